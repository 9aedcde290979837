use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoders::EncodedRow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("row has {actual} features, model expects {expected}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("classifier returned {0}, expected a probability in [0, 1]")]
    OutOfRange(f64),
    #[error("tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },
    #[error("forest has no trees")]
    Empty,
}

/// Probability that the side described by the row wins.
pub trait WinClassifier: Send + Sync {
    fn win_probability(&self, row: &EncodedRow) -> Result<f64, ModelError>;

    fn n_features(&self) -> usize;

    fn describe(&self) -> String {
        format!("classifier over {} features", self.n_features())
    }
}

/// Tree node as stored in the artifact, nodes addressed by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class distribution at the leaf, `[lose, win]`; counts or fractions.
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSpec {
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        win: f64,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_spec(tree: usize, spec: &TreeSpec, n_features: usize) -> Result<Self, ModelError> {
        let invalid = |reason: String| ModelError::InvalidTree { tree, reason };
        if spec.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }
        let len = spec.nodes.len();
        let mut nodes = Vec::with_capacity(len);
        for (idx, node) in spec.nodes.iter().enumerate() {
            let node = match node {
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!("node {idx} splits on feature {feature}")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {idx} has a non-finite threshold")));
                    }
                    // Children strictly after the parent keeps every walk finite.
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(invalid(format!("node {idx} points at node {child}")));
                        }
                    }
                    Node::Split {
                        feature: *feature,
                        threshold: *threshold,
                        left: *left,
                        right: *right,
                    }
                }
                NodeSpec::Leaf { value } => Node::Leaf {
                    win: leaf_win_share(value)
                        .ok_or_else(|| invalid(format!("node {idx} has a bad class distribution")))?,
                },
            };
            nodes.push(node);
        }
        Ok(Self { nodes })
    }

    fn win_share(&self, features: &[u32]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { win } => return win,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if f64::from(features[feature]) <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn leaf_win_share(value: &[f64]) -> Option<f64> {
    let [lose, win] = value else {
        return None;
    };
    if !lose.is_finite() || !win.is_finite() || *lose < 0.0 || *win < 0.0 {
        return None;
    }
    let total = lose + win;
    if total <= 0.0 {
        return None;
    }
    Some(win / total)
}

/// Averaged decision trees over label-encoded features.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn from_specs(n_features: usize, specs: &[TreeSpec]) -> Result<Self, ModelError> {
        if specs.is_empty() {
            return Err(ModelError::Empty);
        }
        let trees = specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| Tree::from_spec(idx, spec, n_features))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { n_features, trees })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl WinClassifier for RandomForest {
    fn win_probability(&self, row: &EncodedRow) -> Result<f64, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::WidthMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.win_share(row.codes()))
            .sum();
        Ok((total / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn describe(&self) -> String {
        format!(
            "random forest, {} trees over {} features",
            self.trees.len(),
            self.n_features
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> NodeSpec {
        NodeSpec::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    fn leaf(lose: f64, win: f64) -> NodeSpec {
        NodeSpec::Leaf {
            value: vec![lose, win],
        }
    }

    #[test]
    fn forest_averages_leaf_shares() {
        let specs = vec![
            TreeSpec {
                nodes: vec![split(0, 0.5, 1, 2), leaf(3.0, 1.0), leaf(1.0, 3.0)],
            },
            TreeSpec {
                nodes: vec![leaf(0.5, 0.5)],
            },
        ];
        let forest = RandomForest::from_specs(2, &specs).unwrap();
        let low = forest
            .win_probability(&EncodedRow::new(vec![0, 9]))
            .unwrap();
        let high = forest
            .win_probability(&EncodedRow::new(vec![1, 9]))
            .unwrap();
        assert!((low - 0.375).abs() < 1e-12);
        assert!((high - 0.625).abs() < 1e-12);
        assert_eq!(forest.describe(), "random forest, 2 trees over 2 features");
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let specs = vec![TreeSpec {
            nodes: vec![leaf(1.0, 1.0)],
        }];
        let forest = RandomForest::from_specs(3, &specs).unwrap();
        let err = forest
            .win_probability(&EncodedRow::new(vec![0, 1]))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::WidthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn backward_child_links_are_rejected() {
        let specs = vec![TreeSpec {
            nodes: vec![split(0, 0.5, 1, 0), leaf(1.0, 0.0)],
        }];
        let err = RandomForest::from_specs(1, &specs).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTree { tree: 0, .. }));
    }

    #[test]
    fn empty_leaf_distribution_is_rejected() {
        let specs = vec![TreeSpec {
            nodes: vec![leaf(0.0, 0.0)],
        }];
        assert!(RandomForest::from_specs(1, &specs).is_err());
        assert_eq!(RandomForest::from_specs(1, &[]).unwrap_err(), ModelError::Empty);
    }
}
