use std::collections::HashSet;
use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::encoders::{ColumnEncoder, EncoderRegistry};
use crate::forest::{ModelError, RandomForest, TreeSpec, WinClassifier};
use crate::team_row::{Category, ROW_WIDTH, column_label};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("read model artifact {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse model artifact")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported artifact format version {0}")]
    Version(u32),
    #[error("artifact has {0} encoder columns, expected {expected}", expected = ROW_WIDTH)]
    ColumnCount(usize),
    #[error("encoder column {column} lists {value} more than once")]
    DuplicateClass { column: usize, value: Category },
    #[error("model expects {model} features but encoders cover {encoders}")]
    FeatureMismatch { model: usize, encoders: usize },
    #[error("invalid model")]
    Model(#[from] ModelError),
}

/// On-disk layout of the trained encoders and classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub columns: Vec<ColumnSpec>,
    pub model: ModelSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// Label-encoder classes; a value's code is its index here.
    pub classes: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest {
        n_features: usize,
        trees: Vec<TreeSpec>,
    },
}

/// Immutable model state built once at startup and shared by every request.
pub struct ModelContext {
    pub encoders: EncoderRegistry,
    pub classifier: Box<dyn WinClassifier>,
    pub fingerprint: String,
}

impl ModelContext {
    pub fn new(encoders: EncoderRegistry, classifier: Box<dyn WinClassifier>) -> Self {
        Self {
            encoders,
            classifier,
            fingerprint: String::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read(path).map_err(|source| ArtifactError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let context = Self::from_slice(&raw)?;
        info!(
            path = %path.display(),
            fingerprint = %context.fingerprint,
            columns = context.encoders.width(),
            "loaded model artifact"
        );
        Ok(context)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_slice(raw)?;
        let mut context = artifact.into_context()?;
        context.fingerprint = fingerprint(raw);
        Ok(context)
    }
}

impl ModelArtifact {
    pub fn into_context(self) -> Result<ModelContext, ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Version(self.format_version));
        }
        if self.columns.len() != ROW_WIDTH {
            return Err(ArtifactError::ColumnCount(self.columns.len()));
        }

        let mut encoders = Vec::with_capacity(self.columns.len());
        for (column, spec) in self.columns.into_iter().enumerate() {
            if let Some(value) = first_duplicate(&spec.classes) {
                return Err(ArtifactError::DuplicateClass { column, value });
            }
            let name = spec.name.unwrap_or_else(|| column_label(column));
            encoders.push(ColumnEncoder::new(name, spec.classes));
        }
        let encoders = EncoderRegistry::new(encoders);

        let classifier: Box<dyn WinClassifier> = match self.model {
            ModelSpec::RandomForest { n_features, trees } => {
                Box::new(RandomForest::from_specs(n_features, &trees)?)
            }
        };
        if classifier.n_features() != encoders.width() {
            return Err(ArtifactError::FeatureMismatch {
                model: classifier.n_features(),
                encoders: encoders.width(),
            });
        }

        Ok(ModelContext::new(encoders, classifier))
    }
}

fn first_duplicate(classes: &[Category]) -> Option<Category> {
    let mut seen = HashSet::new();
    classes.iter().find(|class| !seen.insert(*class)).cloned()
}

/// SHA-256 of the artifact bytes, base64.
pub fn fingerprint(raw: &[u8]) -> String {
    BASE64.encode(Sha256::digest(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact_json(columns: usize, n_features: usize) -> serde_json::Value {
        let columns: Vec<_> = (0..columns)
            .map(|idx| json!({ "classes": [format!("v{idx}"), idx as i64] }))
            .collect();
        json!({
            "format_version": 1,
            "columns": columns,
            "model": {
                "kind": "random_forest",
                "n_features": n_features,
                "trees": [ { "nodes": [ { "value": [1.0, 1.0] } ] } ]
            }
        })
    }

    #[test]
    fn loads_forest_and_names_columns() {
        let raw = serde_json::to_vec(&artifact_json(ROW_WIDTH, ROW_WIDTH)).unwrap();
        let context = ModelContext::from_slice(&raw).unwrap();
        assert_eq!(context.encoders.width(), ROW_WIDTH);
        assert_eq!(context.encoders.columns()[2].name(), "JUNGLE champion");
        assert_eq!(context.classifier.n_features(), ROW_WIDTH);
        assert_eq!(context.fingerprint, fingerprint(&raw));
        assert!(!context.fingerprint.is_empty());
    }

    #[test]
    fn rejects_wrong_column_count() {
        let raw = serde_json::to_vec(&artifact_json(4, 4)).unwrap();
        let err = ModelContext::from_slice(&raw).err().unwrap();
        assert!(matches!(err, ArtifactError::ColumnCount(4)));
    }

    #[test]
    fn rejects_model_width_mismatch() {
        let raw = serde_json::to_vec(&artifact_json(ROW_WIDTH, 7)).unwrap();
        let err = ModelContext::from_slice(&raw).err().unwrap();
        assert!(matches!(
            err,
            ArtifactError::FeatureMismatch {
                model: 7,
                encoders: ROW_WIDTH
            }
        ));
    }

    #[test]
    fn rejects_duplicate_classes() {
        let mut value = artifact_json(ROW_WIDTH, ROW_WIDTH);
        value["columns"][3]["classes"] = json!(["Ahri", "Ahri"]);
        let raw = serde_json::to_vec(&value).unwrap();
        let err = ModelContext::from_slice(&raw).err().unwrap();
        assert!(matches!(err, ArtifactError::DuplicateClass { column: 3, .. }));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut value = artifact_json(ROW_WIDTH, ROW_WIDTH);
        value["format_version"] = json!(9);
        let raw = serde_json::to_vec(&value).unwrap();
        let err = ModelContext::from_slice(&raw).err().unwrap();
        assert!(matches!(err, ArtifactError::Version(9)));
    }
}
