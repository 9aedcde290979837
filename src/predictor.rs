use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::artifact::ModelContext;
use crate::draft::{DraftRequest, PICKS_PER_SIDE, Side, TeamComposition};
use crate::encoders::EncodedRow;
use crate::error::PredictError;
use crate::forest::ModelError;
use crate::store::{MatchStore, NewPrediction};
use crate::team_row::{self, TeamRow};

/// Outcome of one scored and stored draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub record_id: i64,
    pub timestamp: DateTime<Utc>,
    pub winner: Side,
    pub probability_blue: f64,
    pub probability_red: f64,
}

impl Prediction {
    pub fn result_label(&self) -> &'static str {
        self.winner.result_label()
    }
}

/// Validates, encodes, scores, decides and records one draft per call. Holds no
/// per-request state, so a single instance serves concurrent callers.
pub struct Predictor {
    model: Arc<ModelContext>,
    store: Arc<MatchStore>,
}

impl Predictor {
    pub fn new(model: Arc<ModelContext>, store: Arc<MatchStore>) -> Self {
        Self { model, store }
    }

    pub fn predict(&self, request: &DraftRequest) -> Result<Prediction, PredictError> {
        check_pick_counts(request)?;

        // Both sides go through building and encoding before either error is reported.
        let blue = self.prepare(request, Side::Blue);
        let red = self.prepare(request, Side::Red);
        let (blue_team, blue_row) = blue?;
        let (red_team, red_row) = red?;
        check_duplicates(&blue_team, &red_team)?;

        let probability_blue = self.score(&blue_row)?;
        let probability_red = self.score(&red_row)?;
        let winner = decide(probability_blue, probability_red);

        let timestamp = Utc::now();
        let record_id = self.store.append(&NewPrediction {
            timestamp,
            blue: &blue_team,
            red: &red_team,
            probability_blue,
            probability_red,
            winner,
        })?;

        info!(
            record_id,
            probability_blue,
            probability_red,
            result = winner.result_label(),
            "draft predicted"
        );

        Ok(Prediction {
            record_id,
            timestamp,
            winner,
            probability_blue,
            probability_red,
        })
    }

    fn prepare(
        &self,
        request: &DraftRequest,
        side: Side,
    ) -> Result<(TeamComposition, EncodedRow), PredictError> {
        let TeamRow { team, row } = team_row::build(request.picks(side), side)?;
        let encoded = self.model.encoders.encode_row(&row)?;
        Ok((team, encoded))
    }

    fn score(&self, row: &EncodedRow) -> Result<f64, PredictError> {
        let probability = self.model.classifier.win_probability(row)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::OutOfRange(probability).into());
        }
        Ok(probability)
    }
}

/// Ties go to blue.
pub fn decide(probability_blue: f64, probability_red: f64) -> Side {
    if probability_blue >= probability_red {
        Side::Blue
    } else {
        Side::Red
    }
}

/// Halves round to the even digit, so 6.25 becomes 6.2 and 93.75 becomes 93.8.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

fn check_pick_counts(request: &DraftRequest) -> Result<(), PredictError> {
    let (blue, red) = (request.blue.len(), request.red.len());
    if blue != PICKS_PER_SIDE || red != PICKS_PER_SIDE {
        return Err(PredictError::CompositionIncomplete { blue, red });
    }
    Ok(())
}

/// A champion can be drafted once per match, on either side.
fn check_duplicates(blue: &TeamComposition, red: &TeamComposition) -> Result<(), PredictError> {
    let mut seen = HashSet::new();
    for champ in blue.champions().chain(red.champions()) {
        if !seen.insert(champ) {
            return Err(PredictError::DuplicateChampion {
                champion: champ.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::RawPicks;

    fn picks(champs: [&str; 5]) -> RawPicks {
        ["TOP", "JUNGLE", "MID", "ADCARRY", "SUPPORT"]
            .into_iter()
            .zip(champs)
            .map(|(role, champ)| (role.to_string(), Some(champ.to_string())))
            .collect()
    }

    #[test]
    fn ties_favor_blue() {
        assert_eq!(decide(0.5, 0.5), Side::Blue);
        assert_eq!(decide(0.0, 0.0), Side::Blue);
        assert_eq!(decide(0.51, 0.5), Side::Blue);
        assert_eq!(decide(0.49, 0.5), Side::Red);
    }

    #[test]
    fn rounds_for_display() {
        assert_eq!(round_to(0.516666666, 4), 0.5167);
        assert_eq!(round_to(0.56000000001, 4), 0.56);
        assert_eq!(round_to(33.333, 1), 33.3);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(round_to(0.03125, 4), 0.0312);
        assert_eq!(round_to(0.09375, 4), 0.0938);
        assert_eq!(round_to(6.25, 1), 6.2);
        assert_eq!(round_to(93.75, 1), 93.8);
    }

    #[test]
    fn short_side_is_incomplete() {
        let mut request = DraftRequest {
            blue: picks(["Yone", "Maokai", "Corki", "Ziggs", "Bard"]),
            red: picks(["Jax", "Nocturne", "Tristana", "Sivir", "Alistar"]),
        };
        assert!(check_pick_counts(&request).is_ok());
        request.blue.remove("MID");
        let err = check_pick_counts(&request).unwrap_err();
        assert!(matches!(
            err,
            PredictError::CompositionIncomplete { blue: 4, red: 5 }
        ));
    }

    #[test]
    fn repeated_champion_across_sides_is_rejected() {
        let blue = TeamComposition::new(["Yone", "Maokai", "Corki", "Ziggs", "Bard"]);
        let red = TeamComposition::new(["Yone", "Nocturne", "Tristana", "Sivir", "Alistar"]);
        let err = check_duplicates(&blue, &red).unwrap_err();
        assert!(matches!(err, PredictError::DuplicateChampion { ref champion } if champion == "Yone"));
    }

    #[test]
    fn repeated_champion_within_side_is_rejected() {
        let blue = TeamComposition::new(["Bard", "Maokai", "Corki", "Ziggs", "Bard"]);
        let red = TeamComposition::new(["Jax", "Nocturne", "Tristana", "Sivir", "Alistar"]);
        assert!(check_duplicates(&blue, &red).is_err());
        let distinct = TeamComposition::new(["Yone", "Maokai", "Corki", "Ziggs", "Bard"]);
        assert!(check_duplicates(&distinct, &red).is_ok());
    }
}
