use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::artifact::ModelContext;
use crate::draft::{DraftRequest, Role};
use crate::error::{PredictError, error_chain};
use crate::predictor::{Prediction, Predictor, round_to};
use crate::stats::StatsAggregator;
use crate::store::MatchStore;

const DISPLAY_DIGITS: i32 = 4;

/// Status code plus JSON body, independent of any HTTP framework.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => {
                error!(error = %err, "failed to serialize response");
                Self::error(500, "internal error")
            }
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Serialize)]
struct OptionsBody {
    roles: Vec<&'static str>,
    champions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PredictBody {
    result: &'static str,
    probability_blue: f64,
    probability_red: f64,
}

impl From<&Prediction> for PredictBody {
    fn from(prediction: &Prediction) -> Self {
        Self {
            result: prediction.result_label(),
            probability_blue: round_to(prediction.probability_blue, DISPLAY_DIGITS),
            probability_red: round_to(prediction.probability_red, DISPLAY_DIGITS),
        }
    }
}

/// The three endpoints over shared, read-only model state and the match store.
pub struct Api {
    predictor: Predictor,
    stats: StatsAggregator,
    store: Arc<MatchStore>,
}

impl Api {
    pub fn new(model: Arc<ModelContext>, store: Arc<MatchStore>) -> Self {
        Self {
            predictor: Predictor::new(model, Arc::clone(&store)),
            stats: StatsAggregator::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn handle(&self, method: &str, path: &str, body: &[u8]) -> ApiResponse {
        let path = path.trim_end_matches('/');
        let method = method.to_ascii_uppercase();
        match (method.as_str(), path) {
            ("GET", "/options") => self.options(),
            ("POST", "/predict") => self.predict(body),
            ("GET", "/stats") => self.stats(),
            (_, "/options" | "/predict" | "/stats") => {
                ApiResponse::error(405, format!("method {method} not allowed on {path}"))
            }
            _ => ApiResponse::error(404, format!("no route for {path}")),
        }
    }

    pub fn options(&self) -> ApiResponse {
        match self.store.champion_names() {
            Ok(champions) => ApiResponse::ok(OptionsBody {
                roles: Role::ALL.iter().map(|role| role.as_str()).collect(),
                champions,
            }),
            Err(err) => {
                error!(error = %error_chain(&err), "options lookup failed");
                ApiResponse::error(500, "internal error")
            }
        }
    }

    pub fn predict(&self, body: &[u8]) -> ApiResponse {
        let outcome = serde_json::from_slice::<DraftRequest>(body)
            .map_err(|err| PredictError::MalformedRequest(err.to_string()))
            .and_then(|request| self.predictor.predict(&request));
        match outcome {
            Ok(prediction) => ApiResponse::ok(PredictBody::from(&prediction)),
            Err(err) => {
                if err.is_client_error() {
                    warn!(error = %err, "prediction rejected");
                } else {
                    error!(error = %error_chain(&err), "prediction failed");
                }
                ApiResponse::error(err.status_code(), err.to_string())
            }
        }
    }

    pub fn stats(&self) -> ApiResponse {
        match self.stats.compute() {
            Ok(snapshot) => ApiResponse::ok(snapshot),
            Err(err) => {
                error!(error = %error_chain(&err), "stats aggregation failed");
                ApiResponse::error(500, "internal error")
            }
        }
    }
}
