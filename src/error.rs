use thiserror::Error;

use crate::encoders::UnknownCategory;
use crate::forest::ModelError;
use crate::store::StoreError;
use crate::team_row::MissingRole;

/// Everything a prediction can fail with. Client-caused kinds carry a message meant
/// for the caller; `Internal` keeps its detail for the logs only.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("fill in all 5 picks for each side (blue has {blue}, red has {red})")]
    CompositionIncomplete { blue: usize, red: usize },
    #[error(transparent)]
    MissingRole(#[from] MissingRole),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error("champion {champion} is picked more than once in this draft")]
    DuplicateChampion { champion: String },
    #[error("malformed request body: {0}")]
    MalformedRequest(String),
    #[error("internal error")]
    Internal(#[from] InternalFault),
}

#[derive(Debug, Error)]
pub enum InternalFault {
    #[error("match store failure")]
    Store(#[from] StoreError),
    #[error("classifier failure")]
    Model(#[from] ModelError),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PredictError::Internal(_))
    }

    pub fn status_code(&self) -> u16 {
        if self.is_client_error() { 400 } else { 500 }
    }
}

impl From<StoreError> for PredictError {
    fn from(err: StoreError) -> Self {
        PredictError::Internal(InternalFault::Store(err))
    }
}

impl From<ModelError> for PredictError {
    fn from(err: ModelError) -> Self {
        PredictError::Internal(InternalFault::Model(err))
    }
}

/// Renders an error with its whole source chain, for logs.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
