//! Draft outcome predictor.
//!
//! Scores two five-pick team compositions with a pre-trained forest, records every
//! prediction in SQLite and aggregates win rates and pick frequencies over them.

pub mod api;
pub mod artifact;
pub mod config;
pub mod dashboard;
pub mod draft;
pub mod encoders;
pub mod error;
pub mod fake_draft;
pub mod forest;
pub mod predictor;
pub mod stats;
pub mod store;
pub mod team_row;

pub use error::PredictError;
