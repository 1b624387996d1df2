//! Error types for timeline-engine operations.
//!
//! Store mutations never fail; these errors only arise at the JSON boundary
//! and when parsing enum names from text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, TimelineError>;
