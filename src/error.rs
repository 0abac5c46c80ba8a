use thiserror::Error;

use crate::actions::ActionId;

/// Errors surfaced to callers of the simulator.
///
/// Running out of CP or durability is not an error: it ends a run and shows up
/// as a [`TerminationReason`](crate::simulation::TerminationReason).
#[derive(Debug, Error)]
pub enum CraftError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("action {0:?} is not available in this catalog")]
    NotFound(ActionId),
    #[error("{field} is invalid: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

impl CraftError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CraftError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CraftError>;
