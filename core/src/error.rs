use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Infrastructure failures: storage, serialization, data loading.
/// Gameplay rejections never use this type; see [`Rejected`].
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Save slot '{slot}' not found")]
    SaveNotFound { slot: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// Reason code returned when an operator action is refused.
/// The run state is untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejected {
    /// Dismissing or resting this worker would leave nobody on shift.
    #[serde(rename = "LAST_MAID")]
    #[error("cannot remove the last active staff member")]
    LastStaff,

    #[error("no such entity")]
    NotFound,

    #[error("not enough gold")]
    InsufficientGold,

    #[error("limit reached")]
    LimitReached,

    #[error("no such store item")]
    ItemNotFound,

    #[error("the run is bankrupt")]
    Bankruptcy,

    /// The action is not valid in the current run status.
    #[error("action not available right now")]
    WrongPhase,
}

/// Result of an operator action that can be refused.
pub type Outcome<T> = Result<T, Rejected>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_serialize_to_wire_names() {
        let codes = [
            (Rejected::LastStaff, "\"LAST_MAID\""),
            (Rejected::NotFound, "\"NOT_FOUND\""),
            (Rejected::InsufficientGold, "\"INSUFFICIENT_GOLD\""),
            (Rejected::LimitReached, "\"LIMIT_REACHED\""),
            (Rejected::ItemNotFound, "\"ITEM_NOT_FOUND\""),
            (Rejected::Bankruptcy, "\"BANKRUPTCY\""),
        ];
        for (code, wire) in codes {
            assert_eq!(serde_json::to_string(&code).unwrap(), wire);
        }
    }
}
