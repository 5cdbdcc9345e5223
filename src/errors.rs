//! Typed error hierarchy for taskboard.
//!
//! Two top-level enums cover the two sides of the system:
//! - `BoardError`: board store and board service failures
//! - `SyncError`: client-side sync action failures

use thiserror::Error;

/// Errors from the board store and the HTTP layer on top of it.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Board {id} not found")]
    BoardNotFound { id: String },

    #[error("Card {card_id} not found on board {board_id}")]
    CardNotFound { board_id: String, card_id: String },

    #[error("Board {id} already exists")]
    DuplicateBoard { id: String },

    #[error("Invalid column '{0}'")]
    InvalidColumn(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt board document {id}: {source}")]
    CorruptDocument {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BoardError::BoardNotFound { .. } | BoardError::CardNotFound { .. }
        )
    }
}

/// Errors surfaced by client sync actions.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The service answered with a non-success status.
    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid service URL '{0}'")]
    InvalidUrl(String),

    #[error("Card {card_id} is not at {column} index {index} on board {board_id}")]
    CardNotInCache {
        board_id: String,
        card_id: String,
        column: String,
        index: usize,
    },
}

impl SyncError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// User-facing text: the server's message for a status error, the
    /// error itself otherwise.
    pub fn message(&self) -> String {
        match self {
            SyncError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_not_found_carries_id() {
        let err = BoardError::BoardNotFound { id: "b1".into() };
        match &err {
            BoardError::BoardNotFound { id } => assert_eq!(id, "b1"),
            _ => panic!("Expected BoardNotFound"),
        }
        assert!(err.to_string().contains("b1"));
        assert!(err.is_not_found());
    }

    #[test]
    fn card_not_found_mentions_both_ids() {
        let err = BoardError::CardNotFound {
            board_id: "b1".into(),
            card_id: "c9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("b1"));
        assert!(msg.contains("c9"));
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_is_not_a_not_found() {
        let err = BoardError::DuplicateBoard { id: "b1".into() };
        assert!(!err.is_not_found());
        assert!(matches!(err, BoardError::DuplicateBoard { .. }));
    }

    #[test]
    fn board_error_converts_from_anyhow() {
        let err: BoardError = anyhow::anyhow!("disk full").into();
        match &err {
            BoardError::Other(e) => assert_eq!(e.to_string(), "disk full"),
            _ => panic!("Expected Other"),
        }
    }

    #[test]
    fn sync_error_status_exposes_code_and_message() {
        let err = SyncError::Status {
            status: 404,
            message: "Board not found".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "Board not found");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn sync_error_decode_has_no_status() {
        let err = SyncError::Decode("expected value".into());
        assert_eq!(err.status(), None);
        assert!(err.message().contains("expected value"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BoardError::LockPoisoned);
        assert_std_error(&SyncError::Decode("x".into()));
    }
}
