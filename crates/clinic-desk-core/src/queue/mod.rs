//! Visit-token queue.
//!
//! Numbers come from a single per-site counter and are never reused until a
//! reset. Serving normally takes the lowest pending number, but any pending
//! token may be served directly, so "now serving" can move backwards.

mod activity;
mod manager;
mod store;

pub use activity::*;
pub use manager::*;
pub use store::*;

use thiserror::Error;

use crate::db::DbError;

/// Queue operation errors.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Save failed: {0}")]
    Persistence(DbError),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<DbError> for QueueError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => QueueError::NotFound(what),
            DbError::Conflict(what) => QueueError::Conflict(what),
            other => QueueError::Persistence(other),
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Dashboard counters for the desk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tokens generated on the requested day
    pub today_tokens: u32,
    pub pending_tokens: u32,
    pub completed_tokens: u32,
    /// Most recently served number, if any
    pub now_serving: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            QueueError::from(DbError::NotFound("token t-1".into())),
            QueueError::NotFound(_)
        ));
        assert!(matches!(
            QueueError::from(DbError::Conflict("token t-1".into())),
            QueueError::Conflict(_)
        ));
        assert!(matches!(
            QueueError::from(DbError::Constraint("bad".into())),
            QueueError::Persistence(_)
        ));
    }
}
