//! Persistence ports used by the queue manager.

use crate::db::DbResult;
use crate::models::{Actor, NewToken, Patient, QueueState, Token};

/// Document store holding the token collection and the per-site settings
/// document.
///
/// Every mutating method must be all-or-nothing: either both documents it
/// touches are written or neither is.
pub trait QueueStore {
    /// Read the site's settings document, creating a zeroed one if absent.
    fn load_queue_state(&self, site_id: &str) -> DbResult<QueueState>;

    /// Read every token of the site, in any order.
    fn load_tokens(&self, site_id: &str) -> DbResult<Vec<Token>>;

    /// Persist a new pending token and record its number as the site's
    /// `current_token_number`. Assigns the token ID and generation timestamp.
    fn issue_token(&self, site_id: &str, token: NewToken) -> DbResult<Token>;

    /// Mark a pending token completed and record its number as the site's
    /// `last_served_token`. Returns the completion timestamp.
    ///
    /// Fails with `DbError::Conflict` if the token is no longer pending and
    /// with `DbError::NotFound` if it does not exist.
    fn serve_token(&self, site_id: &str, token: &Token, actor: &Actor) -> DbResult<String>;

    /// Delete every token of the site and zero both counters.
    fn reset_queue(&self, site_id: &str) -> DbResult<()>;
}

/// Patient lookups needed to issue a token.
pub trait PatientDirectory {
    fn find_patient(&self, patient_id: &str) -> DbResult<Option<Patient>>;
}
