//! Acting user identity.

use serde::{Deserialize, Serialize};

/// The signed-in staff member performing an operation.
///
/// Supplied by the session provider on every call; the desk never
/// authenticates anyone itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Actor {
    /// Unique user ID from the identity provider
    pub uid: String,
    /// Display name used for attribution
    pub name: String,
}

impl Actor {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}
