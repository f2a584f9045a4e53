//! Queue counter state.

use serde::{Deserialize, Serialize};

/// Singleton counter document for one site.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueState {
    /// Last issued token number; the next token gets `current_token_number + 1`
    pub current_token_number: u32,
    /// Number of the most recently completed token (0 = none served)
    pub last_served_token: u32,
}

impl QueueState {
    /// Number the next issued token will carry.
    pub fn next_number(&self) -> u32 {
        self.current_token_number + 1
    }

    /// The "currently serving" indicator, if anything has been served.
    pub fn now_serving(&self) -> Option<u32> {
        (self.last_served_token > 0).then_some(self.last_served_token)
    }
}
