//! Visit token models.

use serde::{Deserialize, Serialize};

use super::Actor;

/// Token status. Transitions only forward, `Pending` to `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Waiting to be served
    Pending,
    /// Served; terminal
    Completed,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TokenStatus::Pending),
            "completed" => Some(TokenStatus::Completed),
            _ => None,
        }
    }
}

/// A numbered queue ticket for one patient visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Token {
    /// Store-assigned ID
    pub id: String,
    /// Queue number, unique per site until the next reset
    pub number: u32,
    /// Patient ID at generation time
    pub patient_id: String,
    /// Patient name copied at generation time (not kept live)
    pub patient_name: String,
    /// Reason for visit
    pub visit_type: String,
    /// Desk notes
    pub notes: Option<String>,
    pub status: TokenStatus,
    /// Store-assigned generation timestamp
    pub generated_at: String,
    /// Store-assigned completion timestamp
    pub completed_at: Option<String>,
    pub generated_by: Actor,
    pub completed_by: Option<Actor>,
}

impl Token {
    pub fn is_pending(&self) -> bool {
        self.status == TokenStatus::Pending
    }

    /// Apply the completion transition after the store has accepted it.
    pub(crate) fn mark_completed(&mut self, completed_at: String, completed_by: Actor) {
        self.status = TokenStatus::Completed;
        self.completed_at = Some(completed_at);
        self.completed_by = Some(completed_by);
    }

    /// Calendar date (local time) on which the token was generated.
    pub fn generated_on(&self) -> Option<chrono::NaiveDate> {
        chrono::DateTime::parse_from_rfc3339(&self.generated_at)
            .ok()
            .map(|ts| ts.with_timezone(&chrono::Local).date_naive())
    }
}

/// A token about to be issued; the store assigns `id` and `generated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewToken {
    pub number: u32,
    pub patient_id: String,
    pub patient_name: String,
    pub visit_type: String,
    pub notes: Option<String>,
    pub generated_by: Actor,
}

impl NewToken {
    /// Attach the store-assigned fields, producing a pending token.
    pub fn into_token(self, id: String, generated_at: String) -> Token {
        Token {
            id,
            number: self.number,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            visit_type: self.visit_type,
            notes: self.notes,
            status: TokenStatus::Pending,
            generated_at,
            completed_at: None,
            generated_by: self.generated_by,
            completed_by: None,
        }
    }
}
