//! Patient models.

use serde::{Deserialize, Serialize};

use super::Actor;

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Patient {
    /// Local UUID, generated on registration
    pub id: String,
    /// Full name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Age in years
    pub age: Option<u32>,
    /// Gender as entered at the desk
    pub gender: String,
    /// Free-text medical history
    pub history: String,
    /// Staff member who registered the patient
    pub added_by: Actor,
    /// Registration timestamp
    pub added_at: String,
}

/// Registration form data for a new patient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub gender: String,
    pub history: String,
}

impl Patient {
    /// Create a new patient record from registration data.
    pub fn new(form: NewPatient, added_by: Actor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: form.name,
            phone: form.phone,
            age: form.age,
            gender: form.gender,
            history: form.history,
            added_by,
            added_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Case-insensitive name match, or plain substring match on phone.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term.to_lowercase()) || self.phone.contains(term)
    }
}
