//! Queue snapshot export for hand-off and printing.

use serde::{Deserialize, Serialize};

use crate::models::{QueueState, Token};
use crate::queue::{QueueManager, QueueStore};

/// Point-in-time copy of one site's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Export timestamp
    pub exported_at: String,
    pub site_id: String,
    pub state: QueueState,
    /// Pending tokens, lowest number first
    pub pending: Vec<Token>,
    /// Completed tokens, highest number first
    pub completed: Vec<Token>,
}

impl QueueSnapshot {
    /// Capture the manager's current view, keeping at most
    /// `completed_limit` completed tokens.
    pub fn capture<S: QueueStore>(queue: &QueueManager<S>, completed_limit: usize) -> Self {
        Self {
            exported_at: chrono::Utc::now().to_rfc3339(),
            site_id: queue.site_id().to_string(),
            state: queue.state(),
            pending: queue.pending_tokens().into_iter().cloned().collect(),
            completed: queue
                .completed_tokens(completed_limit)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format, pending tokens first.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("number,status,patient_name,visit_type,notes,generated_at,generated_by,completed_at,completed_by\n");

        for token in self.pending.iter().chain(&self.completed) {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                token.number,
                token.status.as_str(),
                escape_csv(&token.patient_name),
                escape_csv(&token.visit_type),
                escape_csv(token.notes.as_deref().unwrap_or("")),
                escape_csv(&token.generated_at),
                escape_csv(&token.generated_by.name),
                escape_csv(token.completed_at.as_deref().unwrap_or("")),
                escape_csv(token.completed_by.as_ref().map(|a| a.name.as_str()).unwrap_or("")),
            ));
        }

        csv
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Actor, NewPatient, Patient};

    fn setup_queue() -> QueueManager<Database> {
        let db = Database::open_in_memory().unwrap();
        let reception = Actor::new("uid-1", "Reception");
        let mut queue = QueueManager::load(db, "clinic").unwrap();

        for name in ["Asha Rao", "Ben Okafor", "Chen Li"] {
            let patient = Patient::new(
                NewPatient {
                    name: name.into(),
                    ..Default::default()
                },
                reception.clone(),
            );
            queue.store().insert_patient(&patient).unwrap();
            queue
                .enqueue(&patient.id, "Consultation", Some("walk-in, first visit"), &reception)
                .unwrap();
        }
        queue.serve_next(&reception).unwrap();
        queue
    }

    #[test]
    fn test_capture() {
        let queue = setup_queue();
        let snapshot = QueueSnapshot::capture(&queue, 10);

        assert_eq!(snapshot.site_id, "clinic");
        assert_eq!(snapshot.state.current_token_number, 3);
        assert_eq!(snapshot.state.last_served_token, 1);
        assert_eq!(snapshot.pending.iter().map(|t| t.number).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(snapshot.completed.len(), 1);
    }

    #[test]
    fn test_to_json() {
        let snapshot = QueueSnapshot::capture(&setup_queue(), 10);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"site_id\": \"clinic\""));
        assert!(json.contains("\"status\": \"completed\""));
    }

    #[test]
    fn test_to_csv() {
        let snapshot = QueueSnapshot::capture(&setup_queue(), 10);
        let csv = snapshot.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("number,status"));
        assert!(lines[1].starts_with("2,pending,Ben Okafor"));
        assert!(lines[3].starts_with("1,completed,Asha Rao"));
        // Notes contain a comma, so they are quoted
        assert!(lines[1].contains("\"walk-in, first visit\""));
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
