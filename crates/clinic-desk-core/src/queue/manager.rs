//! Token queue manager.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::{
    notify_activity, ActivitySink, LogActivitySink, PatientDirectory, QueueError, QueueResult,
    QueueStats, QueueStore,
};
use crate::db::DbError;
use crate::models::{Actor, NewToken, QueueState, Token};

/// Owns one site's token queue and mirrors it in memory.
///
/// Operations run to completion one at a time; callers sharing a manager
/// across threads wrap it in a lock.
pub struct QueueManager<S> {
    store: S,
    site_id: String,
    state: QueueState,
    tokens: Vec<Token>,
    activity: Arc<dyn ActivitySink>,
}

impl<S: QueueStore> QueueManager<S> {
    /// Load the site's counters and tokens from the store.
    pub fn load(store: S, site_id: impl Into<String>) -> QueueResult<Self> {
        let mut manager = Self {
            store,
            site_id: site_id.into(),
            state: QueueState::default(),
            tokens: Vec::new(),
            activity: Arc::new(LogActivitySink),
        };
        manager.refresh()?;
        Ok(manager)
    }

    /// Replace the activity sink.
    pub fn with_activity_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity = sink;
        self
    }

    /// Re-read counters and tokens from the store.
    pub fn refresh(&mut self) -> QueueResult<()> {
        let state = self.store.load_queue_state(&self.site_id).map_err(|e| {
            error!(site = %self.site_id, error = %e, "Failed to load queue settings");
            e
        })?;
        let tokens = self.store.load_tokens(&self.site_id).map_err(|e| {
            error!(site = %self.site_id, error = %e, "Failed to load tokens");
            e
        })?;

        self.state = state;
        self.tokens = tokens;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn activity_sink(&self) -> &dyn ActivitySink {
        self.activity.as_ref()
    }

    /// All known tokens, in load/issue order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Pending tokens, lowest number first.
    pub fn pending_tokens(&self) -> Vec<&Token> {
        let mut pending: Vec<&Token> = self.tokens.iter().filter(|t| t.is_pending()).collect();
        pending.sort_by_key(|t| t.number);
        pending
    }

    /// Completed tokens, highest number first, at most `limit` of them.
    ///
    /// Ordered by number, not by completion time.
    pub fn completed_tokens(&self, limit: usize) -> Vec<&Token> {
        let mut completed: Vec<&Token> =
            self.tokens.iter().filter(|t| !t.is_pending()).collect();
        completed.sort_by(|a, b| b.number.cmp(&a.number));
        completed.truncate(limit);
        completed
    }

    /// Whether serving `token_id` now would skip a lower pending number.
    pub fn is_out_of_order(&self, token_id: &str) -> bool {
        let Some(token) = self.tokens.iter().find(|t| t.id == token_id) else {
            return false;
        };
        token.is_pending()
            && self
                .tokens
                .iter()
                .any(|t| t.is_pending() && t.number < token.number)
    }

    /// Dashboard counters, counting tokens generated on `today`.
    pub fn stats(&self, today: NaiveDate) -> QueueStats {
        let mut stats = QueueStats {
            now_serving: self.state.now_serving(),
            ..Default::default()
        };
        for token in &self.tokens {
            if token.is_pending() {
                stats.pending_tokens += 1;
            } else {
                stats.completed_tokens += 1;
            }
            if token.generated_on() == Some(today) {
                stats.today_tokens += 1;
            }
        }
        stats
    }

    /// Serve the lowest-numbered pending token.
    ///
    /// Returns `Ok(None)` without touching anything when nothing is pending.
    pub fn serve_next(&mut self, actor: &Actor) -> QueueResult<Option<Token>> {
        let next = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_pending())
            .min_by_key(|(_, t)| t.number)
            .map(|(idx, _)| idx);

        match next {
            Some(idx) => self.complete_at(idx, actor).map(Some),
            None => {
                info!(site = %self.site_id, "No pending tokens to serve");
                Ok(None)
            }
        }
    }

    /// Serve a specific token, regardless of its place in the queue.
    pub fn serve_specific(&mut self, token_id: &str, actor: &Actor) -> QueueResult<Token> {
        let Some(idx) = self.tokens.iter().position(|t| t.id == token_id) else {
            warn!(site = %self.site_id, token_id = %token_id, "Token not found");
            return Err(QueueError::NotFound(format!("token {}", token_id)));
        };

        if self.is_out_of_order(token_id) {
            warn!(
                site = %self.site_id,
                number = self.tokens[idx].number,
                "Serving token ahead of lower pending numbers"
            );
        }

        self.complete_at(idx, actor)
    }

    /// Delete every token and restart numbering at 1.
    pub fn reset(&mut self, actor: &Actor) -> QueueResult<()> {
        if let Err(e) = self.store.reset_queue(&self.site_id) {
            error!(site = %self.site_id, error = %e, "Failed to reset tokens");
            return Err(e.into());
        }

        let removed = self.tokens.len();
        self.tokens.clear();
        self.state = QueueState::default();

        info!(site = %self.site_id, removed, "Token queue reset");
        notify_activity(self.activity.as_ref(), actor, "All tokens have been reset");
        Ok(())
    }

    fn complete_at(&mut self, idx: usize, actor: &Actor) -> QueueResult<Token> {
        let token = &self.tokens[idx];
        if !token.is_pending() {
            return Err(QueueError::Conflict(format!(
                "token #{} is already completed",
                token.number
            )));
        }

        let completed_at = match self.store.serve_token(&self.site_id, token, actor) {
            Ok(ts) => ts,
            Err(e @ (DbError::Conflict(_) | DbError::NotFound(_))) => {
                let number = token.number;
                warn!(site = %self.site_id, number, error = %e, "Token changed by another session");
                // Pick up the other session's serve or reset
                if let Err(reload) = self.refresh() {
                    warn!(site = %self.site_id, error = %reload, "Failed to resync after conflict");
                }
                return Err(e.into());
            }
            Err(e) => {
                error!(site = %self.site_id, number = token.number, error = %e, "Failed to complete token");
                return Err(e.into());
            }
        };

        let token = &mut self.tokens[idx];
        token.mark_completed(completed_at, actor.clone());
        self.state.last_served_token = token.number;
        let served = token.clone();

        info!(site = %self.site_id, number = served.number, "Token completed");
        notify_activity(
            self.activity.as_ref(),
            actor,
            &format!("Token #{} completed", served.number),
        );
        Ok(served)
    }
}

impl<S: QueueStore + PatientDirectory> QueueManager<S> {
    /// Issue the next token number to a registered patient.
    pub fn enqueue(
        &mut self,
        patient_id: &str,
        visit_type: &str,
        notes: Option<&str>,
        actor: &Actor,
    ) -> QueueResult<Token> {
        let patient = self
            .store
            .find_patient(patient_id)
            .map_err(|e| {
                error!(site = %self.site_id, patient_id = %patient_id, error = %e, "Failed to look up patient");
                e
            })?
            .ok_or_else(|| QueueError::NotFound(format!("patient {}", patient_id)))?;

        let number = self.state.next_number();
        self.state.current_token_number = number;
        let draft = NewToken {
            number,
            patient_id: patient.id,
            patient_name: patient.name,
            visit_type: visit_type.to_string(),
            notes: notes.filter(|n| !n.trim().is_empty()).map(str::to_string),
            generated_by: actor.clone(),
        };

        let token = match self.store.issue_token(&self.site_id, draft) {
            Ok(token) => token,
            Err(e) => {
                // Give the number back so a retry reuses it
                self.state.current_token_number = number - 1;
                error!(site = %self.site_id, error = %e, "Failed to generate token");
                return Err(e.into());
            }
        };

        self.tokens.push(token.clone());

        info!(site = %self.site_id, number = token.number, "Token generated");
        notify_activity(
            self.activity.as_ref(),
            actor,
            &format!("Token #{} generated for {}", token.number, token.patient_name),
        );
        Ok(token)
    }
}
