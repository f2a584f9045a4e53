//! Clinic Desk Core Library
//!
//! Front-desk patient registry and visit-token queue for a single clinic site.
//!
//! # Architecture
//!
//! ```text
//!   Host UI (FFI)
//!        │
//!        ▼
//!   ClinicDesk ──── Mutex ────► QueueManager<Database>
//!        │                        │   in-memory tokens + QueueState
//!        │                        │
//!        │                        ├──► QueueStore / PatientDirectory
//!        │                        │        (SQLite: tokens, queue_settings, patients)
//!        │                        │
//!        └────────────────────────┴──► ActivitySink (best effort)
//! ```
//!
//! # Token lifecycle
//!
//! A token is issued `pending` with the next counter value, moves once to
//! `completed` when served, and disappears only on a full queue reset.
//!
//! # Modules
//!
//! - [`db`]: SQLite document store
//! - [`models`]: Domain types (Patient, Token, QueueState, Actor)
//! - [`queue`]: Queue manager, store ports, activity notifications
//! - [`export`]: Queue snapshot export
//! - [`config`]: Desk configuration
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod models;
pub mod queue;

// Re-export commonly used types
pub use config::{DeskConfig, LogFormat};
pub use db::Database;
pub use export::QueueSnapshot;
pub use models::{Actor, NewPatient, NewToken, Patient, QueueState, Token, TokenStatus};
pub use queue::{
    ActivitySink, LogActivitySink, PatientDirectory, QueueError, QueueManager, QueueStats,
    QueueStore,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing::info;

use queue::notify_activity;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicDeskError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for ClinicDeskError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => ClinicDeskError::NotFound(what),
            db::DbError::Conflict(what) => ClinicDeskError::Conflict(what),
            other => ClinicDeskError::SaveFailed(other.to_string()),
        }
    }
}

impl From<QueueError> for ClinicDeskError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(what) => ClinicDeskError::NotFound(what),
            QueueError::Conflict(what) => ClinicDeskError::Conflict(what),
            QueueError::Persistence(db_err) => ClinicDeskError::SaveFailed(db_err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClinicDeskError {
    fn from(e: serde_json::Error) -> Self {
        ClinicDeskError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicDeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicDeskError::SaveFailed(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create the desk database described by `config`.
#[uniffi::export]
pub fn open_desk(config: DeskConfig) -> Result<Arc<ClinicDesk>, ClinicDeskError> {
    let db = Database::open(config.db_path())?;
    ClinicDesk::open_with_sink(db, &config, Arc::new(LogActivitySink))
}

/// Create an in-memory desk (for testing).
#[uniffi::export]
pub fn open_desk_in_memory() -> Result<Arc<ClinicDesk>, ClinicDeskError> {
    let db = Database::open_in_memory()?;
    ClinicDesk::open_with_sink(db, &DeskConfig::default(), Arc::new(LogActivitySink))
}

/// Read desk settings from `CLINIC_DESK_*` environment variables.
#[uniffi::export]
pub fn config_from_env() -> DeskConfig {
    DeskConfig::from_env()
}

/// Install the global tracing subscriber. Call once at host startup.
#[uniffi::export]
pub fn init_logging(format: LogFormat) -> Result<(), ClinicDeskError> {
    logging::init(format).map_err(|e| ClinicDeskError::InvalidInput(e.to_string()))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe desk wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicDesk {
    queue: Arc<Mutex<QueueManager<Database>>>,
    history_limit: u32,
}

impl ClinicDesk {
    /// Build a desk over an open database with a custom activity sink.
    pub fn open_with_sink(
        db: Database,
        config: &DeskConfig,
        sink: Arc<dyn ActivitySink>,
    ) -> Result<Arc<Self>, ClinicDeskError> {
        let queue = QueueManager::load(db, config.site_id.clone())?.with_activity_sink(sink);
        let state = queue.state();
        info!(
            site = %config.site_id,
            current_token = state.current_token_number,
            last_served = state.last_served_token,
            "Desk opened"
        );

        Ok(Arc::new(Self {
            queue: Arc::new(Mutex::new(queue)),
            history_limit: config.completed_history_limit,
        }))
    }
}

#[uniffi::export]
impl ClinicDesk {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a new patient.
    pub fn add_patient(
        &self,
        patient: FfiNewPatient,
        actor: FfiActor,
    ) -> Result<FfiPatient, ClinicDeskError> {
        if patient.name.trim().is_empty() {
            return Err(ClinicDeskError::InvalidInput("patient name is required".into()));
        }

        let queue = self.queue.lock()?;
        let actor: Actor = actor.into();
        let patient = Patient::new(patient.into(), actor.clone());
        queue.store().insert_patient(&patient).map_err(|e| {
            tracing::error!(error = %e, "Failed to add patient");
            e
        })?;

        notify_activity(
            queue.activity_sink(),
            &actor,
            &format!("New patient added: {}", patient.name),
        );
        Ok(patient.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let patient = queue.store().get_patient(&id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// All patients, newest registration first.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let patients = queue.store().list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Filter patients by name or phone.
    pub fn search_patients(&self, term: String) -> Result<Vec<FfiPatient>, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let patients = queue.store().search_patients(&term)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Delete a patient. Tokens already issued to them are kept.
    pub fn delete_patient(&self, id: String, actor: FfiActor) -> Result<bool, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let name = queue
            .store()
            .get_patient(&id)?
            .map(|p| p.name)
            .unwrap_or_else(|| "Unknown".to_string());

        let deleted = queue.store().delete_patient(&id).map_err(|e| {
            tracing::error!(patient_id = %id, error = %e, "Failed to delete patient");
            e
        })?;

        if deleted {
            notify_activity(
                queue.activity_sink(),
                &actor.into(),
                &format!("Patient deleted: {}", name),
            );
        }
        Ok(deleted)
    }

    // =========================================================================
    // Token Operations
    // =========================================================================

    /// Issue the next token to a registered patient.
    pub fn generate_token(
        &self,
        patient_id: String,
        visit_type: String,
        notes: Option<String>,
        actor: FfiActor,
    ) -> Result<FfiToken, ClinicDeskError> {
        let mut queue = self.queue.lock()?;
        let token = queue.enqueue(&patient_id, &visit_type, notes.as_deref(), &actor.into())?;
        Ok(token.into())
    }

    /// Serve the lowest pending number. `None` means nothing is waiting.
    pub fn serve_next(&self, actor: FfiActor) -> Result<Option<FfiToken>, ClinicDeskError> {
        let mut queue = self.queue.lock()?;
        let token = queue.serve_next(&actor.into())?;
        Ok(token.map(|t| t.into()))
    }

    /// Serve a specific token, even ahead of lower pending numbers.
    pub fn complete_token(
        &self,
        token_id: String,
        actor: FfiActor,
    ) -> Result<FfiToken, ClinicDeskError> {
        let mut queue = self.queue.lock()?;
        let token = queue.serve_specific(&token_id, &actor.into())?;
        Ok(token.into())
    }

    /// Whether completing `token_id` now would skip lower pending numbers.
    pub fn is_out_of_order(&self, token_id: String) -> Result<bool, ClinicDeskError> {
        let queue = self.queue.lock()?;
        Ok(queue.is_out_of_order(&token_id))
    }

    /// Delete all tokens and restart numbering. The host confirms first.
    pub fn reset_tokens(&self, actor: FfiActor) -> Result<(), ClinicDeskError> {
        let mut queue = self.queue.lock()?;
        queue.reset(&actor.into())?;
        Ok(())
    }

    /// Pending tokens, lowest number first.
    pub fn pending_tokens(&self) -> Result<Vec<FfiToken>, ClinicDeskError> {
        let queue = self.queue.lock()?;
        Ok(queue.pending_tokens().into_iter().map(FfiToken::from).collect())
    }

    /// Completed tokens, highest number first. Defaults to the configured
    /// history limit.
    pub fn completed_tokens(&self, limit: Option<u32>) -> Result<Vec<FfiToken>, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let limit = limit.unwrap_or(self.history_limit) as usize;
        Ok(queue
            .completed_tokens(limit)
            .into_iter()
            .map(FfiToken::from)
            .collect())
    }

    /// Current counters.
    pub fn queue_state(&self) -> Result<FfiQueueState, ClinicDeskError> {
        let queue = self.queue.lock()?;
        Ok(queue.state().into())
    }

    /// Dashboard counters for today (local time).
    pub fn dashboard(&self) -> Result<FfiDashboard, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let total_patients = queue.store().count_patients()?;
        let stats = queue.stats(chrono::Local::now().date_naive());
        Ok(FfiDashboard {
            total_patients,
            today_tokens: stats.today_tokens,
            pending_tokens: stats.pending_tokens,
            completed_tokens: stats.completed_tokens,
            now_serving: stats.now_serving,
        })
    }

    /// Reload counters and tokens from the database.
    pub fn refresh(&self) -> Result<(), ClinicDeskError> {
        let mut queue = self.queue.lock()?;
        queue.refresh()?;
        Ok(())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the queue as JSON.
    pub fn export_queue_json(&self) -> Result<String, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let snapshot = QueueSnapshot::capture(&*queue, self.history_limit as usize);
        Ok(snapshot.to_json()?)
    }

    /// Export the queue as CSV.
    pub fn export_queue_csv(&self) -> Result<String, ClinicDeskError> {
        let queue = self.queue.lock()?;
        let snapshot = QueueSnapshot::capture(&*queue, self.history_limit as usize);
        Ok(snapshot.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe acting user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiActor {
    pub uid: String,
    pub name: String,
}

impl From<FfiActor> for Actor {
    fn from(actor: FfiActor) -> Self {
        Actor {
            uid: actor.uid,
            name: actor.name,
        }
    }
}

/// FFI-safe patient registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub gender: String,
    pub history: String,
}

impl From<FfiNewPatient> for NewPatient {
    fn from(form: FfiNewPatient) -> Self {
        NewPatient {
            name: form.name.trim().to_string(),
            phone: form.phone.trim().to_string(),
            age: form.age,
            gender: form.gender,
            history: form.history,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub age: Option<u32>,
    pub gender: String,
    pub history: String,
    pub added_by: String,
    pub added_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            phone: patient.phone,
            age: patient.age,
            gender: patient.gender,
            history: patient.history,
            added_by: patient.added_by.name,
            added_at: patient.added_at,
        }
    }
}

/// FFI-safe token.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiToken {
    pub id: String,
    pub number: u32,
    pub patient_id: String,
    pub patient_name: String,
    pub visit_type: String,
    pub notes: Option<String>,
    pub status: String,
    pub generated_at: String,
    pub generated_by: String,
    pub completed_at: Option<String>,
    pub completed_by: Option<String>,
}

impl From<Token> for FfiToken {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            number: token.number,
            patient_id: token.patient_id,
            patient_name: token.patient_name,
            visit_type: token.visit_type,
            notes: token.notes,
            status: token.status.as_str().to_string(),
            generated_at: token.generated_at,
            generated_by: token.generated_by.name,
            completed_at: token.completed_at,
            completed_by: token.completed_by.map(|a| a.name),
        }
    }
}

impl From<&Token> for FfiToken {
    fn from(token: &Token) -> Self {
        token.clone().into()
    }
}

/// FFI-safe queue counters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQueueState {
    pub current_token_number: u32,
    pub last_served_token: u32,
    pub now_serving: Option<u32>,
}

impl From<QueueState> for FfiQueueState {
    fn from(state: QueueState) -> Self {
        Self {
            current_token_number: state.current_token_number,
            last_served_token: state.last_served_token,
            now_serving: state.now_serving(),
        }
    }
}

/// FFI-safe dashboard counters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDashboard {
    pub total_patients: u32,
    pub today_tokens: u32,
    pub pending_tokens: u32,
    pub completed_tokens: u32,
    pub now_serving: Option<u32>,
}
