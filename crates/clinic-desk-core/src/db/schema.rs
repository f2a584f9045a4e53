//! SQLite schema definition.

/// Complete database schema for the clinic desk.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT NOT NULL DEFAULT '',
    age INTEGER,
    gender TEXT NOT NULL DEFAULT '',
    history TEXT NOT NULL DEFAULT '',
    added_by_uid TEXT NOT NULL,
    added_by_name TEXT NOT NULL,
    added_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
CREATE INDEX IF NOT EXISTS idx_patients_added_at ON patients(added_at);

-- ============================================================================
-- Visit Tokens
-- ============================================================================

-- No foreign key on patient_id: tokens keep a copy of the patient's name
-- and outlive the patient record.
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    site_id TEXT NOT NULL,
    number INTEGER NOT NULL CHECK (number > 0),
    patient_id TEXT NOT NULL,
    patient_name TEXT NOT NULL,
    visit_type TEXT NOT NULL DEFAULT '',
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed')),
    generated_at TEXT NOT NULL,
    generated_by_uid TEXT NOT NULL,
    generated_by_name TEXT NOT NULL,
    completed_at TEXT,
    completed_by_uid TEXT,
    completed_by_name TEXT,
    UNIQUE (site_id, number)
);

CREATE INDEX IF NOT EXISTS idx_tokens_site_status ON tokens(site_id, status);

-- Completed tokens never go back to pending
CREATE TRIGGER IF NOT EXISTS tokens_status_forward_only BEFORE UPDATE OF status ON tokens
WHEN old.status = 'completed' AND new.status <> 'completed'
BEGIN
    SELECT RAISE(ABORT, 'Token status cannot regress');
END;

-- ============================================================================
-- Queue Settings (one row per site)
-- ============================================================================

CREATE TABLE IF NOT EXISTS queue_settings (
    site_id TEXT PRIMARY KEY,
    current_token_number INTEGER NOT NULL DEFAULT 0 CHECK (current_token_number >= 0),
    last_served_token INTEGER NOT NULL DEFAULT 0 CHECK (last_served_token >= 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
