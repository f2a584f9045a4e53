//! Desk configuration.

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "clinic-desk.db";
pub const DEFAULT_SITE_ID: &str = "clinic";
/// Completed tokens shown by default, newest number first.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, uniffi::Enum)]
pub enum LogFormat {
    /// Human-readable, for development
    #[default]
    Pretty,
    /// Structured JSON lines, for production
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Settings for opening a desk.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct DeskConfig {
    /// SQLite database file
    pub db_path: String,
    /// Site whose settings document and tokens this desk manages
    pub site_id: String,
    /// Default number of completed tokens returned by listings
    pub completed_history_limit: u32,
    pub log_format: LogFormat,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            site_id: DEFAULT_SITE_ID.to_string(),
            completed_history_limit: DEFAULT_HISTORY_LIMIT,
            log_format: LogFormat::default(),
        }
    }
}

impl DeskConfig {
    /// Load from `CLINIC_DESK_*` environment variables, falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup("CLINIC_DESK_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.db_path);

        let site_id = lookup("CLINIC_DESK_SITE_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.site_id);

        let completed_history_limit = lookup("CLINIC_DESK_HISTORY_LIMIT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.completed_history_limit);

        let log_format = lookup("CLINIC_DESK_LOG_FORMAT")
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(defaults.log_format);

        Self {
            db_path,
            site_id,
            completed_history_limit,
            log_format,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }
}
