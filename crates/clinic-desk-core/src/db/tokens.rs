//! Token and queue settings database operations.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Actor, NewToken, Patient, QueueState, Token, TokenStatus};
use crate::queue::{PatientDirectory, QueueStore};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Create the site's settings row if it does not exist yet.
fn ensure_settings(conn: &Connection, site_id: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO queue_settings (site_id, current_token_number, last_served_token) VALUES (?, 0, 0)",
        [site_id],
    )?;
    Ok(())
}

/// A unique-constraint hit on (site_id, number) means another session
/// issued the same number first.
fn map_issue_error(e: rusqlite::Error, number: u32) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            DbError::Conflict(format!("token #{} was already issued", number))
        }
        other => DbError::Sqlite(other),
    }
}

impl QueueStore for Database {
    fn load_queue_state(&self, site_id: &str) -> DbResult<QueueState> {
        ensure_settings(&self.conn, site_id)?;
        self.conn
            .query_row(
                "SELECT current_token_number, last_served_token FROM queue_settings WHERE site_id = ?",
                [site_id],
                |row| {
                    Ok(QueueState {
                        current_token_number: row.get(0)?,
                        last_served_token: row.get(1)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn load_tokens(&self, site_id: &str) -> DbResult<Vec<Token>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, number, patient_id, patient_name, visit_type, notes, status,
                   generated_at, generated_by_uid, generated_by_name,
                   completed_at, completed_by_uid, completed_by_name
            FROM tokens
            WHERE site_id = ?
            ORDER BY number
            "#,
        )?;

        let rows = stmt.query_map([site_id], |row| {
            Ok(TokenRow {
                id: row.get(0)?,
                number: row.get(1)?,
                patient_id: row.get(2)?,
                patient_name: row.get(3)?,
                visit_type: row.get(4)?,
                notes: row.get(5)?,
                status: row.get(6)?,
                generated_at: row.get(7)?,
                generated_by_uid: row.get(8)?,
                generated_by_name: row.get(9)?,
                completed_at: row.get(10)?,
                completed_by_uid: row.get(11)?,
                completed_by_name: row.get(12)?,
            })
        })?;

        let mut tokens: Vec<Token> = Vec::new();
        for row in rows {
            tokens.push(row?.try_into()?);
        }
        Ok(tokens)
    }

    fn issue_token(&self, site_id: &str, token: NewToken) -> DbResult<Token> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_settings(&tx, site_id)?;

        let id = uuid::Uuid::new_v4().to_string();
        let generated_at = now();

        tx.execute(
            r#"
            INSERT INTO tokens (
                id, site_id, number, patient_id, patient_name, visit_type, notes,
                status, generated_at, generated_by_uid, generated_by_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?9, ?10)
            "#,
            params![
                id,
                site_id,
                token.number,
                token.patient_id,
                token.patient_name,
                token.visit_type,
                token.notes,
                generated_at,
                token.generated_by.uid,
                token.generated_by.name,
            ],
        )
        .map_err(|e| map_issue_error(e, token.number))?;

        tx.execute(
            "UPDATE queue_settings SET current_token_number = ?1, updated_at = datetime('now') WHERE site_id = ?2",
            params![token.number, site_id],
        )?;

        tx.commit()?;
        Ok(token.into_token(id, generated_at))
    }

    fn serve_token(&self, site_id: &str, token: &Token, actor: &Actor) -> DbResult<String> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_settings(&tx, site_id)?;

        let completed_at = now();
        let rows_affected = tx.execute(
            r#"
            UPDATE tokens SET
                status = 'completed',
                completed_at = ?1,
                completed_by_uid = ?2,
                completed_by_name = ?3
            WHERE id = ?4 AND site_id = ?5 AND status = 'pending'
            "#,
            params![completed_at, actor.uid, actor.name, token.id, site_id],
        )?;

        if rows_affected == 0 {
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM tokens WHERE id = ? AND site_id = ?",
                    params![token.id, site_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match status {
                Some(_) => DbError::Conflict(format!("token #{} is no longer pending", token.number)),
                None => DbError::NotFound(format!("token {}", token.id)),
            });
        }

        tx.execute(
            "UPDATE queue_settings SET last_served_token = ?1, updated_at = datetime('now') WHERE site_id = ?2",
            params![token.number, site_id],
        )?;

        tx.commit()?;
        Ok(completed_at)
    }

    fn reset_queue(&self, site_id: &str) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_settings(&tx, site_id)?;

        tx.execute("DELETE FROM tokens WHERE site_id = ?", [site_id])?;
        tx.execute(
            r#"
            UPDATE queue_settings SET
                current_token_number = 0,
                last_served_token = 0,
                updated_at = datetime('now')
            WHERE site_id = ?
            "#,
            [site_id],
        )?;

        tx.commit()?;
        Ok(())
    }
}

impl PatientDirectory for Database {
    fn find_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        self.get_patient(patient_id)
    }
}

/// Intermediate row struct for database mapping.
struct TokenRow {
    id: String,
    number: u32,
    patient_id: String,
    patient_name: String,
    visit_type: String,
    notes: Option<String>,
    status: String,
    generated_at: String,
    generated_by_uid: String,
    generated_by_name: String,
    completed_at: Option<String>,
    completed_by_uid: Option<String>,
    completed_by_name: Option<String>,
}

impl TryFrom<TokenRow> for Token {
    type Error = DbError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let status = TokenStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown token status: {}", row.status)))?;

        let completed_by = match (row.completed_by_uid, row.completed_by_name) {
            (Some(uid), Some(name)) => Some(Actor { uid, name }),
            _ => None,
        };

        Ok(Token {
            id: row.id,
            number: row.number,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
            visit_type: row.visit_type,
            notes: row.notes,
            status,
            generated_at: row.generated_at,
            completed_at: row.completed_at,
            generated_by: Actor {
                uid: row.generated_by_uid,
                name: row.generated_by_name,
            },
            completed_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "clinic";

    fn reception() -> Actor {
        Actor::new("uid-1", "Reception")
    }

    fn new_token(number: u32) -> NewToken {
        NewToken {
            number,
            patient_id: "p-1".into(),
            patient_name: "Asha Rao".into(),
            visit_type: "Consultation".into(),
            notes: Some("fasting".into()),
            generated_by: reception(),
        }
    }

    #[test]
    fn test_settings_created_on_first_load() {
        let db = Database::open_in_memory().unwrap();
        let state = db.load_queue_state(SITE).unwrap();
        assert_eq!(state, QueueState::default());

        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM queue_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_issue_token_updates_counter() {
        let db = Database::open_in_memory().unwrap();

        let token = db.issue_token(SITE, new_token(1)).unwrap();
        assert_eq!(token.id.len(), 36);
        assert!(token.is_pending());
        assert_eq!(db.load_queue_state(SITE).unwrap().current_token_number, 1);

        let tokens = db.load_tokens(SITE).unwrap();
        assert_eq!(tokens, vec![token]);
    }

    #[test]
    fn test_issue_duplicate_number_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.issue_token(SITE, new_token(1)).unwrap();

        let result = db.issue_token(SITE, new_token(1));
        assert!(matches!(result, Err(DbError::Conflict(_))));
        assert_eq!(db.load_tokens(SITE).unwrap().len(), 1);
    }

    #[test]
    fn test_serve_token_sets_last_served() {
        let db = Database::open_in_memory().unwrap();
        let token = db.issue_token(SITE, new_token(1)).unwrap();

        let completed_at = db.serve_token(SITE, &token, &reception()).unwrap();

        let stored = &db.load_tokens(SITE).unwrap()[0];
        assert_eq!(stored.status, TokenStatus::Completed);
        assert_eq!(stored.completed_at.as_deref(), Some(completed_at.as_str()));
        assert_eq!(stored.completed_by, Some(reception()));
        assert_eq!(db.load_queue_state(SITE).unwrap().last_served_token, 1);
    }

    #[test]
    fn test_serve_token_twice_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let token = db.issue_token(SITE, new_token(1)).unwrap();
        let first = db.serve_token(SITE, &token, &reception()).unwrap();

        let result = db.serve_token(SITE, &token, &Actor::new("uid-2", "Nurse"));
        assert!(matches!(result, Err(DbError::Conflict(_))));

        let stored = &db.load_tokens(SITE).unwrap()[0];
        assert_eq!(stored.completed_at.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_serve_missing_token() {
        let db = Database::open_in_memory().unwrap();
        let ghost = new_token(5).into_token("ghost".into(), now());

        let result = db.serve_token(SITE, &ghost, &reception());
        assert!(matches!(result, Err(DbError::NotFound(_))));
        assert_eq!(db.load_queue_state(SITE).unwrap().last_served_token, 0);
    }

    #[test]
    fn test_reset_is_scoped_to_site() {
        let db = Database::open_in_memory().unwrap();
        db.issue_token(SITE, new_token(1)).unwrap();
        let served = db.issue_token(SITE, new_token(2)).unwrap();
        db.serve_token(SITE, &served, &reception()).unwrap();
        db.issue_token("annex", new_token(1)).unwrap();

        db.reset_queue(SITE).unwrap();

        assert!(db.load_tokens(SITE).unwrap().is_empty());
        assert_eq!(db.load_queue_state(SITE).unwrap(), QueueState::default());
        assert_eq!(db.load_tokens("annex").unwrap().len(), 1);
        assert_eq!(db.load_queue_state("annex").unwrap().current_token_number, 1);
    }
}
