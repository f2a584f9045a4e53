//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{Actor, Patient};

const PATIENT_COLUMNS: &str = r#"
    id, name, phone, age, gender, history,
    added_by_uid, added_by_name, added_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        history: row.get(5)?,
        added_by: Actor {
            uid: row.get(6)?,
            name: row.get(7)?,
        },
        added_at: row.get(8)?,
    })
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, phone, age, gender, history,
                added_by_uid, added_by_name, added_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.age,
                patient.gender,
                patient.history,
                patient.added_by.uid,
                patient.added_by.name,
                patient.added_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients, newest registration first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY added_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search patients by name (case-insensitive substring) or phone (substring).
    ///
    /// The term is matched literally; a blank term lists everyone.
    pub fn search_patients(&self, term: &str) -> DbResult<Vec<Patient>> {
        let mut patients = self.list_patients()?;
        patients.retain(|p| p.matches(term));
        Ok(patients)
    }

    /// Number of registered patients.
    pub fn count_patients(&self) -> DbResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a patient. Existing tokens keep their copy of the name.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
