//! SQLite schema definitions and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, 1)?;
        migrate_schema(conn, 1)?;
    } else if current_version < SCHEMA_VERSION {
        migrate_schema(conn, current_version)?;
    }

    info!(version = SCHEMA_VERSION, "records schema ready");
    Ok(())
}

/// Get the current schema version.
pub(crate) fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| internal_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// Creates the vocabulary, patient and condition tables.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS global_property (
            property TEXT PRIMARY KEY,
            property_value TEXT
        );

        CREATE TABLE IF NOT EXISTS concept (
            concept_id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS concept_mapping (
            concept_mapping_id INTEGER PRIMARY KEY AUTOINCREMENT,
            concept_id INTEGER NOT NULL REFERENCES concept(concept_id),
            system TEXT NOT NULL,
            code TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS patient (
            patient_id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            gender TEXT,
            birthdate TEXT,
            voided INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS person_name (
            person_name_id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patient(patient_id),
            given_name TEXT,
            middle_name TEXT,
            family_name TEXT,
            preferred INTEGER NOT NULL DEFAULT 0,
            voided INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS patient_identifier (
            patient_identifier_id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patient(patient_id),
            identifier TEXT NOT NULL,
            identifier_type TEXT,
            preferred INTEGER NOT NULL DEFAULT 0,
            voided INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS condition (
            condition_id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            patient_id INTEGER NOT NULL REFERENCES patient(patient_id),
            condition_coded INTEGER REFERENCES concept(concept_id),
            condition_non_coded TEXT,
            clinical_status TEXT NOT NULL,
            verification_status TEXT,
            onset_date TEXT,
            end_date TEXT,
            end_reason TEXT,
            additional_detail TEXT,
            voided INTEGER NOT NULL DEFAULT 0,
            void_reason TEXT,
            date_voided TEXT,
            date_created TEXT NOT NULL,
            date_changed TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_concept_mapping_code ON concept_mapping(system, code);
        CREATE INDEX IF NOT EXISTS idx_person_name_patient ON person_name(patient_id);
        CREATE INDEX IF NOT EXISTS idx_patient_identifier_patient ON patient_identifier(patient_id);
        CREATE INDEX IF NOT EXISTS idx_condition_patient ON condition(patient_id);
        ",
    )
    .map_err(|e| internal_error(format!("Failed to create schema: {}", e)))
}

/// Run schema migrations from current version to latest.
fn migrate_schema(conn: &Connection, from_version: i32) -> StorageResult<()> {
    let mut version = from_version;

    while version < SCHEMA_VERSION {
        match version {
            1 => migrate_v1_to_v2(conn)?,
            _ => return Err(internal_error(format!("Unknown schema version: {}", version))),
        }
        version += 1;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

/// Migrate from schema version 1 to version 2.
///
/// Adds allergies and their reactions.
fn migrate_v1_to_v2(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS allergy (
            allergy_id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            patient_id INTEGER NOT NULL REFERENCES patient(patient_id),
            allergen_type TEXT NOT NULL,
            coded_allergen INTEGER REFERENCES concept(concept_id),
            non_coded_allergen TEXT,
            severity_concept_id INTEGER REFERENCES concept(concept_id),
            comment TEXT,
            voided INTEGER NOT NULL DEFAULT 0,
            void_reason TEXT,
            date_voided TEXT,
            date_created TEXT NOT NULL,
            date_changed TEXT
        );

        CREATE TABLE IF NOT EXISTS allergy_reaction (
            allergy_reaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            allergy_id INTEGER NOT NULL REFERENCES allergy(allergy_id),
            reaction_concept_id INTEGER REFERENCES concept(concept_id),
            reaction_non_coded TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_allergy_patient ON allergy(patient_id);
        CREATE INDEX IF NOT EXISTS idx_allergy_reaction_allergy ON allergy_reaction(allergy_id);
        ",
    )
    .map_err(|e| internal_error(format!("Failed to migrate schema to v2: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = tables(&conn);
        for table in [
            "global_property",
            "concept",
            "concept_mapping",
            "patient",
            "person_name",
            "patient_identifier",
            "condition",
            "allergy",
            "allergy_reaction",
            "schema_version",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migration_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        get_schema_version(&conn).unwrap();
        create_schema_v1(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();
        assert!(!tables(&conn).contains(&"allergy".to_string()));

        initialize_schema(&conn).unwrap();

        assert!(tables(&conn).contains(&"allergy".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
