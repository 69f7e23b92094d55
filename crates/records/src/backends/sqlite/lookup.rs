//! Concepts, patients and global properties.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::core::{ConceptLookup, GlobalPropertyResolver, GlobalPropertyStore, PatientLookup};
use crate::error::{StorageResult, ValidationError};
use crate::types::{Concept, ConceptMapping, Patient, PatientIdentifier, PersonName};

use super::SqliteBackend;
use super::backend::internal_error;

fn load_concept(conn: &Connection, where_clause: &str, value: &dyn rusqlite::ToSql) -> StorageResult<Option<Concept>> {
    let row = conn
        .query_row(
            &format!("SELECT concept_id, uuid, name FROM concept WHERE {}", where_clause),
            &[value],
            |row| {
                Ok(Concept {
                    concept_id: Some(row.get(0)?),
                    uuid: row.get(1)?,
                    name: row.get(2)?,
                    mappings: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut concept) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT system, code FROM concept_mapping WHERE concept_id = ?1 ORDER BY concept_mapping_id",
    )?;
    concept.mappings = stmt
        .query_map([concept.concept_id], |row| {
            Ok(ConceptMapping {
                system: row.get(0)?,
                code: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(concept))
}

pub(crate) fn concept_by_id(conn: &Connection, id: i64) -> StorageResult<Option<Concept>> {
    load_concept(conn, "concept_id = ?1", &id)
}

pub(crate) fn concept_by_uuid(conn: &Connection, uuid: &str) -> StorageResult<Option<Concept>> {
    load_concept(conn, "uuid = ?1", &uuid)
}

/// The internal id of a referenced concept.
///
/// # Errors
///
/// * `ValidationError::InvalidReference` - If no concept has the UUID
pub(crate) fn concept_id_for(conn: &Connection, concept: &Concept) -> StorageResult<i64> {
    conn.query_row(
        "SELECT concept_id FROM concept WHERE uuid = ?1",
        [&concept.uuid],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| {
        ValidationError::InvalidReference {
            reference: concept.uuid.clone(),
            message: "no such concept".to_string(),
        }
        .into()
    })
}

fn load_patient(conn: &Connection, where_clause: &str, value: &dyn rusqlite::ToSql) -> StorageResult<Option<Patient>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT patient_id, uuid, gender, birthdate FROM patient WHERE {}",
                where_clause
            ),
            &[value],
            |row| {
                let patient_id: i64 = row.get(0)?;
                let uuid: String = row.get(1)?;
                let gender: Option<String> = row.get(2)?;
                let birthdate: Option<String> = row.get(3)?;
                Ok((patient_id, uuid, gender, birthdate))
            },
        )
        .optional()?;

    let Some((patient_id, uuid, gender, birthdate)) = row else {
        return Ok(None);
    };

    let birthdate = birthdate
        .map(|b| NaiveDate::parse_from_str(&b, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| internal_error(format!("Failed to parse birthdate: {}", e)))?;

    let mut stmt = conn.prepare(
        "SELECT given_name, middle_name, family_name, preferred FROM person_name
         WHERE patient_id = ?1 AND voided = 0 ORDER BY person_name_id",
    )?;
    let names = stmt
        .query_map([patient_id], |row| {
            Ok(PersonName {
                given_name: row.get(0)?,
                middle_name: row.get(1)?,
                family_name: row.get(2)?,
                preferred: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT identifier, identifier_type, preferred FROM patient_identifier
         WHERE patient_id = ?1 AND voided = 0 ORDER BY patient_identifier_id",
    )?;
    let identifiers = stmt
        .query_map([patient_id], |row| {
            Ok(PatientIdentifier {
                identifier: row.get(0)?,
                identifier_type: row.get(1)?,
                preferred: row.get::<_, i64>(2)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Patient {
        patient_id: Some(patient_id),
        uuid,
        gender,
        birthdate,
        names,
        identifiers,
    }))
}

pub(crate) fn patient_by_id(conn: &Connection, id: i64) -> StorageResult<Option<Patient>> {
    load_patient(conn, "patient_id = ?1", &id)
}

/// The internal id of a referenced patient.
///
/// # Errors
///
/// * `ValidationError::InvalidReference` - If no patient has the UUID
pub(crate) fn patient_id_for(conn: &Connection, patient: &Patient) -> StorageResult<i64> {
    conn.query_row(
        "SELECT patient_id FROM patient WHERE uuid = ?1 AND voided = 0",
        [&patient.uuid],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| {
        ValidationError::InvalidReference {
            reference: format!("Patient/{}", patient.uuid),
            message: "no such patient".to_string(),
        }
        .into()
    })
}

impl SqliteBackend {
    /// Stores a concept with its mappings and returns it with its id.
    pub fn create_concept(&self, concept: &Concept) -> StorageResult<Concept> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO concept (uuid, name) VALUES (?1, ?2)",
            params![concept.uuid, concept.name],
        )?;
        let concept_id = tx.last_insert_rowid();
        for mapping in &concept.mappings {
            tx.execute(
                "INSERT INTO concept_mapping (concept_id, system, code) VALUES (?1, ?2, ?3)",
                params![concept_id, mapping.system, mapping.code],
            )?;
        }
        tx.commit()?;

        Ok(Concept {
            concept_id: Some(concept_id),
            ..concept.clone()
        })
    }

    /// Stores a patient with its names and identifiers and returns it with
    /// its id.
    pub fn create_patient(&self, patient: &Patient) -> StorageResult<Patient> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO patient (uuid, gender, birthdate) VALUES (?1, ?2, ?3)",
            params![
                patient.uuid,
                patient.gender,
                patient.birthdate.map(|d| d.format("%Y-%m-%d").to_string())
            ],
        )?;
        let patient_id = tx.last_insert_rowid();

        for name in &patient.names {
            tx.execute(
                "INSERT INTO person_name (patient_id, given_name, middle_name, family_name, preferred)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    patient_id,
                    name.given_name,
                    name.middle_name,
                    name.family_name,
                    name.preferred as i64
                ],
            )?;
        }
        for identifier in &patient.identifiers {
            tx.execute(
                "INSERT INTO patient_identifier (patient_id, identifier, identifier_type, preferred)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    patient_id,
                    identifier.identifier,
                    identifier.identifier_type,
                    identifier.preferred as i64
                ],
            )?;
        }
        tx.commit()?;

        Ok(Patient {
            patient_id: Some(patient_id),
            ..patient.clone()
        })
    }
}

impl ConceptLookup for SqliteBackend {
    fn concept_by_uuid(&self, uuid: &str) -> StorageResult<Option<Concept>> {
        let conn = self.get_connection()?;
        concept_by_uuid(&conn, uuid)
    }

    fn concept_by_mapping(&self, system: &str, code: &str) -> StorageResult<Option<Concept>> {
        let conn = self.get_connection()?;
        let concept_id: Option<i64> = conn
            .query_row(
                "SELECT concept_id FROM concept_mapping WHERE system = ?1 AND code = ?2
                 ORDER BY concept_id LIMIT 1",
                params![system, code],
                |row| row.get(0),
            )
            .optional()?;

        match concept_id {
            Some(id) => concept_by_id(&conn, id),
            None => Ok(None),
        }
    }
}

impl PatientLookup for SqliteBackend {
    fn patient_by_uuid(&self, uuid: &str) -> StorageResult<Option<Patient>> {
        let conn = self.get_connection()?;
        load_patient(&conn, "uuid = ?1 AND voided = 0", &uuid)
    }
}

impl GlobalPropertyResolver for SqliteBackend {
    fn get_global_property(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.get_connection()?;
        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT property_value FROM global_property WHERE property = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }
}

impl GlobalPropertyStore for SqliteBackend {
    fn set_global_property(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO global_property (property, property_value) VALUES (?1, ?2)
             ON CONFLICT(property) DO UPDATE SET property_value = excluded.property_value",
            params![key, value],
        )?;
        Ok(())
    }
}
