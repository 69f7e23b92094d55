//! AllergyStorage implementation for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::core::AllergyStorage;
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::search::handlers::format_timestamp;
use crate::search::{Criteria, SqlFragment, SqlParam, allergy_criteria};
use crate::translators::{finish_allergy, merge_allergy};
use crate::types::{
    AllergenType, Allergen, Allergy, AllergyPatch, AllergyReaction, AllergySearchParams,
    CodedOrFreeText,
};
use crate::vocabulary::VocabularyMapper;

use super::SqliteBackend;
use super::backend::{internal_error, parse_timestamp};
use super::lookup::{concept_by_id, concept_id_for, patient_by_id, patient_id_for};
use super::query::{list, unique_result};

const ALLERGY_COLUMNS: &str = "allergy_id, uuid, patient_id, allergen_type, coded_allergen, \
     non_coded_allergen, severity_concept_id, comment, voided, void_reason, date_voided, \
     date_created, date_changed";

struct AllergyRow {
    allergy_id: i64,
    uuid: String,
    patient_id: i64,
    allergen_type: String,
    coded_allergen: Option<i64>,
    non_coded_allergen: Option<String>,
    severity_concept_id: Option<i64>,
    comment: Option<String>,
    voided: i64,
    void_reason: Option<String>,
    date_voided: Option<String>,
    date_created: Option<String>,
    date_changed: Option<String>,
}

fn not_found(uuid: &str) -> StorageError {
    StorageError::Resource(ResourceError::NotFound {
        resource_type: "AllergyIntolerance".to_string(),
        id: uuid.to_string(),
    })
}

fn optional_concept(
    conn: &Connection,
    concept_id: Option<i64>,
) -> StorageResult<Option<crate::types::Concept>> {
    match concept_id {
        Some(id) => concept_by_id(conn, id),
        None => Ok(None),
    }
}

pub(crate) fn allergy_by_id(conn: &Connection, id: i64) -> StorageResult<Option<Allergy>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM allergy WHERE allergy_id = ?1", ALLERGY_COLUMNS),
            [id],
            |row| {
                Ok(AllergyRow {
                    allergy_id: row.get(0)?,
                    uuid: row.get(1)?,
                    patient_id: row.get(2)?,
                    allergen_type: row.get(3)?,
                    coded_allergen: row.get(4)?,
                    non_coded_allergen: row.get(5)?,
                    severity_concept_id: row.get(6)?,
                    comment: row.get(7)?,
                    voided: row.get(8)?,
                    void_reason: row.get(9)?,
                    date_voided: row.get(10)?,
                    date_created: row.get(11)?,
                    date_changed: row.get(12)?,
                })
            },
        )
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

fn load_reactions(conn: &Connection, allergy_id: i64) -> StorageResult<Vec<AllergyReaction>> {
    let mut stmt = conn.prepare(
        "SELECT reaction_concept_id, reaction_non_coded FROM allergy_reaction
         WHERE allergy_id = ?1 ORDER BY allergy_reaction_id",
    )?;
    let rows = stmt
        .query_map([allergy_id], |row| {
            let concept_id: Option<i64> = row.get(0)?;
            let non_coded: Option<String> = row.get(1)?;
            Ok((concept_id, non_coded))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(concept_id, non_coded)| {
            Ok(AllergyReaction {
                reaction: CodedOrFreeText {
                    coded: optional_concept(conn, concept_id)?,
                    non_coded,
                },
            })
        })
        .collect()
}

fn hydrate(conn: &Connection, row: AllergyRow) -> StorageResult<Allergy> {
    let allergen_type = row
        .allergen_type
        .parse::<AllergenType>()
        .map_err(internal_error)?;

    Ok(Allergy {
        allergy_id: Some(row.allergy_id),
        uuid: row.uuid,
        patient: patient_by_id(conn, row.patient_id)?,
        allergen: Allergen {
            allergen_type,
            value: CodedOrFreeText {
                coded: optional_concept(conn, row.coded_allergen)?,
                non_coded: row.non_coded_allergen,
            },
        },
        severity: optional_concept(conn, row.severity_concept_id)?,
        comment: row.comment,
        reactions: load_reactions(conn, row.allergy_id)?,
        voided: row.voided != 0,
        void_reason: row.void_reason,
        date_voided: parse_timestamp(row.date_voided)?,
        date_created: parse_timestamp(row.date_created)?,
        date_changed: parse_timestamp(row.date_changed)?,
    })
}

fn allergy_by_uuid(conn: &Connection, uuid: &str) -> StorageResult<Option<Allergy>> {
    let mut criteria = Criteria::new("allergy", "a", "allergy_id");
    criteria.add(SqlFragment::with_params(
        "a.uuid = ?",
        vec![SqlParam::string(uuid)],
    ));

    match unique_result(conn, &criteria)? {
        Some(id) => allergy_by_id(conn, id),
        None => Ok(None),
    }
}

fn write_allergy(conn: &Connection, record: &Allergy) -> StorageResult<i64> {
    let patient = record
        .patient
        .as_ref()
        .ok_or_else(|| internal_error("allergy has no patient".to_string()))?;
    let patient_id = patient_id_for(conn, patient)?;
    let allergen_id = record
        .allergen
        .value
        .coded
        .as_ref()
        .map(|concept| concept_id_for(conn, concept))
        .transpose()?;
    let severity_id = record
        .severity
        .as_ref()
        .map(|concept| concept_id_for(conn, concept))
        .transpose()?;

    let now = format_timestamp(&Utc::now());

    let allergy_id = match record.allergy_id {
        Some(allergy_id) => {
            conn.execute(
                "UPDATE allergy SET patient_id = ?1, allergen_type = ?2, coded_allergen = ?3,
                 non_coded_allergen = ?4, severity_concept_id = ?5, comment = ?6,
                 date_changed = ?7
                 WHERE allergy_id = ?8",
                params![
                    patient_id,
                    record.allergen.allergen_type.as_str(),
                    allergen_id,
                    record.allergen.value.non_coded,
                    severity_id,
                    record.comment,
                    now,
                    allergy_id
                ],
            )?;
            allergy_id
        }
        None => {
            conn.execute(
                "INSERT INTO allergy (uuid, patient_id, allergen_type, coded_allergen,
                 non_coded_allergen, severity_concept_id, comment, voided, date_created)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
                params![
                    record.uuid,
                    patient_id,
                    record.allergen.allergen_type.as_str(),
                    allergen_id,
                    record.allergen.value.non_coded,
                    severity_id,
                    record.comment,
                    now
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    conn.execute(
        "DELETE FROM allergy_reaction WHERE allergy_id = ?1",
        [allergy_id],
    )?;
    for reaction in &record.reactions {
        let concept_id = reaction
            .reaction
            .coded
            .as_ref()
            .map(|concept| concept_id_for(conn, concept))
            .transpose()?;
        conn.execute(
            "INSERT INTO allergy_reaction (allergy_id, reaction_concept_id, reaction_non_coded)
             VALUES (?1, ?2, ?3)",
            params![allergy_id, concept_id, reaction.reaction.non_coded],
        )?;
    }

    Ok(allergy_id)
}

#[async_trait]
impl AllergyStorage for SqliteBackend {
    async fn get_allergy_by_uuid(&self, uuid: &str) -> StorageResult<Option<Allergy>> {
        let conn = self.get_connection()?;
        allergy_by_uuid(&conn, uuid)
    }

    async fn get_allergy_by_id(&self, id: i64) -> StorageResult<Option<Allergy>> {
        let conn = self.get_connection()?;
        allergy_by_id(&conn, id)
    }

    async fn search_allergies(&self, params: &AllergySearchParams) -> StorageResult<Vec<Allergy>> {
        // Severity mapping reads global properties through its own
        // connection, so the criteria are built before ours is taken.
        let mapper = VocabularyMapper::new(self, self.vocabulary());
        let criteria = allergy_criteria(params, &mapper)?;
        let conn = self.get_connection()?;

        let mut allergies = Vec::new();
        for id in list(&conn, &criteria)? {
            if let Some(allergy) = allergy_by_id(&conn, id)? {
                allergies.push(allergy);
            }
        }

        debug!(count = allergies.len(), "allergy search complete");
        Ok(allergies)
    }

    async fn save_allergy(&self, allergy: Allergy) -> StorageResult<Allergy> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let existing = if allergy.uuid.is_empty() {
            None
        } else {
            allergy_by_uuid(&tx, &allergy.uuid)?
        };
        let record = finish_allergy(merge_allergy(existing, AllergyPatch::from(&allergy)))?;

        let allergy_id = write_allergy(&tx, &record)?;
        tx.commit()?;

        debug!(uuid = %record.uuid, allergy_id, "saved allergy");
        allergy_by_id(&conn, allergy_id)?
            .ok_or_else(|| internal_error(format!("Allergy {} vanished after save", record.uuid)))
    }

    async fn void_allergy(&self, uuid: &str, reason: &str) -> StorageResult<Allergy> {
        let conn = self.get_connection()?;
        let now = format_timestamp(&Utc::now());

        let updated = conn.execute(
            "UPDATE allergy SET voided = 1, void_reason = ?1, date_voided = ?2, date_changed = ?2
             WHERE uuid = ?3",
            params![reason, now, uuid],
        )?;
        if updated == 0 {
            return Err(not_found(uuid));
        }

        allergy_by_uuid(&conn, uuid)?.ok_or_else(|| not_found(uuid))
    }

    async fn unvoid_allergy(&self, uuid: &str) -> StorageResult<Allergy> {
        let conn = self.get_connection()?;
        let now = format_timestamp(&Utc::now());

        let updated = conn.execute(
            "UPDATE allergy SET voided = 0, void_reason = NULL, date_voided = NULL,
             date_changed = ?1
             WHERE uuid = ?2",
            params![now, uuid],
        )?;
        if updated == 0 {
            return Err(not_found(uuid));
        }

        allergy_by_uuid(&conn, uuid)?.ok_or_else(|| not_found(uuid))
    }
}
