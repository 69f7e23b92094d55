//! ConditionStorage implementation for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::core::ConditionStorage;
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::search::handlers::format_timestamp;
use crate::search::{Criteria, SqlFragment, SqlParam, condition_criteria};
use crate::translators::{finish_condition, merge_condition};
use crate::types::{
    CodedOrFreeText, Condition, ConditionClinicalStatus, ConditionPatch, ConditionSearchParams,
    ConditionVerificationStatus,
};

use super::SqliteBackend;
use super::backend::{internal_error, parse_timestamp};
use super::lookup::{concept_by_id, concept_id_for, patient_by_id, patient_id_for};
use super::query::{list, unique_result};

const CONDITION_COLUMNS: &str = "condition_id, uuid, patient_id, condition_coded, \
     condition_non_coded, clinical_status, verification_status, onset_date, end_date, \
     end_reason, additional_detail, voided, void_reason, date_voided, date_created, date_changed";

struct ConditionRow {
    condition_id: i64,
    uuid: String,
    patient_id: i64,
    condition_coded: Option<i64>,
    condition_non_coded: Option<String>,
    clinical_status: String,
    verification_status: Option<String>,
    onset_date: Option<String>,
    end_date: Option<String>,
    end_reason: Option<String>,
    additional_detail: Option<String>,
    voided: i64,
    void_reason: Option<String>,
    date_voided: Option<String>,
    date_created: Option<String>,
    date_changed: Option<String>,
}

fn not_found(uuid: &str) -> StorageError {
    StorageError::Resource(ResourceError::NotFound {
        resource_type: "Condition".to_string(),
        id: uuid.to_string(),
    })
}

pub(crate) fn condition_by_id(conn: &Connection, id: i64) -> StorageResult<Option<Condition>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM condition WHERE condition_id = ?1",
                CONDITION_COLUMNS
            ),
            [id],
            |row| {
                Ok(ConditionRow {
                    condition_id: row.get(0)?,
                    uuid: row.get(1)?,
                    patient_id: row.get(2)?,
                    condition_coded: row.get(3)?,
                    condition_non_coded: row.get(4)?,
                    clinical_status: row.get(5)?,
                    verification_status: row.get(6)?,
                    onset_date: row.get(7)?,
                    end_date: row.get(8)?,
                    end_reason: row.get(9)?,
                    additional_detail: row.get(10)?,
                    voided: row.get(11)?,
                    void_reason: row.get(12)?,
                    date_voided: row.get(13)?,
                    date_created: row.get(14)?,
                    date_changed: row.get(15)?,
                })
            },
        )
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

fn hydrate(conn: &Connection, row: ConditionRow) -> StorageResult<Condition> {
    let clinical_status = row
        .clinical_status
        .parse::<ConditionClinicalStatus>()
        .map_err(internal_error)?;
    let verification_status = row
        .verification_status
        .map(|v| v.parse::<ConditionVerificationStatus>())
        .transpose()
        .map_err(internal_error)?;

    let coded = match row.condition_coded {
        Some(concept_id) => concept_by_id(conn, concept_id)?,
        None => None,
    };

    Ok(Condition {
        condition_id: Some(row.condition_id),
        uuid: row.uuid,
        patient: patient_by_id(conn, row.patient_id)?,
        condition: CodedOrFreeText {
            coded,
            non_coded: row.condition_non_coded,
        },
        clinical_status,
        verification_status,
        onset_date: parse_timestamp(row.onset_date)?,
        end_date: parse_timestamp(row.end_date)?,
        end_reason: row.end_reason,
        additional_detail: row.additional_detail,
        voided: row.voided != 0,
        void_reason: row.void_reason,
        date_voided: parse_timestamp(row.date_voided)?,
        date_created: parse_timestamp(row.date_created)?,
        date_changed: parse_timestamp(row.date_changed)?,
    })
}

fn condition_by_uuid(conn: &Connection, uuid: &str) -> StorageResult<Option<Condition>> {
    let mut criteria = Criteria::new("condition", "c", "condition_id");
    criteria.add(SqlFragment::with_params(
        "c.uuid = ?",
        vec![SqlParam::string(uuid)],
    ));

    match unique_result(conn, &criteria)? {
        Some(id) => condition_by_id(conn, id),
        None => Ok(None),
    }
}

fn write_condition(conn: &Connection, record: &Condition) -> StorageResult<i64> {
    let patient = record
        .patient
        .as_ref()
        .ok_or_else(|| internal_error("condition has no patient".to_string()))?;
    let patient_id = patient_id_for(conn, patient)?;
    let concept_id = record
        .condition
        .coded
        .as_ref()
        .map(|concept| concept_id_for(conn, concept))
        .transpose()?;

    let now = format_timestamp(&Utc::now());
    let onset_date = record.onset_date.as_ref().map(format_timestamp);
    let end_date = record.end_date.as_ref().map(format_timestamp);
    let verification_status = record.verification_status.map(|v| v.as_str());

    match record.condition_id {
        Some(condition_id) => {
            conn.execute(
                "UPDATE condition SET patient_id = ?1, condition_coded = ?2,
                 condition_non_coded = ?3, clinical_status = ?4, verification_status = ?5,
                 onset_date = ?6, end_date = ?7, end_reason = ?8, additional_detail = ?9,
                 date_changed = ?10
                 WHERE condition_id = ?11",
                params![
                    patient_id,
                    concept_id,
                    record.condition.non_coded,
                    record.clinical_status.as_str(),
                    verification_status,
                    onset_date,
                    end_date,
                    record.end_reason,
                    record.additional_detail,
                    now,
                    condition_id
                ],
            )?;
            Ok(condition_id)
        }
        None => {
            conn.execute(
                "INSERT INTO condition (uuid, patient_id, condition_coded, condition_non_coded,
                 clinical_status, verification_status, onset_date, end_date, end_reason,
                 additional_detail, voided, date_created)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
                params![
                    record.uuid,
                    patient_id,
                    concept_id,
                    record.condition.non_coded,
                    record.clinical_status.as_str(),
                    verification_status,
                    onset_date,
                    end_date,
                    record.end_reason,
                    record.additional_detail,
                    now
                ],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

#[async_trait]
impl ConditionStorage for SqliteBackend {
    async fn get_condition_by_uuid(&self, uuid: &str) -> StorageResult<Option<Condition>> {
        let conn = self.get_connection()?;
        condition_by_uuid(&conn, uuid)
    }

    async fn get_condition_by_id(&self, id: i64) -> StorageResult<Option<Condition>> {
        let conn = self.get_connection()?;
        condition_by_id(&conn, id)
    }

    async fn search_conditions(
        &self,
        params: &ConditionSearchParams,
    ) -> StorageResult<Vec<Condition>> {
        let criteria = condition_criteria(params);
        let conn = self.get_connection()?;

        let mut conditions = Vec::new();
        for id in list(&conn, &criteria)? {
            if let Some(condition) = condition_by_id(&conn, id)? {
                conditions.push(condition);
            }
        }

        debug!(count = conditions.len(), "condition search complete");
        Ok(conditions)
    }

    async fn save_condition(&self, condition: Condition) -> StorageResult<Condition> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let existing = if condition.uuid.is_empty() {
            None
        } else {
            condition_by_uuid(&tx, &condition.uuid)?
        };
        let record = finish_condition(merge_condition(existing, ConditionPatch::from(&condition)))?;

        let condition_id = write_condition(&tx, &record)?;
        tx.commit()?;

        debug!(uuid = %record.uuid, condition_id, "saved condition");
        condition_by_id(&conn, condition_id)?
            .ok_or_else(|| internal_error(format!("Condition {} vanished after save", record.uuid)))
    }

    async fn void_condition(&self, uuid: &str, reason: &str) -> StorageResult<Condition> {
        let conn = self.get_connection()?;
        let now = format_timestamp(&Utc::now());

        let updated = conn.execute(
            "UPDATE condition SET voided = 1, void_reason = ?1, date_voided = ?2, date_changed = ?2
             WHERE uuid = ?3",
            params![reason, now, uuid],
        )?;
        if updated == 0 {
            return Err(not_found(uuid));
        }

        condition_by_uuid(&conn, uuid)?.ok_or_else(|| not_found(uuid))
    }

    async fn unvoid_condition(&self, uuid: &str) -> StorageResult<Condition> {
        let conn = self.get_connection()?;
        let now = format_timestamp(&Utc::now());

        let updated = conn.execute(
            "UPDATE condition SET voided = 0, void_reason = NULL, date_voided = NULL,
             date_changed = ?1
             WHERE uuid = ?2",
            params![now, uuid],
        )?;
        if updated == 0 {
            return Err(not_found(uuid));
        }

        condition_by_uuid(&conn, uuid)?.ok_or_else(|| not_found(uuid))
    }
}
