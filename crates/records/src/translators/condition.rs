//! Condition translation.

use chrono::Utc;
use uuid::Uuid;

use crate::core::{ConceptLookup, PatientLookup};
use crate::error::{StorageResult, ValidationError};
use crate::types::{
    Annotation, CodeableConcept, Coding, Condition, ConditionPatch, ConditionResource, Extension,
};
use crate::vocabulary::{
    CONDITION_CLINICAL_SYSTEM, CONDITION_VERIFICATION_SYSTEM, condition_status_code,
    condition_status_from_code, verification_status_code, verification_status_from_code,
};

use super::ResourceTranslator;
use super::common::{patient_reference, resolve_patient, resolve_value, to_codeable_concept};

/// Extension carrying the reason a condition ended.
pub const END_REASON_EXTENSION_URL: &str = "urn:helios-records:condition-end-reason";

/// Merges a patch into a condition.
///
/// A persisted record (one with an internal id) keeps every field the patch
/// leaves out. Anything else is populated from the patch alone, keeping the
/// record's UUID when it has one. The voided fields and storage timestamps
/// are never touched.
pub fn merge_condition(existing: Option<Condition>, patch: ConditionPatch) -> Condition {
    let persisted = existing.as_ref().is_some_and(|c| c.condition_id.is_some());
    let mut record = existing.unwrap_or_else(|| Condition::new(""));

    if record.uuid.is_empty() {
        record.uuid = patch
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
    }

    if !persisted {
        record.patient = patch.patient;
        record.condition = patch.condition.unwrap_or_default();
        record.clinical_status = patch.clinical_status.unwrap_or_default();
        record.verification_status = patch.verification_status;
        record.onset_date = patch.onset_date;
        record.end_date = patch.end_date;
        record.end_reason = patch.end_reason;
        record.additional_detail = patch.additional_detail;
        return record;
    }

    if let Some(patient) = patch.patient {
        record.patient = Some(patient);
    }
    if let Some(condition) = patch.condition {
        record.condition = condition;
    }
    if let Some(status) = patch.clinical_status {
        record.clinical_status = status;
    }
    if let Some(status) = patch.verification_status {
        record.verification_status = Some(status);
    }
    if let Some(onset) = patch.onset_date {
        record.onset_date = Some(onset);
    }
    if let Some(end) = patch.end_date {
        record.end_date = Some(end);
    }
    if let Some(reason) = patch.end_reason {
        record.end_reason = Some(reason);
    }
    if let Some(detail) = patch.additional_detail {
        record.additional_detail = Some(detail);
    }

    record
}

/// Applies derived fields and checks the record can be stored.
///
/// # Errors
///
/// * `ValidationError::MissingRequiredField` - If the condition has no patient
pub fn finish_condition(mut record: Condition) -> StorageResult<Condition> {
    record.derive_end_date(Utc::now());

    if record.patient.is_none() {
        return Err(ValidationError::MissingRequiredField {
            field: "subject".to_string(),
        }
        .into());
    }

    Ok(record)
}

/// Translates conditions to and from [`ConditionResource`].
pub struct ConditionTranslator<'a> {
    concepts: &'a dyn ConceptLookup,
    patients: &'a dyn PatientLookup,
}

impl<'a> ConditionTranslator<'a> {
    /// Creates a translator resolving references through the given lookups.
    pub fn new(concepts: &'a dyn ConceptLookup, patients: &'a dyn PatientLookup) -> Self {
        Self { concepts, patients }
    }

    fn patch_from(
        &self,
        existing: Option<&Condition>,
        resource: &ConditionResource,
    ) -> StorageResult<ConditionPatch> {
        let patient = resource
            .subject
            .as_ref()
            .map(|subject| resolve_patient(self.patients, subject))
            .transpose()?;

        let existing_text = existing.and_then(|c| c.condition.non_coded.as_deref());
        let condition = resource
            .code
            .as_ref()
            .map(|code| resolve_value(self.concepts, "code", code, existing_text))
            .transpose()?;

        let clinical_status = resource
            .clinical_status
            .as_ref()
            .map(|status| {
                status_code(status, CONDITION_CLINICAL_SYSTEM, "clinicalStatus")
                    .and_then(|code| parse_code(code, "clinicalStatus", condition_status_from_code))
            })
            .transpose()?;

        let verification_status = resource
            .verification_status
            .as_ref()
            .map(|status| {
                status_code(status, CONDITION_VERIFICATION_SYSTEM, "verificationStatus").and_then(
                    |code| parse_code(code, "verificationStatus", verification_status_from_code),
                )
            })
            .transpose()?;

        Ok(ConditionPatch {
            uuid: resource.id.clone(),
            patient,
            condition,
            clinical_status,
            verification_status,
            onset_date: resource.onset_date_time,
            end_date: resource.abatement_date_time,
            end_reason: resource
                .extension_value(END_REASON_EXTENSION_URL)
                .map(str::to_string),
            additional_detail: resource.note.first().map(|n| n.text.clone()),
        })
    }
}

/// The code of a status concept, preferring the given system.
fn status_code<'c>(
    status: &'c CodeableConcept,
    system: &str,
    field: &str,
) -> StorageResult<&'c str> {
    status
        .code_in(system)
        .or_else(|| status.first_code())
        .ok_or_else(|| {
            ValidationError::InvalidResource {
                message: format!("{} has no code", field),
            }
            .into()
        })
}

fn parse_code<T>(code: &str, field: &str, parse: impl Fn(&str) -> Option<T>) -> StorageResult<T> {
    parse(code).ok_or_else(|| {
        ValidationError::InvalidResource {
            message: format!("unknown {} code '{}'", field, code),
        }
        .into()
    })
}

impl ResourceTranslator for ConditionTranslator<'_> {
    type Record = Condition;
    type Resource = ConditionResource;

    fn to_external(&self, record: &Condition) -> StorageResult<ConditionResource> {
        let clinical_status = CodeableConcept::from_coding(Coding::new(
            CONDITION_CLINICAL_SYSTEM,
            condition_status_code(record.clinical_status),
        ));
        let verification_status = record.verification_status.map(|status| {
            CodeableConcept::from_coding(Coding::new(
                CONDITION_VERIFICATION_SYSTEM,
                verification_status_code(status),
            ))
        });

        let extension = record
            .end_reason
            .iter()
            .map(|reason| Extension {
                url: END_REASON_EXTENSION_URL.to_string(),
                value_string: Some(reason.clone()),
            })
            .collect();

        Ok(ConditionResource {
            id: Some(record.uuid.clone()),
            extension,
            clinical_status: Some(clinical_status),
            verification_status,
            code: to_codeable_concept(&record.condition),
            subject: record.patient.as_ref().map(patient_reference),
            onset_date_time: record.onset_date,
            abatement_date_time: record.end_date,
            recorded_date: record.date_created,
            note: record
                .additional_detail
                .iter()
                .map(|text| Annotation { text: text.clone() })
                .collect(),
            ..Default::default()
        })
    }

    fn to_internal(
        &self,
        existing: Option<Condition>,
        resource: &ConditionResource,
    ) -> StorageResult<Condition> {
        let patch = self.patch_from(existing.as_ref(), resource)?;
        finish_condition(merge_condition(existing, patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::translators::testing::{Lookups, horatio};
    use crate::types::{CodedOrFreeText, Concept, ConditionClinicalStatus, Reference};
    use chrono::TimeZone;

    fn lookups() -> Lookups {
        Lookups::new().with_patient(horatio()).with_concept(
            Concept::new("asthma-uuid")
                .with_name("Asthma")
                .with_mapping("http://snomed.info/sct", "195967001"),
        )
    }

    fn persisted() -> Condition {
        let mut condition = Condition::new("c-1");
        condition.condition_id = Some(7);
        condition.patient = Some(horatio());
        condition.condition = CodedOrFreeText::coded(
            Concept::new("asthma-uuid")
                .with_name("Asthma")
                .with_mapping("http://snomed.info/sct", "195967001"),
        );
        condition.clinical_status = ConditionClinicalStatus::HistoryOf;
        condition.onset_date = Some(Utc.with_ymd_and_hms(2017, 1, 12, 0, 0, 0).unwrap());
        condition.end_date = Some(Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap());
        condition.end_reason = Some("resolved".to_string());
        condition.additional_detail = Some("seasonal".to_string());
        condition.date_created = Some(Utc.with_ymd_and_hms(2016, 1, 12, 0, 0, 0).unwrap());
        condition
    }

    #[test]
    fn test_to_external() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);

        let resource = translator.to_external(&persisted()).unwrap();

        assert_eq!(resource.id.as_deref(), Some("c-1"));
        assert_eq!(
            resource.clinical_status.as_ref().unwrap().code_in(CONDITION_CLINICAL_SYSTEM),
            Some("resolved")
        );
        assert_eq!(resource.code.as_ref().unwrap().text.as_deref(), Some("Asthma"));
        let subject = resource.subject.as_ref().unwrap();
        assert_eq!(subject.reference.as_deref(), Some("Patient/p-horatio"));
        assert_eq!(
            subject.display.as_deref(),
            Some("Horatio Hornblower (Identifier: 101-6)")
        );
        assert_eq!(resource.extension_value(END_REASON_EXTENSION_URL), Some("resolved"));
        assert_eq!(resource.note[0].text, "seasonal");
        assert!(resource.verification_status.is_none());
    }

    #[test]
    fn test_round_trip_is_identity() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let record = persisted();

        let resource = translator.to_external(&record).unwrap();
        let back = translator.to_internal(Some(record.clone()), &resource).unwrap();

        assert_eq!(back, record);
    }

    #[test]
    fn test_create_from_resource() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let resource = ConditionResource {
            id: Some("new-1".to_string()),
            subject: Some(Reference::patient("p-horatio")),
            code: Some(CodeableConcept::from_coding(Coding::new(
                "http://snomed.info/sct",
                "195967001",
            ))),
            ..Default::default()
        };

        let record = translator.to_internal(None, &resource).unwrap();

        assert_eq!(record.uuid, "new-1");
        assert_eq!(record.condition.coded.unwrap().uuid, "asthma-uuid");
        assert_eq!(record.clinical_status, ConditionClinicalStatus::Active);
        assert!(record.end_date.is_none());
        assert!(!record.voided);
    }

    #[test]
    fn test_generates_uuid_without_id() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let resource = ConditionResource {
            subject: Some(Reference::patient("p-horatio")),
            code: Some(CodeableConcept::from_text("headache")),
            ..Default::default()
        };

        let record = translator.to_internal(None, &resource).unwrap();
        assert!(Uuid::parse_str(&record.uuid).is_ok());
        assert_eq!(record.condition, CodedOrFreeText::free_text("headache"));
    }

    #[test]
    fn test_end_reason_derives_end_date() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let resource = ConditionResource {
            subject: Some(Reference::patient("p-horatio")),
            extension: vec![Extension {
                url: END_REASON_EXTENSION_URL.to_string(),
                value_string: Some("cured".to_string()),
            }],
            ..Default::default()
        };

        let before = Utc::now();
        let record = translator.to_internal(None, &resource).unwrap();

        assert_eq!(record.end_reason.as_deref(), Some("cured"));
        assert!(record.end_date.unwrap() >= before);
    }

    #[test]
    fn test_missing_subject_is_rejected() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);

        let err = translator
            .to_internal(None, &ConditionResource::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_unknown_subject_is_rejected() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let resource = ConditionResource {
            subject: Some(Reference::patient("nobody")),
            ..Default::default()
        };

        let err = translator.to_internal(None, &resource).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_update_keeps_absent_fields_and_voided() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let mut existing = persisted();
        existing.voided = true;
        let resource = ConditionResource {
            note: vec![Annotation {
                text: "updated".to_string(),
            }],
            ..Default::default()
        };

        let record = translator.to_internal(Some(existing.clone()), &resource).unwrap();

        assert_eq!(record.additional_detail.as_deref(), Some("updated"));
        assert_eq!(record.onset_date, existing.onset_date);
        assert_eq!(record.patient, existing.patient);
        assert!(record.voided);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let lookups = lookups();
        let translator = ConditionTranslator::new(&lookups, &lookups);
        let resource = ConditionResource {
            subject: Some(Reference::patient("p-horatio")),
            clinical_status: Some(CodeableConcept::from_coding(Coding::new(
                CONDITION_CLINICAL_SYSTEM,
                "remission",
            ))),
            ..Default::default()
        };

        assert!(translator.to_internal(None, &resource).is_err());
    }
}
