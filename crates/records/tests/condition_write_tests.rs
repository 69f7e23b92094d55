//! Condition write tests through the condition service.

mod common;

use chrono::Utc;

use helios_records::core::ConditionStorage;
use helios_records::error::{ResourceError, StorageError, ValidationError};
use helios_records::services::{ConditionService, ResourceService};
use helios_records::translators::END_REASON_EXTENSION_URL;
use helios_records::types::{
    Annotation, CodeableConcept, Coding, ConditionClinicalStatus, ConditionResource,
    ConditionSearchParams, Extension, Reference,
};
use helios_records::vocabulary::CONDITION_CLINICAL_SYSTEM;

use common::*;

fn service(seeded: &Seeded) -> ConditionService<helios_records::backends::sqlite::SqliteBackend> {
    ConditionService::new(seeded.backend.clone())
}

fn status(code: &str) -> CodeableConcept {
    CodeableConcept::from_coding(Coding::new(CONDITION_CLINICAL_SYSTEM, code))
}

fn asthma_resource() -> ConditionResource {
    ConditionResource {
        subject: Some(Reference::patient(JOHN)),
        code: Some(CodeableConcept::from_coding(Coding::new(SNOMED, "195967001"))),
        clinical_status: Some(status("active")),
        onset_date_time: Some(at(2021, 5, 5, 12)),
        note: vec![Annotation {
            text: "Exercise induced".to_string(),
        }],
        ..Default::default()
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_generates_id_and_resolves_code() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let created = service.create(asthma_resource()).await.unwrap();

    let id = created.id.clone().unwrap();
    assert!(!id.is_empty());
    assert!(created.recorded_date.is_some());
    assert_eq!(created.code.as_ref().unwrap().first_code(), Some(ASTHMA));
    assert_eq!(created.subject.as_ref().unwrap().id(), Some(JOHN));
    assert_eq!(created.note[0].text, "Exercise induced");

    let stored = seeded.backend.get_condition_by_uuid(&id).await.unwrap().unwrap();
    assert_eq!(stored.condition.coded.unwrap().uuid, ASTHMA);
    assert_eq!(stored.clinical_status, ConditionClinicalStatus::Active);
    assert!(stored.end_date.is_none());
}

#[tokio::test]
async fn test_create_with_existing_id_fails() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let resource = ConditionResource {
        id: Some(JOHN_ASTHMA.to_string()),
        ..asthma_resource()
    };
    let err = service.create(resource).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn test_create_free_text_condition() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let resource = ConditionResource {
        code: Some(CodeableConcept::from_text("Sore shoulder")),
        ..asthma_resource()
    };
    let created = service.create(resource).await.unwrap();

    let code = created.code.unwrap();
    assert!(code.coding.is_empty());
    assert_eq!(code.text.as_deref(), Some("Sore shoulder"));
}

#[tokio::test]
async fn test_create_without_subject_fails() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let resource = ConditionResource {
        subject: None,
        ..asthma_resource()
    };
    let err = service.create(resource).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::MissingRequiredField { ref field }) if field == "subject"
    ));
}

#[tokio::test]
async fn test_create_with_unknown_subject_fails() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let resource = ConditionResource {
        subject: Some(Reference::patient("no-such-patient")),
        ..asthma_resource()
    };
    let err = service.create(resource).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidReference { .. })
    ));
}

// ============================================================================
// Derived end dates
// ============================================================================

#[tokio::test]
async fn test_end_reason_derives_end_date_on_write_day() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let resource = ConditionResource {
        extension: vec![Extension {
            url: END_REASON_EXTENSION_URL.to_string(),
            value_string: Some("cured".to_string()),
        }],
        ..asthma_resource()
    };
    let created = service.create(resource).await.unwrap();

    let abatement = created.abatement_date_time.unwrap();
    assert_eq!(abatement.date_naive(), Utc::now().date_naive());
    assert_eq!(created.extension_value(END_REASON_EXTENSION_URL), Some("cured"));
}

#[tokio::test]
async fn test_terminal_status_derives_end_date_on_write_day() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let mut resource = service.get(JOHN_ASTHMA).await.unwrap().unwrap();
    assert!(resource.abatement_date_time.is_none());

    resource.clinical_status = Some(status("inactive"));
    let updated = service.update(JOHN_ASTHMA, resource).await.unwrap();

    let abatement = updated.abatement_date_time.unwrap();
    assert_eq!(abatement.date_naive(), Utc::now().date_naive());
}

#[tokio::test]
async fn test_explicit_end_date_is_kept() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let resource = ConditionResource {
        clinical_status: Some(status("resolved")),
        abatement_date_time: Some(at(2022, 1, 1, 0)),
        ..asthma_resource()
    };
    let created = service.create(resource).await.unwrap();

    assert_eq!(created.abatement_date_time, Some(at(2022, 1, 1, 0)));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_with_unchanged_representation_is_noop() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let before = seeded
        .backend
        .get_condition_by_uuid(HORATIO_1_DIABETES)
        .await
        .unwrap()
        .unwrap();
    let resource = service.get(HORATIO_1_DIABETES).await.unwrap().unwrap();
    service.update(HORATIO_1_DIABETES, resource).await.unwrap();

    let mut after = seeded
        .backend
        .get_condition_by_uuid(HORATIO_1_DIABETES)
        .await
        .unwrap()
        .unwrap();
    assert!(after.date_changed.is_some());
    after.date_changed = before.date_changed;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_update_keeps_fields_the_body_omits() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let resource = ConditionResource {
        note: vec![Annotation {
            text: "Diet controlled".to_string(),
        }],
        ..Default::default()
    };
    let updated = service.update(HORATIO_1_DIABETES, resource).await.unwrap();

    assert_eq!(updated.note[0].text, "Diet controlled");
    assert_eq!(updated.code.unwrap().first_code(), Some(DIABETES));
    assert_eq!(updated.subject.unwrap().id(), Some(HORATIO_1));
    assert_eq!(updated.onset_date_time, Some(at(2017, 1, 12, 10)));
}

#[tokio::test]
async fn test_update_id_mismatch_fails() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let resource = ConditionResource {
        id: Some(JOHN_ASTHMA.to_string()),
        ..Default::default()
    };
    let err = service.update(HORATIO_1_DIABETES, resource).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::IdMismatch { .. })
    ));
}

#[tokio::test]
async fn test_update_missing_is_not_found() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let err = service
        .update("missing", asthma_resource())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unknown_status_code_is_rejected() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let resource = ConditionResource {
        clinical_status: Some(status("remission")),
        ..Default::default()
    };
    let err = service.update(JOHN_ASTHMA, resource).await.unwrap_err();

    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidResource { .. })
    ));
}

// ============================================================================
// Void
// ============================================================================

#[tokio::test]
async fn test_void_flips_only_soft_delete_fields() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let before = seeded
        .backend
        .get_condition_by_uuid(JOHN_ASTHMA)
        .await
        .unwrap()
        .unwrap();
    service.void(JOHN_ASTHMA, "duplicate entry").await.unwrap();

    let after = seeded
        .backend
        .get_condition_by_uuid(JOHN_ASTHMA)
        .await
        .unwrap()
        .unwrap();
    assert!(after.voided);
    assert_eq!(after.void_reason.as_deref(), Some("duplicate entry"));
    assert!(after.date_voided.is_some());

    assert_eq!(after.condition, before.condition);
    assert_eq!(after.patient, before.patient);
    assert_eq!(after.clinical_status, before.clinical_status);
    assert_eq!(after.onset_date, before.onset_date);
    assert_eq!(after.end_date, before.end_date);

    // Still readable, no longer searchable
    assert!(service.get(JOHN_ASTHMA).await.unwrap().is_some());
    let found = service.search(&ConditionSearchParams::new()).await.unwrap();
    assert!(found.iter().all(|c| c.id.as_deref() != Some(JOHN_ASTHMA)));
}

#[tokio::test]
async fn test_update_does_not_unvoid() {
    let seeded = seed_conditions().await;
    let service = service(&seeded);

    let resource = ConditionResource {
        note: vec![Annotation {
            text: "late note".to_string(),
        }],
        ..Default::default()
    };
    service.update(JOHN_KNEE_VOIDED, resource).await.unwrap();

    let stored = seeded
        .backend
        .get_condition_by_uuid(JOHN_KNEE_VOIDED)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.voided);
    assert_eq!(stored.additional_detail.as_deref(), Some("late note"));
}

#[tokio::test]
async fn test_unvoid_restores_search_visibility() {
    let seeded = seed_conditions().await;

    seeded.backend.unvoid_condition(JOHN_KNEE_VOIDED).await.unwrap();

    let found = seeded
        .backend
        .search_conditions(&ConditionSearchParams::new())
        .await
        .unwrap();
    assert!(condition_uuids(&found).contains(&JOHN_KNEE_VOIDED));
}

#[tokio::test]
async fn test_void_missing_is_not_found() {
    let seeded = seed_reference_data();
    let service = service(&seeded);

    let err = service.void("missing", "reason").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::NotFound { .. })
    ));
}
