//! Seeded reference data and records.
//!
//! Two patients are both named Horatio Hornblower, and each has more than
//! one name row, so joins through names must not duplicate results.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use helios_records::backends::sqlite::SqliteBackend;
use helios_records::core::{AllergyStorage, ConditionStorage, GlobalPropertyStore};
use helios_records::types::{
    AllergenType, Allergen, Allergy, AllergyReaction, CodedOrFreeText, Concept, Condition,
    ConditionClinicalStatus, ConditionVerificationStatus, Patient, PatientIdentifier, PersonName,
};

pub const SNOMED: &str = "http://snomed.info/sct";
pub const ICD10: &str = "http://hl7.org/fhir/sid/icd-10";
pub const LOINC: &str = "http://loinc.org";

// Patients
pub const HORATIO_1: &str = "da7f524f-27ce-4bb2-86d6-6d1d05312bd5";
pub const HORATIO_2: &str = "5946f880-b197-400b-9caa-a3c661d23041";
pub const JOHN: &str = "8d703ff2-c3e2-4070-9737-73e713d5a50d";

// Concepts
pub const DIABETES: &str = "c607c80f-1ea9-4da3-bb88-6276ce8868dd";
pub const ASTHMA: &str = "4fd6b6b4-6b3b-4fd3-9d4f-8b7f0f1a1a11";
pub const WEIGHT: &str = "5089AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const PENICILLIN: &str = "71617AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const PEANUTS: &str = "162302AAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const HIVES: &str = "512AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const RASH: &str = "121677AAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const MILD: &str = "1498AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const MODERATE: &str = "1499AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const SEVERE: &str = "1500AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const OTHER: &str = "5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

// Conditions
pub const HORATIO_1_DIABETES: &str = "cond-h1-diabetes";
pub const HORATIO_1_ASTHMA: &str = "cond-h1-asthma";
pub const HORATIO_2_DIABETES: &str = "cond-h2-diabetes";
pub const JOHN_ASTHMA: &str = "cond-john-asthma";
pub const JOHN_KNEE_VOIDED: &str = "cond-john-knee";

// Allergies
pub const HORATIO_1_PENICILLIN: &str = "allergy-h1-penicillin";
pub const HORATIO_2_PEANUTS: &str = "allergy-h2-peanuts";
pub const JOHN_POLLEN_VOIDED: &str = "allergy-john-pollen";

/// Creates an empty in-memory backend with the schema initialised.
pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

fn horatio_1() -> Patient {
    Patient::new(HORATIO_1)
        .with_name(PersonName::new("Horatio", "Hornblower").preferred())
        .with_name(PersonName {
            given_name: Some("Horatio".to_string()),
            middle_name: Some("H".to_string()),
            family_name: Some("Hornblower".to_string()),
            preferred: false,
        })
        .with_identifier(PatientIdentifier::new("101-6"))
}

fn horatio_2() -> Patient {
    Patient::new(HORATIO_2)
        .with_name(PersonName::new("Horatio", "Hornblower").preferred())
        .with_name(PersonName::new("Horatio", "Hornblowers"))
        .with_identifier(PatientIdentifier::new("102-4"))
}

fn john() -> Patient {
    Patient::new(JOHN)
        .with_name(PersonName::new("John", "Smith").preferred())
        .with_identifier(PatientIdentifier::new("103-2"))
}

fn concepts() -> Vec<Concept> {
    vec![
        Concept::new(DIABETES)
            .with_name("Diabetes mellitus")
            .with_mapping(SNOMED, "CD41003")
            .with_mapping(ICD10, "E11"),
        Concept::new(ASTHMA)
            .with_name("Asthma")
            .with_mapping(SNOMED, "195967001"),
        Concept::new(WEIGHT)
            .with_name("Weight (kg)")
            .with_mapping(LOINC, "WGT234"),
        Concept::new(PENICILLIN)
            .with_name("Penicillin")
            .with_mapping(SNOMED, "764146007"),
        Concept::new(PEANUTS).with_name("Peanuts"),
        Concept::new(HIVES)
            .with_name("Hives")
            .with_mapping(SNOMED, "247472004"),
        Concept::new(RASH).with_name("Rash"),
        Concept::new(MILD).with_name("Mild"),
        Concept::new(MODERATE).with_name("Moderate"),
        Concept::new(SEVERE).with_name("Severe"),
        Concept::new(OTHER).with_name("Other"),
    ]
}

/// Everything a seeded test needs: the backend and the stored reference data.
pub struct Seeded {
    pub backend: Arc<SqliteBackend>,
    pub patients: Vec<Patient>,
    pub concepts: Vec<Concept>,
}

impl Seeded {
    pub fn patient(&self, uuid: &str) -> Patient {
        self.patients
            .iter()
            .find(|p| p.uuid == uuid)
            .cloned()
            .unwrap_or_else(|| panic!("no seeded patient {}", uuid))
    }

    pub fn concept(&self, uuid: &str) -> Concept {
        self.concepts
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
            .unwrap_or_else(|| panic!("no seeded concept {}", uuid))
    }

    pub fn condition(
        &self,
        uuid: &str,
        patient: &str,
        value: CodedOrFreeText,
        status: ConditionClinicalStatus,
        onset: DateTime<Utc>,
    ) -> Condition {
        let mut condition = Condition::new(uuid);
        condition.patient = Some(self.patient(patient));
        condition.condition = value;
        condition.clinical_status = status;
        condition.verification_status = Some(ConditionVerificationStatus::Confirmed);
        condition.onset_date = Some(onset);
        condition
    }
}

/// Seeds patients, concepts and severity global properties only.
pub fn seed_reference_data() -> Seeded {
    let backend = create_backend();

    let patients = [horatio_1(), horatio_2(), john()]
        .iter()
        .map(|p| backend.create_patient(p).expect("Failed to create patient"))
        .collect();
    let concepts = concepts()
        .iter()
        .map(|c| backend.create_concept(c).expect("Failed to create concept"))
        .collect();

    for (key, value) in [
        ("allergy.concept.severity.mild", MILD),
        ("allergy.concept.severity.moderate", MODERATE),
        ("allergy.concept.severity.severe", SEVERE),
        ("allergy.concept.other", OTHER),
    ] {
        backend
            .set_global_property(key, value)
            .expect("Failed to set global property");
    }

    Seeded {
        backend: Arc::new(backend),
        patients,
        concepts,
    }
}

/// Seeds reference data plus five conditions, one of them voided.
///
/// | UUID | Patient | Value | Status | Onset |
/// |------|---------|-------|--------|-------|
/// | `HORATIO_1_DIABETES` | Horatio 1 | Diabetes | active | 2017-01-12 10:00 |
/// | `HORATIO_1_ASTHMA` | Horatio 1 | Asthma | inactive | 2015-06-01 08:00 |
/// | `HORATIO_2_DIABETES` | Horatio 2 | Diabetes | history-of | 2017-01-12 23:00 |
/// | `JOHN_ASTHMA` | John | Asthma | active | 2020-03-04 09:00 |
/// | `JOHN_KNEE_VOIDED` | John | "Bad knee" | active | 2019-01-01 00:00 |
pub async fn seed_conditions() -> Seeded {
    let seeded = seed_reference_data();
    let diabetes = CodedOrFreeText::coded(seeded.concept(DIABETES));
    let asthma = CodedOrFreeText::coded(seeded.concept(ASTHMA));

    let conditions = [
        seeded.condition(
            HORATIO_1_DIABETES,
            HORATIO_1,
            diabetes.clone(),
            ConditionClinicalStatus::Active,
            at(2017, 1, 12, 10),
        ),
        seeded.condition(
            HORATIO_1_ASTHMA,
            HORATIO_1,
            asthma.clone(),
            ConditionClinicalStatus::Inactive,
            at(2015, 6, 1, 8),
        ),
        seeded.condition(
            HORATIO_2_DIABETES,
            HORATIO_2,
            diabetes,
            ConditionClinicalStatus::HistoryOf,
            at(2017, 1, 12, 23),
        ),
        seeded.condition(
            JOHN_ASTHMA,
            JOHN,
            asthma,
            ConditionClinicalStatus::Active,
            at(2020, 3, 4, 9),
        ),
        seeded.condition(
            JOHN_KNEE_VOIDED,
            JOHN,
            CodedOrFreeText::free_text("Bad knee"),
            ConditionClinicalStatus::Active,
            at(2019, 1, 1, 0),
        ),
    ];

    for condition in conditions {
        seeded
            .backend
            .save_condition(condition)
            .await
            .expect("Failed to save condition");
    }
    seeded
        .backend
        .void_condition(JOHN_KNEE_VOIDED, "entered in error")
        .await
        .expect("Failed to void condition");

    seeded
}

/// Seeds reference data plus three allergies, one of them voided.
///
/// | UUID | Patient | Allergen | Severity | Reactions |
/// |------|---------|----------|----------|-----------|
/// | `HORATIO_1_PENICILLIN` | Horatio 1 | Penicillin (drug) | severe | hives, rash |
/// | `HORATIO_2_PEANUTS` | Horatio 2 | Peanuts (food) | mild | hives |
/// | `JOHN_POLLEN_VOIDED` | John | "Pollen" (environment) | none | "sneezing" |
pub async fn seed_allergies() -> Seeded {
    let seeded = seed_reference_data();

    let mut penicillin = Allergy::new(HORATIO_1_PENICILLIN);
    penicillin.patient = Some(seeded.patient(HORATIO_1));
    penicillin.allergen = Allergen {
        allergen_type: AllergenType::Drug,
        value: CodedOrFreeText::coded(seeded.concept(PENICILLIN)),
    };
    penicillin.severity = Some(seeded.concept(SEVERE));
    penicillin.comment = Some("Anaphylaxis risk".to_string());
    penicillin.reactions = vec![
        AllergyReaction::coded(seeded.concept(HIVES)),
        AllergyReaction::coded(seeded.concept(RASH)),
    ];

    let mut peanuts = Allergy::new(HORATIO_2_PEANUTS);
    peanuts.patient = Some(seeded.patient(HORATIO_2));
    peanuts.allergen = Allergen {
        allergen_type: AllergenType::Food,
        value: CodedOrFreeText::coded(seeded.concept(PEANUTS)),
    };
    peanuts.severity = Some(seeded.concept(MILD));
    peanuts.reactions = vec![AllergyReaction::coded(seeded.concept(HIVES))];

    let mut pollen = Allergy::new(JOHN_POLLEN_VOIDED);
    pollen.patient = Some(seeded.patient(JOHN));
    pollen.allergen = Allergen {
        allergen_type: AllergenType::Environment,
        value: CodedOrFreeText::free_text("Pollen"),
    };
    pollen.reactions = vec![AllergyReaction::free_text("sneezing")];

    for allergy in [penicillin, peanuts, pollen] {
        seeded
            .backend
            .save_allergy(allergy)
            .await
            .expect("Failed to save allergy");
    }
    seeded
        .backend
        .void_allergy(JOHN_POLLEN_VOIDED, "no longer allergic")
        .await
        .expect("Failed to void allergy");

    seeded
}

/// The UUIDs of the given conditions, in order.
pub fn condition_uuids(conditions: &[Condition]) -> Vec<&str> {
    conditions.iter().map(|c| c.uuid.as_str()).collect()
}

/// The UUIDs of the given allergies, in order.
pub fn allergy_uuids(allergies: &[Allergy]) -> Vec<&str> {
    allergies.iter().map(|a| a.uuid.as_str()).collect()
}
