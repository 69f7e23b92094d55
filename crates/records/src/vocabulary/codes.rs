//! Fixed mappings between external codes and stored enumerations.

use crate::types::{AllergenType, ConditionClinicalStatus, ConditionVerificationStatus};

/// Code system of condition clinical statuses.
pub const CONDITION_CLINICAL_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-clinical";

/// Code system of condition verification statuses.
pub const CONDITION_VERIFICATION_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";

/// Code system of allergy clinical statuses.
pub const ALLERGY_CLINICAL_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical";

/// Code system of allergy categories.
pub const ALLERGY_CATEGORY_SYSTEM: &str = "http://hl7.org/fhir/allergy-intolerance-category";

/// Code system of reaction severities.
pub const REACTION_SEVERITY_SYSTEM: &str = "http://hl7.org/fhir/reaction-event-severity";

/// Maps an external condition clinical status code.
pub fn condition_status_from_code(code: &str) -> Option<ConditionClinicalStatus> {
    match code.to_ascii_lowercase().as_str() {
        "active" => Some(ConditionClinicalStatus::Active),
        "inactive" => Some(ConditionClinicalStatus::Inactive),
        "resolved" => Some(ConditionClinicalStatus::HistoryOf),
        _ => None,
    }
}

/// The external code of a condition clinical status.
pub fn condition_status_code(status: ConditionClinicalStatus) -> &'static str {
    match status {
        ConditionClinicalStatus::Active => "active",
        ConditionClinicalStatus::Inactive => "inactive",
        ConditionClinicalStatus::HistoryOf => "resolved",
    }
}

/// Maps an external condition verification status code.
pub fn verification_status_from_code(code: &str) -> Option<ConditionVerificationStatus> {
    match code.to_ascii_lowercase().as_str() {
        "provisional" => Some(ConditionVerificationStatus::Provisional),
        "confirmed" => Some(ConditionVerificationStatus::Confirmed),
        _ => None,
    }
}

/// The external code of a condition verification status.
pub fn verification_status_code(status: ConditionVerificationStatus) -> &'static str {
    match status {
        ConditionVerificationStatus::Provisional => "provisional",
        ConditionVerificationStatus::Confirmed => "confirmed",
    }
}

/// Maps an external allergy category. `Other` has no category.
pub fn allergen_type_from_category(code: &str) -> Option<AllergenType> {
    match code.to_ascii_lowercase().as_str() {
        "food" => Some(AllergenType::Food),
        "medication" => Some(AllergenType::Drug),
        "environment" => Some(AllergenType::Environment),
        _ => None,
    }
}

/// The external category of an allergen type.
pub fn allergen_category(allergen_type: AllergenType) -> Option<&'static str> {
    match allergen_type {
        AllergenType::Food => Some("food"),
        AllergenType::Drug => Some("medication"),
        AllergenType::Environment => Some("environment"),
        AllergenType::Other => None,
    }
}

/// Maps an external allergy clinical status onto the voided flag.
pub fn allergy_status_to_voided(code: &str) -> Option<bool> {
    match code.to_ascii_lowercase().as_str() {
        "active" => Some(false),
        "inactive" => Some(true),
        _ => None,
    }
}

/// The external allergy clinical status for a voided flag.
pub fn allergy_status_code(voided: bool) -> &'static str {
    if voided { "inactive" } else { "active" }
}
