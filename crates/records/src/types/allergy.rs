//! The allergy domain record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CodedOrFreeText, Concept, Patient};

/// The kind of substance an allergy is to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllergenType {
    Drug,
    Food,
    Environment,
    #[default]
    Other,
}

impl AllergenType {
    /// Returns the value stored in the `allergen_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AllergenType::Drug => "DRUG",
            AllergenType::Food => "FOOD",
            AllergenType::Environment => "ENVIRONMENT",
            AllergenType::Other => "OTHER",
        }
    }
}

impl fmt::Display for AllergenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AllergenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRUG" => Ok(AllergenType::Drug),
            "FOOD" => Ok(AllergenType::Food),
            "ENVIRONMENT" => Ok(AllergenType::Environment),
            "OTHER" => Ok(AllergenType::Other),
            _ => Err(format!("unknown allergen type: {}", s)),
        }
    }
}

/// The substance an allergy is to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allergen {
    pub allergen_type: AllergenType,
    pub value: CodedOrFreeText,
}

/// A reaction (manifestation) observed for an allergy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyReaction {
    pub reaction: CodedOrFreeText,
}

impl AllergyReaction {
    /// A coded reaction.
    pub fn coded(concept: Concept) -> Self {
        Self {
            reaction: CodedOrFreeText::coded(concept),
        }
    }

    /// A free-text reaction.
    pub fn free_text(text: impl Into<String>) -> Self {
        Self {
            reaction: CodedOrFreeText::free_text(text),
        }
    }
}

/// An allergy recorded for a patient.
///
/// Allergies have no stored clinical status: a voided allergy is inactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    /// Internal identifier, `None` until persisted.
    pub allergy_id: Option<i64>,
    /// Immutable external identifier.
    pub uuid: String,
    pub patient: Option<Patient>,
    pub allergen: Allergen,
    pub severity: Option<Concept>,
    pub comment: Option<String>,
    /// Reactions in insertion order.
    pub reactions: Vec<AllergyReaction>,
    pub voided: bool,
    pub void_reason: Option<String>,
    pub date_voided: Option<DateTime<Utc>>,
    /// Maintained by storage.
    pub date_created: Option<DateTime<Utc>>,
    /// Maintained by storage.
    pub date_changed: Option<DateTime<Utc>>,
}

impl Allergy {
    /// Creates an empty, unsaved allergy shell with the given UUID.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            allergy_id: None,
            uuid: uuid.into(),
            patient: None,
            allergen: Allergen::default(),
            severity: None,
            comment: None,
            reactions: Vec::new(),
            voided: false,
            void_reason: None,
            date_voided: None,
            date_created: None,
            date_changed: None,
        }
    }

    /// Returns true if the allergy is clinically active.
    pub fn is_active(&self) -> bool {
        !self.voided
    }
}

/// The fields of an allergy that a write may carry. `None` keeps the
/// existing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllergyPatch {
    pub uuid: Option<String>,
    pub patient: Option<Patient>,
    pub allergen_type: Option<AllergenType>,
    pub allergen: Option<CodedOrFreeText>,
    pub severity: Option<Concept>,
    pub comment: Option<String>,
    pub reactions: Option<Vec<AllergyReaction>>,
}

impl From<&Allergy> for AllergyPatch {
    fn from(allergy: &Allergy) -> Self {
        Self {
            uuid: (!allergy.uuid.is_empty()).then(|| allergy.uuid.clone()),
            patient: allergy.patient.clone(),
            allergen_type: Some(allergy.allergen.allergen_type),
            allergen: (!allergy.allergen.value.is_empty()).then(|| allergy.allergen.value.clone()),
            severity: allergy.severity.clone(),
            comment: allergy.comment.clone(),
            reactions: Some(allergy.reactions.clone()),
        }
    }
}
