//! Shared domain types referenced by clinical records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A mapping of a concept onto an external code system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMapping {
    /// The code system URL (e.g. `http://snomed.info/sct`).
    pub system: String,
    /// The code within the system.
    pub code: String,
}

impl ConceptMapping {
    /// Creates a new mapping.
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
        }
    }
}

/// A concept from the controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Internal identifier, `None` until persisted.
    pub concept_id: Option<i64>,
    /// External identifier.
    pub uuid: String,
    /// Preferred display name.
    pub name: Option<String>,
    /// Mappings to external code systems.
    pub mappings: Vec<ConceptMapping>,
}

impl Concept {
    /// Creates an unsaved concept with the given UUID.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            concept_id: None,
            uuid: uuid.into(),
            name: None,
            mappings: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a code system mapping.
    pub fn with_mapping(mut self, system: impl Into<String>, code: impl Into<String>) -> Self {
        self.mappings.push(ConceptMapping::new(system, code));
        self
    }
}

/// A value that is either a coded concept or a free-text string.
///
/// Both may be stored; the coded value is authoritative when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedOrFreeText {
    /// The coded value.
    pub coded: Option<Concept>,
    /// The free-text value.
    pub non_coded: Option<String>,
}

impl CodedOrFreeText {
    /// A coded value.
    pub fn coded(concept: Concept) -> Self {
        Self {
            coded: Some(concept),
            non_coded: None,
        }
    }

    /// A free-text value.
    pub fn free_text(text: impl Into<String>) -> Self {
        Self {
            coded: None,
            non_coded: Some(text.into()),
        }
    }

    /// Returns true if neither value is set.
    pub fn is_empty(&self) -> bool {
        self.coded.is_none() && self.non_coded.is_none()
    }

    /// The text that represents this value: the concept name when coded,
    /// otherwise the free text.
    pub fn display(&self) -> Option<&str> {
        match &self.coded {
            Some(concept) => concept.name.as_deref(),
            None => self.non_coded.as_deref(),
        }
    }
}

/// A name of a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    /// Whether this is the preferred name.
    pub preferred: bool,
}

impl PersonName {
    /// Creates a name from given and family parts.
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given_name: Some(given.into()),
            middle_name: None,
            family_name: Some(family.into()),
            preferred: false,
        }
    }

    /// Marks the name as preferred.
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    /// Formats the name as "given middle family".
    pub fn full_name(&self) -> String {
        [&self.given_name, &self.middle_name, &self.family_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An identifier assigned to a patient (e.g. a medical record number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentifier {
    pub identifier: String,
    pub identifier_type: Option<String>,
    pub preferred: bool,
}

impl PatientIdentifier {
    /// Creates an identifier with no type.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            identifier_type: None,
            preferred: false,
        }
    }
}

/// The subject of a clinical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Internal identifier, `None` until persisted.
    pub patient_id: Option<i64>,
    /// External identifier.
    pub uuid: String,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    /// Names in insertion order.
    pub names: Vec<PersonName>,
    /// Identifiers in insertion order.
    pub identifiers: Vec<PatientIdentifier>,
}

impl Patient {
    /// Creates an unsaved patient with the given UUID.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            patient_id: None,
            uuid: uuid.into(),
            gender: None,
            birthdate: None,
            names: Vec::new(),
            identifiers: Vec::new(),
        }
    }

    /// Adds a name.
    pub fn with_name(mut self, name: PersonName) -> Self {
        self.names.push(name);
        self
    }

    /// Adds an identifier.
    pub fn with_identifier(mut self, identifier: PatientIdentifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    /// The preferred name, falling back to the first one.
    pub fn preferred_name(&self) -> Option<&PersonName> {
        self.names
            .iter()
            .find(|n| n.preferred)
            .or_else(|| self.names.first())
    }

    /// The given part of the preferred name.
    pub fn given_name(&self) -> Option<&str> {
        self.preferred_name().and_then(|n| n.given_name.as_deref())
    }

    /// The family part of the preferred name.
    pub fn family_name(&self) -> Option<&str> {
        self.preferred_name().and_then(|n| n.family_name.as_deref())
    }

    /// The preferred identifier, falling back to the first one.
    pub fn preferred_identifier(&self) -> Option<&PatientIdentifier> {
        self.identifiers
            .iter()
            .find(|i| i.preferred)
            .or_else(|| self.identifiers.first())
    }

    /// Display text used in references, e.g. `Horatio Hornblower (Identifier: 101-6)`.
    pub fn display(&self) -> Option<String> {
        let name = self.preferred_name().map(PersonName::full_name);
        let identifier = self
            .preferred_identifier()
            .map(|i| format!("(Identifier: {})", i.identifier));

        match (name, identifier) {
            (Some(n), Some(i)) => Some(format!("{} {}", n, i)),
            (Some(n), None) => Some(n),
            (None, Some(i)) => Some(i),
            (None, None) => None,
        }
    }
}
