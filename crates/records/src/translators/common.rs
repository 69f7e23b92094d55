//! Field mappings shared by the translators.

use crate::core::{ConceptLookup, PatientLookup};
use crate::error::{StorageResult, ValidationError};
use crate::types::{CodeableConcept, CodedOrFreeText, Coding, Concept, Patient, Reference};

/// The external form of a coded-or-free-text value.
///
/// A coded value lists the concept UUID first, then its mappings; the text
/// is the concept name. `None` when the value is empty.
pub fn to_codeable_concept(value: &CodedOrFreeText) -> Option<CodeableConcept> {
    match &value.coded {
        Some(concept) => Some(concept_to_codeable(concept)),
        None => value.non_coded.as_deref().map(CodeableConcept::from_text),
    }
}

/// The external form of a concept.
pub fn concept_to_codeable(concept: &Concept) -> CodeableConcept {
    let display = |coding: Coding| match &concept.name {
        Some(name) => coding.with_display(name),
        None => coding,
    };

    let mut coding = vec![display(Coding::code(&concept.uuid))];
    coding.extend(
        concept
            .mappings
            .iter()
            .map(|m| display(Coding::new(&m.system, &m.code))),
    );

    CodeableConcept {
        coding,
        text: concept.name.clone(),
    }
}

/// Resolves the first coding of `value` that names a known concept.
///
/// A coding without a system names a concept by UUID; one with a system
/// names it through a mapping.
pub fn resolve_concept(
    concepts: &dyn ConceptLookup,
    value: &CodeableConcept,
) -> StorageResult<Option<Concept>> {
    for coding in &value.coding {
        let Some(code) = coding.code.as_deref() else {
            continue;
        };
        let concept = match coding.system.as_deref() {
            Some(system) => concepts.concept_by_mapping(system, code)?,
            None => concepts.concept_by_uuid(code)?,
        };
        if concept.is_some() {
            return Ok(concept);
        }
    }
    Ok(None)
}

/// Resolves an incoming coded-or-free-text value.
///
/// A resolved coding replaces the coded part and keeps `existing_text`;
/// otherwise the text becomes a free-text value.
///
/// # Errors
///
/// * `ValidationError::InvalidResource` - If nothing resolves and there is no text
pub fn resolve_value(
    concepts: &dyn ConceptLookup,
    field: &str,
    value: &CodeableConcept,
    existing_text: Option<&str>,
) -> StorageResult<CodedOrFreeText> {
    if let Some(concept) = resolve_concept(concepts, value)? {
        return Ok(CodedOrFreeText {
            coded: Some(concept),
            non_coded: existing_text.map(str::to_string),
        });
    }

    match &value.text {
        Some(text) => Ok(CodedOrFreeText::free_text(text)),
        None => Err(ValidationError::InvalidResource {
            message: format!("{} has no known coding and no text", field),
        }
        .into()),
    }
}

/// The external reference to a patient.
pub fn patient_reference(patient: &Patient) -> Reference {
    Reference {
        display: patient.display(),
        ..Reference::patient(&patient.uuid)
    }
}

/// Resolves a patient reference.
///
/// # Errors
///
/// * `ValidationError::InvalidReference` - If the reference has no id or names no patient
pub fn resolve_patient(
    patients: &dyn PatientLookup,
    reference: &Reference,
) -> StorageResult<Patient> {
    let raw = reference.reference.clone().unwrap_or_default();
    let Some(id) = reference.id() else {
        return Err(ValidationError::InvalidReference {
            reference: raw,
            message: "reference has no id".to_string(),
        }
        .into());
    };

    if let Some(kind) = reference.reference_type.as_deref() {
        if kind != "Patient" {
            return Err(ValidationError::InvalidReference {
                reference: raw,
                message: format!("expected a Patient reference, found {}", kind),
            }
            .into());
        }
    }

    patients.patient_by_uuid(id)?.ok_or_else(|| {
        ValidationError::InvalidReference {
            reference: raw,
            message: "no such patient".to_string(),
        }
        .into()
    })
}
