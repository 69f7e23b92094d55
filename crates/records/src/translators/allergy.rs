//! Allergy translation.

use uuid::Uuid;

use crate::core::{ConceptLookup, GlobalPropertyResolver, PatientLookup};
use crate::error::{StorageResult, ValidationError};
use crate::types::{
    Allergen, Allergy, AllergyIntoleranceResource, AllergyPatch, AllergyReaction,
    AllergyReactionComponent, Annotation, CodeableConcept, Coding, Concept,
};
use crate::vocabulary::{
    ALLERGY_CLINICAL_SYSTEM, VocabularyConfig, VocabularyMapper, allergen_category,
    allergen_type_from_category, allergy_status_code,
};

use super::ResourceTranslator;
use super::common::{patient_reference, resolve_patient, resolve_value, to_codeable_concept};

/// Merges a patch into an allergy.
///
/// Follows the same rules as conditions: a persisted record keeps what the
/// patch leaves out, anything else is populated from the patch alone.
pub fn merge_allergy(existing: Option<Allergy>, patch: AllergyPatch) -> Allergy {
    let persisted = existing.as_ref().is_some_and(|a| a.allergy_id.is_some());
    let mut record = existing.unwrap_or_else(|| Allergy::new(""));

    if record.uuid.is_empty() {
        record.uuid = patch
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
    }

    if !persisted {
        record.patient = patch.patient;
        record.allergen = Allergen {
            allergen_type: patch.allergen_type.unwrap_or_default(),
            value: patch.allergen.unwrap_or_default(),
        };
        record.severity = patch.severity;
        record.comment = patch.comment;
        record.reactions = patch.reactions.unwrap_or_default();
        return record;
    }

    if let Some(patient) = patch.patient {
        record.patient = Some(patient);
    }
    if let Some(allergen_type) = patch.allergen_type {
        record.allergen.allergen_type = allergen_type;
    }
    if let Some(allergen) = patch.allergen {
        record.allergen.value = allergen;
    }
    if let Some(severity) = patch.severity {
        record.severity = Some(severity);
    }
    if let Some(comment) = patch.comment {
        record.comment = Some(comment);
    }
    if let Some(reactions) = patch.reactions {
        record.reactions = reactions;
    }

    record
}

/// Checks an allergy can be stored.
///
/// # Errors
///
/// * `ValidationError::MissingRequiredField` - If the allergy has no patient
pub fn finish_allergy(record: Allergy) -> StorageResult<Allergy> {
    if record.patient.is_none() {
        return Err(ValidationError::MissingRequiredField {
            field: "patient".to_string(),
        }
        .into());
    }
    Ok(record)
}

/// Translates allergies to and from [`AllergyIntoleranceResource`].
pub struct AllergyTranslator<'a> {
    concepts: &'a dyn ConceptLookup,
    patients: &'a dyn PatientLookup,
    properties: &'a dyn GlobalPropertyResolver,
    vocabulary: &'a VocabularyConfig,
}

impl<'a> AllergyTranslator<'a> {
    /// Creates a translator. Severities are resolved through `properties`
    /// using the keys named in `vocabulary`.
    pub fn new(
        concepts: &'a dyn ConceptLookup,
        patients: &'a dyn PatientLookup,
        properties: &'a dyn GlobalPropertyResolver,
        vocabulary: &'a VocabularyConfig,
    ) -> Self {
        Self {
            concepts,
            patients,
            properties,
            vocabulary,
        }
    }

    fn mapper(&self) -> VocabularyMapper<'a> {
        VocabularyMapper::new(self.properties, self.vocabulary)
    }

    fn patch_from(
        &self,
        existing: Option<&Allergy>,
        resource: &AllergyIntoleranceResource,
    ) -> StorageResult<AllergyPatch> {
        let patient = resource
            .patient
            .as_ref()
            .map(|reference| resolve_patient(self.patients, reference))
            .transpose()?;

        let allergen_type = resource
            .category
            .first()
            .map(|category| {
                allergen_type_from_category(category).ok_or_else(|| {
                    ValidationError::InvalidResource {
                        message: format!("unknown allergy category '{}'", category),
                    }
                })
            })
            .transpose()?;

        let existing_text = existing.and_then(|a| a.allergen.value.non_coded.as_deref());
        let allergen = resource
            .code
            .as_ref()
            .map(|code| resolve_value(self.concepts, "code", code, existing_text))
            .transpose()?;

        let reactions = if resource.reaction.is_empty() {
            None
        } else {
            let existing_reactions = existing.map(|a| a.reactions.as_slice()).unwrap_or_default();
            let manifestations = resource
                .reaction
                .iter()
                .flat_map(|r| r.manifestation.iter())
                .map(|m| -> StorageResult<AllergyReaction> {
                    let mut reaction =
                        resolve_value(self.concepts, "reaction.manifestation", m, None)?;
                    // The external form carries no text beside a coded reaction.
                    if let Some(concept) = &reaction.coded {
                        reaction.non_coded = existing_reactions
                            .iter()
                            .find(|r| r.reaction.coded.as_ref().is_some_and(|c| c.uuid == concept.uuid))
                            .and_then(|r| r.reaction.non_coded.clone());
                    }
                    Ok(AllergyReaction { reaction })
                })
                .collect::<StorageResult<Vec<_>>>()?;
            Some(manifestations)
        };

        let severity = match resource.reaction.iter().find_map(|r| r.severity.as_deref()) {
            Some(code) => self.severity_concept(code)?,
            None => None,
        };

        Ok(AllergyPatch {
            uuid: resource.id.clone(),
            patient,
            allergen_type,
            allergen,
            severity,
            comment: resource.note.first().map(|n| n.text.clone()),
            reactions,
        })
    }

    /// The concept for an external severity code. Codes that are not a
    /// configured severity fall back to the "other" concept.
    fn severity_concept(&self, code: &str) -> StorageResult<Option<Concept>> {
        let mapper = self.mapper();
        let uuid = match mapper.severity_concept_uuid(code)? {
            Some(uuid) => Some(uuid),
            None => mapper
                .severities()?
                .other_concept_uuid()
                .map(str::to_string),
        };

        match uuid {
            Some(uuid) => self.concepts.concept_by_uuid(&uuid),
            None => Ok(None),
        }
    }
}

impl ResourceTranslator for AllergyTranslator<'_> {
    type Record = Allergy;
    type Resource = AllergyIntoleranceResource;

    fn to_external(&self, record: &Allergy) -> StorageResult<AllergyIntoleranceResource> {
        let severity = match &record.severity {
            Some(concept) => self.mapper().severity_code(&concept.uuid)?,
            None => None,
        };

        let manifestation: Vec<CodeableConcept> = record
            .reactions
            .iter()
            .filter_map(|r| to_codeable_concept(&r.reaction))
            .collect();
        let reaction = if manifestation.is_empty() && severity.is_none() {
            Vec::new()
        } else {
            vec![AllergyReactionComponent {
                manifestation,
                severity: severity.map(str::to_string),
            }]
        };

        Ok(AllergyIntoleranceResource {
            id: Some(record.uuid.clone()),
            clinical_status: Some(CodeableConcept::from_coding(Coding::new(
                ALLERGY_CLINICAL_SYSTEM,
                allergy_status_code(record.voided),
            ))),
            category: allergen_category(record.allergen.allergen_type)
                .map(|c| vec![c.to_string()])
                .unwrap_or_default(),
            code: to_codeable_concept(&record.allergen.value),
            patient: record.patient.as_ref().map(patient_reference),
            recorded_date: record.date_created,
            note: record
                .comment
                .iter()
                .map(|text| Annotation { text: text.clone() })
                .collect(),
            reaction,
            ..Default::default()
        })
    }

    fn to_internal(
        &self,
        existing: Option<Allergy>,
        resource: &AllergyIntoleranceResource,
    ) -> StorageResult<Allergy> {
        let patch = self.patch_from(existing.as_ref(), resource)?;
        finish_allergy(merge_allergy(existing, patch))
    }
}
