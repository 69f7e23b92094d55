//! Vocabulary mapping.
//!
//! Maps external codes (statuses, categories, severities) onto the stored
//! representation. Fixed enumerations are mapped directly; severities are
//! resolved through global properties.
//!
//! A [`VocabularyMapper`] caches what it resolves for its own lifetime, which
//! is one composition or one translation. Nothing is cached across calls.

mod codes;
mod config;
mod severity;

use std::cell::OnceCell;

use crate::core::GlobalPropertyResolver;
use crate::error::StorageResult;

pub use codes::{
    ALLERGY_CATEGORY_SYSTEM, ALLERGY_CLINICAL_SYSTEM, CONDITION_CLINICAL_SYSTEM,
    CONDITION_VERIFICATION_SYSTEM, REACTION_SEVERITY_SYSTEM,
    allergen_category, allergen_type_from_category, allergy_status_code,
    allergy_status_to_voided, condition_status_code, condition_status_from_code,
    verification_status_code, verification_status_from_code,
};
pub use config::VocabularyConfig;
pub use severity::{Severity, SeverityMapping};

/// Resolves site-configured vocabulary for the duration of one call.
pub struct VocabularyMapper<'a> {
    resolver: &'a dyn GlobalPropertyResolver,
    config: &'a VocabularyConfig,
    severity: OnceCell<SeverityMapping>,
}

impl<'a> VocabularyMapper<'a> {
    /// Creates a mapper over `resolver`.
    pub fn new(resolver: &'a dyn GlobalPropertyResolver, config: &'a VocabularyConfig) -> Self {
        Self {
            resolver,
            config,
            severity: OnceCell::new(),
        }
    }

    /// The severity mapping, loaded on first use.
    pub fn severities(&self) -> StorageResult<&SeverityMapping> {
        if let Some(mapping) = self.severity.get() {
            return Ok(mapping);
        }
        let mapping = SeverityMapping::load(self.resolver, self.config)?;
        Ok(self.severity.get_or_init(|| mapping))
    }

    /// The concept UUID for an external severity code.
    ///
    /// `None` for unknown codes and for severities without a configured
    /// concept.
    pub fn severity_concept_uuid(&self, code: &str) -> StorageResult<Option<String>> {
        let Ok(severity) = code.parse::<Severity>() else {
            return Ok(None);
        };
        Ok(self
            .severities()?
            .concept_uuid(severity)
            .map(str::to_string))
    }

    /// The external severity code for a concept UUID.
    pub fn severity_code(&self, concept_uuid: &str) -> StorageResult<Option<&'static str>> {
        Ok(self
            .severities()?
            .severity_of(concept_uuid)
            .map(|s| s.as_code()))
    }
}
