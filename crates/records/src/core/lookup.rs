//! Lookups of referenced entities.
//!
//! Translators resolve coded values and subject references through these
//! traits; the storage backend implements them.

use crate::error::StorageResult;
use crate::types::{Concept, Patient};

/// Resolves concepts of the controlled vocabulary.
pub trait ConceptLookup: Send + Sync {
    /// Finds a concept by its UUID.
    fn concept_by_uuid(&self, uuid: &str) -> StorageResult<Option<Concept>>;

    /// Finds the concept mapped to `code` within `system`.
    fn concept_by_mapping(&self, system: &str, code: &str) -> StorageResult<Option<Concept>>;
}

/// Resolves patients.
pub trait PatientLookup: Send + Sync {
    /// Finds a patient by UUID, with names and identifiers.
    fn patient_by_uuid(&self, uuid: &str) -> StorageResult<Option<Patient>>;
}
