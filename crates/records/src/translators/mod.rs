//! Resource translators.
//!
//! A translator converts a stored domain record to its external
//! representation and back. Inbound translation builds a patch from the
//! resource, merges it into the existing record, applies derived fields and
//! validates the result; the voided fields are never changed.
//!
//! The merge functions are public so that the repository applies exactly
//! the same rules when saving a domain record directly.

mod allergy;
mod common;
mod condition;

use crate::error::StorageResult;

pub use allergy::{AllergyTranslator, finish_allergy, merge_allergy};
pub use common::{concept_to_codeable, patient_reference, to_codeable_concept};
pub use condition::{
    ConditionTranslator, END_REASON_EXTENSION_URL, finish_condition, merge_condition,
};

/// Converts between a domain record and its external representation.
pub trait ResourceTranslator {
    /// The domain record.
    type Record;
    /// The external representation.
    type Resource;

    /// Converts a record to its external representation.
    fn to_external(&self, record: &Self::Record) -> StorageResult<Self::Resource>;

    /// Converts a representation to a record, merging it into `existing`.
    ///
    /// Translating the representation of a persisted record back onto that
    /// record yields the record unchanged.
    fn to_internal(
        &self,
        existing: Option<Self::Record>,
        resource: &Self::Resource,
    ) -> StorageResult<Self::Record>;
}
