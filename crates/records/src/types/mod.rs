//! Core types for the records store.
//!
//! - [`Condition`], [`Allergy`] - Domain records as stored
//! - [`Patient`], [`Concept`], [`CodedOrFreeText`] - Shared domain types
//! - [`ConditionSearchParams`], [`AllergySearchParams`] - Search parameter sets
//! - [`ConditionResource`], [`AllergyIntoleranceResource`] - External representations
//!
//! # Examples
//!
//! ## Building a Search Parameter Set
//!
//! ```
//! use helios_records::types::{
//!     ConditionSearchParams, DateParam, DateRangeParam, ReferenceAndListParam,
//!     ReferenceParam, TokenOrListParam,
//! };
//!
//! let params = ConditionSearchParams::new()
//!     .with_subject(ReferenceAndListParam::of(ReferenceParam::chained("given", "Horatio")))
//!     .with_clinical_status(TokenOrListParam::of_codes(["active", "inactive"]))
//!     .with_onset_date(DateRangeParam::single(DateParam::parse("eq2017-01-12").unwrap()));
//!
//! assert!(params.code.is_none());
//! ```

mod allergy;
mod condition;
mod domain;
mod resources;
mod search_params;

pub use allergy::{AllergenType, Allergen, Allergy, AllergyPatch, AllergyReaction};
pub use condition::{
    Condition, ConditionClinicalStatus, ConditionPatch, ConditionVerificationStatus,
};
pub use domain::{
    CodedOrFreeText, Concept, ConceptMapping, Patient, PatientIdentifier, PersonName,
};
pub use resources::{
    AllergyIntoleranceResource, AllergyReactionComponent, Annotation, CodeableConcept, Coding,
    ConditionResource, Extension, Reference,
};
pub use search_params::{
    AllergySearchParams, ConditionSearchParams, DateParam, DatePrecision, DateRangeParam,
    ReferenceAndListParam, ReferenceOrListParam, ReferenceParam, SearchPrefix,
    TokenOrListParam, TokenParam,
};
