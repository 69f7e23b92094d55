//! Core traits and abstractions.
//!
//! - [`ConditionStorage`], [`AllergyStorage`] - Record repositories
//! - [`ConceptLookup`], [`PatientLookup`] - Resolution of referenced entities
//! - [`GlobalPropertyResolver`] - Site-configurable vocabulary
//!
//! The SQLite backend implements all of them; translators and services are
//! generic over them so that tests can substitute in-memory versions.

mod global_property;
mod lookup;
mod storage;

pub use global_property::{GlobalPropertyResolver, GlobalPropertyStore, InMemoryGlobalProperties};
pub use lookup::{ConceptLookup, PatientLookup};
pub use storage::{AllergyStorage, ConditionStorage};
