//! Helios Clinical Records Store
//!
//! This crate stores conditions and allergies in a relational domain model
//! and exposes them as FHIR-shaped resources. It translates between the two
//! representations, enforcing the domain's state rules on every write, and
//! answers parameterized searches by composing one SQL query from any
//! combination of optional filter slots.
//!
//! # Features
//!
//! - **Criteria composition**: reference (with chained name and identifier
//!   fields), token, date and boolean slots; ORed within a slot, ANDed across
//! - **Translation**: coded-or-free-text values, status vocabularies,
//!   derived end dates, existing-wins merges
//! - **Site vocabulary**: severity concepts resolved through global properties
//! - **Soft deletes**: records are voided and unvoided, never removed
//!
//! # Architecture
//!
//! - [`types`] - Domain records, search parameter sets and resources
//! - [`error`] - Error types for all operations
//! - [`core`] - Repository, lookup and global property traits
//! - [`search`] - Criteria and the criteria composer
//! - [`vocabulary`] - Code systems and the severity mapping
//! - [`translators`] - Record to resource translation
//! - [`services`] - Resource-level get, search, create, update and void
//! - [`backends`] - Storage backends (SQLite)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use helios_records::backends::sqlite::SqliteBackend;
//! use helios_records::services::{ConditionService, ResourceService};
//! use helios_records::types::{
//!     ConditionSearchParams, ReferenceAndListParam, ReferenceParam, TokenOrListParam,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("records.db")?;
//! backend.init_schema()?;
//! let service = ConditionService::new(Arc::new(backend));
//!
//! // Active conditions of patients whose given name starts with "Horatio"
//! let params = ConditionSearchParams::new()
//!     .with_subject(ReferenceAndListParam::of(ReferenceParam::chained("given", "Horatio")))
//!     .with_clinical_status(TokenOrListParam::of_codes(["active"]));
//!
//! for condition in service.search(&params).await? {
//!     println!("{:?}", condition.code);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod search;
pub mod services;
pub mod translators;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use types::{Allergy, AllergyIntoleranceResource, Condition, ConditionResource};

pub use crate::core::{
    AllergyStorage, ConceptLookup, ConditionStorage, GlobalPropertyResolver, GlobalPropertyStore,
    PatientLookup,
};
pub use services::{AllergyIntoleranceService, ConditionService, ResourceService};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
