//! SQLite backend implementation.
//!
//! Implements the record repositories, the concept and patient lookups and
//! the global property store over SQLite. Both in-memory databases (for
//! tests) and file-based databases are supported.
//!
//! # Example
//!
//! ```no_run
//! use helios_records::backends::sqlite::SqliteBackend;
//! use helios_records::core::GlobalPropertyStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! backend.set_global_property("allergy.concept.severity.mild", "mild-uuid")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- Clinical records
//! CREATE TABLE condition (condition_id, uuid, patient_id, condition_coded, ...);
//! CREATE TABLE allergy (allergy_id, uuid, patient_id, allergen_type, ...);
//! CREATE TABLE allergy_reaction (allergy_reaction_id, allergy_id, reaction_concept_id, ...);
//!
//! -- Reference data
//! CREATE TABLE concept (concept_id, uuid, name);
//! CREATE TABLE concept_mapping (concept_mapping_id, concept_id, system, code);
//! CREATE TABLE patient (patient_id, uuid, gender, birthdate, voided);
//! CREATE TABLE person_name (person_name_id, patient_id, given_name, middle_name, family_name, ...);
//! CREATE TABLE patient_identifier (patient_identifier_id, patient_id, identifier, ...);
//! CREATE TABLE global_property (property, property_value);
//! ```

mod allergy_storage;
mod backend;
mod condition_storage;
mod lookup;
mod query;
mod schema;

pub use backend::{SqliteBackend, SqliteBackendConfig};
