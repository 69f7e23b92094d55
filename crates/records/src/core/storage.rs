//! Record repository traits.
//!
//! This module defines [`ConditionStorage`] and [`AllergyStorage`], the
//! repository operations over domain records. Lookups never fail with
//! not-found; they return `Ok(None)`. Records are never hard-deleted:
//! voiding is the only deletion path.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{Allergy, AllergySearchParams, Condition, ConditionSearchParams};

/// Repository operations for conditions.
///
/// # Example
///
/// ```ignore
/// use helios_records::core::ConditionStorage;
///
/// async fn example<S: ConditionStorage>(storage: &S) -> StorageResult<()> {
///     let mut condition = Condition::new("c-1");
///     condition.patient = Some(patient);
///     let saved = storage.save_condition(condition).await?;
///     assert!(saved.condition_id.is_some());
///
///     storage.void_condition("c-1", "entered in error").await?;
///     let voided = storage.get_condition_by_uuid("c-1").await?;
///     assert!(voided.unwrap().voided);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ConditionStorage: Send + Sync {
    /// Finds a condition by UUID, voided or not.
    async fn get_condition_by_uuid(&self, uuid: &str) -> StorageResult<Option<Condition>>;

    /// Finds a condition by internal id, voided or not.
    async fn get_condition_by_id(&self, id: i64) -> StorageResult<Option<Condition>>;

    /// Returns the non-voided conditions matching `params`, ordered by
    /// internal id, each at most once.
    async fn search_conditions(
        &self,
        params: &ConditionSearchParams,
    ) -> StorageResult<Vec<Condition>>;

    /// Creates or updates the condition with the record's UUID.
    ///
    /// An existing record is merged with the incoming one (present fields
    /// overwrite), derived fields are applied, and the persisted record is
    /// returned with its id and timestamps.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - If the record has no patient
    async fn save_condition(&self, condition: Condition) -> StorageResult<Condition>;

    /// Voids a condition, recording the reason and the void date.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If no condition has the UUID
    async fn void_condition(&self, uuid: &str, reason: &str) -> StorageResult<Condition>;

    /// Reverses a void, clearing the reason and the void date.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If no condition has the UUID
    async fn unvoid_condition(&self, uuid: &str) -> StorageResult<Condition>;
}

/// Repository operations for allergies.
#[async_trait]
pub trait AllergyStorage: Send + Sync {
    /// Finds an allergy by UUID, voided or not.
    async fn get_allergy_by_uuid(&self, uuid: &str) -> StorageResult<Option<Allergy>>;

    /// Finds an allergy by internal id, voided or not.
    async fn get_allergy_by_id(&self, id: i64) -> StorageResult<Option<Allergy>>;

    /// Returns the allergies matching `params`, ordered by internal id.
    ///
    /// Voided (inactive) allergies are only returned when the clinical
    /// status slot asks for them.
    async fn search_allergies(&self, params: &AllergySearchParams) -> StorageResult<Vec<Allergy>>;

    /// Creates or updates the allergy with the record's UUID. Reactions are
    /// replaced by the incoming list.
    async fn save_allergy(&self, allergy: Allergy) -> StorageResult<Allergy>;

    /// Voids an allergy.
    async fn void_allergy(&self, uuid: &str, reason: &str) -> StorageResult<Allergy>;

    /// Reverses a void.
    async fn unvoid_allergy(&self, uuid: &str) -> StorageResult<Allergy>;
}
