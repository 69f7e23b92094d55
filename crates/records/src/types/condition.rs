//! The condition (problem list entry) domain record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CodedOrFreeText, Patient};

/// Clinical status of a condition as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionClinicalStatus {
    #[default]
    Active,
    Inactive,
    HistoryOf,
}

impl ConditionClinicalStatus {
    /// Returns the value stored in the `clinical_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionClinicalStatus::Active => "ACTIVE",
            ConditionClinicalStatus::Inactive => "INACTIVE",
            ConditionClinicalStatus::HistoryOf => "HISTORY_OF",
        }
    }

    /// Terminal statuses imply the condition has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConditionClinicalStatus::Inactive | ConditionClinicalStatus::HistoryOf
        )
    }
}

impl fmt::Display for ConditionClinicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConditionClinicalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ConditionClinicalStatus::Active),
            "INACTIVE" => Ok(ConditionClinicalStatus::Inactive),
            "HISTORY_OF" => Ok(ConditionClinicalStatus::HistoryOf),
            _ => Err(format!("unknown condition clinical status: {}", s)),
        }
    }
}

/// Verification status of a condition as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionVerificationStatus {
    Provisional,
    Confirmed,
}

impl ConditionVerificationStatus {
    /// Returns the value stored in the `verification_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionVerificationStatus::Provisional => "PROVISIONAL",
            ConditionVerificationStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl FromStr for ConditionVerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROVISIONAL" => Ok(ConditionVerificationStatus::Provisional),
            "CONFIRMED" => Ok(ConditionVerificationStatus::Confirmed),
            _ => Err(format!("unknown condition verification status: {}", s)),
        }
    }
}

/// A condition recorded for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Internal identifier, `None` until persisted.
    pub condition_id: Option<i64>,
    /// Immutable external identifier.
    pub uuid: String,
    pub patient: Option<Patient>,
    /// The condition itself, coded or free text.
    pub condition: CodedOrFreeText,
    pub clinical_status: ConditionClinicalStatus,
    pub verification_status: Option<ConditionVerificationStatus>,
    pub onset_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    pub additional_detail: Option<String>,
    pub voided: bool,
    pub void_reason: Option<String>,
    pub date_voided: Option<DateTime<Utc>>,
    /// Maintained by storage.
    pub date_created: Option<DateTime<Utc>>,
    /// Maintained by storage.
    pub date_changed: Option<DateTime<Utc>>,
}

impl Condition {
    /// Creates an empty, unsaved condition shell with the given UUID.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            condition_id: None,
            uuid: uuid.into(),
            patient: None,
            condition: CodedOrFreeText::default(),
            clinical_status: ConditionClinicalStatus::default(),
            verification_status: None,
            onset_date: None,
            end_date: None,
            end_reason: None,
            additional_detail: None,
            voided: false,
            void_reason: None,
            date_voided: None,
            date_created: None,
            date_changed: None,
        }
    }

    /// Derives the end date when the record implies one but carries none.
    ///
    /// A record never carries an end reason, or a terminal clinical status,
    /// without an end date.
    pub fn derive_end_date(&mut self, now: DateTime<Utc>) {
        if self.end_date.is_some() {
            return;
        }

        if self.end_reason.is_some() || self.clinical_status.is_terminal() {
            self.end_date = Some(now);
        }
    }
}

/// The fields of a condition that a write may carry.
///
/// `None` means "not present in the incoming data"; the merge keeps the
/// existing value for such fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionPatch {
    pub uuid: Option<String>,
    pub patient: Option<Patient>,
    pub condition: Option<CodedOrFreeText>,
    pub clinical_status: Option<ConditionClinicalStatus>,
    pub verification_status: Option<ConditionVerificationStatus>,
    pub onset_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    pub additional_detail: Option<String>,
}

impl From<&Condition> for ConditionPatch {
    fn from(condition: &Condition) -> Self {
        Self {
            uuid: (!condition.uuid.is_empty()).then(|| condition.uuid.clone()),
            patient: condition.patient.clone(),
            condition: (!condition.condition.is_empty()).then(|| condition.condition.clone()),
            clinical_status: Some(condition.clinical_status),
            verification_status: condition.verification_status,
            onset_date: condition.onset_date,
            end_date: condition.end_date,
            end_reason: condition.end_reason.clone(),
            additional_detail: condition.additional_detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clinical_status_round_trip() {
        for status in [
            ConditionClinicalStatus::Active,
            ConditionClinicalStatus::Inactive,
            ConditionClinicalStatus::HistoryOf,
        ] {
            assert_eq!(status.as_str().parse::<ConditionClinicalStatus>(), Ok(status));
        }
        assert!("RESOLVED".parse::<ConditionClinicalStatus>().is_err());
    }

    #[test]
    fn test_end_reason_derives_end_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut condition = Condition::new("c-1");
        condition.end_reason = Some("resolved".to_string());

        condition.derive_end_date(now);
        assert_eq!(condition.end_date, Some(now));
    }

    #[test]
    fn test_terminal_status_derives_end_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut condition = Condition::new("c-1");
        condition.clinical_status = ConditionClinicalStatus::HistoryOf;

        condition.derive_end_date(now);
        assert_eq!(condition.end_date, Some(now));
    }

    #[test]
    fn test_explicit_end_date_is_kept() {
        let explicit = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut condition = Condition::new("c-1");
        condition.clinical_status = ConditionClinicalStatus::Inactive;
        condition.end_date = Some(explicit);

        condition.derive_end_date(now);
        assert_eq!(condition.end_date, Some(explicit));
    }

    #[test]
    fn test_active_without_end_reason_has_no_end_date() {
        let mut condition = Condition::new("c-1");
        condition.derive_end_date(Utc::now());
        assert!(condition.end_date.is_none());
    }
}
