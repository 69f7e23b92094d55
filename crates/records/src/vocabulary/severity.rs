//! Reaction severity mapping.
//!
//! Severities are site-configured: each external severity is represented by
//! a concept whose UUID is held in a global property.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::core::GlobalPropertyResolver;
use crate::error::StorageResult;

use super::VocabularyConfig;

/// External reaction severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// The external code.
    pub fn as_code(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Severity concept UUIDs as configured when loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityMapping {
    mild: Option<String>,
    moderate: Option<String>,
    severe: Option<String>,
    other: Option<String>,
}

impl SeverityMapping {
    /// Reads the configured concept UUIDs. Missing properties are logged and
    /// left unmapped.
    pub fn load(
        resolver: &dyn GlobalPropertyResolver,
        config: &VocabularyConfig,
    ) -> StorageResult<Self> {
        let read = |key: &str| -> StorageResult<Option<String>> {
            let value = resolver
                .get_global_property(key)?
                .filter(|v| !v.trim().is_empty());
            if value.is_none() {
                warn!(property = key, "severity global property is not set");
            }
            Ok(value)
        };

        Ok(Self {
            mild: read(&config.severity_mild_key)?,
            moderate: read(&config.severity_moderate_key)?,
            severe: read(&config.severity_severe_key)?,
            other: read(&config.other_key)?,
        })
    }

    /// The concept UUID representing `severity`.
    pub fn concept_uuid(&self, severity: Severity) -> Option<&str> {
        match severity {
            Severity::Mild => self.mild.as_deref(),
            Severity::Moderate => self.moderate.as_deref(),
            Severity::Severe => self.severe.as_deref(),
        }
    }

    /// The UUID of the catch-all "other" concept.
    pub fn other_concept_uuid(&self) -> Option<&str> {
        self.other.as_deref()
    }

    /// The severity a concept represents. The "other" concept, like any
    /// unconfigured concept, has none.
    pub fn severity_of(&self, concept_uuid: &str) -> Option<Severity> {
        [Severity::Mild, Severity::Moderate, Severity::Severe]
            .into_iter()
            .find(|s| self.concept_uuid(*s) == Some(concept_uuid))
    }
}
