//! Vocabulary configuration.

use serde::{Deserialize, Serialize};

/// Names of the global properties holding site-configured concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Property holding the UUID of the "mild" severity concept.
    #[serde(default = "default_severity_mild_key")]
    pub severity_mild_key: String,

    /// Property holding the UUID of the "moderate" severity concept.
    #[serde(default = "default_severity_moderate_key")]
    pub severity_moderate_key: String,

    /// Property holding the UUID of the "severe" severity concept.
    #[serde(default = "default_severity_severe_key")]
    pub severity_severe_key: String,

    /// Property holding the UUID of the catch-all "other" concept.
    #[serde(default = "default_other_key")]
    pub other_key: String,
}

fn default_severity_mild_key() -> String {
    "allergy.concept.severity.mild".to_string()
}

fn default_severity_moderate_key() -> String {
    "allergy.concept.severity.moderate".to_string()
}

fn default_severity_severe_key() -> String {
    "allergy.concept.severity.severe".to_string()
}

fn default_other_key() -> String {
    "allergy.concept.other".to_string()
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            severity_mild_key: default_severity_mild_key(),
            severity_moderate_key: default_severity_moderate_key(),
            severity_severe_key: default_severity_severe_key(),
            other_key: default_other_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: VocabularyConfig =
            serde_json::from_str(r#"{"severity_mild_key": "site.mild"}"#).unwrap();

        assert_eq!(config.severity_mild_key, "site.mild");
        assert_eq!(config.severity_severe_key, "allergy.concept.severity.severe");
        assert_eq!(config.other_key, "allergy.concept.other");
    }
}
