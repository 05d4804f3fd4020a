//! Reconciliation settings
//!
//! Every column name and token the extractor relies on lives here. The
//! defaults match the PsychoPy moral-dilemma task and its eye-tracker
//! summary export; a JSON file may override any subset of them.

use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Column names of the stimulus-engine (behavioral) log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorColumns {
    /// Candidate participant identifier columns, tried in order
    pub identifier_candidates: Vec<String>,
    pub stimulus: String,
    pub key_response: String,
    pub correct_label: String,
    pub choice_stopped: String,
    pub left_shown: String,
    pub right_shown: String,
}

impl Default for BehaviorColumns {
    fn default() -> Self {
        Self {
            identifier_candidates: vec!["participant".to_string(), "ID".to_string()],
            stimulus: "main_img".to_string(),
            key_response: "key_resp.keys".to_string(),
            correct_label: "correct".to_string(),
            choice_stopped: "Dilemma.stopped".to_string(),
            left_shown: "left_choice_image.started".to_string(),
            right_shown: "right_choice_image.started".to_string(),
        }
    }
}

/// Key tokens mapped to response sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseKeys {
    pub left: String,
    pub right: String,
}

impl Default for ResponseKeys {
    fn default() -> Self {
        Self {
            left: "z".to_string(),
            right: "m".to_string(),
        }
    }
}

/// Eye-tracker event summary conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogSettings {
    pub event_column: String,
    /// Substring marking a dilemma onset (MAIN) event
    pub main_marker: String,
    /// Auxiliary marker preceding the choice screen
    pub sequence_marker: String,
}

impl Default for EventLogSettings {
    fn default() -> Self {
        Self {
            event_column: "event".to_string(),
            main_marker: "_main_".to_string(),
            sequence_marker: "red_dot_start".to_string(),
        }
    }
}

/// File layout of a participant directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub summary_prefix: String,
    pub processed_suffix: String,
    pub input_extension: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            summary_prefix: "summary".to_string(),
            processed_suffix: "_processed_data".to_string(),
            input_extension: "csv".to_string(),
        }
    }
}

/// Complete reconciliation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub behavior: BehaviorColumns,
    pub keys: ResponseKeys,
    pub events: EventLogSettings,
    pub layout: LayoutSettings,
    /// Stimulus rows containing this token are practice trials
    pub tutorial_token: String,
    /// Decimal places for floating-point output
    pub float_precision: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            behavior: BehaviorColumns::default(),
            keys: ResponseKeys::default(),
            events: EventLogSettings::default(),
            layout: LayoutSettings::default(),
            tutorial_token: "Tutorial".to_string(),
            float_precision: 4,
        }
    }
}

impl ReconcileConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        let config: ReconcileConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ReconcileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the extractor cannot work with
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let required = [
            ("keys.left", &self.keys.left),
            ("keys.right", &self.keys.right),
            ("events.event_column", &self.events.event_column),
            ("events.main_marker", &self.events.main_marker),
            ("events.sequence_marker", &self.events.sequence_marker),
            ("behavior.stimulus", &self.behavior.stimulus),
            ("layout.summary_prefix", &self.layout.summary_prefix),
            ("layout.processed_suffix", &self.layout.processed_suffix),
            ("layout.input_extension", &self.layout.input_extension),
            ("tutorial_token", &self.tutorial_token),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ReconcileError::InvalidConfig(format!("{} must not be empty", name)));
            }
        }

        if self.keys.left == self.keys.right {
            return Err(ReconcileError::InvalidConfig(
                "left and right keys must differ".to_string(),
            ));
        }

        if self.behavior.identifier_candidates.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "at least one identifier column is required".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReconcileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.behavior.identifier_candidates, vec!["participant", "ID"]);
        assert_eq!(config.float_precision, 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ReconcileConfig::from_json(r#"{ "keys": { "left": "a" } }"#).unwrap();
        assert_eq!(config.keys.left, "a");
        assert_eq!(config.keys.right, "m");
        assert_eq!(config.events.sequence_marker, "red_dot_start");
    }

    #[test]
    fn test_rejects_identical_keys() {
        let result = ReconcileConfig::from_json(r#"{ "keys": { "left": "m", "right": "m" } }"#);
        assert!(matches!(result, Err(ReconcileError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_marker() {
        let result = ReconcileConfig::from_json(r#"{ "events": { "sequence_marker": "" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_tutorial_token() {
        let err = ReconcileConfig::from_json(r#"{ "tutorial_token": "" }"#).unwrap_err();
        assert!(err.to_string().contains("tutorial_token"));

        let result = ReconcileConfig::from_json(r#"{ "layout": { "input_extension": "" } }"#);
        assert!(matches!(result, Err(ReconcileError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ReconcileConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(ReconcileConfig::from_json(&json).unwrap(), config);
    }
}
