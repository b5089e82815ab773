//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! ```rust
//! use reflow_core::{BlockerReporting, EngineConfig};
//!
//! let json = r#"{ "label": "checkout", "blocker": "root_cause" }"#;
//! let config = EngineConfig::from_json(json).unwrap();
//! assert_eq!(config.blocker, BlockerReporting::RootCause);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which node a blocked failure names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerReporting {
    /// The dependency that was in error when the node was evaluated.
    #[default]
    Immediate,

    /// The node at the start of the blocked chain, resolved through the error
    /// store while evaluating.
    RootCause,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Name attached to this engine's log events.
    pub label: Option<String>,

    pub blocker: BlockerReporting,
}

impl EngineConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_blocker_reporting(mut self, blocker: BlockerReporting) -> Self {
        self.blocker = blocker;
        self
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("reflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config =
            EngineConfig::from_json(r#"{ "label": "checkout", "blocker": "root_cause" }"#).unwrap();
        assert_eq!(config.label.as_deref(), Some("checkout"));
        assert_eq!(config.blocker, BlockerReporting::RootCause);
        assert_eq!(config.label(), "checkout");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_json(r#"{ "lable": "typo" }"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid engine config"));
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::default()
            .with_label("pace")
            .with_blocker_reporting(BlockerReporting::RootCause);
        assert_eq!(config.label(), "pace");
        assert_eq!(config.blocker, BlockerReporting::RootCause);
        assert_eq!(EngineConfig::default().label(), "reflow");
    }
}
