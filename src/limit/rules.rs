//! Rate limit rules configuration and resolution.
//!
//! This module handles loading per-source rate limit rules from
//! configuration. A source without an explicit rule falls back to the
//! default rule.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

/// Default admission ceiling when no rule is configured.
const DEFAULT_MAX_REQUESTS: u32 = 10;
/// Default trailing window when no rule is configured.
const DEFAULT_WINDOW_MS: u64 = 60_000;

/// A rate limit rule: the admission ceiling and the trailing window it
/// applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    /// Number of requests allowed within the window
    pub max_requests: u32,
    /// Trailing window length in milliseconds
    pub window_ms: u64,
}

impl LimitRule {
    /// Create a new rule.
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// The trailing window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for LimitRule {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

/// Rate limit rules for all known sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitRules {
    /// Rule applied to sources without an explicit entry
    #[serde(default)]
    pub default: LimitRule,

    /// Per-source overrides keyed by source id
    #[serde(default)]
    pub sources: HashMap<String, LimitRule>,
}

impl LimitRules {
    /// Create rules with only the default rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create rules with an explicit default rule.
    pub fn with_default(default: LimitRule) -> Self {
        Self {
            default,
            sources: HashMap::new(),
        }
    }

    /// Add or replace the rule for a source.
    pub fn set_rule(&mut self, source: impl Into<String>, rule: LimitRule) {
        self.sources.insert(source.into(), rule);
    }

    /// Resolve the rule for a source.
    ///
    /// A per-source override takes precedence; otherwise the default rule
    /// applies.
    pub fn rule_for(&self, source: &str) -> LimitRule {
        self.sources.get(source).copied().unwrap_or(self.default)
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse rate limit rules: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rules() {
        let yaml = r#"
default:
  max_requests: 20
  window_ms: 10000
sources:
  hackernews:
    max_requests: 5
    window_ms: 1000
"#;
        let rules = LimitRules::from_yaml(yaml).unwrap();
        assert_eq!(rules.default, LimitRule::new(20, 10_000));
        assert!(rules.sources.contains_key("hackernews"));
    }

    #[test]
    fn test_rule_resolution_prefers_override() {
        let yaml = r#"
default:
  max_requests: 20
  window_ms: 10000
sources:
  hackernews:
    max_requests: 5
    window_ms: 1000
  lobsters:
    max_requests: 2
    window_ms: 5000
"#;
        let rules = LimitRules::from_yaml(yaml).unwrap();

        assert_eq!(rules.rule_for("hackernews"), LimitRule::new(5, 1000));
        assert_eq!(rules.rule_for("lobsters"), LimitRule::new(2, 5000));
        // Unknown sources fall back to the default rule
        assert_eq!(rules.rule_for("unknown"), LimitRule::new(20, 10_000));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let rules = LimitRules::from_yaml("{}").unwrap();
        assert_eq!(rules.default, LimitRule::default());
        assert!(rules.sources.is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let result = LimitRules::from_yaml("default: [not, a, rule]");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_set_rule() {
        let mut rules = LimitRules::new();
        rules.set_rule("reddit", LimitRule::new(3, 2000));
        assert_eq!(rules.rule_for("reddit"), LimitRule::new(3, 2000));
    }

    #[test]
    fn test_window_conversion() {
        assert_eq!(LimitRule::new(1, 1500).window(), Duration::from_millis(1500));
    }
}
