//! Hub configuration
//!
//! Parses the top-level configuration file: log level, router settings and
//! declarative automations.

use hubitat_automation::AutomationConfig;
use hubitat_event_router::RouterConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::ConfigReader;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Tracing filter directive (e.g. "info", "hubitat_event_router=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Router settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Declarative automations
    #[serde(default, alias = "automation")]
    pub automations: Vec<AutomationConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            router: RouterConfig::default(),
            automations: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Build from a processed YAML value and validate
    ///
    /// An empty document yields the defaults.
    pub fn from_value(value: Value, source_path: &Path) -> ConfigResult<Self> {
        let value = match value {
            Value::Null => Value::Mapping(Default::default()),
            other => other,
        };
        let config: HubConfig =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Schema {
                path: source_path.to_path_buf(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the schema cannot express
    ///
    /// Change filters that can never match are reported but accepted.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.router.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "router.queue_capacity must be at least 1".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for automation in &self.automations {
            if let Some(id) = &automation.id {
                if !seen.insert(id.as_str()) {
                    return Err(ConfigError::DuplicateAutomation { id: id.clone() });
                }
            }

            let invalid: usize = automation
                .triggers
                .iter()
                .filter_map(|t| t.as_device())
                .map(|t| t.invalid_filter_count())
                .sum();
            if invalid > 0 {
                warn!(
                    automation = ?automation.alias.as_ref().or(automation.id.as_ref()),
                    invalid,
                    "Automation has change filters that never match"
                );
            }
        }

        Ok(())
    }
}

/// Load and validate a configuration file
///
/// Relative `!include` paths resolve against the including file's directory.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<HubConfig> {
    let path = path.as_ref();
    let value = ConfigReader::new().read(path)?;
    HubConfig::from_value(value, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubitat_event_router::FailurePolicy;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = HubConfig::from_value(Value::Null, Path::new("inline")).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.router.failure_policy, FailurePolicy::FailFast);
        assert!(config.automations.is_empty());
    }

    #[test]
    fn test_load_config_with_included_automations() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("automations.yaml"),
            r#"
- id: porch
  alias: Porch light
  triggers:
    - trigger_type: hubitat_device_event
      devices: [12]
- id: everything
  triggers:
    - trigger_type: hubitat_device_event
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            r#"
log_level: debug
router:
  failure_policy: continue
automations: !include automations.yaml
"#,
        )
        .unwrap();

        let config = load_config(dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.router.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.automations.len(), 2);
        assert_eq!(config.automations[0].alias.as_deref(), Some("Porch light"));
    }

    #[test]
    fn test_automations_split_across_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("automations")).unwrap();
        fs::write(
            dir.path().join("automations/lights.yaml"),
            r#"
- id: porch
  triggers:
    - trigger_type: hubitat_device_event
      devices: [12]
- id: hall
  triggers:
    - trigger_type: hubitat_device_event
      devices: [14]
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            r#"
automations:
  - id: everything
    triggers:
      - trigger_type: hubitat_device_event
  - !include automations/lights.yaml
"#,
        )
        .unwrap();

        let config = load_config(dir.path().join("config.yaml")).unwrap();
        let ids: Vec<_> = config
            .automations
            .iter()
            .filter_map(|a| a.id.as_deref())
            .collect();
        assert_eq!(ids, vec!["everything", "porch", "hall"]);
    }

    #[test]
    fn test_schema_error() {
        let value: Value = serde_yaml::from_str("automations: 3\n").unwrap();
        let result = HubConfig::from_value(value, Path::new("inline"));
        assert!(matches!(result, Err(ConfigError::Schema { .. })));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config: HubConfig = serde_yaml::from_str(
            r#"
automations:
  - id: same
  - id: same
"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAutomation { ref id }) if id == "same"
        ));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let config: HubConfig = serde_yaml::from_str("router:\n  queue_capacity: 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_invalid_change_filter_is_accepted() {
        let config: HubConfig = serde_yaml::from_str(
            r#"
automations:
  - alias: Odd filter
    triggers:
      - trigger_type: hubitat_device_event
        attributes:
          - attribute_names: [switch]
            change_groups:
              - filters:
                  - name: toggles
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
    }
}
