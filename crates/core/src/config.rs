//! Runtime configuration
//!
//! Actors and deciders load one document holding the service-side
//! identifiers and the plan. YAML is the default; `.json` files are
//! parsed as JSON. Validation failures are fatal at startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::plan::{Plan, PlanError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),
}

/// Everything a worker process needs to know at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Workflow service domain
    pub domain: String,

    /// Object store bucket
    pub bucket: String,

    /// Key prefix inside the bucket
    pub prefix: String,

    /// The workflow plan
    pub plan: Plan,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        config.plan.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{End, Spec, Task, Timer};

    fn config() -> Config {
        Config {
            domain: "jobs".into(),
            bucket: "artifacts".into(),
            prefix: "runs".into(),
            plan: Plan {
                start: Task {
                    name: "root".into(),
                    version: "1.0".into(),
                    queue: "decide".into(),
                    timeout_secs: 60,
                },
                specs: vec![
                    Spec::Work(Task {
                        name: "build".into(),
                        version: "1.0".into(),
                        queue: "work".into(),
                        timeout_secs: 300,
                    }),
                    Spec::Sleep(Timer {
                        name: "cooldown".into(),
                        timeout_secs: 30,
                    }),
                ],
                end: End::Continue,
            },
        }
    }

    #[test]
    fn yaml_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windlass.yaml");
        fs::write(&path, serde_yaml::to_string(&config()).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config());
    }

    #[test]
    fn json_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windlass.json");
        fs::write(&path, serde_json::to_string(&config()).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config());
    }

    #[test]
    fn invalid_plan_is_rejected_at_load() {
        let mut bad = config();
        bad.plan.specs.push(bad.plan.specs[0].clone());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windlass.yaml");
        fs::write(&path, serde_yaml::to_string(&bad).unwrap()).unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Plan(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/windlass.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
