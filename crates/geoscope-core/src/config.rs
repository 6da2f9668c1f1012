use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project-level configuration loaded from `geoscope.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: String,
    pub brand: String,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default = "default_engines")]
    pub engines: Vec<String>,
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default, skip_serializing_if = "is_default_simulation")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSettings {
    /// Base URL of the remote simulation backend; None selects the offline
    /// deterministic simulator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Deep competitor analysis gets its own, much larger budget.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_seconds: u64,
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: default_timeout(),
            analysis_timeout_seconds: default_analysis_timeout(),
            parallel: default_parallel(),
        }
    }
}

fn is_default_simulation(s: &SimulationSettings) -> bool {
    s == &SimulationSettings::default()
}

fn default_engines() -> Vec<String> {
    vec!["chatgpt".into(), "claude".into()]
}

fn default_channels() -> Vec<String> {
    vec!["chat".into()]
}

fn default_timeout() -> u64 {
    60
}

fn default_analysis_timeout() -> u64 {
    120
}

fn default_parallel() -> usize {
    4
}

pub fn load_config(path: &Path, strict: bool) -> Result<ProjectConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    // serde_ignored wrapper to capture unknown fields
    let cfg: ProjectConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        let meaningful_unknowns: Vec<_> = ignored_keys
            .iter()
            .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
            .collect();

        if !meaningful_unknowns.is_empty() {
            if strict {
                return Err(ConfigError(format!(
                    "Unknown fields detected in strict mode: {:?} (file: {})",
                    meaningful_unknowns,
                    path.display()
                )));
            }
            eprintln!("WARN: Ignored unknown config fields: {:?}", ignored_keys);
        }
    }

    if cfg.project.trim().is_empty() {
        return Err(ConfigError("config has an empty project id".into()));
    }
    if cfg.brand.trim().is_empty() {
        return Err(ConfigError("config has an empty brand name".into()));
    }
    if cfg.engines.is_empty() {
        return Err(ConfigError("config lists no engines".into()));
    }

    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"project: demo
brand: "Acme"
competitors: ["Globex", "Initech"]
engines: [chatgpt, claude, deepseek]
channels: [chat, search]
simulation:
  # endpoint: "https://simulator.internal.example"
  timeout_seconds: 60
  analysis_timeout_seconds: 120
  parallel: 4
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
