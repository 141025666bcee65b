use crate::error::{AgentgenError, Result};
use crate::paths;
use crate::roles::OPERATIONAL_ROLES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Project layout, read from `agentgen.yaml` at the project root.
///
/// Every field has a default so the file itself is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_commands_dir")]
    pub commands_dir: PathBuf,
    #[serde(default = "default_legacy_namespaces")]
    pub legacy_namespaces: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_role_config")]
    pub role_config: PathBuf,
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
    #[serde(default = "default_partial_prefix")]
    pub partial_prefix: String,
}

fn default_commands_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_COMMANDS_DIR)
}

fn default_legacy_namespaces() -> Vec<String> {
    vec!["flow".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_OUTPUT_DIR)
}

fn default_role_config() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ROLE_CONFIG)
}

fn default_max_include_depth() -> usize {
    10
}

fn default_partial_prefix() -> String {
    "_".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commands_dir: default_commands_dir(),
            legacy_namespaces: default_legacy_namespaces(),
            output_dir: default_output_dir(),
            role_config: default_role_config(),
            max_include_depth: default_max_include_depth(),
            partial_prefix: default_partial_prefix(),
        }
    }
}

impl Config {
    /// Load `agentgen.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|e| AgentgenError::InvalidConfig {
            path,
            message: e.to_string(),
        })
    }

    pub fn commands_root(&self, root: &Path) -> PathBuf {
        root.join(&self.commands_dir)
    }

    pub fn output_root(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }

    pub fn role_config_path(&self, root: &Path) -> PathBuf {
        root.join(&self.role_config)
    }

    pub fn is_legacy_namespace(&self, name: &str) -> bool {
        self.legacy_namespaces.iter().any(|n| n == name)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for ns in &self.legacy_namespaces {
            if OPERATIONAL_ROLES.contains(&ns.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "legacy namespace '{ns}' collides with an operational role name"
                    ),
                });
            }
            if ns.is_empty() || ns.contains('-') || ns.contains('/') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "legacy namespace '{ns}' must be a non-empty name without '-' or '/'"
                    ),
                });
            }
        }

        if self.max_include_depth == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_include_depth is 0: nested includes will always fail".to_string(),
            });
        }

        if self.partial_prefix.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "partial_prefix is empty: partial files will be compiled as commands"
                    .to_string(),
            });
        }

        if self.output_dir.starts_with(&self.commands_dir) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "output_dir '{}' lies inside commands_dir '{}'",
                    self.output_dir.display(),
                    self.commands_dir.display()
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
