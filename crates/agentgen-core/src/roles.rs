//! Role metadata: which role owns which commands and agents.
//!
//! Loaded once per run from the role configuration file and passed by
//! reference to everything that needs it. A missing file is not an error;
//! it yields empty metadata and every document is treated as unscoped.

use crate::config::{Config, ConfigWarning, WarnLevel};
use crate::error::{AgentgenError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Roles that receive the operational tool set and role visibility fields.
pub const OPERATIONAL_ROLES: &[&str] = &["pm", "arch", "dev", "sec", "qa", "ops"];

/// Visibility scope shared by every role.
pub const ALL_ROLES: &str = "all";

/// Leading sigil on agent names in the role configuration (`@pm-planner`).
const AGENT_SIGIL: char = '@';

pub fn is_operational_role(name: &str) -> bool {
    OPERATIONAL_ROLES.contains(&name)
}

// ---------------------------------------------------------------------------
// RoleFilter
// ---------------------------------------------------------------------------

/// `--role` selection: one operational role, or everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleFilter {
    All,
    Role(String),
}

impl RoleFilter {
    pub fn parse(s: &str) -> Result<Self> {
        if s == ALL_ROLES {
            Ok(RoleFilter::All)
        } else if is_operational_role(s) {
            Ok(RoleFilter::Role(s.to_string()))
        } else {
            Err(AgentgenError::UnknownRole(s.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration file shape
// ---------------------------------------------------------------------------

/// ```yaml
/// roles:
///   primary: dev
///   show_all_commands: false
///   definitions:
///     dev:
///       display_name: Developer
///       commands: [build, debug]
///       agents: ["@software-engineer"]
/// ```
///
/// Keys outside `roles` are ignored, as are per-role display fields.
#[derive(Debug, Default, Deserialize)]
struct RoleConfigFile {
    #[serde(default)]
    roles: RolesSection,
}

#[derive(Debug, Default, Deserialize)]
struct RolesSection {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    show_all_commands: bool,
    #[serde(default)]
    definitions: BTreeMap<String, RoleEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct RoleEntry {
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    agents: Vec<String>,
}

// ---------------------------------------------------------------------------
// RoleMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDefinition {
    pub role: String,
    pub commands: Vec<String>,
    /// Agent names with the sigil stripped, in configuration order.
    pub agents: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleMetadata {
    roles: BTreeMap<String, RoleDefinition>,
    command_roles: HashMap<String, String>,
    agent_roles: HashMap<String, String>,
    primary: Option<String>,
    show_all_commands: bool,
    /// `(role, agent)` pairs written without the `@` sigil.
    unsigiled_agents: Vec<(String, String)>,
}

impl RoleMetadata {
    /// Metadata with no roles; all lookups miss.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from the role configuration file.
    ///
    /// A missing file degrades to [`RoleMetadata::empty`] with a warning; a
    /// file that exists but does not parse is [`AgentgenError::ConfigParse`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "role configuration not found; continuing without role metadata"
            );
            return Ok(Self::empty());
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data).map_err(|message| AgentgenError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_yaml(data: &str) -> std::result::Result<Self, String> {
        if data.trim().is_empty() {
            return Ok(Self::empty());
        }
        let file: RoleConfigFile = serde_yaml::from_str(data).map_err(|e| e.to_string())?;
        let section = file.roles;
        let mut meta = Self::from_definitions(section.definitions.into_iter().map(
            |(role, entry)| RoleDefinition {
                role,
                commands: entry.commands,
                agents: entry.agents,
            },
        ));
        meta.primary = section.primary;
        meta.show_all_commands = section.show_all_commands;
        Ok(meta)
    }

    /// Build from explicit definitions. Agent sigils are stripped here. When a
    /// command or agent is claimed by several roles the first one wins. The
    /// shared `all` scope is listed but never owns commands or agents.
    pub fn from_definitions(defs: impl IntoIterator<Item = RoleDefinition>) -> Self {
        let mut meta = Self::empty();
        for mut def in defs {
            let mut agents = Vec::with_capacity(def.agents.len());
            for raw in &def.agents {
                let raw = raw.trim();
                if !raw.is_empty() && !raw.starts_with(AGENT_SIGIL) {
                    meta.unsigiled_agents.push((def.role.clone(), raw.to_string()));
                }
                let name = raw.trim_start_matches(AGENT_SIGIL);
                if !name.is_empty() {
                    agents.push(name.to_string());
                }
            }
            def.agents = agents;

            if def.role != ALL_ROLES {
                for cmd in &def.commands {
                    claim(&mut meta.command_roles, cmd, &def.role, "command");
                }
                for agent in &def.agents {
                    claim(&mut meta.agent_roles, agent, &def.role, "agent");
                }
            }
            meta.roles.insert(def.role.clone(), def);
        }
        meta
    }

    /// Role selected by default in the configuration, if any.
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn show_all_commands(&self) -> bool {
        self.show_all_commands
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn command_role(&self, command: &str) -> Option<&str> {
        self.command_roles.get(command).map(String::as_str)
    }

    pub fn agent_role(&self, agent: &str) -> Option<&str> {
        self.agent_roles
            .get(agent.trim_start_matches(AGENT_SIGIL))
            .map(String::as_str)
    }

    /// Ordered agent list for `role`, empty when unknown.
    pub fn agents_for_role(&self, role: &str) -> &[String] {
        self.roles
            .get(role)
            .map(|d| d.agents.as_slice())
            .unwrap_or(&[])
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    // -----------------------------------------------------------------------
    // Schema checks
    // -----------------------------------------------------------------------

    /// Cross-check the role configuration against the templates on disk.
    ///
    /// A declared command is satisfied by a template in the role's own
    /// directory or in any legacy namespace.
    pub fn check_schema(&self, root: &Path, config: &Config) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };

        if let Some(primary) = &self.primary {
            if primary != ALL_ROLES && !is_operational_role(primary) {
                warn(format!(
                    "primary role '{primary}' is not one of {}, {ALL_ROLES}",
                    OPERATIONAL_ROLES.join(", ")
                ));
            }
        }

        for role in self.roles.keys() {
            if role != ALL_ROLES && !is_operational_role(role) {
                warn(format!(
                    "role '{role}' is not an operational role; its commands are never compiled under it"
                ));
            }
        }

        for (role, agent) in &self.unsigiled_agents {
            warn(format!("role '{role}' agent '{agent}' must start with @"));
        }

        let commands_root = config.commands_root(root);
        for def in self.roles.values().filter(|d| d.role != ALL_ROLES) {
            for command in &def.commands {
                let file = format!("{command}.{}", paths::SOURCE_EXTENSION);
                let found = commands_root.join(&def.role).join(&file).is_file()
                    || config
                        .legacy_namespaces
                        .iter()
                        .any(|ns| commands_root.join(ns).join(&file).is_file());
                if !found {
                    warn(format!(
                        "role '{}' declares command '{command}' but {} does not exist",
                        def.role,
                        config.commands_dir.join(&def.role).join(&file).display()
                    ));
                }
            }
        }

        warnings
    }
}

fn claim(map: &mut HashMap<String, String>, name: &str, role: &str, what: &str) {
    match map.get(name) {
        Some(owner) if owner != role => {
            tracing::warn!(
                name,
                owner = %owner,
                ignored = role,
                "{what} claimed by more than one role; keeping first"
            );
        }
        Some(_) => {}
        None => {
            map.insert(name.to_string(), role.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WORKFLOW: &str = r#"
version: "2.0"
roles:
  primary: dev
  show_all_commands: false
  definitions:
    all:
      display_name: All Roles
      icon: "*"
      commands: []
      agents: ["@software-engineer"]
    pm:
      display_name: Product Manager
      icon: "P"
      commands: [assess, define, discover]
      agents: ["@product-requirements-manager", "pm-assess"]
    dev:
      display_name: Developer
      icon: "D"
      commands: [build, debug]
      agents: ["@software-engineer"]
workflows:
  specify:
    command: /flow:specify
"#;

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    #[test]
    fn lookups_by_command_and_agent() {
        let meta = RoleMetadata::from_yaml(WORKFLOW).unwrap();
        assert_eq!(meta.command_role("assess"), Some("pm"));
        assert_eq!(meta.command_role("build"), Some("dev"));
        assert_eq!(meta.command_role("unknown"), None);
        assert_eq!(meta.agent_role("product-requirements-manager"), Some("pm"));
        assert_eq!(meta.agent_role("@software-engineer"), Some("dev"));
    }

    #[test]
    fn reads_definitions_next_to_scalar_keys() {
        let meta = RoleMetadata::from_yaml(WORKFLOW).unwrap();
        assert_eq!(meta.primary(), Some("dev"));
        assert!(!meta.show_all_commands());
        let roles: Vec<&str> = meta.roles().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["all", "dev", "pm"]);
        assert_eq!(meta.command_role("definitions"), None);
    }

    #[test]
    fn all_scope_owns_nothing() {
        let meta = RoleMetadata::from_yaml(WORKFLOW).unwrap();
        assert_eq!(meta.agent_role("software-engineer"), Some("dev"));
        assert_eq!(meta.agents_for_role("all"), ["software-engineer"]);
    }

    #[test]
    fn flat_role_map_is_not_read_as_definitions() {
        let meta = RoleMetadata::from_yaml("roles:\n  primary: pm\n").unwrap();
        assert!(meta.is_empty());
        assert_eq!(meta.primary(), Some("pm"));
    }

    #[test]
    fn agent_order_is_preserved_and_sigils_stripped() {
        let meta = RoleMetadata::from_yaml(WORKFLOW).unwrap();
        assert_eq!(
            meta.agents_for_role("pm"),
            ["product-requirements-manager", "pm-assess"]
        );
        assert!(meta.agents_for_role("ops").is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let meta = RoleMetadata::load(&dir.path().join("flowspec_workflow.yml")).unwrap();
        assert!(meta.is_empty());
        assert_eq!(meta.command_role("assess"), None);
    }

    #[test]
    fn malformed_file_is_config_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flowspec_workflow.yml");
        std::fs::write(&path, "roles:\n  definitions: [unclosed\n").unwrap();
        let err = RoleMetadata::load(&path).unwrap_err();
        assert!(matches!(err, AgentgenError::ConfigParse { .. }));
    }

    #[test]
    fn first_owner_wins_on_duplicates() {
        let meta = RoleMetadata::from_definitions([
            RoleDefinition {
                role: "arch".into(),
                commands: vec!["review".into()],
                agents: vec![],
            },
            RoleDefinition {
                role: "qa".into(),
                commands: vec!["review".into()],
                agents: vec![],
            },
        ]);
        assert_eq!(meta.command_role("review"), Some("arch"));
    }

    #[test]
    fn role_filter_parse() {
        assert_eq!(RoleFilter::parse("all").unwrap(), RoleFilter::All);
        assert_eq!(
            RoleFilter::parse("ops").unwrap(),
            RoleFilter::Role("ops".into())
        );
        assert!(RoleFilter::parse("marketing").is_err());
    }

    #[test]
    fn schema_check_reports_missing_templates_and_sigils() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "templates/commands/pm/assess.md", "a");
        write(root, "templates/commands/flow/discover.md", "d");
        write(root, "templates/commands/dev/build.md", "b");
        let meta = RoleMetadata::from_yaml(WORKFLOW).unwrap();
        let warnings = meta.check_schema(root, &Config::default());
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();

        assert!(warnings.iter().all(|w| w.level == WarnLevel::Warning));
        assert!(messages.iter().any(|m| m.contains("'pm-assess' must start with @")));
        assert!(messages.iter().any(|m| m.contains("command 'define'")));
        assert!(messages.iter().any(|m| m.contains("command 'debug'")));
        assert!(!messages.iter().any(|m| m.contains("command 'assess'")));
        // satisfied by the legacy namespace
        assert!(!messages.iter().any(|m| m.contains("command 'discover'")));
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn schema_check_flags_unknown_roles() {
        let dir = TempDir::new().unwrap();
        let meta = RoleMetadata::from_yaml(
            "roles:\n  primary: marketing\n  definitions:\n    growth:\n      agents: [\"@seo\"]\n",
        )
        .unwrap();
        let messages: Vec<String> = meta
            .check_schema(dir.path(), &Config::default())
            .into_iter()
            .map(|w| w.message)
            .collect();
        assert!(messages.iter().any(|m| m.contains("primary role 'marketing'")));
        assert!(messages.iter().any(|m| m.contains("role 'growth'")));
    }
}
