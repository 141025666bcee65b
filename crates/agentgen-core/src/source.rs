//! Source command discovery.
//!
//! Two namespace roots live under `commands_dir`: one subdirectory per
//! operational role (`pm/`, `dev/`, ...) and one per configured legacy
//! namespace (`flow/`). Each `*.md` file directly inside becomes a
//! [`SourceDocument`] unless its name starts with the partial prefix.

use crate::config::{Config, ConfigWarning, WarnLevel};
use crate::error::{AgentgenError, Result};
use crate::paths;
use crate::roles::{is_operational_role, RoleFilter, RoleMetadata};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Role,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Role or legacy namespace name.
    pub scope: String,
    pub command: String,
    pub kind: SourceKind,
    pub path: PathBuf,
    pub content: String,
}

impl SourceDocument {
    /// `{scope}-{command}`, also the generated filename stem.
    pub fn identity(&self) -> String {
        identity(&self.scope, &self.command)
    }

    /// Whether `filter` selects this document. Legacy documents belong to the
    /// role that claims their command in the role metadata.
    pub fn matches(&self, filter: &RoleFilter, meta: &RoleMetadata) -> bool {
        selected(filter, meta, self.kind, &self.scope, &self.command)
    }
}

/// A command template that was found but could not be read.
#[derive(Debug)]
pub struct SourceFailure {
    pub scope: String,
    pub command: String,
    pub kind: SourceKind,
    pub error: AgentgenError,
}

impl SourceFailure {
    pub fn identity(&self) -> String {
        identity(&self.scope, &self.command)
    }

    pub fn matches(&self, filter: &RoleFilter, meta: &RoleMetadata) -> bool {
        selected(filter, meta, self.kind, &self.scope, &self.command)
    }
}

fn selected(
    filter: &RoleFilter,
    meta: &RoleMetadata,
    kind: SourceKind,
    scope: &str,
    command: &str,
) -> bool {
    match filter {
        RoleFilter::All => true,
        RoleFilter::Role(role) => match kind {
            SourceKind::Role => scope == role.as_str(),
            SourceKind::Legacy => meta.command_role(command) == Some(role.as_str()),
        },
    }
}

pub fn identity(scope: &str, command: &str) -> String {
    format!("{scope}-{command}")
}

/// Lowercase ASCII letters, digits, `-` and `_`.
pub fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub documents: Vec<SourceDocument>,
    /// Templates that exist but could not be read. Each one fails only its
    /// own document.
    pub failures: Vec<SourceFailure>,
    /// Partial files seen and skipped.
    pub partials: Vec<PathBuf>,
}

impl Discovery {
    /// Identities of every discovered template, readable or not.
    pub fn identities(&self) -> BTreeSet<String> {
        self.documents
            .iter()
            .map(SourceDocument::identity)
            .chain(self.failures.iter().map(SourceFailure::identity))
            .collect()
    }

    /// Warn about template filenames that are not valid command names.
    pub fn check_command_names(&self) -> Vec<ConfigWarning> {
        let names = self
            .documents
            .iter()
            .map(|d| (&d.scope, &d.command))
            .chain(self.failures.iter().map(|f| (&f.scope, &f.command)));
        let mut warnings: Vec<ConfigWarning> = names
            .filter(|(_, command)| !is_valid_command_name(command))
            .map(|(scope, command)| ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "invalid command name '{scope}/{command}': use lowercase letters, digits, '-' or '_'"
                ),
            })
            .collect();
        warnings.sort_by(|a, b| a.message.cmp(&b.message));
        warnings
    }
}

/// Enumerate source documents under the configured commands directory.
///
/// Output is sorted by `(scope, command)` so runs are reproducible.
pub fn discover(root: &Path, config: &Config) -> Result<Discovery> {
    let commands_root = config.commands_root(root);
    let mut discovery = Discovery::default();
    if !commands_root.is_dir() {
        tracing::warn!(
            path = %commands_root.display(),
            "commands directory not found; nothing to compile"
        );
        return Ok(discovery);
    }

    for entry in std::fs::read_dir(&commands_root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let scope = entry.file_name().to_string_lossy().into_owned();
        let kind = if is_operational_role(&scope) {
            SourceKind::Role
        } else if config.is_legacy_namespace(&scope) {
            SourceKind::Legacy
        } else {
            tracing::debug!(dir = %scope, "skipping unrecognized command directory");
            continue;
        };
        collect_scope(&entry.path(), &scope, kind, config, &mut discovery)?;
    }

    discovery
        .documents
        .sort_by(|a, b| (&a.scope, &a.command).cmp(&(&b.scope, &b.command)));
    discovery
        .failures
        .sort_by(|a, b| (&a.scope, &a.command).cmp(&(&b.scope, &b.command)));
    discovery.partials.sort();
    Ok(discovery)
}

fn collect_scope(
    dir: &Path,
    scope: &str,
    kind: SourceKind,
    config: &Config,
    discovery: &mut Discovery,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(paths::SOURCE_EXTENSION) {
            continue;
        }
        // `is_file` follows symlinks.
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }
        let Some(command) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if !config.partial_prefix.is_empty() && command.starts_with(&config.partial_prefix) {
            tracing::debug!(path = %path.display(), "skipping partial");
            discovery.partials.push(path);
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "unreadable command template");
                discovery.failures.push(SourceFailure {
                    scope: scope.to_string(),
                    command,
                    kind,
                    error: AgentgenError::SourceRead { path, source },
                });
                continue;
            }
        };
        tracing::debug!(scope, command = %command, "discovered command");
        discovery.documents.push(SourceDocument {
            scope: scope.to_string(),
            command,
            kind,
            path,
            content,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
