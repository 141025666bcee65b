use crate::error::{AgentgenError, Result};
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "agentgen.yaml";
pub const DEFAULT_COMMANDS_DIR: &str = "templates/commands";
pub const DEFAULT_OUTPUT_DIR: &str = ".github/agents";
pub const DEFAULT_ROLE_CONFIG: &str = "flowspec_workflow.yml";

pub const AGENT_SUFFIX: &str = ".agent.md";
pub const SOURCE_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `{output_dir}/{identity}.agent.md`
pub fn agent_path(output_dir: &Path, identity: &str) -> PathBuf {
    output_dir.join(format!("{identity}{AGENT_SUFFIX}"))
}

/// Inverse of [`agent_path`] on the filename only. `None` for foreign files.
pub fn identity_from_filename(filename: &str) -> Option<&str> {
    filename
        .strip_suffix(AGENT_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

// ---------------------------------------------------------------------------
// Include path guard
// ---------------------------------------------------------------------------

/// Resolve `requested` against `base`, refusing anything that could leave it.
///
/// Absolute paths and any `..` segment are rejected before the filesystem is
/// touched. The existing target is then canonicalized and checked
/// component-wise against the canonical base, so `/proj-secret` never passes
/// for `/proj` and symlinks pointing outside are caught.
pub fn resolve_include(base: &Path, requested: &str) -> Result<PathBuf> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(AgentgenError::PathEscape(requested.to_string()));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || Path::new(trimmed).is_absolute()
    {
        return Err(AgentgenError::PathEscape(trimmed.to_string()));
    }
    if trimmed.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(AgentgenError::PathEscape(trimmed.to_string()));
    }
    if Path::new(trimmed)
        .components()
        .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(AgentgenError::PathEscape(trimmed.to_string()));
    }

    let joined = base.join(trimmed);
    if !joined.is_file() {
        return Err(AgentgenError::IncludeNotFound(joined));
    }

    let canonical_base = base.canonicalize()?;
    let canonical = joined.canonicalize()?;
    if !canonical.starts_with(&canonical_base) {
        return Err(AgentgenError::PathEscape(trimmed.to_string()));
    }
    Ok(canonical)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
