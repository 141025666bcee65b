//! Compile every discovered command and act on the result.
//!
//! One [`Mode`] is chosen per run. Per-document failures are recorded in the
//! [`SyncReport`] and never stop the loop. Configuration and discovery
//! failures happen before [`run_with`] is reached.

use crate::config::Config;
use crate::error::{AgentgenError, Result};
use crate::frontmatter::{AgentDocument, Transformer};
use crate::handoff::HandoffTable;
use crate::include::{self, IncludeResolver};
use crate::io;
use crate::paths;
use crate::roles::{is_operational_role, RoleFilter, RoleMetadata};
use crate::source::{Discovery, SourceDocument};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Sync,
    DryRun,
    Validate,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sync => "sync",
            Mode::DryRun => "dry_run",
            Mode::Validate => "validate",
        }
    }

    fn sweeps_stale(&self) -> bool {
        !matches!(self, Mode::DryRun)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: Mode,
    /// Delete stale artifacts instead of only reporting them.
    pub force: bool,
    pub role: RoleFilter,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Sync,
            force: false,
            role: RoleFilter::All,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    Missing,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Written,
    Unchanged,
    WouldWrite,
    UpToDate,
    Drifted(DriftKind),
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub identity: String,
    pub path: PathBuf,
    pub action: Action,
    /// Generated header, kept only in dry-run mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentError {
    pub identity: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Drift {
    pub identity: String,
    pub kind: DriftKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleArtifact {
    pub identity: String,
    pub path: PathBuf,
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: Mode,
    pub scanned: usize,
    pub processed: usize,
    pub partials_skipped: usize,
    pub outcomes: Vec<ArtifactOutcome>,
    pub errors: Vec<DocumentError>,
    pub drifted: Vec<Drift>,
    /// Identities whose description was defaulted.
    pub missing_descriptions: Vec<String>,
    pub stale: Vec<StaleArtifact>,
}

impl SyncReport {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            scanned: 0,
            processed: 0,
            partials_skipped: 0,
            outcomes: Vec::new(),
            errors: Vec::new(),
            drifted: Vec::new(),
            missing_descriptions: Vec::new(),
            stale: Vec::new(),
        }
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    /// `0` clean, `1` per-document errors, `2` validate found drift or errors.
    pub fn exit_code(&self) -> i32 {
        match self.mode {
            Mode::Validate if !self.errors.is_empty() || !self.drifted.is_empty() => 2,
            Mode::Validate => 0,
            _ if !self.errors.is_empty() => 1,
            _ => 0,
        }
    }

    fn record_error(&mut self, identity: String, err: &AgentgenError) {
        tracing::error!(agent = %identity, kind = err.kind(), "{err}");
        self.errors.push(DocumentError {
            identity,
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Everything needed to turn one [`SourceDocument`] into an [`AgentDocument`].
pub struct Compiler<'a> {
    root: &'a Path,
    config: &'a Config,
    meta: &'a RoleMetadata,
    handoffs: &'a HandoffTable,
}

impl<'a> Compiler<'a> {
    pub fn new(
        root: &'a Path,
        config: &'a Config,
        meta: &'a RoleMetadata,
        handoffs: &'a HandoffTable,
    ) -> Self {
        Self {
            root,
            config,
            meta,
            handoffs,
        }
    }

    pub fn compile(&self, doc: &SourceDocument) -> Result<AgentDocument> {
        let resolved = IncludeResolver::new(self.root)
            .with_max_depth(self.config.max_include_depth)
            .resolve(&doc.content)?;
        debug_assert!(!include::has_unresolved_includes(&resolved));
        Transformer::new(self.meta, self.handoffs).transform(&resolved, &doc.scope, &doc.command)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Compile an already discovered set with explicit metadata.
pub fn run_with(
    root: &Path,
    config: &Config,
    meta: &RoleMetadata,
    discovery: &Discovery,
    options: &SyncOptions,
) -> SyncReport {
    let handoffs = HandoffTable::builtin();
    let compiler = Compiler::new(root, config, meta, &handoffs);
    let output_root = config.output_root(root);
    let mut report = SyncReport::new(options.mode);
    report.partials_skipped = discovery.partials.len();

    for failure in discovery
        .failures
        .iter()
        .filter(|f| f.matches(&options.role, meta))
    {
        report.scanned += 1;
        report.record_error(failure.identity(), &failure.error);
    }

    for doc in discovery
        .documents
        .iter()
        .filter(|d| d.matches(&options.role, meta))
    {
        report.scanned += 1;
        let identity = doc.identity();

        let agent = match compiler.compile(doc) {
            Ok(agent) => agent,
            Err(e) => {
                report.record_error(identity, &e);
                continue;
            }
        };
        if agent.description_defaulted {
            report.missing_descriptions.push(identity.clone());
        }

        let path = paths::agent_path(&output_root, &identity);
        match apply(options.mode, &agent, &path) {
            Ok(action) => {
                if let Action::Drifted(kind) = action {
                    tracing::warn!(agent = %identity, ?kind, "drift detected");
                    report.drifted.push(Drift {
                        identity: identity.clone(),
                        kind,
                    });
                }
                report.processed += 1;
                report.outcomes.push(ArtifactOutcome {
                    identity,
                    path,
                    action,
                    preview: (options.mode == Mode::DryRun).then(|| agent.header.clone()),
                });
            }
            Err(e) => report.record_error(identity, &e),
        }
    }

    if options.mode.sweeps_stale() {
        sweep_stale(
            &output_root,
            config,
            meta,
            &discovery.identities(),
            options,
            &mut report,
        );
    }

    report
}

fn apply(mode: Mode, agent: &AgentDocument, path: &Path) -> Result<Action> {
    let content = io::normalize_line_endings(&agent.render());
    match mode {
        Mode::DryRun => {
            tracing::info!(agent = %agent.identity, path = %path.display(), "would write");
            Ok(Action::WouldWrite)
        }
        Mode::Sync => {
            if io::read_normalized(path)?.as_deref() == Some(content.as_str()) {
                tracing::debug!(agent = %agent.identity, "unchanged");
                return Ok(Action::Unchanged);
            }
            io::atomic_write(path, content.as_bytes())?;
            tracing::info!(agent = %agent.identity, path = %path.display(), "wrote agent");
            Ok(Action::Written)
        }
        Mode::Validate => Ok(match io::read_normalized(path)? {
            Some(existing) if existing == content => Action::UpToDate,
            Some(_) => Action::Drifted(DriftKind::Modified),
            None => Action::Drifted(DriftKind::Missing),
        }),
    }
}

// ---------------------------------------------------------------------------
// Stale artifacts
// ---------------------------------------------------------------------------

/// Split a generated identity into `(scope, command)` at the first `-`.
pub fn split_identity(identity: &str) -> Option<(&str, &str)> {
    identity
        .split_once('-')
        .filter(|(scope, command)| !scope.is_empty() && !command.is_empty())
}

fn sweep_stale(
    output_root: &Path,
    config: &Config,
    meta: &RoleMetadata,
    discovered: &BTreeSet<String>,
    options: &SyncOptions,
    report: &mut SyncReport,
) {
    let candidates = match stale_candidates(output_root, config, meta, &options.role) {
        Ok(c) => c,
        Err(e) => {
            report.record_error(output_root.display().to_string(), &e);
            return;
        }
    };

    for (identity, path) in candidates {
        if discovered.contains(&identity) {
            continue;
        }
        let removed = if options.force {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(agent = %identity, path = %path.display(), "removed stale agent");
                    true
                }
                Err(e) => {
                    report.record_error(identity, &AgentgenError::from(e));
                    continue;
                }
            }
        } else {
            tracing::warn!(
                agent = %identity,
                path = %path.display(),
                "stale agent has no source; rerun with --force to remove"
            );
            false
        };
        report.stale.push(StaleArtifact {
            identity,
            path,
            removed,
        });
    }
}

/// Generated artifacts under `output_root` that belong to a known scope and
/// fall within `filter`, sorted by identity.
fn stale_candidates(
    output_root: &Path,
    config: &Config,
    meta: &RoleMetadata,
    filter: &RoleFilter,
) -> Result<Vec<(String, PathBuf)>> {
    if !output_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(output_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(identity) = paths::identity_from_filename(&name) else {
            continue;
        };
        let Some((scope, command)) = split_identity(identity) else {
            continue;
        };
        let operational = is_operational_role(scope);
        if !operational && !config.is_legacy_namespace(scope) {
            continue;
        }
        let in_filter = match filter {
            RoleFilter::All => true,
            RoleFilter::Role(role) if operational => scope == role.as_str(),
            RoleFilter::Role(role) => meta.command_role(command) == Some(role.as_str()),
        };
        if in_filter {
            out.push((identity.to_string(), entry.path()));
        }
    }
    out.sort();
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
