use crate::output::{print_json, print_table};
use agentgen_core::config::{Config, ConfigWarning, WarnLevel};
use agentgen_core::roles::{RoleFilter, RoleMetadata};
use agentgen_core::source;
use agentgen_core::sync::{self, Action, DriftKind, Mode, SyncOptions, SyncReport};
use anyhow::Context;
use std::path::Path;

pub struct SyncArgs {
    pub dry_run: bool,
    pub validate: bool,
    pub force: bool,
    pub role: String,
}

impl SyncArgs {
    fn mode(&self) -> Mode {
        if self.validate {
            Mode::Validate
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Sync
        }
    }
}

/// `agentgen sync`. Returns the process exit code.
pub fn run(root: &Path, args: SyncArgs, json: bool, verbose: bool) -> anyhow::Result<i32> {
    let role = RoleFilter::parse(&args.role)?;
    let options = SyncOptions {
        mode: args.mode(),
        force: args.force,
        role,
    };

    let config = Config::load(root).context("failed to load agentgen.yaml")?;
    let warnings = config.validate();
    print_warnings(&warnings);
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("agentgen.yaml has configuration errors");
    }

    let meta = RoleMetadata::load(&config.role_config_path(root))
        .context("failed to load role configuration")?;
    let discovery =
        source::discover(root, &config).context("failed to discover command templates")?;
    print_warnings(&meta.check_schema(root, &config));
    print_warnings(&discovery.check_command_names());

    let report = sync::run_with(root, &config, &meta, &discovery, &options);

    if json {
        print_json(&report)?;
    } else {
        print_report(root, &report, verbose);
    }
    Ok(report.exit_code())
}

/// Configuration findings go to stderr so `--json` output stays parseable.
pub fn print_warnings(warnings: &[ConfigWarning]) {
    for w in warnings {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        eprintln!("[{prefix}] {}", w.message);
    }
}

fn print_report(root: &Path, report: &SyncReport, verbose: bool) {
    for outcome in &report.outcomes {
        let shown = match outcome.action {
            Action::Written => Some("wrote"),
            Action::WouldWrite => Some("would write"),
            Action::Drifted(_) => Some("drift"),
            Action::Unchanged if verbose => Some("unchanged"),
            Action::UpToDate if verbose => Some("up to date"),
            Action::Unchanged | Action::UpToDate => None,
        };
        if let Some(label) = shown {
            let display = outcome.path.strip_prefix(root).unwrap_or(&outcome.path);
            println!("  {label:<12} {}", display.display());
        }
        if verbose {
            if let Some(preview) = &outcome.preview {
                for line in preview.lines() {
                    println!("               {line}");
                }
            }
        }
    }

    if !report.errors.is_empty() {
        println!("\nErrors:");
        let rows: Vec<Vec<String>> = report
            .errors
            .iter()
            .map(|e| vec![e.identity.clone(), e.kind.clone(), e.message.clone()])
            .collect();
        print_table(2, &["AGENT", "KIND", "MESSAGE"], &rows);
    }

    if !report.drifted.is_empty() {
        println!("\nDrift:");
        let rows: Vec<Vec<String>> = report
            .drifted
            .iter()
            .map(|d| {
                let kind = match d.kind {
                    DriftKind::Missing => "missing",
                    DriftKind::Modified => "modified",
                };
                vec![d.identity.clone(), kind.to_string()]
            })
            .collect();
        print_table(2, &["AGENT", "DRIFT"], &rows);
    }

    if !report.stale.is_empty() {
        println!("\nStale:");
        let rows: Vec<Vec<String>> = report
            .stale
            .iter()
            .map(|s| {
                let status = if s.removed {
                    "removed"
                } else {
                    "left in place (use --force to remove)"
                };
                vec![s.identity.clone(), status.to_string()]
            })
            .collect();
        print_table(2, &["AGENT", "STATUS"], &rows);
    }

    if !report.missing_descriptions.is_empty() {
        println!("\nWarnings:");
        for id in &report.missing_descriptions {
            println!("  {id:<28} missing description, default used");
        }
    }

    println!(
        "\n{}: scanned {}, processed {}, errors {}{}",
        report.mode,
        report.scanned,
        report.processed,
        report.errors.len(),
        if report.mode == Mode::Validate {
            format!(", drifted {}", report.drifted.len())
        } else {
            String::new()
        }
    );

    if report.mode == Mode::Validate && report.exit_code() != 0 {
        println!("Generated agents are out of date; run `agentgen sync` to regenerate.");
    }
}
