mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agentgen",
    about = "Compile command templates into role-scoped agent documents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from agentgen.yaml or .git/)
    #[arg(long, global = true, env = "AGENTGEN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log each artifact and show header previews in dry-run mode
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate agent documents from command templates
    Sync {
        /// Show what would be written without touching the filesystem
        #[arg(long, conflicts_with = "validate")]
        dry_run: bool,

        /// Compare generated output with what is on disk; exit 2 on drift
        #[arg(long)]
        validate: bool,

        /// Remove stale agents whose source command no longer exists
        #[arg(long)]
        force: bool,

        /// Only process commands owned by this role (pm, arch, dev, sec, qa, ops, all)
        #[arg(long, default_value = "all")]
        role: String,
    },

    /// Show role ownership loaded from the role configuration
    Roles,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Sync {
            dry_run,
            validate,
            force,
            role,
        } => cmd::sync::run(
            &root,
            cmd::sync::SyncArgs {
                dry_run,
                validate,
                force,
                role,
            },
            cli.json,
            cli.verbose,
        ),
        Commands::Roles => cmd::roles::run(&root, cli.json).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
