use crate::cmd::sync::print_warnings;
use crate::output::{print_json, print_table};
use agentgen_core::config::Config;
use agentgen_core::roles::RoleMetadata;
use agentgen_core::source;
use anyhow::Context;
use std::path::Path;

/// `agentgen roles`: show which role owns which commands and agents, and
/// check the role configuration against the templates on disk.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load agentgen.yaml")?;
    let path = config.role_config_path(root);
    let meta = RoleMetadata::load(&path).context("failed to load role configuration")?;
    let discovery =
        source::discover(root, &config).context("failed to discover command templates")?;

    let mut warnings = meta.check_schema(root, &config);
    warnings.extend(discovery.check_command_names());
    let roles: Vec<_> = meta.roles().collect();

    if json {
        print_json(&serde_json::json!({
            "primary": meta.primary(),
            "show_all_commands": meta.show_all_commands(),
            "roles": roles,
            "warnings": warnings,
        }))?;
        return Ok(());
    }

    if roles.is_empty() {
        println!("No role metadata ({} not found or empty).", path.display());
    } else {
        let rows: Vec<Vec<String>> = roles
            .iter()
            .map(|r| {
                let marker = if meta.primary() == Some(r.role.as_str()) {
                    "*"
                } else {
                    ""
                };
                vec![
                    format!("{}{marker}", r.role),
                    r.commands.join(", "),
                    r.agents.join(", "),
                ]
            })
            .collect();
        print_table(0, &["ROLE", "COMMANDS", "AGENTS"], &rows);
    }

    print_warnings(&warnings);
    Ok(())
}
