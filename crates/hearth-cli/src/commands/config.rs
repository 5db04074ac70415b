//! `hearth config` - show the resolved, merged configuration.

use std::path::PathBuf;

use colored::Colorize;

use hearth_config::ConfigResolver;

/// Print the merged configuration as pretty JSON.
pub(crate) fn show(workspace_root: PathBuf) -> anyhow::Result<()> {
    let resolver = ConfigResolver::new(workspace_root);
    let merged = resolver.get_merged()?;
    println!("{}", "Resolved configuration:".bold());
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}
