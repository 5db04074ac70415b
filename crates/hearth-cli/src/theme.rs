//! CLI output styling.

use colored::Colorize;

/// Terminal output theme.
pub(crate) struct Theme;

impl Theme {
    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a tool name as it runs.
    pub(crate) fn tool(name: &str) -> String {
        format!("{}", name.cyan())
    }

    /// Format a conversation id (shortened).
    pub(crate) fn conversation_id(id: &str) -> String {
        let short = if id.len() > 8 { &id[..8] } else { id };
        format!("{}", short.cyan())
    }
}

/// Print the startup banner.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("hearth v{version}").bold().cyan());
    println!("{}", "Terminal AI coding assistant".dimmed());
    println!();
}
