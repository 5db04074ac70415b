//! Interactive permission prompt: asks the user on the terminal whenever
//! base-mode resolution falls through to `ask` and no allow/deny rule
//! covers the tool.
//!
//! Grounded on `astrid-cli::commands::chat`'s use of `dialoguer::Confirm`
//! for approval prompts, simplified from the teacher's full approval box
//! (risk level, diff preview) to a yes/no since `hearth-tools` has no
//! risk-classification model.

use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use serde_json::Value;

use hearth_runtime::PermissionPrompt;
use hearth_tools::PermissionDecision;

use crate::theme::Theme;

/// Prompts on stdin/stdout via `dialoguer`, run on a blocking thread since
/// the terminal read is synchronous.
pub(crate) struct TerminalPrompt;

#[async_trait]
impl PermissionPrompt for TerminalPrompt {
    async fn ask(&self, tool_name: &str, input: &Value) -> Option<PermissionDecision> {
        let tool_name = tool_name.to_string();
        let input = input.clone();
        tokio::task::spawn_blocking(move || {
            println!();
            println!("{}", Theme::warning(&format!("{tool_name} wants to run:")));
            println!("{}", Theme::dimmed(&serde_json::to_string_pretty(&input).unwrap_or_default()));
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Allow?")
                .default(false)
                .interact()
                .ok()
        })
        .await
        .unwrap_or(None)
        .map(|allowed| if allowed { PermissionDecision::Allow } else { PermissionDecision::Deny })
    }
}
