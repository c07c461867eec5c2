//! Non-interactive UI for CI/headless environments.

use std::collections::HashMap;

use crate::deploy::DeploymentResult;
use crate::error::{ForgeError, Result};

use super::prompts::parse_confirm;
use super::report::{conflict_previews, deployment_footer, deployment_table, failure_lines};
use super::theme::ForgeTheme;
use super::{OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface};

/// Prefix of environment variables answering prompts.
pub const PROMPT_ENV_PREFIX: &str = "ACFORGE_PROMPT_";

/// UI implementation for non-interactive mode.
///
/// Prompts are answered from `ACFORGE_PROMPT_<KEY>` environment variables,
/// then from the prompt default. Output is plain text.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
    theme: ForgeTheme,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with(PROMPT_ENV_PREFIX))
            .collect();

        Self::with_overrides(mode, env_overrides)
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
            theme: ForgeTheme::plain(),
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_hint(hint));
        }
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let env_key = format!("{}{}", PROMPT_ENV_PREFIX, prompt.key.to_uppercase());
        let answer = self
            .env_overrides
            .get(&env_key)
            .or(prompt.default.as_ref())
            .cloned()
            .ok_or_else(|| ForgeError::ConfigValidationError {
                message: format!(
                    "Cannot prompt for '{}' in non-interactive mode (no default value)",
                    prompt.key
                ),
            })?;

        Ok(match prompt.prompt_type {
            PromptType::Confirm => PromptResult::Bool(parse_confirm(&answer)),
            PromptType::Input => PromptResult::String(answer),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            println!("{}", message);
        }
        Box::new(NoopSpinner)
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", self.theme.format_header(title));
        }
    }

    fn show_deployment(&mut self, result: &DeploymentResult) {
        if self.mode.shows_table() {
            println!(
                "{}",
                deployment_table(result, &self.theme, self.mode.shows_details())
            );
            for (path, preview) in conflict_previews(result) {
                println!("\n{}", path);
                for line in preview {
                    println!("  {}", line);
                }
            }
        }
        for line in failure_lines(result) {
            eprintln!("{}", self.theme.format_warning(&line));
        }
        println!("{}", deployment_footer(result));
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner that only prints completion lines.
struct NoopSpinner;

impl SpinnerHandle for NoopSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        println!("✓ {}", msg);
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_and_clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(key: &str, prompt_type: PromptType, default: Option<&str>) -> Prompt {
        Prompt {
            key: key.to_string(),
            question: format!("{}?", key),
            prompt_type,
            default: default.map(String::from),
        }
    }

    #[test]
    fn prompt_uses_env_override_first() {
        let mut overrides = HashMap::new();
        overrides.insert("ACFORGE_PROMPT_GITHUB_OWNER".to_string(), "acme".to_string());
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, overrides);

        let result = ui
            .prompt(&prompt("github_owner", PromptType::Input, Some("unknown")))
            .unwrap();
        assert_eq!(result.as_string(), "acme");
    }

    #[test]
    fn prompt_falls_back_to_default() {
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, HashMap::new());
        let result = ui
            .prompt(&prompt("project_name", PromptType::Input, Some("widget")))
            .unwrap();
        assert_eq!(result.as_string(), "widget");
    }

    #[test]
    fn confirm_parses_answer() {
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, HashMap::new());
        let result = ui
            .prompt(&prompt("overwrite", PromptType::Confirm, Some("yes")))
            .unwrap();
        assert_eq!(result.as_bool(), Some(true));
    }

    #[test]
    fn prompt_without_default_fails() {
        let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, HashMap::new());
        let err = ui
            .prompt(&prompt("name", PromptType::Input, None))
            .unwrap_err();
        assert!(err.to_string().contains("non-interactive"));
    }

    #[test]
    fn is_never_interactive() {
        let ui = NonInteractiveUI::with_overrides(OutputMode::Normal, HashMap::new());
        assert!(!ui.is_interactive());
    }
}
