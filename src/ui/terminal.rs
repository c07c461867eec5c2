//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::deploy::DeploymentResult;
use crate::error::Result;

use super::report::{conflict_previews, deployment_footer, deployment_table, failure_lines};
use super::{
    prompt_user, ForgeTheme, NonInteractiveUI, OutputMode, ProgressSpinner, Prompt, PromptResult,
    SpinnerHandle, UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: ForgeTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode) -> Self {
        Self {
            term: Term::stdout(),
            theme: ForgeTheme::detect(),
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        let term = Term::stderr();
        writeln!(&term, "{}", self.theme.format_error(msg)).ok();
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_hint(hint)).ok();
        }
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        prompt_user(prompt, &self.term)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            Box::new(ProgressSpinner::new(message))
        } else {
            Box::new(ProgressSpinner::hidden())
        }
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }

    fn show_deployment(&mut self, result: &DeploymentResult) {
        if self.mode.shows_table() {
            writeln!(
                self.term,
                "{}",
                deployment_table(result, &self.theme, self.mode.shows_details())
            )
            .ok();
            for (path, preview) in conflict_previews(result) {
                writeln!(self.term, "\n{}", self.theme.key.apply_to(&path)).ok();
                for line in preview {
                    writeln!(self.term, "  {}", self.theme.dim.apply_to(line)).ok();
                }
            }
        }

        for line in failure_lines(result) {
            writeln!(self.term, "{}", self.theme.format_warning(&line)).ok();
        }
        let footer = deployment_footer(result);
        if result.is_success() {
            writeln!(self.term, "{}", self.theme.format_success(&footer)).ok();
        } else {
            writeln!(self.term, "{}", self.theme.format_error(&footer)).ok();
        }
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Create the appropriate UI based on context.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}
