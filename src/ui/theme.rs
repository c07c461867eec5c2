//! Visual theme and styling.

use console::Style;

use crate::deploy::DeployOutcome;

/// acforge's visual theme.
#[derive(Debug, Clone)]
pub struct ForgeTheme {
    /// Style for success messages and written files (green).
    pub success: Style,
    /// Style for merged files (cyan).
    pub merged: Style,
    /// Style for warnings and conflicts (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for dim/secondary text and unchanged files.
    pub dim: Style,
    /// Style for highlighted/important text (bold).
    pub highlight: Style,
    /// Style for headers (cyan bold).
    pub header: Style,
    /// Style for box-drawing borders (dim).
    pub border: Style,
    /// Style for contextual hints (cyan dim).
    pub hint: Style,
    /// Style for key labels in key-value displays (bold).
    pub key: Style,
}

impl Default for ForgeTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ForgeTheme {
    /// Create the default theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            merged: Style::new().cyan(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            border: Style::new().dim(),
            hint: Style::new().cyan().dim(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            merged: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            border: Style::new(),
            hint: Style::new(),
            key: Style::new(),
        }
    }

    /// Pick the theme for the current terminal.
    pub fn detect() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }

    /// Format a success message.
    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    /// Format a warning message.
    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    /// Format an error message.
    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    /// Format a hint line.
    pub fn format_hint(&self, msg: &str) -> String {
        format!("{}", self.hint.apply_to(format!("→ {}", msg)))
    }

    /// Format a header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("⚒"),
            self.highlight.apply_to(title)
        )
    }

    /// Icon for a deployment outcome.
    pub fn outcome_icon(outcome: DeployOutcome) -> &'static str {
        match outcome {
            DeployOutcome::Written => "✓",
            DeployOutcome::Merged => "⇄",
            DeployOutcome::SkippedUnchanged => "○",
            DeployOutcome::Conflict => "⚠",
            DeployOutcome::Error => "✗",
        }
    }

    /// Style for a deployment outcome.
    pub fn outcome_style(&self, outcome: DeployOutcome) -> &Style {
        match outcome {
            DeployOutcome::Written => &self.success,
            DeployOutcome::Merged => &self.merged,
            DeployOutcome::SkippedUnchanged => &self.dim,
            DeployOutcome::Conflict => &self.warning,
            DeployOutcome::Error => &self.error,
        }
    }

    /// Format an outcome label with its icon.
    pub fn format_outcome(&self, outcome: DeployOutcome) -> String {
        format!(
            "{}",
            self.outcome_style(outcome)
                .apply_to(format!("{} {}", Self::outcome_icon(outcome), outcome))
        )
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
