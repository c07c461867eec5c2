//! Output verbosity.

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show per-file reasons and warnings.
    Verbose,
    /// Show the summary table and status messages.
    #[default]
    Normal,
    /// Show the summary line and failures only.
    Quiet,
}

impl OutputMode {
    /// Check if this mode shows warnings attached to individual files.
    pub fn shows_details(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Check if this mode shows the full summary table and conflict previews.
    pub fn shows_table(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Check if this mode shows progress spinners.
    pub fn shows_spinners(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Check if this mode shows headers, messages, warnings and hints.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}
