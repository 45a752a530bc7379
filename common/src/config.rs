//! Configuration types for runtime and output settings

/// Runtime configuration for the tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output and progress lines
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    ///
    /// Progress lines (target `progress`) are printed at every level unless `quiet` is set.
    pub verbose: u8,
    /// Print the operation's summary at the end
    pub print_summary: bool,
}

impl OutputConfig {
    /// Builds the `tracing` filter directives for this configuration.
    ///
    /// `RUST_LOG` takes precedence when set.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        if self.quiet {
            return "off".to_string();
        }
        let level = match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("{level},{}=info", crate::PROGRESS_TARGET)
    }
}
