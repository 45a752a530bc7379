//! Shared building blocks for the `ftpscm` tools.
//!
//! - [`validate`]: checks for profile names, hosts and ports
//! - [`credentials`]: credential stores and the id-based resolver
//! - [`profile`] / [`registry`]: named server profiles, their persistence and the registry
//! - [`workspace`] / [`changelog`]: local checkout directory helpers
//! - [`run`]: tokio runtime and `tracing` bootstrap used by the binaries
//!
//! # Logging Convention
//!
//! Logs go to stdout. Human-readable progress lines of a checkout use the
//! [`PROGRESS_TARGET`] target and are printed at every verbosity level unless quiet mode
//! is enabled; everything else follows `-v` (ERROR / INFO / DEBUG / TRACE).

pub mod changelog;
pub mod config;
pub mod credentials;
pub mod profile;
pub mod registry;
pub mod validate;
pub mod workspace;

pub use config::{OutputConfig, RuntimeConfig};

/// `tracing` target for checkout progress lines.
pub const PROGRESS_TARGET: &str = "progress";

fn init_tracing(output: &OutputConfig) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(output.filter_directives())?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize logging: {error}"))
}

fn build_runtime(runtime: &RuntimeConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    Ok(builder.build()?)
}

/// Runs `func` on a fresh tokio runtime with logging configured from `output`.
///
/// Returns `None` on failure after reporting the error to stderr (unless quiet). The
/// summary is printed to stdout when `output.print_summary` is set.
pub fn run<Fut, Summary>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    if let Err(error) = init_tracing(&output) {
        eprintln!("{error:#}");
        return None;
    }
    let runtime = match build_runtime(&runtime) {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start runtime: {error:#}");
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            if !output.quiet {
                eprintln!("{error:#}");
            }
            None
        }
    }
}
