use tracing_subscriber::EnvFilter;

use crate::cli::VerbosityLevel;

/// Filter directive used when `RUST_LOG` is not set
pub fn default_directive(verbosity: VerbosityLevel) -> &'static str {
    match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "info",
    }
}

/// `RUST_LOG` when set and valid, otherwise the verbosity default
pub fn build_filter(verbosity: VerbosityLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber writing log events to stderr
pub fn init(
    verbosity: VerbosityLevel,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
}
