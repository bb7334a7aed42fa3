// Logging and verbosity control

use tracing_subscriber::EnvFilter;

/// Initialize tracing based on CLI flags
///
/// `RUST_LOG` takes precedence over the flag-derived default so targeted
/// debugging stays possible in quiet mode.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Diagnostics go to stderr so command output stays pipeable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
