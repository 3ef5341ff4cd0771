use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "embersh=debug"
    } else {
        "embersh=warn"
    }
}

/// Installs the global subscriber. Logs go to stderr so they never land in
/// the rendered transcript.
pub fn init_logging(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    // A second init (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init();

    tracing::debug!("embersh v{} starting up", env!("CARGO_PKG_VERSION"));
}
