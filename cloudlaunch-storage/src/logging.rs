//! Tracing subscriber bootstrap.

use tracing_subscriber::EnvFilter;

/// Maps loose level names onto tracing filter directives.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Installs a stderr fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Calling this
/// more than once is harmless.
pub fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(normalize_level(default_level))),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
