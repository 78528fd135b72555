use tracing_subscriber::EnvFilter;

/// Map a configured level name onto a `tracing::Level`. Unknown names mean `INFO`.
pub fn level_from_str(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing for the application.
///
/// `RUST_LOG` wins when it is set; otherwise `default_level` is used for the
/// whole process.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_from_str(default_level).to_string()));

    // try_init so tests can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
