use tracing::Level;
use tracing_subscriber::EnvFilter;

fn parse_level(log_level: Option<&str>) -> Level {
    match log_level.unwrap_or("info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs a global fmt subscriber. `RUST_LOG` wins over `log_level` when set.
///
/// Returns `false` if a subscriber was already installed.
pub fn setup_logging(log_level: Option<&str>) -> bool {
    let level = parse_level(log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
