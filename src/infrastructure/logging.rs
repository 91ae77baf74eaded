use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::{LogFormat, LoggingConfig};

/// Crates that are only interesting at warn and above
const QUIET_TARGETS: &[&str] = &["sqlx", "hyper", "h2", "redis"];

fn default_directives(level: &str) -> String {
    QUIET_TARGETS
        .iter()
        .fold(level.to_string(), |acc, target| format!("{},{}=warn", acc, target))
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the configured directives.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let output = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    if tracing_subscriber::registry().with(filter).with(output).try_init().is_err() {
        tracing::debug!("Global subscriber already installed");
        return;
    }

    tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
}
