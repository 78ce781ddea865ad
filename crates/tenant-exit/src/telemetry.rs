use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}'")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("tracing subscriber could not be installed: {0}")]
    Install(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Log filter for the service. `RUST_LOG` wins when it parses; otherwise
/// `APP_LOG_LEVEL` must.
pub fn log_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = config.log_level.trim();
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the global fmt subscriber. Calling it twice is an error.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config)?)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Install)
}
