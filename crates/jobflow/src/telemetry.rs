use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Pipeline-specific filter override. Takes precedence over `RUST_LOG` and
/// the configured log level.
const LOG_ENV: &str = "JOBFLOW_LOG";

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log filter '{}': unable to build EnvFilter", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Scopes the configured level to the pipeline crates and keeps dependency
/// noise at warn.
fn default_directives(level: &str) -> String {
    format!("warn,jobflow={level},jobflow_api={level}")
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = if let Ok(directives) = std::env::var(LOG_ENV) {
        EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
            value: directives,
            source,
        })?
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        let directives = default_directives(&config.log_level);
        EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
            value: directives,
            source,
        })?
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_scope_the_pipeline_crates() {
        let directives = default_directives("debug");
        assert_eq!(directives, "warn,jobflow=debug,jobflow_api=debug");
        EnvFilter::try_new(&directives).expect("directives parse");
    }

    #[test]
    fn malformed_directives_surface_the_offending_value() {
        let err = EnvFilter::try_new("jobflow=notalevel")
            .map_err(|source| TelemetryError::EnvFilter {
                value: "jobflow=notalevel".to_string(),
                source,
            })
            .expect_err("malformed filter rejected");
        assert!(err.to_string().contains("jobflow=notalevel"));
    }
}
