//! Logging and observability
//!
//! Structured logging built on `tracing-subscriber`, with either text or JSON
//! formatting selected at runtime via CLI flag or environment variable.
//!
//! All logging output is directed to stderr; stdout is reserved for the
//! scenario notices and summaries printed by [`crate::report::Reporter`].

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable selecting the log format (`json` or `text`)
pub const LOG_FORMAT_ENV: &str = "DEVFEAT_LOG_FORMAT";

/// Environment variable carrying an `EnvFilter` directive
pub const LOG_FILTER_ENV: &str = "DEVFEAT_LOG";

/// Initialize the logging system with optional format specification
///
/// Safe to call more than once; only the first call installs a subscriber.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for
///   one JSON object per event. `None` defers to `DEVFEAT_LOG_FORMAT`.
///
/// ## Environment Variables
///
/// * `DEVFEAT_LOG_FORMAT` - log output format when no explicit format is given
/// * `DEVFEAT_LOG` - filter directive (e.g. `devfeat_core=debug`)
/// * `RUST_LOG` - fallback filter directive
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var(LOG_FORMAT_ENV).ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(fmt::format::FmtSpan::CLOSE)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(true).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Build the filter: `DEVFEAT_LOG`, then `RUST_LOG`, then `info`
fn create_env_filter() -> EnvFilter {
    if let Ok(spec) = std::env::var(LOG_FILTER_ENV) {
        EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            eprintln!("Invalid {LOG_FILTER_ENV} specification '{spec}', using default 'info'");
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
