//! Logging bootstrap.

use std::io::IsTerminal;

use shardline_config::{General, LogFormat};
use tracing::{debug, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides `log_level`.
///
/// Does nothing if a subscriber is already installed.
pub fn init(general: &General) {
    let level = match general.log_level.parse::<LevelFilter>() {
        Ok(level) => level,
        Err(_) => {
            warn!("unknown log level \"{}\", using info", general.log_level);
            LevelFilter::INFO
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (text, json) = match general.log_format {
        LogFormat::Text => (
            Some(
                fmt::layer()
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_file(false),
            ),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_file(false))),
    };

    if tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(filter)
        .try_init()
        .is_ok()
    {
        debug!("shardline v{}", env!("CARGO_PKG_VERSION"));
    }
}
