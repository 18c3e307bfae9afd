use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: Level, json_output: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("colstat_index={},warn", level)));

    let installed = if json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr);

        Registry::default().with(env_filter).with(fmt_layer).try_init()
    };

    installed.map_err(|e| Error::Config(format!("Cannot install logger: {}", e)))
}

pub fn parse_level(level: &str) -> Result<Level> {
    level
        .parse::<Level>()
        .map_err(|_| Error::Config(format!("Unknown log level: {}", level)))
}
