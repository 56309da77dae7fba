//! Setup for the application logging.
//!
//! It redirects the log output to stdout with the level defined in the
//! configuration:
//!
//! - `Off`
//! - `Error`
//! - `Warn`
//! - `Info`
//! - `Debug`
//! - `Trace`
use std::sync::Once;

use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Configuration;

static INIT: Once = Once::new();

/// It initializes the `tracing` subscriber with the configured level.
///
/// # Panics
///
/// Panics when the configured level is not one of the known names.
pub fn setup(cfg: &Configuration) {
    let level = config_level_or_default(cfg.log_level.as_deref());

    if level == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        stdout_config(level);
    });
}

fn config_level_or_default(log_level: Option<&str>) -> LevelFilter {
    match log_level {
        None => LevelFilter::INFO,
        Some(level) => level.parse().expect("unknown log level in configuration"),
    }
}

fn stdout_config(filter: LevelFilter) {
    tracing_subscriber::fmt().with_max_level(filter).init();

    info!("logging initialized.");
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::config_level_or_default;

    #[test]
    fn the_level_should_default_to_info() {
        assert_eq!(config_level_or_default(None), LevelFilter::INFO);
    }

    #[test]
    fn the_level_names_should_parse() {
        assert_eq!(config_level_or_default(Some("off")), LevelFilter::OFF);
        assert_eq!(config_level_or_default(Some("debug")), LevelFilter::DEBUG);
    }
}
