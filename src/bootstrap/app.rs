//! Setup for the main tracker application.
//!
//! Setup steps:
//!
//! 1. Load the configuration from file and environment.
//! 2. Initialize logging.
//! 3. Validate the configuration (announce interval, TLS material).
//! 4. Connect the store and build the domain tracker.
//!
//! Any failure here aborts the process with a message: a tracker without a
//! sane configuration or a reachable store has nothing useful to do.
use std::sync::Arc;

use tracing::info;

use super::logging;
use crate::config::{Configuration, DEFAULT_CONFIG_PATH};
use crate::core::Tracker;
use crate::servers::apis::resources::ServerStatus;
use crate::{APP_NAME, VERSION};

/// It loads the configuration, initializes logging and builds the tracker.
///
/// # Panics
///
/// Will panic (aborting the startup) when the configuration is malformed or
/// the database is unreachable.
#[must_use]
pub fn setup() -> (Arc<Configuration>, Arc<Tracker>) {
    let config = Configuration::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| panic!("{e}"));

    logging::setup(&config);

    info!("Starting {APP_NAME} {VERSION}");

    config.validate().unwrap_or_else(|e| panic!("{e}"));

    let config = Arc::new(config);

    let tracker = Arc::new(Tracker::new(config.clone()).unwrap_or_else(|e| panic!("cannot connect to database: {e}")));

    info!("Database {} : OK", config.store.driver);

    let status = ServerStatus::snapshot(&tracker.stats.snapshot());
    info!(
        "{} - {}_{} ({} CPU) [pid: {}]",
        status.hostname, status.platform, status.architecture, status.num_cpu, status.pid
    );

    (config, tracker)
}
