use std::time::Duration;

use goat_tracker::servers::signals::global_shutdown_signal;
use goat_tracker::{app, bootstrap};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let (config, tracker) = bootstrap::app::setup();

    let jobs = app::start(&config, tracker.clone()).await;

    global_shutdown_signal().await;

    info!("Triggering graceful shutdown ..");

    // Watchdog: if the graceful shutdown hangs, terminate hard.
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        error!("Timeout reached, triggering force halt");
        std::process::exit(1);
    });

    jobs.stop().await;

    info!("Closing database connection");
    drop(tracker);
}
