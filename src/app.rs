//! The tracker supervisor.
//!
//! [`start`] launches every configured listener plus the peer reaper, each
//! as its own task with its own halt channel. [`Jobs::stop`] broadcasts the
//! halt signals and waits for every task to acknowledge by finishing.
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bootstrap::jobs;
use crate::config::Configuration;
use crate::core::counter::{Counter, RedisCounter};
use crate::core::Tracker;
use crate::servers::signals::Halted;

struct Job {
    name: &'static str,
    task: JoinHandle<()>,
    halt: oneshot::Sender<Halted>,
}

/// Handles to every running service.
pub struct Jobs {
    entries: Vec<Job>,
}

impl Jobs {
    /// It broadcasts the halt signal and waits for every job to finish.
    pub async fn stop(self) {
        for job in self.entries {
            info!("Stopping {} listener", job.name);

            // A job that already stopped has dropped its receiver.
            drop(job.halt.send(Halted::Normal));

            if let Err(e) = job.task.await {
                error!("{} job did not stop cleanly: {e}", job.name);
            }
        }
    }
}

/// It starts the configured listeners and the peer reaper.
///
/// # Panics
///
/// Will panic (aborting the startup) when a listener cannot bind, the TLS
/// material cannot be loaded, or redis is required but unreachable.
pub async fn start(config: &Arc<Configuration>, tracker: Arc<Tracker>) -> Jobs {
    let counter = connect_counter(config).await;

    let mut entries = Vec::new();

    if config.http {
        let bind_address = SocketAddr::from(([0, 0, 0, 0], config.port));
        let (_, task, halt) = jobs::http_tracker::start_job(bind_address, None, tracker.clone(), counter.clone());
        entries.push(Job {
            name: "HTTP",
            task,
            halt,
        });
    }

    if config.ssl.enabled {
        let tls = jobs::make_rust_tls(&config.ssl.certificate, &config.ssl.key)
            .await
            .unwrap_or_else(|e| panic!("bad tls config: {e}"));

        let bind_address = SocketAddr::from(([0, 0, 0, 0], config.ssl.port));
        let (_, task, halt) = jobs::http_tracker::start_job(bind_address, Some(tls), tracker.clone(), counter.clone());
        entries.push(Job {
            name: "HTTPS",
            task,
            halt,
        });
    }

    if config.udp {
        let bind_address = SocketAddr::from(([0, 0, 0, 0], config.port));
        let (_, task, halt) = jobs::udp_tracker::start_job(bind_address, tracker.clone()).await;
        entries.push(Job {
            name: "UDP",
            task,
            halt,
        });
    }

    let (task, halt) = jobs::peer_reaper::start_job(&tracker);
    entries.push(Job {
        name: "peer reaper",
        task,
        halt,
    });

    Jobs { entries }
}

async fn connect_counter(config: &Arc<Configuration>) -> Option<Arc<dyn Counter>> {
    if !config.redis.enabled {
        return None;
    }

    let counter = RedisCounter::connect(&config.redis.host, &config.redis.password)
        .await
        .unwrap_or_else(|e| panic!("cannot connect to redis: {e}"));

    info!("Redis : OK");

    Some(Arc::new(counter))
}
