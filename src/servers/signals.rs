//! This module contains functions to handle signals.
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

/// Message the supervisor sends to a listener task to ask it to shut down.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Halted {
    Normal,
}

impl std::fmt::Display for Halted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Halted::Normal => write!(f, "normal"),
        }
    }
}

/// Creates a future awaiting the terminate signal (unix only).
///
/// # Panics
///
/// Panics if unable to install the signal handler.
#[must_use]
pub fn global_terminate_signal<'a>() -> BoxFuture<'a, ()> {
    #[cfg(unix)]
    let terminate: BoxFuture<'a, ()> = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    }
    .boxed();

    #[cfg(not(unix))]
    let terminate: BoxFuture<'a, ()> = std::future::pending::<()>().boxed();

    terminate
}

/// Creates a future awaiting the interrupt, i.e. `ctrl_c`, signal.
///
/// # Panics
///
/// Panics if unable to install the signal handler.
#[must_use]
pub fn global_interrupt_signal<'a>() -> BoxFuture<'a, ()> {
    async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    }
    .boxed()
}

/// Resolves on `ctrl_c` or the `terminate` signal.
pub async fn global_shutdown_signal() {
    let interrupt = global_interrupt_signal();
    let terminate = global_terminate_signal();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {}
    }
}

/// Resolves when the `rx_halt` channel or the global shutdown signal
/// resolves.
pub async fn shutdown_signal(rx_halt: tokio::sync::oneshot::Receiver<Halted>) {
    let halt = async {
        match rx_halt.await {
            Ok(signal) => signal,
            // The supervisor dropped the sender; treat it as a halt.
            Err(_) => Halted::Normal,
        }
    };

    tokio::select! {
        signal = halt => { info!("Halt signal processed: {}", signal) },
        () = global_shutdown_signal() => { info!("Global shutdown signal processed") }
    }
}
