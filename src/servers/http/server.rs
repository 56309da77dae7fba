//! Logic to start HTTP tracker instances, with or without TLS.
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use futures::future::BoxFuture;

use super::routes::router;
use crate::core::counter::Counter;
use crate::core::Tracker;

/// Grace period for in-flight requests once a shutdown is requested.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Launcher;

impl Launcher {
    /// It starts an HTTP (or, with `tls`, HTTPS) tracker server from an
    /// already bound TCP listener, with graceful shutdown.
    ///
    /// # Panics
    ///
    /// Will panic if the server crashes.
    pub fn start_from_tcp_listener_with_graceful_shutdown<F>(
        tcp_listener: std::net::TcpListener,
        tls: Option<RustlsConfig>,
        tracker: Arc<Tracker>,
        counter: Option<Arc<dyn Counter>>,
        shutdown_signal: F,
    ) -> BoxFuture<'static, ()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(tracker, counter);

        let handle = Handle::new();
        let cloned_handle = handle.clone();

        tokio::spawn(async move {
            shutdown_signal.await;
            cloned_handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
        });

        Box::pin(async move {
            match tls {
                Some(tls) => axum_server::from_tcp_rustls(tcp_listener, tls)
                    .handle(handle)
                    .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .expect("HTTPS tracker server crashed"),
                None => axum_server::from_tcp(tcp_listener)
                    .handle(handle)
                    .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .expect("HTTP tracker server crashed"),
            }
        })
    }
}
