//! Serving a [`Chain`] over TCP.
//!
//! Each accepted connection gets its own task; each request on it is
//! buffered, run down the chain, and logged. On SIGTERM or Ctrl-C the
//! listener closes at once and [`Server::serve`] returns once the open
//! connections have drained. A publish in flight keeps its connection open
//! until the handler answers, so give the orchestrator a grace period longer
//! than the slowest upload.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::chain::Chain;
use crate::error::Error;
use crate::request::Request;
use crate::response::{HyperBody, Response};
use crate::settings::Settings;
use crate::status::Status;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use kpr::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000).into());
    /// ```
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::bind(settings.addr)
    }

    /// Starts accepting connections and running each request down `chain`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, chain: Chain) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        let chain = Arc::new(chain);

        info!(addr = %self.addr, "kpr listening");

        let mut connections = tokio::task::JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown wins over queued connections.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = connections.len(), "shutting down, draining connections");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&chain), stream, peer));
                    }
                    Err(e) => error!("accept error: {e}"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        while connections.join_next().await.is_some() {}

        info!("kpr stopped");
        Ok(())
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Speaks HTTP/1.1 or HTTP/2 on one connection, whichever the peer picks.
async fn serve_connection(chain: Arc<Chain>, stream: TcpStream, peer: SocketAddr) {
    let svc = service_fn(move |req| dispatch(Arc::clone(&chain), req));

    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        warn!(%peer, "connection closed with error: {e}");
    }
}

/// Buffers one request body, runs the chain, and hands hyper the response.
///
/// The error type is [`Infallible`](std::convert::Infallible): failures
/// become responses here or in the chain's error handler.
async fn dispatch(
    chain: Arc<Chain>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<HyperBody>, std::convert::Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let body: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%method, %path, "failed to read request body: {e}");
            return Ok(Response::status(Status::BadRequest).into_inner());
        }
    };

    let response = chain.handle(Request::from_parts(parts, body)).await;
    debug!(
        %method,
        %path,
        status = response.code(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request handled",
    );
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// SIGTERM or Ctrl-C, whichever comes first. Only Ctrl-C off Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C"),
        () = sigterm => info!("received SIGTERM"),
    }
}
