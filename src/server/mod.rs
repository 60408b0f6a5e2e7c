//! Connection layer.
//!
//! A custom accept loop peeks at each connection before hyper sees it.
//! Media requests are handed to the blocking streamer with socket timeouts;
//! everything else is served by hyper with the axum router.

pub mod router;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tower::Service;
use tracing::{debug, error, info, trace, warn};

use crate::catalog::Snapshot;
use crate::config::Config;
use crate::streaming::{direct, MediaRoot, Route};

pub use router::build_router;

/// Bytes peeked to classify a connection.
const PEEK_BYTES: usize = 2048;

/// Attempts at peeking a complete request line before classifying anyway.
const PEEK_ATTEMPTS: u32 = 20;

/// Shared, read-only state handed to every connection.
#[derive(Clone)]
pub struct ServerContext {
    pub snapshot: Arc<Snapshot>,
    pub media: Arc<MediaRoot>,
    /// Socket timeout for media connections, header timeout for the rest.
    pub timeout: Duration,
    pub chunk_size: usize,
}

impl ServerContext {
    pub fn new(config: &Config, snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            media: Arc::new(MediaRoot::new(
                config.server.serve_root.clone(),
                config.library.web_video_dir.clone(),
                config.library.source_root.clone(),
            )),
            timeout: config.server.timeout(),
            chunk_size: config.server.chunk_size(),
        }
    }
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn start_server(config: &Config, snapshot: Snapshot) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(
        "Serving {} catalog entries on http://{}",
        snapshot.len(),
        listener.local_addr().context("Listener has no local address")?
    );

    let ctx = ServerContext::new(config, snapshot);
    serve(listener, ctx, shutdown_signal()).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Accept loop: one task per connection until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    let app = build_router(ctx.clone());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        trace!(%peer, "Accepted connection");
                        tokio::spawn(handle_connection(stream, peer, ctx.clone(), app.clone()));
                    }
                    Err(e) => {
                        warn!("Accept error: {e}");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

/// Classify a connection and serve it on the matching path.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: ServerContext, app: Router) {
    let route = match tokio::time::timeout(ctx.timeout, peek_route(&stream)).await {
        Ok(Ok(Some(route))) => route,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            debug!(%peer, "Peek failed: {e}");
            return;
        }
        Err(_) => {
            debug!(%peer, "No request before timeout");
            return;
        }
    };

    if route == Route::Media {
        serve_media(stream, peer, &ctx).await;
        return;
    }

    let io = TokioIo::new(stream);
    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
        app.clone().call(request)
    });

    if let Err(e) = hyper::server::conn::http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(ctx.timeout)
        .keep_alive(false)
        .serve_connection(io, service)
        .await
    {
        debug!(%peer, "HTTP connection error: {e}");
    }
}

/// Peek until the request line is complete (or the buffer is full) and
/// classify it. `None` means the peer closed without sending anything.
async fn peek_route(stream: &TcpStream) -> io::Result<Option<Route>> {
    let mut buf = [0u8; PEEK_BYTES];

    for _ in 0..PEEK_ATTEMPTS {
        let n = stream.peek(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if n == buf.len() || buf[..n].windows(2).any(|w| w == b"\r\n") {
            return Ok(Some(Route::classify_peek(&buf[..n])));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let n = stream.peek(&mut buf).await?;
    Ok(Some(Route::classify_peek(&buf[..n])))
}

/// Run the blocking media handler for one connection.
async fn serve_media(stream: TcpStream, peer: SocketAddr, ctx: &ServerContext) {
    let std_stream = match into_blocking(stream, ctx.timeout) {
        Ok(s) => s,
        Err(e) => {
            debug!(%peer, "Failed to prepare media socket: {e}");
            return;
        }
    };

    let media = ctx.media.clone();
    let chunk_size = ctx.chunk_size;
    let result = tokio::task::spawn_blocking(move || {
        direct::handle_media_connection(std_stream, &media, chunk_size)
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) if direct::is_disconnect(&e) => {
            debug!(%peer, "Client disconnected during stream: {e}");
        }
        Ok(Err(e)) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            debug!(%peer, "Media connection timed out");
        }
        Ok(Err(e)) => warn!(%peer, "Media connection error: {e}"),
        Err(e) => error!(%peer, "Media worker failed: {e}"),
    }
}

/// Convert to a blocking std socket with symmetric read/write timeouts.
fn into_blocking(stream: TcpStream, timeout: Duration) -> io::Result<std::net::TcpStream> {
    let std_stream = stream.into_std()?;
    std_stream.set_nonblocking(false)?;
    std_stream.set_read_timeout(Some(timeout))?;
    std_stream.set_write_timeout(Some(timeout))?;
    Ok(std_stream)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
