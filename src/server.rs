//! A minimal HTTP listener around `Static`.

use std::{
    convert::Infallible,
    future::Future,
    time::{Duration, Instant},
};

use http::{Method, Request, Response, StatusCode};
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::{conn::auto::Builder as ConnBuilder, graceful::GracefulShutdown},
};
use serde::Serialize;
use tokio::{
    io::{AsyncRead, AsyncSeek},
    net::TcpListener,
};
use tracing::{debug, info, warn};

use crate::{
    response_builder::json_response,
    service::Static,
    util::Body,
    vfs::FileOpener,
};

/// Body of the health response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Always `"healthy"` while the process is serving.
    pub status: &'static str,
}

/// Route a request: `GET /health` is answered here, everything else by `Static`.
pub async fn route<O, B>(static_: &Static<O>, req: Request<B>) -> Response<Body<O::File>>
where
    O: FileOpener,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let res = match (&method, path.as_str()) {
        (&Method::GET | &Method::HEAD, "/health") => {
            json_response(StatusCode::OK, &Health { status: "healthy" })
        }
        _ => static_.serve(req).await,
    };

    debug!(
        method = %method,
        path = %path,
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    res
}

/// How long `run` waits for in-flight connections after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Pause after a failed `accept` before retrying it.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` resolves, serving each on its own task.
///
/// Both HTTP/1 and HTTP/2 are accepted. Once `shutdown` resolves, no new connections are
/// accepted, open connections are asked to close after their current request, and `run` returns
/// when they have all finished or after `SHUTDOWN_GRACE`, whichever comes first.
pub async fn run<O>(
    listener: TcpListener,
    static_: Static<O>,
    shutdown: impl Future<Output = ()>,
) where
    O: FileOpener,
    O::File: AsyncRead + AsyncSeek + Send + Unpin + 'static,
    O::Future: Send,
{
    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting connections");
                break;
            }
        };

        let static_ = static_.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            let static_ = static_.clone();
            async move { Ok::<_, Infallible>(route(&static_, req).await) }
        });

        let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
        let conn = graceful.watch(conn.into_owned());

        tokio::spawn(async move {
            // Client disconnects surface here; the response body (and its file) is dropped.
            if let Err(err) = conn.await {
                debug!(%remote, error = %err, "connection closed with error");
            }
        });
    }

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("all connections closed");
        }
        _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
            warn!("timed out waiting for connections to close");
        }
    }
}
