//! HTTP retrieval endpoint.
//!
//! Every request path is routed to one handler. The final path segment is
//! the token; the [`AccessGate`] decides whether the request is served, and
//! served files are streamed from disk.
//!
//! ## Responses
//!
//! | Outcome | Status |
//! |---------|--------|
//! | served | 200 with the file bytes |
//! | banned | 403 |
//! | unknown token or missing file | 404 |
//! | non-GET | 405 |
//! | expired | 410 |
//! | rate limited | 429 |
//! | server fault | 500 |
//!
//! Non-200 bodies are JSON `{"code": "...", "message": "..."}`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use keylink_core::web::WebServer;
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! WebServer::new(gate).run(listener, shutdown_signal()).await?;
//! ```

pub mod error;

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, StatusCode, Uri},
    response::Response,
    routing::any,
    Router,
};
use tokio::fs::File;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use crate::gate::AccessGate;
use crate::store::LinkEntry;

use self::error::{ApiError, ApiResult};

/// State shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    gate: Arc<AccessGate>,
}

/// Build the router for the retrieval endpoint.
///
/// The router expects `ConnectInfo<SocketAddr>` to be available; serve it
/// with `into_make_service_with_connect_info`.
pub fn router(gate: AccessGate) -> Router {
    let state = AppState {
        gate: Arc::new(gate),
    };

    Router::new()
        .route("/", any(retrieve))
        .route("/{*path}", any(retrieve))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server for the retrieval endpoint.
#[derive(Debug)]
pub struct WebServer {
    router: Router,
}

impl WebServer {
    /// Create a server around `gate`.
    #[must_use]
    pub fn new(gate: AccessGate) -> Self {
        Self {
            router: router(gate),
        }
    }

    /// Serve on `listener` until `shutdown` completes.
    ///
    /// In-flight requests are allowed to finish after the shutdown future
    /// resolves; no new connections are accepted.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Retrieval endpoint listening");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Retrieval endpoint stopped");
        Ok(())
    }
}

async fn retrieve(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
) -> ApiResult<Response> {
    let client = peer.ip().to_string();
    let target = uri.path().to_string();

    let entry = {
        let gate = Arc::clone(&state.gate);
        let client = client.clone();
        run_blocking(move || gate.evaluate(&method, &client, &target)).await??
    };

    serve_entry(&state.gate, client, entry).await
}

/// Open and stream the file behind an admitted link.
///
/// A file that vanished after the access check is handled like one that
/// was already missing: the link is removed and the client gets a 404.
async fn serve_entry(
    gate: &Arc<AccessGate>,
    client: String,
    entry: LinkEntry,
) -> ApiResult<Response> {
    let opened = File::open(&entry.path).await;
    let file = match opened {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let gate = Arc::clone(gate);
            let err = run_blocking(move || gate.remove_stale(&client, &entry)).await?;
            return Err(err.into());
        }
        Err(e) => {
            tracing::error!(
                client = %client,
                path = %entry.path.display(),
                error = %e,
                "Failed to open file"
            );
            return Err(ApiError::internal());
        }
    };

    stream_file(&entry, file).await
}

async fn stream_file(entry: &LinkEntry, file: File) -> ApiResult<Response> {
    let metadata = file.metadata().await.map_err(|e| {
        tracing::error!(path = %entry.path.display(), error = %e, "Failed to read file metadata");
        ApiError::internal()
    })?;

    let content_type = mime_guess::from_path(&entry.path).first_or_octet_stream();
    let filename = entry
        .path
        .file_name()
        .map(|name| attachment_filename(&name.to_string_lossy()))
        .unwrap_or_default();

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            ApiError::internal()
        })
}

/// Run store and filesystem work on the blocking pool.
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "Blocking task failed");
        ApiError::internal()
    })
}

/// Make a file name safe to place inside a quoted header parameter.
fn attachment_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
