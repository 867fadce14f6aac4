//! The viewer server: the transport boundary over the driftscope engine.
//!
//! One `AppState` per process owns the display publisher, the processor, and
//! the current comparison session. Handlers are thin async wrappers over the
//! synchronous state methods, which keeps the whole request surface unit
//! testable without a socket.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use driftscope::{
    ComparisonSession, DegradePipeline, DisplayPublisher, DisplayState, ProcessError, Processor,
    SessionError,
};

/// Everything a handler needs, one instance per process behind an `Arc`.
pub struct AppState {
    publisher: DisplayPublisher,
    processor: Processor<DegradePipeline>,
    session: Mutex<Option<ComparisonSession>>,
    /// Base for the absolute URLs carried by the SSE feed, no trailing slash.
    public_url: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no comparison session configured")]
    NoSession,
    #[error("no image has been processed yet")]
    NoImage,
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoSession => StatusCode::BAD_REQUEST,
            ApiError::NoImage => StatusCode::NOT_FOUND,
            ApiError::Process(ProcessError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            ApiError::Process(ProcessError::Failed { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(SessionError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The short wire tag for the error body.
    fn tag(&self) -> &'static str {
        match self {
            ApiError::NoSession => "no_session",
            ApiError::NoImage => "no_image",
            ApiError::Process(ProcessError::IndexOutOfRange { .. }) => "index_out_of_range",
            ApiError::Process(ProcessError::Failed { .. }) => "processing_failed",
            ApiError::Session(_) => "invalid_session",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.tag(),
            "detail": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

/// The response shape of `process` and `next`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProcessResponse {
    pub original: String,
    pub modified: String,
    pub index: usize,
    pub total: usize,
    pub filename: String,
}

/// The response shape of `images`: one overview of the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub count: usize,
    /// -1 until the first successful process, matching the historical wire
    /// sentinel for "nothing shown yet."
    pub current_index: i64,
    pub modifiers: Vec<String>,
    pub image_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub modifiers: Vec<String>,
}

/// One SSE payload: the full display state with absolute image URLs.
#[derive(Debug, Serialize)]
struct StreamEvent {
    index: usize,
    timestamp: u64,
    original: String,
    modified: String,
    filename: String,
}

impl AppState {
    pub fn new(
        source_dir: PathBuf,
        output_root: PathBuf,
        pipeline: DegradePipeline,
        session: Option<ComparisonSession>,
        public_url: String,
    ) -> Self {
        Self {
            publisher: DisplayPublisher::new(),
            processor: Processor::new(source_dir, output_root, pipeline),
            session: Mutex::new(session),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Processes the image at `index`, publishes the new display state, and
    /// repositions the auto-advance cursor behind it.
    pub fn process_index(&self, index: usize) -> Result<ProcessResponse, ApiError> {
        let mut guard = self.session.lock().expect("session lock");
        let session = guard.as_mut().ok_or(ApiError::NoSession)?;

        let pair = self.processor.process(session, index)?;
        let original = format!("/images/source/{}", pair.filename);
        let modified = format!("/images/modified/{}/{}", pair.fingerprint, pair.filename);

        self.publisher
            .publish(pair.index, original.clone(), modified.clone(), pair.filename.clone());
        session.note_processed(pair.index);

        Ok(ProcessResponse {
            original,
            modified,
            index: pair.index,
            total: pair.total,
            filename: pair.filename,
        })
    }

    /// Processes whatever image the cursor points at, wrapping past the end.
    /// The cursor moves even when processing fails, so a broken image cannot
    /// wedge the advance loop.
    pub fn process_next(&self) -> Result<ProcessResponse, ApiError> {
        let index = {
            let mut guard = self.session.lock().expect("session lock");
            guard.as_mut().ok_or(ApiError::NoSession)?.advance()
        };
        self.process_index(index)
    }

    /// The current display state, or `NoImage` before the first process.
    pub fn current(&self) -> Result<DisplayState, ApiError> {
        let state = self.publisher.current();
        if state.is_showing() {
            Ok(state)
        } else {
            Err(ApiError::NoImage)
        }
    }

    pub fn overview(&self) -> Result<OverviewResponse, ApiError> {
        let guard = self.session.lock().expect("session lock");
        let session = guard.as_ref().ok_or(ApiError::NoSession)?;
        let current_index = self
            .publisher
            .current()
            .index
            .map_or(-1, |index| index as i64);
        Ok(OverviewResponse {
            count: session.len(),
            current_index,
            modifiers: session.selection().to_vec(),
            image_files: session.images().to_vec(),
        })
    }

    /// Rebuilds the session over the same source directory with a new
    /// selection; the sequence is rescanned and the cursor reset.
    pub fn reset_session(&self, modifiers: Vec<String>) -> Result<OverviewResponse, ApiError> {
        let session = ComparisonSession::scan(self.processor.source_dir(), modifiers)?;
        *self.session.lock().expect("session lock") = Some(session);
        self.overview()
    }

    fn absolute(&self, relative: &str) -> String {
        format!("{}{relative}", self.public_url)
    }
}

async fn process_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<ProcessResponse>, ApiError> {
    state.process_index(index).map(Json)
}

async fn next_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProcessResponse>, ApiError> {
    state.process_next().map(Json)
}

async fn current_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DisplayState>, ApiError> {
    state.current().map(Json)
}

async fn overview_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OverviewResponse>, ApiError> {
    state.overview().map(Json)
}

async fn session_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<OverviewResponse>, ApiError> {
    state.reset_session(request.modifiers).map(Json)
}

/// The payload sequence one listener sees: its own watch receiver and its own
/// last-sent index, so it gets the current state immediately on connect (if an
/// image is showing) and then one JSON payload per observed index change,
/// coalesced under bursts. Ends when the publisher goes away.
fn display_stream(state: Arc<AppState>) -> impl Stream<Item = String> {
    let mut rx = state.publisher.subscribe();
    async_stream::stream! {
        let mut last_sent: Option<usize> = None;
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if let Some(index) = snapshot.index {
                if last_sent != Some(index) {
                    last_sent = Some(index);
                    let event = StreamEvent {
                        index,
                        timestamp: snapshot.timestamp_micros,
                        original: state.absolute(&snapshot.original),
                        modified: state.absolute(&snapshot.modified),
                        filename: snapshot.filename,
                    };
                    match serde_json::to_string(&event) {
                        Ok(payload) => yield payload,
                        Err(error) => warn!(%error, "failed to encode display event"),
                    }
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// One long-lived SSE response per listener. Dropping the response ends the
/// underlying loop.
async fn stream_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let stream = display_stream(state).map(|payload| {
        Ok::<_, std::convert::Infallible>(Event::default().event("display").data(payload))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Minimal comparison page wired to the SSE feed. Serving it inline keeps the
/// server free of any templating layer.
const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>Driftscope</title></head>
<body style="font-family:monospace; background:#111; color:#ddd;">
  <h2>Driftscope Comparison</h2>
  <div style="margin:8px 0; display:flex; gap:12px; align-items:center;">
    <button id="btn-next" style="padding:6px 12px;">Next</button>
    <span id="status" style="font-size:12px; color:#777">waiting</span>
  </div>
  <div style="display:flex; gap:16px;">
    <figure><img id="original" style="max-width:45vw; border:1px solid #444"/><figcaption>original</figcaption></figure>
    <figure><img id="modified" style="max-width:45vw; border:1px solid #444"/><figcaption>modified</figcaption></figure>
  </div>
  <script>
  (function(){
    const status = (t)=>{ const el=document.getElementById('status'); if(el) el.textContent=t; };
    document.getElementById('btn-next').onclick = ()=> fetch('/api/next').then(r=>r.json()).then(j=>{
      if(j.error) status(j.error);
    });
    const es = new EventSource('/api/stream');
    es.addEventListener('display', (ev)=>{
      const s = JSON.parse(ev.data);
      document.getElementById('original').src = s.original;
      document.getElementById('modified').src = s.modified;
      status((s.index + 1) + ': ' + s.filename);
    });
    es.onerror = ()=> status('stream disconnected');
  })();
  </script>
</body>
</html>
"#;

/// Builds the full router over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let source_dir = state.processor.source_dir().to_path_buf();
    let output_root = state.processor.output_root().to_path_buf();
    Router::new()
        .route("/", get(index_page))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/process/:index", get(process_handler))
        .route("/api/current", get(current_handler))
        .route("/api/next", get(next_handler))
        .route("/api/images", get(overview_handler))
        .route("/api/stream", get(stream_handler))
        .route("/api/session", post(session_handler))
        .nest_service("/images/source", ServeDir::new(source_dir))
        .nest_service("/images/modified", ServeDir::new(output_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves in a spawned task, returning its handle.
pub async fn start_server(
    state: Arc<AppState>,
    bind_addr: &str,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "viewer server listening");
    Ok(tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            warn!(%error, "viewer server exited");
        }
    }))
}
