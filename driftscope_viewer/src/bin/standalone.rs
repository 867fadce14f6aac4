use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use driftscope::{ComparisonSession, DegradePipeline};
use driftscope_viewer::{AppState, start_server};

/// Serve a source directory of images next to their degraded counterparts,
/// with polling endpoints and a live SSE comparison feed.
#[derive(Parser, Debug)]
#[command(name = "driftscope-viewer", version, about)]
struct Args {
    /// Directory holding the source images (png/jpg/jpeg/gif/bmp).
    #[arg(long)]
    source_dir: PathBuf,

    /// Root directory for degraded outputs, keyed per selection.
    #[arg(long, default_value = "modified")]
    output_dir: PathBuf,

    /// Comma-separated ordered modifier selection, e.g. "gaussian,sudden_drift".
    #[arg(long, value_delimiter = ',', required = true)]
    modifiers: Vec<String>,

    /// Bind address for the server.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Public base URL used for the absolute links in the SSE feed.
    /// Defaults to http://<bind>.
    #[arg(long)]
    public_url: Option<String>,

    /// RNG seed for reproducible degradation runs.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();

    let session = ComparisonSession::scan(&args.source_dir, args.modifiers)?;
    info!(
        images = session.len(),
        modifiers = ?session.selection(),
        "comparison session ready"
    );

    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://{}", args.bind));
    let state = Arc::new(AppState::new(
        args.source_dir,
        args.output_dir,
        DegradePipeline::new(args.seed),
        Some(session),
        public_url,
    ));

    let handle = start_server(state, &args.bind).await?;
    handle.await.ok();
    Ok(())
}
