use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::request_log::DEFAULT_WINDOW;
use search_core::{EngineOptions, DEFAULT_BUCKET_COUNT, MAX_RESULT_DOCUMENT_COUNT};
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// JSONL file of documents to index at startup
    #[arg(long)]
    documents: Option<PathBuf>,
    /// Space separated stop words
    #[arg(long, default_value = "")]
    stop_words: String,
    /// Maximum number of ranked results per query
    #[arg(long, default_value_t = MAX_RESULT_DOCUMENT_COUNT)]
    max_results: usize,
    /// Lock buckets used while accumulating relevance
    #[arg(long, default_value_t = DEFAULT_BUCKET_COUNT)]
    buckets: usize,
    /// Searches kept for the no-result statistics
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    request_window: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        stop_words: args.stop_words,
        options: EngineOptions {
            max_results: args.max_results,
            bucket_count: args.buckets,
        },
        request_window: args.request_window,
        documents: args.documents,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
