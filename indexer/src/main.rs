mod console;
mod loader;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use search_core::{
    paginate, process_queries_joined, remove_duplicates, DocumentId, DocumentStatus, EngineOptions,
    ExecutionPolicy, ScopedTimer, SearchEngine, StopWords, DEFAULT_BUCKET_COUNT,
    MAX_RESULT_DOCUMENT_COUNT,
};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index documents in memory and run TF-IDF queries against them", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Space separated stop words
    #[arg(long, default_value = "", global = true)]
    stop_words: String,
    /// Maximum number of ranked results per query
    #[arg(long, default_value_t = MAX_RESULT_DOCUMENT_COUNT, global = true)]
    max_results: usize,
    /// Lock buckets used while accumulating relevance
    #[arg(long, default_value_t = DEFAULT_BUCKET_COUNT, global = true)]
    buckets: usize,
}

impl EngineArgs {
    fn build(&self) -> Result<SearchEngine> {
        let stop_words = StopWords::from_text(&self.stop_words).context("parsing stop words")?;
        Ok(SearchEngine::with_options(stop_words, self.options()))
    }

    fn options(&self) -> EngineOptions {
        EngineOptions {
            max_results: self.max_results,
            bucket_count: self.buckets,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rank documents for a query
    Search {
        /// Input path (JSON/JSONL file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Query words; prefix a word with '-' to exclude documents containing it
        #[arg(long)]
        query: String,
        /// Only documents with this status (active, irrelevant, banned, removed)
        #[arg(long)]
        status: Option<DocumentStatus>,
        /// Accumulate relevance on the rayon pool
        #[arg(long, default_value_t = false)]
        parallel: bool,
        /// Print results in pages of this size
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// List the query words found in one document
    Match {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        id: DocumentId,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Run every line of a file as a query and print the joined results
    Batch {
        #[arg(long)]
        input: PathBuf,
        /// File with one query per line
        #[arg(long)]
        queries: PathBuf,
    },
    /// Remove documents whose word set repeats an earlier document
    Dedup {
        #[arg(long)]
        input: PathBuf,
    },
    /// Interactive session on stdin
    Console,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Search { input, query, status, parallel, page_size } => {
            let engine = load(&cli.engine, &input)?;
            let _timer = ScopedTimer::new("search");
            let status = status.unwrap_or_default();
            let documents = engine.find_top_documents_with(
                ExecutionPolicy::from_flag(parallel),
                &query,
                |_, doc_status, _| doc_status == status,
            )?;
            match page_size {
                Some(size) => {
                    for (n, page) in paginate(&documents, size)?.into_iter().enumerate() {
                        writeln!(out, "page {}: {page}", n + 1)?;
                    }
                }
                None => {
                    for document in &documents {
                        writeln!(out, "{document}")?;
                    }
                }
            }
        }
        Commands::Match { input, id, query, parallel } => {
            let engine = load(&cli.engine, &input)?;
            let _timer = ScopedTimer::new("match");
            let (words, status) =
                engine.match_document_with(ExecutionPolicy::from_flag(parallel), &query, id)?;
            writeln!(out, "document {id} ({status}): {}", words.join(" "))?;
        }
        Commands::Batch { input, queries } => {
            let engine = load(&cli.engine, &input)?;
            let text = fs::read_to_string(&queries)
                .with_context(|| format!("reading {}", queries.display()))?;
            let queries: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            let _timer = ScopedTimer::new(format!("{} queries", queries.len()));
            for document in process_queries_joined(&engine, &queries)? {
                writeln!(
                    out,
                    "Document {} matched with relevance {}",
                    document.id, document.relevance
                )?;
            }
        }
        Commands::Dedup { input } => {
            let mut engine = load(&cli.engine, &input)?;
            let _timer = ScopedTimer::new("dedup");
            let removed = remove_duplicates(&mut engine);
            writeln!(
                out,
                "removed {} duplicates, {} documents left",
                removed.len(),
                engine.document_count()
            )?;
        }
        Commands::Console => {
            let stdin = io::stdin();
            console::run(stdin.lock(), &mut out, cli.engine.options())?;
        }
    }
    out.flush()?;
    Ok(())
}

fn load(args: &EngineArgs, input: &std::path::Path) -> Result<SearchEngine> {
    let mut engine = args.build()?;
    let docs = loader::load_documents(input)?;
    let _timer = ScopedTimer::new("indexing");
    loader::index_documents(&mut engine, &docs)?;
    Ok(engine)
}
