use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use parking_lot::{Mutex, RwLock};
use search_core::request_log::DEFAULT_WINDOW;
use search_core::{
    remove_duplicates, DocumentId, DocumentInput, DocumentStatus, EngineOptions, ExecutionPolicy,
    RequestLog, SearchEngine, SearchError, StopWords,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Space separated stop words.
    pub stop_words: String,
    pub options: EngineOptions,
    /// Number of recent searches kept for `/stats`.
    pub request_window: usize,
    /// JSONL file indexed at startup.
    pub documents: Option<PathBuf>,
    /// Token expected in `X-ADMIN-TOKEN` for mutating endpoints.
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            stop_words: String::new(),
            options: EngineOptions::default(),
            request_window: DEFAULT_WINDOW,
            documents: None,
            admin_token: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<SearchEngine>>,
    pub requests: Arc<Mutex<RequestLog>>,
    pub admin_token: Option<Arc<str>>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Parsed like the CLI's `--status`, so any letter case is accepted.
    #[serde(default, deserialize_with = "status_from_str")]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub parallel: bool,
}

fn status_from_str<'de, D>(deserializer: D) -> std::result::Result<Option<DocumentStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| raw.parse().map_err(de::Error::custom))
        .transpose()
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub relevance: f64,
    pub rating: i32,
    pub status: DocumentStatus,
    /// Document text with matched query words wrapped in `<em>`.
    pub text: String,
}

#[derive(Deserialize)]
pub struct MatchParams {
    pub q: String,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub id: DocumentId,
    pub status: DocumentStatus,
    pub words: Vec<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub documents: usize,
    pub requests: usize,
    pub no_result_requests: usize,
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let stop_words = StopWords::from_text(&config.stop_words).context("parsing stop words")?;
    let mut engine = SearchEngine::with_options(stop_words, config.options);
    if let Some(path) = &config.documents {
        load_documents(&mut engine, path)?;
    }
    tracing::info!(documents = engine.document_count(), "search engine ready");

    let app_state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        requests: Arc::new(Mutex::new(RequestLog::with_window(config.request_window))),
        admin_token: config.admin_token.map(Arc::from),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/documents", post(add_document))
        .route("/documents/dedup", post(dedup_documents))
        .route("/documents/:id", delete(remove_document))
        .route("/documents/:id/match", get(match_handler))
        .route("/documents/:id/words", get(words_handler))
        .with_state(app_state)
        .layer(cors_layer(std::env::var("CORS_ALLOW_ORIGIN").ok().as_deref()))
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Browsers may call the API from the origins in `allowed` (comma separated).
/// With no usable origin every origin is accepted.
fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed
        .into_iter()
        .flat_map(|list| list.split(','))
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

fn load_documents(engine: &mut SearchEngine, path: &std::path::Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: DocumentInput = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed document", path.display(), n + 1))?;
        engine
            .add_document(doc.id, &doc.text, doc.status, &doc.ratings)
            .with_context(|| format!("{}:{}: rejected document", path.display(), n + 1))?;
    }
    Ok(())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let status = params.status.unwrap_or_default();
    let policy = ExecutionPolicy::from_flag(params.parallel);

    let engine = state.engine.read();
    let documents = engine
        .find_top_documents_with(policy, &params.q, |_, doc_status, _| doc_status == status)
        .map_err(error_response)?;
    state.requests.lock().record(documents.len());

    let query = engine.parse_query(&params.q).map_err(error_response)?;
    let results = documents
        .iter()
        .filter_map(|doc| {
            let record = engine.document(doc.id)?;
            Some(SearchHit {
                id: doc.id,
                relevance: doc.relevance,
                rating: doc.rating,
                status: record.status,
                text: highlight_terms(record.text(), &query.plus),
            })
        })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        results,
    }))
}

pub async fn match_handler(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Query(params): Query<MatchParams>,
) -> Result<Json<MatchResponse>, ApiError> {
    let engine = state.engine.read();
    let (words, status) = engine
        .match_document_with(ExecutionPolicy::from_flag(params.parallel), &params.q, id)
        .map_err(error_response)?;
    Ok(Json(MatchResponse {
        id,
        status,
        words: words.into_iter().map(str::to_owned).collect(),
    }))
}

/// Unknown ids give an empty object rather than 404.
pub async fn words_handler(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Json<BTreeMap<String, f64>> {
    let engine = state.engine.read();
    let words = engine
        .word_frequencies(id)
        .into_iter()
        .map(|(word, tf)| (word.to_owned(), tf))
        .collect();
    Json(words)
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let documents = state.engine.read().document_count();
    let requests = state.requests.lock();
    Json(StatsResponse {
        documents,
        requests: requests.len(),
        no_result_requests: requests.no_result_requests(),
    })
}

// --- Admin endpoints ---
async fn add_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(doc): Json<DocumentInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    authorize(&state, &headers)?;
    let mut engine = state.engine.write();
    engine
        .add_document(doc.id, &doc.text, doc.status, &doc.ratings)
        .map_err(error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": doc.id, "documents": engine.document_count() })),
    ))
}

async fn remove_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut engine = state.engine.write();
    let removed = engine.document(id).is_some();
    engine.remove_document_with(ExecutionPolicy::Parallel, id);
    Ok(Json(serde_json::json!({ "id": id, "removed": removed })))
}

async fn dedup_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut engine = state.engine.write();
    let removed = remove_duplicates(&mut engine);
    Ok(Json(serde_json::json!({ "removed": removed, "documents": engine.document_count() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == &**required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn error_response(err: SearchError) -> ApiError {
    let status = match err {
        SearchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SearchError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, err.to_string())
}

/// Wrap every space separated word of `text` that is one of `terms` in
/// `<em>`. Spacing is preserved.
fn highlight_terms(text: &str, terms: &[&str]) -> String {
    text.split(' ')
        .map(|word| {
            if terms.contains(&word) {
                format!("<em>{word}</em>")
            } else {
                word.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_whole_words_only() {
        assert_eq!(
            highlight_terms("curly cat  curlyhair cat", &["cat", "curly"]),
            "<em>curly</em> <em>cat</em>  curlyhair <em>cat</em>"
        );
        assert_eq!(highlight_terms("dog", &[]), "dog");
    }

    #[test]
    fn status_param_ignores_case() {
        let parse = |raw: &str| -> Option<DocumentStatus> {
            let value = serde_json::json!({ "q": "cat", "status": raw });
            serde_json::from_value::<SearchParams>(value).ok()?.status
        };
        assert_eq!(parse("Banned"), Some(DocumentStatus::Banned));
        assert_eq!(parse("IRRELEVANT"), Some(DocumentStatus::Irrelevant));
        assert_eq!(parse("unknown"), None);
        let missing: SearchParams = serde_json::from_value(serde_json::json!({ "q": "cat" })).unwrap();
        assert!(missing.status.is_none());
    }

    #[test]
    fn maps_search_errors_to_status() {
        let (status, _) = error_response(SearchError::DocumentNotFound(3));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = error_response(SearchError::InvalidInput("bad".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "invalid input: bad");
    }
}
