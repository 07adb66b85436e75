//! HTTP Server for the asset inventory API.
//!
//! One dataset is held per server process. Loading replaces it; every
//! query endpoint reads the current dataset and takes the same filter
//! parameters (`region`, `decision`, `year_min`, `year_max`,
//! `similarity_min`).
//!
//! # API Endpoints
//!
//! | Method | Path                 | Description                           |
//! |--------|----------------------|---------------------------------------|
//! | GET    | `/health`            | Health check                          |
//! | POST   | `/api/upload`        | Upload one or more CSV files          |
//! | POST   | `/api/load`          | Load paths/URLs, or the demo dataset  |
//! | GET    | `/api/options`       | Filter widget values                  |
//! | GET    | `/api/records`       | Filtered records                      |
//! | GET    | `/api/metrics`       | Strategic summary and region rollup   |
//! | GET    | `/api/details`       | Detail analytics                      |
//! | GET    | `/api/export/csv`    | Filtered view as CSV                  |
//! | GET    | `/api/export/xlsx`   | Filtered view as a workbook           |
//! | GET    | `/api/logs`          | SSE stream for real-time logs         |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::types::{LoadRequest, LoadResponse, RecordsResponse};
use crate::aggregate::{aggregate, details};
use crate::cache::{CacheKey, QueryCache};
use crate::config::AppConfig;
use crate::demo::{demo_batch, DEMO_ROWS, DEMO_SEED};
use crate::error::{ServerError, ServerResult};
use crate::export::{export_csv_with_limit, export_file_name, export_spreadsheet_with_limit};
use crate::ingest::{Ingested, SourceDescriptor};
use crate::models::{AssetRecord, RecordSet};
use crate::query::{filter, filter_options, FilterPredicates};
use crate::transform::{build_outcome, ingest_and_normalize, LoadOutcome, LoadSummary};

/// Largest accepted upload request
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// =============================================================================
// State
// =============================================================================

/// Session dataset plus the query cache in front of it
pub struct AppState {
    config: AppConfig,
    dataset: RwLock<Option<RecordSet>>,
    cache: Mutex<QueryCache<Value>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let cache = if config.cache_ttl.is_zero() {
            QueryCache::disabled()
        } else {
            QueryCache::new(config.cache_ttl)
        };
        Self {
            config,
            dataset: RwLock::new(None),
            cache: Mutex::new(cache),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The current dataset
    pub async fn current(&self) -> ServerResult<RecordSet> {
        self.dataset.read().await.clone().ok_or(ServerError::NotLoaded)
    }

    /// Install a freshly loaded dataset and drop cache entries of the old one
    pub async fn replace(&self, outcome: &LoadOutcome) -> LoadSummary {
        let id = outcome.records.id();
        *self.dataset.write().await = Some(outcome.records.clone());
        self.cache.lock().await.retain_dataset(id);
        LoadSummary::from(outcome)
    }

    /// Load sources. On failure the previous dataset stays in place.
    pub async fn load_sources(&self, sources: &[SourceDescriptor]) -> ServerResult<LoadSummary> {
        let outcome = ingest_and_normalize(sources).await?;
        Ok(self.replace(&outcome).await)
    }

    pub async fn load_demo(&self) -> ServerResult<LoadSummary> {
        log_info(format!("🎲 Gerando {} registros de demonstração", DEMO_ROWS));
        let outcome = build_outcome(Ingested {
            batches: vec![demo_batch(DEMO_ROWS, DEMO_SEED)],
            failures: Vec::new(),
        })?;
        Ok(self.replace(&outcome).await)
    }

    /// The current dataset, once the predicates are known to be usable
    async fn view_source(&self, predicates: &FilterPredicates) -> ServerResult<RecordSet> {
        predicates.validate().map_err(ServerError::BadRequest)?;
        self.current().await
    }

    /// Run `compute` on the filtered view, memoized per dataset and filter
    async fn cached<T, F>(
        &self,
        op: &'static str,
        predicates: &FilterPredicates,
        compute: F,
    ) -> ServerResult<Value>
    where
        T: Serialize,
        F: FnOnce(&[AssetRecord]) -> T,
    {
        let dataset = self.view_source(predicates).await?;
        let key = CacheKey::new(op, dataset.id(), predicates)?;

        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.get(&key) {
            return Ok(value);
        }
        let view = filter(&dataset, predicates);
        let value = serde_json::to_value(compute(&view))?;
        cache.insert(key, value.clone());
        Ok(value)
    }
}

// =============================================================================
// Server
// =============================================================================

/// Build the router around a shared state
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/load", post(load))
        .route("/api/options", get(options))
        .route("/api/records", get(records))
        .route("/api/metrics", get(metrics))
        .route("/api/details", get(detail_views))
        .route("/api/export/csv", get(export_csv_file))
        .route("/api/export/xlsx", get(export_xlsx_file))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server, auto-loading the configured sources first
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let state = Arc::new(AppState::new(config));

    if state.config().auto_load {
        let sources = state.config().auto_load_sources();
        if sources.is_empty() {
            log_info("Nenhuma fonte configurada para carga automática");
        } else if let Err(e) = state.load_sources(&sources).await {
            log_warning(format!("Carga automática falhou: {}", e));
        }
    }

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Patrimônio server running on http://localhost:{}", port);
    println!("   POST /api/upload      - Upload CSV files");
    println!("   POST /api/load        - Load paths, URLs or demo data");
    println!("   GET  /api/records     - Filtered records");
    println!("   GET  /api/metrics     - Summary metrics");
    println!("   GET  /api/export/csv  - Export filtered view");
    println!("   GET  /api/logs        - SSE log stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let loaded = state.current().await.ok();
    Json(json!({
        "status": "ok",
        "service": "patrimonio",
        "version": env!("CARGO_PKG_VERSION"),
        "datasetId": loaded.as_ref().map(|d| d.id().to_string()),
        "totalRecords": loaded.as_ref().map(|d| d.len()).unwrap_or(0),
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Every `file` field becomes one upload source
async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<LoadResponse>> {
    let mut sources = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(String::from)
            .unwrap_or_else(|| format!("upload_{}.csv", sources.len() + 1));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        sources.push(SourceDescriptor::Upload {
            name,
            bytes: bytes.to_vec(),
        });
    }

    if sources.is_empty() {
        return Err(ServerError::BadRequest("No file provided".to_string()));
    }

    log_info(format!("📤 {} arquivo(s) recebido(s)", sources.len()));
    let summary = state.load_sources(&sources).await?;
    Ok(Json(summary.into()))
}

async fn load(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> ServerResult<Json<LoadResponse>> {
    let summary = if request.demo {
        state.load_demo().await?
    } else {
        let sources: Vec<SourceDescriptor> = request
            .sources
            .iter()
            .map(|s| SourceDescriptor::from_arg(s))
            .collect();
        if sources.is_empty() {
            return Err(ServerError::BadRequest("No source provided".to_string()));
        }
        state.load_sources(&sources).await?
    };
    Ok(Json(summary.into()))
}

async fn options(State(state): State<Arc<AppState>>) -> ServerResult<Json<Value>> {
    let value = state
        .cached("options", &FilterPredicates::default(), filter_options)
        .await?;
    Ok(Json(value))
}

// Not cached: the view can be as large as the dataset.
async fn records(
    State(state): State<Arc<AppState>>,
    Query(predicates): Query<FilterPredicates>,
) -> ServerResult<Json<RecordsResponse>> {
    let dataset = state.view_source(&predicates).await?;
    let records = filter(&dataset, &predicates);
    Ok(Json(RecordsResponse {
        total: records.len(),
        records,
    }))
}

async fn metrics(
    State(state): State<Arc<AppState>>,
    Query(predicates): Query<FilterPredicates>,
) -> ServerResult<Json<Value>> {
    Ok(Json(state.cached("metrics", &predicates, aggregate).await?))
}

async fn detail_views(
    State(state): State<Arc<AppState>>,
    Query(predicates): Query<FilterPredicates>,
) -> ServerResult<Json<Value>> {
    Ok(Json(state.cached("details", &predicates, details).await?))
}

async fn export_csv_file(
    State(state): State<Arc<AppState>>,
    Query(predicates): Query<FilterPredicates>,
) -> ServerResult<impl IntoResponse> {
    let dataset = state.view_source(&predicates).await?;
    let view = filter(&dataset, &predicates);
    let bytes = export_csv_with_limit(&view, state.config().export_row_limit)?;
    Ok(attachment("text/csv; charset=utf-8", "csv", bytes))
}

async fn export_xlsx_file(
    State(state): State<Arc<AppState>>,
    Query(predicates): Query<FilterPredicates>,
) -> ServerResult<impl IntoResponse> {
    let dataset = state.view_source(&predicates).await?;
    let view = filter(&dataset, &predicates);
    let bytes = export_spreadsheet_with_limit(&view, state.config().export_row_limit)?;
    Ok(attachment(XLSX_CONTENT_TYPE, "xlsx", bytes))
}

fn attachment(content_type: &str, extension: &str, bytes: Vec<u8>) -> impl IntoResponse {
    let name = export_file_name(extension, &chrono::Local::now());
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, body: &str) -> SourceDescriptor {
        SourceDescriptor::Upload {
            name: name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(AppConfig::default()))
    }

    #[tokio::test]
    async fn test_queries_before_load_are_not_loaded() {
        let state = state();
        let err = records(State(state.clone()), Query(FilterPredicates::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotLoaded));
    }

    #[tokio::test]
    async fn test_load_then_filter_and_metrics() {
        let state = state();
        let summary = state
            .load_sources(&[upload(
                "a.csv",
                "Location,SimilarityPct,RejectionJustification\n\
                 1.01 BRÁS,75.0%,RECLASSIFICAR\n\
                 2.01 SANTOS,30.0%,MANTER\n",
            )])
            .await
            .unwrap();
        assert_eq!(summary.total_records, 2);

        let predicates = FilterPredicates {
            similarity_min: Some(50.0),
            ..Default::default()
        };
        let Json(view) = records(State(state.clone()), Query(predicates.clone()))
            .await
            .unwrap();
        assert_eq!(view.total, 1);
        assert_eq!(view.records[0].region, "1.01 BRÁS");

        let Json(all) = metrics(State(state.clone()), Query(FilterPredicates::default()))
            .await
            .unwrap();
        assert_eq!(all["summary"]["total_itens"], 2);

        let Json(opts) = options(State(state.clone())).await.unwrap();
        assert_eq!(opts["regions"], json!(["1.01 BRÁS", "2.01 SANTOS"]));
    }

    #[tokio::test]
    async fn test_repeat_query_hits_cache() {
        let state = state();
        state.load_demo().await.unwrap();

        for _ in 0..2 {
            metrics(State(state.clone()), Query(FilterPredicates::default()))
                .await
                .unwrap();
        }
        let stats = state.cache.lock().await.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_records_are_not_cached() {
        let state = state();
        state.load_demo().await.unwrap();

        records(State(state.clone()), Query(FilterPredicates::default()))
            .await
            .unwrap();
        assert_eq!(state.cache.lock().await.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_non_finite_bound_is_rejected_with_or_without_cache() {
        let csv = "Location,SimilarityPct\n1.01 BRÁS,75.0%\n2.01 SANTOS,30.0%\n";
        let cached = state();
        let uncached = Arc::new(AppState::new(AppConfig {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        }));

        for state in [cached, uncached] {
            state.load_sources(&[upload("a.csv", csv)]).await.unwrap();

            // Warm the cache with the unfiltered view
            let Json(all) = metrics(State(state.clone()), Query(FilterPredicates::default()))
                .await
                .unwrap();
            assert_eq!(all["summary"]["total_itens"], 2);

            let nan = FilterPredicates {
                similarity_min: Some(f64::NAN),
                ..Default::default()
            };
            let err = metrics(State(state.clone()), Query(nan.clone()))
                .await
                .unwrap_err();
            assert!(matches!(err, ServerError::BadRequest(_)));
            let err = records(State(state.clone()), Query(nan)).await.unwrap_err();
            assert!(matches!(err, ServerError::BadRequest(_)));
        }

        let uri: axum::http::Uri = "http://localhost/api/metrics?similarity_min=NaN".parse().unwrap();
        assert!(Query::<FilterPredicates>::try_from_uri(&uri).is_err());
        let uri: axum::http::Uri = "http://localhost/api/metrics?similarity_min=50".parse().unwrap();
        let Query(parsed) = Query::<FilterPredicates>::try_from_uri(&uri).unwrap();
        assert_eq!(parsed.similarity_min, Some(50.0));
    }

    #[tokio::test]
    async fn test_reload_replaces_dataset_and_invalidates_cache() {
        let state = state();
        state
            .load_sources(&[upload("a.csv", "Location\nSANTOS\n")])
            .await
            .unwrap();
        let first = state.current().await.unwrap().id();
        metrics(State(state.clone()), Query(FilterPredicates::default()))
            .await
            .unwrap();

        state
            .load_sources(&[upload("b.csv", "Location\nBRÁS\nTAUBATÉ\n")])
            .await
            .unwrap();
        let current = state.current().await.unwrap();
        assert_ne!(current.id(), first);
        assert_eq!(current.len(), 2);
        assert_eq!(state.cache.lock().await.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_dataset() {
        let state = state();
        state.load_demo().await.unwrap();
        let before = state.current().await.unwrap().id();

        let err = state.load_sources(&[upload("empty.csv", "")]).await.unwrap_err();
        assert!(matches!(err, ServerError::Pipeline(_)));
        assert_eq!(state.current().await.unwrap().id(), before);
    }

    #[tokio::test]
    async fn test_load_request_without_sources_is_bad_request() {
        let err = load(State(state()), Json(LoadRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_export_respects_configured_limit() {
        let state = Arc::new(AppState::new(AppConfig {
            export_row_limit: 10,
            ..Default::default()
        }));
        state.load_demo().await.unwrap();

        let dataset = state.current().await.unwrap();
        let bytes = export_csv_with_limit(&dataset, state.config().export_row_limit).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 11);
    }
}
