use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;

use pulso_analyze::{analysis_stream, analyze_one, AnalyzeOptions, ProgressEvent};
use pulso_core::{Category, Client};
use pulso_insights::{
    build_insights, build_metrics, build_seller_details, build_sellers_summary, filter_clients,
    ClientFilter, DashboardMetrics, InsightsData, SellerDetail, SellersSummary,
};
use pulso_model::{CompletionClient, KnownModel, KNOWN_MODELS};
use pulso_store::{ClientsCache, KeyValueStore};

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

// ── App State ──

pub struct AppState {
    pub client: Arc<dyn CompletionClient>,
    pub csv_path: PathBuf,
    pub cache: ClientsCache<Box<dyn KeyValueStore>>,
    pub options: AnalyzeOptions,
}

impl AppState {
    /// Imported CSV when one exists, else the configured file.
    fn base_clients(&self) -> anyhow::Result<Vec<Client>> {
        match self.cache.load_custom_csv() {
            Ok(Some(custom)) => return Ok(custom),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "imported CSV unreadable, using configured file"),
        }
        Ok(pulso_ingest::load_clients_csv(&self.csv_path)?)
    }

    /// Base clients with cached categories overlaid.
    fn clients(&self) -> anyhow::Result<Vec<Client>> {
        Ok(self.cache.load_clients(self.base_clients()?))
    }
}

// ── Error Handling ──

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        let body = serde_json::json!({ "error": self.0.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn bad_request(message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// ── Entrypoint ──

pub async fn serve(state: AppState, config: ServeConfig) -> anyhow::Result<()> {
    let app = router(Arc::new(state));
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "pulso HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Build the router (for testing without binding to a port).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/clients", get(get_clients))
        .route("/api/analyze-all", get(analyze_all))
        .route("/api/analyze", post(post_analyze))
        .route("/api/models", get(get_models))
        .route("/api/metrics", get(get_metrics))
        .route("/api/insights", get(get_insights))
        .route("/api/sellers", get(get_sellers))
        .route("/api/cache", delete(delete_cache))
        .route("/api/custom-csv", put(put_custom_csv).delete(delete_custom_csv))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ── GET /api/clients ──

#[derive(Serialize)]
struct ClientsResponse {
    clients: Vec<Client>,
    /// Size of the unfiltered list.
    total: usize,
}

async fn get_clients(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ClientFilter>,
) -> Result<Json<ClientsResponse>, AppError> {
    let all = state.clients()?;
    let clients = filter_clients(&all, &filter).into_iter().cloned().collect();
    Ok(Json(ClientsResponse {
        clients,
        total: all.len(),
    }))
}

// ── GET /api/analyze-all (SSE) ──

#[derive(Deserialize)]
struct AnalyzeAllQuery {
    model: Option<String>,
}

async fn analyze_all(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AnalyzeAllQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let clients = state.base_clients()?;
    let mut opts = state.options.clone();
    if let Some(model) = q.model.filter(|m| !m.trim().is_empty()) {
        opts.model = model;
    }
    tracing::info!(clients = clients.len(), model = %opts.model, "analyze-all requested");

    let events = analysis_stream(state.client.clone(), clients, opts);
    let stream = async_stream::stream! {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            if let ProgressEvent::Done { clients, .. } = &event {
                if let Err(e) = state.cache.save_clients(clients) {
                    tracing::warn!(error = %e, "failed to save analysis cache");
                }
            }
            yield Ok(sse_frame(&event));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn sse_frame(event: &ProgressEvent) -> Event {
    Event::default().data(event.to_ndjson().trim_end())
}

// ── POST /api/analyze ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    transcription: String,
    model: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    client_id: String,
    category: Category,
}

async fn post_analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Response, AppError> {
    if body.client_id.trim().is_empty() || body.transcription.trim().is_empty() {
        return Ok(bad_request("clientId and transcription are required"));
    }
    let model = body.model.unwrap_or_else(|| state.options.model.clone());
    let category = analyze_one(
        state.client.as_ref(),
        &body.client_id,
        &body.transcription,
        &model,
    )
    .await?;
    Ok(Json(AnalyzeResponse {
        client_id: body.client_id,
        category,
    })
    .into_response())
}

// ── GET /api/models ──

#[derive(Serialize)]
struct ModelsResponse {
    models: &'static [KnownModel],
    default: String,
}

async fn get_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: KNOWN_MODELS,
        default: state.options.model.clone(),
    })
}

// ── Derived views ──

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardMetrics>, AppError> {
    Ok(Json(build_metrics(&state.clients()?)))
}

async fn get_insights(State(state): State<Arc<AppState>>) -> Result<Json<InsightsData>, AppError> {
    Ok(Json(build_insights(&state.clients()?)))
}

#[derive(Serialize)]
struct SellersResponse {
    sellers: Vec<SellerDetail>,
    summary: SellersSummary,
}

async fn get_sellers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SellersResponse>, AppError> {
    let sellers = build_seller_details(&state.clients()?);
    let summary = build_sellers_summary(&sellers);
    Ok(Json(SellersResponse { sellers, summary }))
}

// ── Cache ──

async fn delete_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.cache.clear_clients()?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn put_custom_csv(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Response, AppError> {
    let clients = match pulso_ingest::parse_clients_str(&body) {
        Ok(c) => c,
        Err(e) => return Ok(bad_request(&e.to_string())),
    };
    state.cache.save_custom_csv(&clients)?;
    // Categories belong to the previous dataset.
    state.cache.clear_clients()?;
    Ok(Json(serde_json::json!({ "ok": true, "total": clients.len() })).into_response())
}

async fn delete_custom_csv(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.cache.clear_custom_csv()?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
