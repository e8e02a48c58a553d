// Campaign Import - Web Server
// REST API with Axum over the same import pipeline as the CLI

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use campaign_import::{
    derive, parse_and_validate, summarize, CampaignMetrics, CampaignRecord, Config, ImportError,
    ImportSummary, Importer, PortfolioSummary, Preview, RecordViolation, SqliteStore,
    StoredCampaign, StoredImportOutcome,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<SqliteStore>,
    error_display_limit: usize,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
        .into_response()
    }

    /// Failure that still carries a payload (e.g. a blocked import with its errors)
    fn rejected(status: StatusCode, data: T, error: String) -> Response {
        (
            status,
            Json(Self {
                success: false,
                data: Some(data),
                error: Some(error),
            }),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{}: {:#}", context, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
}

#[derive(Deserialize)]
struct UploadParams {
    file_name: Option<String>,
}

impl UploadParams {
    fn file_name(&self) -> String {
        self.file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "upload.csv".to_string())
    }
}

/// Optional `startDate` range for listings
#[derive(Deserialize)]
struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Preview/import payload: the full result plus the lines a UI should show
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WithDisplay<T> {
    #[serde(flatten)]
    result: T,
    display_errors: Vec<String>,
}

/// Campaign plus derived metrics
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignResponse {
    #[serde(flatten)]
    campaign: StoredCampaign,
    metrics: CampaignMetrics,
}

impl From<StoredCampaign> for CampaignResponse {
    fn from(campaign: StoredCampaign) -> Self {
        let metrics = derive(&campaign.record);
        Self { campaign, metrics }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// POST /api/import/preview?file_name=.. - Parse and validate, commit nothing
async fn preview_import(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let file_name = params.file_name();

    match parse_and_validate(&body) {
        Ok(preview) => {
            let display_errors =
                campaign_import::display_error_lines(&preview.errors, state.error_display_limit);
            ApiResponse::ok(WithDisplay::<Preview> {
                result: preview,
                display_errors,
            })
        }
        Err(e) => {
            info!(file = %file_name, "preview rejected: {}", e);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

/// POST /api/import?file_name=.. - Full all-or-nothing import
async fn import_file(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let file_name = params.file_name();
    let importer = Importer::new(state.store.clone());

    match importer.import_file(&body, &file_name).await {
        Ok(summary) => {
            let display_errors = summary.display_lines(state.error_display_limit);
            let committed = summary.is_committed();
            let error_count = summary.errors.len();
            let payload = WithDisplay::<ImportSummary> {
                result: summary,
                display_errors,
            };

            if committed {
                ApiResponse::ok(payload)
            } else {
                let message = ImportError::ValidationFailed { error_count }.to_string();
                ApiResponse::rejected(StatusCode::UNPROCESSABLE_ENTITY, payload, message)
            }
        }
        Err(e @ ImportError::StoreFailure(_)) => {
            error!(file = %file_name, "{}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// GET /api/campaigns?from=..&to=.. - Campaigns with metrics.
/// Newest first; latest start first when a date range is given.
async fn list_campaigns(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Response {
    let campaigns = match (range.from, range.to) {
        (None, None) => state.store.list_campaigns(),
        (from, to) => state.store.list_campaigns_between(from, to),
    };

    match campaigns {
        Ok(campaigns) => {
            let response: Vec<CampaignResponse> =
                campaigns.into_iter().map(CampaignResponse::from).collect();
            ApiResponse::ok(response)
        }
        Err(e) => internal_error("Error listing campaigns", e),
    }
}

fn invalid_campaign(violations: Vec<RecordViolation>) -> Response {
    let message = format!("invalid campaign: {} violation(s)", violations.len());
    ApiResponse::rejected(StatusCode::UNPROCESSABLE_ENTITY, violations, message)
}

/// POST /api/campaigns - Manual entry
async fn create_campaign(
    State(state): State<AppState>,
    Json(record): Json<CampaignRecord>,
) -> Response {
    if let Err(violations) = record.validate() {
        return invalid_campaign(violations);
    }

    match state.store.create_campaign(&record) {
        Ok(campaign) => {
            info!(id = %campaign.id, "campaign created");
            let body = CampaignResponse::from(campaign);
            (StatusCode::CREATED, ApiResponse::ok(body)).into_response()
        }
        Err(e) => internal_error("Error creating campaign", e),
    }
}

/// PUT /api/campaigns/:id - Edit an existing campaign
async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<CampaignRecord>,
) -> Response {
    if let Err(violations) = record.validate() {
        return invalid_campaign(violations);
    }

    match state.store.update_campaign(&id, &record) {
        Ok(Some(campaign)) => ApiResponse::ok(CampaignResponse::from(campaign)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("campaign {} not found", id)),
        Err(e) => internal_error("Error updating campaign", e),
    }
}

/// GET /api/campaigns/:id
async fn get_campaign(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_campaign(&id) {
        Ok(Some(campaign)) => ApiResponse::ok(CampaignResponse::from(campaign)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("campaign {} not found", id)),
        Err(e) => internal_error("Error loading campaign", e),
    }
}

/// DELETE /api/campaigns/:id
async fn delete_campaign(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete_campaign(&id) {
        Ok(true) => ApiResponse::ok(id),
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("campaign {} not found", id)),
        Err(e) => internal_error("Error deleting campaign", e),
    }
}

/// GET /api/history - Import attempts, newest first
async fn list_history(State(state): State<AppState>) -> Response {
    match state.store.list_import_history() {
        Ok(history) => ApiResponse::<Vec<StoredImportOutcome>>::ok(history),
        Err(e) => internal_error("Error listing import history", e),
    }
}

/// GET /api/summary - Portfolio totals
async fn get_summary(State(state): State<AppState>) -> Response {
    match state.store.list_campaigns() {
        Ok(campaigns) => {
            let summary: PortfolioSummary = summarize(campaigns.iter().map(|c| &c.record));
            ApiResponse::ok(summary)
        }
        Err(e) => internal_error("Error computing summary", e),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/import/preview", post(preview_import))
        .route("/import", post(import_file))
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/campaigns/:id",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/history", get(list_history))
        .route("/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let store = SqliteStore::open(&config.db_path)?;

    let state = AppState {
        store: Arc::new(store),
        error_display_limit: config.error_display_limit,
    };

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!(addr = %config.server_addr, db = %config.db_path.display(), "server running");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}
