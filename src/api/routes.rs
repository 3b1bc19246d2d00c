//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::engine::{Quote, QuoteEngine, QuoteRequest};
use crate::store::CorridorStore;
use crate::types::{
    CorridorSnapshot, CorridorState, CurrencyPair, FeeQuote, RailscopeError, SignalId, SignalInput,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub store: Arc<CorridorStore>,
    pub quotes: QuoteEngine,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(store: Arc<CorridorStore>, quotes: QuoteEngine) -> Self {
        Self {
            started_at: store.clock().now(),
            store,
            quotes,
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub corridors: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingParams {
    pub amount_minor: u64,
    #[serde(default)]
    pub override_base_bps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: SignalId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResponse {
    pub ids: Vec<SignalId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Domain error rendered as `{ "error": ... }` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub RailscopeError);

impl From<RailscopeError> for ApiError {
    fn from(err: RailscopeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RailscopeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RailscopeError::UnknownCorridor(_) => StatusCode::NOT_FOUND,
            RailscopeError::InvalidRequest(_) | RailscopeError::UnknownStrategy(_) => {
                StatusCode::BAD_REQUEST
            }
            RailscopeError::RailSource { .. } => StatusCode::BAD_GATEWAY,
            RailscopeError::Aggregation(_) | RailscopeError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

fn pair_from_path(base: &str, quote: &str) -> Result<CurrencyPair, ApiError> {
    CurrencyPair::new(base, quote).map_err(|_| {
        ApiError(RailscopeError::UnknownCorridor(format!("{base}/{quote}")))
    })
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        corridors: state.store.corridors().len(),
        uptime_secs: (state.store.clock().now() - state.started_at).num_seconds(),
    })
}

/// GET /api/corridors
pub async fn get_corridors(State(state): State<AppState>) -> Json<CorridorSnapshot> {
    Json(state.store.get_states())
}

/// GET /api/corridors/:base/:quote
pub async fn get_corridor(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
) -> Result<Json<CorridorState>, ApiError> {
    let pair = pair_from_path(&base, &quote)?;
    state
        .store
        .get_state(&pair)
        .map(Json)
        .ok_or_else(|| ApiError(RailscopeError::UnknownCorridor(pair.to_string())))
}

/// GET /api/corridors/:base/:quote/pricing?amount_minor=&override_base_bps=
pub async fn get_pricing(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
    Query(params): Query<PricingParams>,
) -> Result<Json<FeeQuote>, ApiError> {
    let pair = pair_from_path(&base, &quote)?;
    let fee = state
        .store
        .compute_pricing(&pair, params.amount_minor, params.override_base_bps)?;
    Ok(Json(fee))
}

/// POST /api/signals
pub async fn post_signal(
    State(state): State<AppState>,
    Json(input): Json<SignalInput>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let id = state.store.ingest_signal(input).await?;
    Ok((StatusCode::CREATED, Json(IngestResponse { id })))
}

/// POST /api/signals/seed
pub async fn seed_signals(State(state): State<AppState>) -> Result<Json<SeedResponse>, ApiError> {
    let ids = state.store.seed_preset_signals().await?;
    Ok(Json(SeedResponse { ids }))
}

/// DELETE /api/signals
pub async fn clear_signals(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.store.clear_all_signals().await?;
    Ok(Json(ClearResponse { removed }))
}

/// POST /api/quote
pub async fn post_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state.quotes.quote(&request).await?;
    Ok(Json(quote))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
