//! Axum router and all HTTP handlers for bm-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Every read route fetches raw rows from the purchase
//! source and reconciles them per request; nothing is cached.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bm_analytics::seller_dashboard;
use bm_db::canonical_id;
use bm_reconcile::{reconcile, reconcile_inputs, ReconcileError, ReconcileReport, View};
use tracing::{info, warn};

use crate::{
    api_types::{
        DashboardResponse, ErrorResponse, HealthResponse, OrdersResponse, ReconcileRequest,
        ReconcileResponse,
    },
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are not applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/buyers/:buyer_id/orders", get(buyer_orders))
        .route("/v1/sellers/:seller_id/sales", get(seller_sales))
        .route("/v1/sellers/:seller_id/dashboard", get(seller_dashboard_handler))
        .route("/v1/reconcile", post(reconcile_posted))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub(crate) enum ApiError {
    /// 422: the input cannot be reconciled.
    Malformed(ReconcileError),
    /// 502: the purchase store failed.
    Store(anyhow::Error),
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        ApiError::Malformed(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, error) = match self {
            ApiError::Malformed(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_record",
                e.to_string(),
            ),
            ApiError::Store(e) => {
                warn!(error = %format!("{e:#}"), "purchase store failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "store_unavailable",
                    format!("{e:#}"),
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                error,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Order views
// ---------------------------------------------------------------------------

/// `seller_id` must already be canonical: totals compare it byte-for-byte
/// against item seller ids.
async fn seller_report(st: &AppState, seller_id: &str) -> Result<ReconcileReport, ApiError> {
    let rows = st.source.records_for_seller(seller_id).await?;
    let view = View::Seller(seller_id.to_string());
    Ok(reconcile(&rows, &view, st.now(), &st.settings.reconcile)?)
}

pub(crate) async fn buyer_orders(
    State(st): State<Arc<AppState>>,
    Path(buyer_id): Path<String>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let buyer_id = canonical_id(&buyer_id);
    let rows = st.source.records_for_buyer(&buyer_id).await?;
    let report = reconcile(&rows, &View::Buyer, st.now(), &st.settings.reconcile)?;
    Ok(Json(OrdersResponse {
        view: View::Buyer,
        count: report.orders.len(),
        orders: report.orders,
    }))
}

pub(crate) async fn seller_sales(
    State(st): State<Arc<AppState>>,
    Path(seller_id): Path<String>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let seller_id = canonical_id(&seller_id);
    let report = seller_report(&st, &seller_id).await?;
    Ok(Json(OrdersResponse {
        view: View::Seller(seller_id),
        count: report.orders.len(),
        orders: report.orders,
    }))
}

pub(crate) async fn seller_dashboard_handler(
    State(st): State<Arc<AppState>>,
    Path(seller_id): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let seller_id = canonical_id(&seller_id);
    let report = seller_report(&st, &seller_id).await?;
    let plan = st.source.seller_plan(&seller_id).await?;
    let dashboard = seller_dashboard(
        &seller_id,
        &report.orders,
        plan.as_deref(),
        &st.settings.payout,
        &st.settings.dashboard,
        st.now(),
    );
    Ok(Json(DashboardResponse { plan, dashboard }))
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile
// ---------------------------------------------------------------------------

/// Reconcile a caller-supplied record list without touching the store.
pub(crate) async fn reconcile_posted(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let view = match req.seller_id {
        Some(seller_id) => View::Seller(seller_id),
        None => View::Buyer,
    };
    let now = req.now.unwrap_or_else(|| st.now());
    let posted = req.records.len();

    let report = reconcile_inputs(req.records, &view, now, &st.settings.reconcile)?;
    info!(
        posted,
        kept = report.orders.len(),
        "reconcile/posted"
    );

    Ok(Json(ReconcileResponse {
        superseded: report.superseded_count(),
        abandoned: report.abandoned_count(),
        view,
        orders: report.orders,
        resolutions: report.resolutions,
    }))
}
