//! Request and response types for all bm-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use bm_analytics::SellerDashboard;
use bm_reconcile::{RecordInput, Resolution, ResolvedOrder, View};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "malformed_record" | "store_unavailable"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Order views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub view: View,
    pub count: usize,
    /// Newest first.
    pub orders: Vec<ResolvedOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub plan: Option<String>,
    #[serde(flatten)]
    pub dashboard: SellerDashboard,
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub records: Vec<RecordInput>,
    /// Seller view when present, buyer view otherwise.
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Overrides the daemon clock for this call.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub view: View,
    pub orders: Vec<ResolvedOrder>,
    /// One entry per posted record, in posted order.
    pub resolutions: Vec<Resolution>,
    pub superseded: usize,
    pub abandoned: usize,
}
