//! Health check and status endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use waypoint_common::ConnectionId;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    connections: usize,
    admin_id: Option<ConnectionId>,
    bus_id: Option<ConnectionId>,
    #[serde(rename = "uptime_secs")]
    uptime_secs: u64,
}

/// Live connection count and current role holders
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let assignments = state.hub.assignments();

    Json(StatsResponse {
        connections: state.hub.connection_count(),
        admin_id: assignments.admin_id,
        bus_id: assignments.bus_id,
        uptime_secs: state.uptime_secs(),
    })
}
