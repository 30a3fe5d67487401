use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::broadcast::{BroadcastReport, Broadcaster};

/// Manual broadcast trigger, gated by a static bearer token.
#[derive(Clone)]
struct AdminState {
    broadcaster: Arc<Broadcaster>,
    bearer_token: String,
}

pub async fn serve(
    listen_addr: &str,
    bearer_token: String,
    broadcaster: Arc<Broadcaster>,
) -> Result<()> {
    let state = AdminState {
        broadcaster,
        bearer_token,
    };

    let app = Router::new()
        .route("/broadcast", post(trigger_broadcast))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind admin endpoint to {listen_addr}"))?;

    info!("Admin trigger listening on {}", listen_addr);

    axum::serve(listener, app).await.context("Admin server error")?;
    Ok(())
}

/// POST /broadcast runs a broadcast right away and returns its report.
async fn trigger_broadcast(
    State(state): State<AdminState>,
    headers: HeaderMap,
) -> Result<Json<BroadcastReport>, StatusCode> {
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !bearer_matches(presented, &state.bearer_token) {
        warn!("Rejected broadcast trigger with a bad or missing token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    info!("Manual broadcast triggered");
    Ok(Json(state.broadcaster.run().await))
}

fn bearer_matches(header: Option<&str>, token: &str) -> bool {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}
