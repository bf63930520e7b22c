//! Stats API handlers.
//!
//! Each handler clones the latest controller snapshot out of the watch
//! channel and returns JSON.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use qscale_core::{LoopState, PoolKind};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

#[derive(serde::Serialize)]
struct StatusBody {
    state: LoopState,
}

/// GET /api/v1/status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow().clone();
    ApiResponse::ok(StatusBody {
        state: snapshot.state,
    })
}

/// GET /api/v1/pools
pub async fn list_pools(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow().clone();
    ApiResponse::ok(snapshot.pools)
}

/// GET /api/v1/pools/{kind}
pub async fn get_pool(
    State(state): State<ApiState>,
    Path(kind): Path<String>,
) -> impl IntoResponse {
    let Some(kind) = PoolKind::parse(&kind) else {
        debug!(%kind, "stats requested for unknown pool kind");
        return error_response("unknown pool kind", StatusCode::NOT_FOUND).into_response();
    };

    let snapshot = state.snapshot.borrow().clone();
    match snapshot.pools.into_iter().find(|p| p.kind == kind) {
        Some(stats) => ApiResponse::ok(stats).into_response(),
        None => {
            debug!(pool = %kind, "stats requested for untracked pool");
            error_response("pool not tracked", StatusCode::NOT_FOUND).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::sync::watch;
    use tower::util::ServiceExt;

    use qscale_core::{ControllerSnapshot, LoopState, PoolKind, PoolStats};

    use crate::build_router;

    fn snapshot() -> ControllerSnapshot {
        ControllerSnapshot {
            state: LoopState::Running,
            pools: vec![
                PoolStats {
                    kind: PoolKind::Filter,
                    workers: 3,
                    backlog: Some(12),
                    lambda: 3.0,
                    target: Some(3),
                    min_workers: 1,
                    max_workers: 150,
                    last_cycle_at: Some(1_700_000_000),
                },
                PoolStats::empty(PoolKind::Processor, 1, 20),
            ],
        }
    }

    async fn get(path: &str) -> (StatusCode, serde_json::Value) {
        let (_tx, rx) = watch::channel(snapshot());
        let router = build_router(rx);
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn status_reports_loop_state() {
        let (status, body) = get("/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["state"], "running");
    }

    #[tokio::test]
    async fn list_pools_returns_both() {
        let (status, body) = get("/api/v1/pools").await;
        assert_eq!(status, StatusCode::OK);
        let pools = body["data"].as_array().unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0]["kind"], "filter");
        assert_eq!(pools[0]["workers"], 3);
        assert_eq!(pools[0]["backlog"], 12);
    }

    #[tokio::test]
    async fn get_pool_by_kind() {
        let (status, body) = get("/api/v1/pools/processor").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "processor");
        assert_eq!(body["data"]["workers"], 0);
        assert_eq!(body["data"]["max_workers"], 20);
    }

    #[tokio::test]
    async fn unknown_pool_kind_is_404() {
        let (status, body) = get("/api/v1/pools/widget").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
