//! qscale-api — read-only statistics endpoints.
//!
//! Serves the controller's latest [`ControllerSnapshot`] out of a watch
//! channel. Handlers never lock anything: the controller task is the
//! single writer and readers just clone the current value.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | Loop state |
//! | GET | `/api/v1/pools` | Statistics for both pools |
//! | GET | `/api/v1/pools/{kind}` | Statistics for one pool |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use tokio::sync::watch;

use qscale_core::ControllerSnapshot;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub snapshot: watch::Receiver<ControllerSnapshot>,
}

/// Build the stats API router.
pub fn build_router(snapshot: watch::Receiver<ControllerSnapshot>) -> Router {
    let state = ApiState { snapshot };

    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/pools", get(handlers::list_pools))
        .route("/pools/{kind}", get(handlers::get_pool))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
