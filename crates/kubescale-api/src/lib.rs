//! kubescale-api — REST API for kubescale.
//!
//! Provides axum route handlers for inspecting and editing the namespaces
//! and workloads the scaler manages, and for triggering a sweep on demand.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/namespaces` | List namespaces |
//! | GET | `/api/v1/namespaces/{name}` | Get a namespace |
//! | PUT | `/api/v1/namespaces/{name}` | Create or replace a namespace |
//! | GET | `/api/v1/resources` | List all resources |
//! | POST | `/api/v1/resources` | Create or replace a resource |
//! | GET | `/api/v1/resources/{kind}` | List resources of one kind |
//! | GET | `/api/v1/resources/{kind}/{namespace}/{name}` | Get a resource |
//! | DELETE | `/api/v1/resources/{kind}/{namespace}/{name}` | Delete a resource |
//! | PATCH | `/api/v1/resources/{kind}/{namespace}/{name}/annotations` | Merge annotations |
//! | POST | `/api/v1/sweep` | Run one sweep now, or at `?at=<RFC 3339>` |

pub mod handlers;

use axum::Router;
use axum::routing::{get, patch, post};
use kubescale_core::ScalerConfig;
use kubescale_scaler::Scaler;
use kubescale_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub scaler: Scaler<StateStore>,
}

impl ApiState {
    pub fn new(store: StateStore, config: &ScalerConfig) -> Self {
        Self {
            scaler: Scaler::new(store.clone(), config),
            store,
        }
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/namespaces", get(handlers::list_namespaces))
        .route(
            "/namespaces/{name}",
            get(handlers::get_namespace).put(handlers::put_namespace),
        )
        .route(
            "/resources",
            get(handlers::list_all_resources).post(handlers::put_resource),
        )
        .route("/resources/{kind}", get(handlers::list_resources))
        .route(
            "/resources/{kind}/{namespace}/{name}",
            get(handlers::get_resource).delete(handlers::delete_resource),
        )
        .route(
            "/resources/{kind}/{namespace}/{name}/annotations",
            patch(handlers::patch_annotations),
        )
        .route("/sweep", post(handlers::run_sweep))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
