//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore` and returns JSON responses.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use kubescale_core::{AnnotationSet, ResourceKind};
use kubescale_state::*;

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

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn state_error(e: StateError) -> Response {
    let status = match &e {
        StateError::NotFound(_) => StatusCode::NOT_FOUND,
        StateError::Conflict { .. } => StatusCode::CONFLICT,
        StateError::Invalid(_) | StateError::InvalidField { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

fn parse_kind(raw: &str) -> Result<ResourceKind, Response> {
    raw.parse::<ResourceKind>()
        .map_err(|e| error_response(&e, StatusCode::BAD_REQUEST))
}

// ── Namespaces ─────────────────────────────────────────────────

/// GET /api/v1/namespaces
pub async fn list_namespaces(State(state): State<ApiState>) -> Response {
    match state.store.list_namespaces() {
        Ok(namespaces) => ApiResponse::ok(namespaces).into_response(),
        Err(e) => state_error(e),
    }
}

/// GET /api/v1/namespaces/:name
pub async fn get_namespace(State(state): State<ApiState>, Path(name): Path<String>) -> Response {
    match state.store.get_namespace(&name) {
        Ok(Some(ns)) => ApiResponse::ok(ns).into_response(),
        Ok(None) => error_response("namespace not found", StatusCode::NOT_FOUND),
        Err(e) => state_error(e),
    }
}

/// Namespace body; the name comes from the path.
#[derive(serde::Deserialize)]
pub struct NamespaceRequest {
    #[serde(default)]
    pub annotations: AnnotationSet,
}

/// PUT /api/v1/namespaces/:name
pub async fn put_namespace(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<NamespaceRequest>,
) -> Response {
    let mut ns = NamespaceRecord::new(name);
    ns.annotations = req.annotations;
    match state.store.put_namespace(&ns) {
        Ok(version) => {
            ns.resource_version = version;
            info!(namespace = %ns.name, "namespace stored");
            ApiResponse::ok(ns).into_response()
        }
        Err(e) => state_error(e),
    }
}

// ── Resources ──────────────────────────────────────────────────

/// GET /api/v1/resources
pub async fn list_all_resources(State(state): State<ApiState>) -> Response {
    match state.store.list_all_resources() {
        Ok(resources) => ApiResponse::ok(resources).into_response(),
        Err(e) => state_error(e),
    }
}

/// GET /api/v1/resources/:kind
pub async fn list_resources(State(state): State<ApiState>, Path(kind): Path<String>) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.store.list_resources(kind) {
        Ok(resources) => ApiResponse::ok(resources).into_response(),
        Err(e) => state_error(e),
    }
}

/// POST /api/v1/resources
pub async fn put_resource(
    State(state): State<ApiState>,
    Json(mut res): Json<ResourceRecord>,
) -> Response {
    match state.store.put_resource(&res) {
        Ok(version) => {
            res.resource_version = version;
            info!(key = %res.table_key(), "resource stored");
            (StatusCode::CREATED, ApiResponse::ok(res)).into_response()
        }
        Err(e) => state_error(e),
    }
}

/// GET /api/v1/resources/:kind/:namespace/:name
pub async fn get_resource(
    State(state): State<ApiState>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.store.get_resource(kind, &namespace, &name) {
        Ok(Some(res)) => ApiResponse::ok(res).into_response(),
        Ok(None) => error_response("resource not found", StatusCode::NOT_FOUND),
        Err(e) => state_error(e),
    }
}

/// DELETE /api/v1/resources/:kind/:namespace/:name
pub async fn delete_resource(
    State(state): State<ApiState>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state.store.delete_resource(kind, &namespace, &name) {
        Ok(true) => ApiResponse::ok("deleted").into_response(),
        Ok(false) => error_response("resource not found", StatusCode::NOT_FOUND),
        Err(e) => state_error(e),
    }
}

/// Annotation patch: a `null` value removes the key.
pub type AnnotationPatch = BTreeMap<String, Option<String>>;

/// PATCH /api/v1/resources/:kind/:namespace/:name/annotations
pub async fn patch_annotations(
    State(state): State<ApiState>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
    Json(patch): Json<AnnotationPatch>,
) -> Response {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    let mut res = match state.store.get_resource(kind, &namespace, &name) {
        Ok(Some(res)) => res,
        Ok(None) => return error_response("resource not found", StatusCode::NOT_FOUND),
        Err(e) => return state_error(e),
    };

    for (key, value) in patch {
        match value {
            Some(value) => {
                res.annotations.insert(key, value);
            }
            None => {
                res.annotations.remove(&key);
            }
        }
    }

    match state.store.update_resource(&res) {
        Ok(version) => {
            res.resource_version = version;
            ApiResponse::ok(res).into_response()
        }
        Err(e) => {
            warn!(key = %res.table_key(), error = %e, "annotation patch rejected");
            state_error(e)
        }
    }
}

// ── Sweep ──────────────────────────────────────────────────────

/// Optional evaluation instant for an on-demand sweep.
#[derive(Debug, Default, serde::Deserialize)]
pub struct SweepQuery {
    /// RFC 3339 instant; defaults to now.
    pub at: Option<DateTime<Utc>>,
}

/// POST /api/v1/sweep?at=RFC3339
pub async fn run_sweep(State(state): State<ApiState>, Query(query): Query<SweepQuery>) -> Response {
    let now = query.at.unwrap_or_else(Utc::now);
    ApiResponse::ok(state.scaler.sweep(now)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubescale_core::ScalerConfig;
    use kubescale_core::annotations::{DOWNTIME_ANNOTATION, EXCLUDE_ANNOTATION};

    fn test_state() -> ApiState {
        let store = StateStore::open_in_memory().unwrap();
        ApiState::new(store, &ScalerConfig::default())
    }

    fn path(kind: &str, ns: &str, name: &str) -> Path<(String, String, String)> {
        Path((kind.to_string(), ns.to_string(), name.to_string()))
    }

    #[tokio::test]
    async fn list_namespaces_empty() {
        let resp = list_namespaces(State(test_state())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn put_and_get_namespace() {
        let state = test_state();
        let req = NamespaceRequest {
            annotations: AnnotationSet::from([(
                DOWNTIME_ANNOTATION.to_string(),
                "Sat-Sun 00:00-23:59".to_string(),
            )]),
        };

        let resp = put_namespace(State(state.clone()), Path("dev".to_string()), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_namespace(State(state.clone()), Path("dev".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let ns = state.store.get_namespace("dev").unwrap().unwrap();
        assert_eq!(ns.annotations[DOWNTIME_ANNOTATION], "Sat-Sun 00:00-23:59");
    }

    #[tokio::test]
    async fn get_nonexistent_namespace() {
        let resp = get_namespace(State(test_state()), Path("nope".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_and_get_resource() {
        let state = test_state();
        let res = ResourceRecord::deployment("default", "api", 2);

        let resp = put_resource(State(state.clone()), Json(res)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = get_resource(State(state), path("deployment", "default", "api")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_rejects_mismatched_spec() {
        let mut res = ResourceRecord::deployment("default", "api", 2);
        res.kind = ResourceKind::CronJob;
        let resp = put_resource(State(test_state()), Json(res)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_kind_is_bad_request() {
        let resp = list_resources(State(test_state()), Path("replica_set".to_string())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = get_resource(State(test_state()), path("pod", "default", "api")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_resource_exists_then_missing() {
        let state = test_state();
        state
            .store
            .put_resource(&ResourceRecord::cron_job("default", "nightly", false))
            .unwrap();

        let resp = delete_resource(State(state.clone()), path("cron_job", "default", "nightly")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = delete_resource(State(state), path("cron_job", "default", "nightly")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_sets_and_removes_annotations() {
        let state = test_state();
        state
            .store
            .put_resource(
                &ResourceRecord::deployment("default", "api", 2).with_annotation(EXCLUDE_ANNOTATION, "true"),
            )
            .unwrap();

        let patch = AnnotationPatch::from([
            (EXCLUDE_ANNOTATION.to_string(), None),
            (DOWNTIME_ANNOTATION.to_string(), Some("22:00-06:00".to_string())),
        ]);
        let resp = patch_annotations(State(state.clone()), path("deployment", "default", "api"), Json(patch)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let res = state
            .store
            .get_resource(ResourceKind::Deployment, "default", "api")
            .unwrap()
            .unwrap();
        assert!(!res.annotations.contains_key(EXCLUDE_ANNOTATION));
        assert_eq!(res.annotations[DOWNTIME_ANNOTATION], "22:00-06:00");
        assert_eq!(res.resource_version, 2);
    }

    #[tokio::test]
    async fn patch_missing_resource() {
        let resp = patch_annotations(
            State(test_state()),
            path("deployment", "default", "ghost"),
            Json(AnnotationPatch::new()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sweep_returns_report() {
        let resp = run_sweep(State(test_state()), Query(SweepQuery::default())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sweep_at_fixed_instant() {
        let state = test_state();
        state
            .store
            .put_resource(
                &ResourceRecord::deployment("default", "api", 3)
                    .with_annotation(DOWNTIME_ANNOTATION, "Mon-Fri 09:00-17:00 UTC"),
            )
            .unwrap();

        // 2024-01-06 is a Saturday: outside the window.
        let saturday = "2024-01-06T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        run_sweep(State(state.clone()), Query(SweepQuery { at: Some(saturday) })).await;
        let res = state
            .store
            .get_resource(ResourceKind::Deployment, "default", "api")
            .unwrap()
            .unwrap();
        assert_eq!(res.spec, WorkloadSpec::Replicated { replicas: 3 });

        let tuesday = "2024-01-02T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let resp = run_sweep(State(state.clone()), Query(SweepQuery { at: Some(tuesday) })).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let res = state
            .store
            .get_resource(ResourceKind::Deployment, "default", "api")
            .unwrap()
            .unwrap();
        assert_eq!(res.spec, WorkloadSpec::Replicated { replicas: 0 });
    }
}
