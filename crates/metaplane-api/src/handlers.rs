//! REST API handlers.
//!
//! Each handler calls into the registry and maps `RegistryError` onto
//! the HTTP status policy described in the crate docs.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use metaplane_registry::{
    EndpointRecord, FaultTolerance, NodeRecord, RegistryError, ReplicationIntent,
};

use crate::ApiState;

/// Failure body shape, `error` always non-empty.
#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

/// Master-list payload (`private_ip` wire name preserved).
#[derive(serde::Serialize)]
struct MastersList {
    masters: Vec<EndpointRecord>,
}

/// Query-layer server list payload.
#[derive(serde::Serialize)]
struct ServersList {
    servers: Vec<EndpointRecord>,
}

fn error_response(err: &RegistryError) -> Response {
    let (status, message) = match err {
        RegistryError::NotFound(_) | RegistryError::InvalidArgument(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        // Ownership denial: a plain not-found body so existence of a
        // foreign universe does not leak through the error text.
        RegistryError::Forbidden(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        RegistryError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
    };
    (status, Json(ErrorBody { error: message })).into_response()
}

// ── Discovery ──────────────────────────────────────────────────

/// GET /metamaster/universe/{universe_id}
///
/// Legacy unscoped master-address lookup.
pub async fn metamaster_get(
    State(state): State<ApiState>,
    Path(universe_id): Path<String>,
) -> Response {
    match state.query.list_masters(&universe_id) {
        Ok(masters) => Json(MastersList { masters }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/customers/{customer_id}/universes/{universe_id}/masters
pub async fn list_masters(
    State(state): State<ApiState>,
    Path((customer_id, universe_id)): Path<(String, String)>,
) -> Response {
    match state.query.list_masters_scoped(&customer_id, &universe_id) {
        Ok(masters) => Json(MastersList { masters }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/customers/{customer_id}/universes/{universe_id}/yqlservers
pub async fn list_yql_servers(
    State(state): State<ApiState>,
    Path((customer_id, universe_id)): Path<(String, String)>,
) -> Response {
    match state
        .query
        .list_query_servers_scoped(&customer_id, &universe_id)
    {
        Ok(servers) => Json(ServersList { servers }).into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Universe lifecycle ─────────────────────────────────────────

/// Create request body.
#[derive(serde::Deserialize)]
pub struct CreateUniverseRequest {
    pub universe_id: String,
    pub replication_factor: u32,
    #[serde(default = "default_fault_tolerance")]
    pub fault_tolerance: FaultTolerance,
}

fn default_fault_tolerance() -> FaultTolerance {
    FaultTolerance::Zone
}

/// POST /api/customers/{customer_id}/universes
pub async fn create_universe(
    State(state): State<ApiState>,
    Path(customer_id): Path<String>,
    Json(req): Json<CreateUniverseRequest>,
) -> Response {
    let intent = ReplicationIntent {
        replication_factor: req.replication_factor,
        fault_tolerance: req.fault_tolerance,
    };
    let snapshot = match state.store.create(&req.universe_id, &customer_id, intent) {
        Ok(snapshot) => snapshot,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state.ownership.add_ownership(&customer_id, &req.universe_id) {
        // Stale ownership entry for this id; undo the registration.
        let _ = state.store.delete(&req.universe_id);
        return error_response(&e);
    }
    info!(universe_id = %req.universe_id, %customer_id, "universe registered");
    (StatusCode::CREATED, Json(snapshot)).into_response()
}

/// GET /api/customers/{customer_id}/universes/{universe_id}
pub async fn get_universe(
    State(state): State<ApiState>,
    Path((customer_id, universe_id)): Path<(String, String)>,
) -> Response {
    match state.query.snapshot_scoped(&customer_id, &universe_id) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/customers/{customer_id}/universes/{universe_id}
pub async fn delete_universe(
    State(state): State<ApiState>,
    Path((customer_id, universe_id)): Path<(String, String)>,
) -> Response {
    if let Err(e) = state.query.snapshot_scoped(&customer_id, &universe_id) {
        return error_response(&e);
    }
    if let Err(e) = state.store.delete(&universe_id) {
        return error_response(&e);
    }
    state.ownership.remove_ownership(&universe_id);
    info!(%universe_id, %customer_id, "universe deleted");
    Json(serde_json::json!({ "deleted": universe_id })).into_response()
}

// ── Node records ───────────────────────────────────────────────

/// POST /api/customers/{customer_id}/universes/{universe_id}/nodes
pub async fn add_node(
    State(state): State<ApiState>,
    Path((customer_id, universe_id)): Path<(String, String)>,
    Json(record): Json<NodeRecord>,
) -> Response {
    if let Err(e) = state.query.snapshot_scoped(&customer_id, &universe_id) {
        return error_response(&e);
    }
    match state.store.update(&universe_id, |s| s.with_node(record.clone())) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/customers/{customer_id}/universes/{universe_id}/nodes/{node_name}
pub async fn remove_node(
    State(state): State<ApiState>,
    Path((customer_id, universe_id, node_name)): Path<(String, String, String)>,
) -> Response {
    if let Err(e) = state.query.snapshot_scoped(&customer_id, &universe_id) {
        return error_response(&e);
    }
    match state.store.update(&universe_id, |s| s.without_node(&node_name)) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaplane_registry::{NodePorts, NodeState, OwnershipIndex, UniverseStore};

    fn test_state() -> ApiState {
        ApiState::new(UniverseStore::new(), OwnershipIndex::new())
    }

    fn seeded_state() -> ApiState {
        let state = test_state();
        let intent = ReplicationIntent {
            replication_factor: 3,
            fault_tolerance: FaultTolerance::Zone,
        };
        state.store.create("u1", "c1", intent).unwrap();
        state.ownership.add_ownership("c1", "u1").unwrap();
        state
    }

    fn master(name: &str, ip: &str) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            is_master: true,
            is_query_server: true,
            state: NodeState::Running,
            private_ip: ip.to_string(),
            public_ip: None,
            ports: NodePorts::default(),
        }
    }

    #[tokio::test]
    async fn metamaster_with_invalid_universe_is_bad_request() {
        let state = test_state();
        let resp = metamaster_get(
            State(state),
            Path("11111111-2222-3333-4444-555555555555".to_string()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metamaster_with_valid_universe_is_ok() {
        let state = seeded_state();
        state
            .store
            .update("u1", |s| s.with_node(master("host-n1", "10.0.0.1")))
            .unwrap();

        let resp = metamaster_get(State(state), Path("u1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn yqlservers_for_foreign_customer_is_not_found() {
        let state = seeded_state();
        let resp = list_yql_servers(
            State(state),
            Path(("c2".to_string(), "u1".to_string())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_with_zero_replication_factor_is_bad_request() {
        let state = test_state();
        let req = CreateUniverseRequest {
            universe_id: "u1".to_string(),
            replication_factor: 0,
            fault_tolerance: FaultTolerance::None,
        };
        let resp = create_universe(State(state), Path("c1".to_string()), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_then_delete_universe() {
        let state = test_state();
        let req = CreateUniverseRequest {
            universe_id: "u1".to_string(),
            replication_factor: 3,
            fault_tolerance: FaultTolerance::Zone,
        };
        let resp =
            create_universe(State(state.clone()), Path("c1".to_string()), Json(req)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = delete_universe(
            State(state.clone()),
            Path(("c1".to_string(), "u1".to_string())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.store.get("u1").is_err());
        assert!(!state.ownership.authorize("c1", "u1"));
    }

    #[tokio::test]
    async fn add_node_rejects_duplicate_name() {
        let state = seeded_state();
        let resp = add_node(
            State(state.clone()),
            Path(("c1".to_string(), "u1".to_string())),
            Json(master("host-n1", "10.0.0.1")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = add_node(
            State(state),
            Path(("c1".to_string(), "u1".to_string())),
            Json(master("host-n1", "10.0.0.9")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn remove_unknown_node_is_bad_request() {
        let state = seeded_state();
        let resp = remove_node(
            State(state),
            Path(("c1".to_string(), "u1".to_string(), "host-n9".to_string())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
