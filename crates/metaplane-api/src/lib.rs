//! metaplane-api — REST API for the topology registry.
//!
//! Thin transport layer over `metaplane-registry`: route parsing, JSON
//! marshalling, and HTTP status mapping. All registry semantics live in
//! the core crate.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metamaster/universe/{universe_id}` | Master endpoints (unscoped, legacy path) |
//! | POST | `/api/customers/{customer_id}/universes` | Register a universe |
//! | GET | `/api/customers/{customer_id}/universes/{universe_id}` | Current snapshot |
//! | DELETE | `/api/customers/{customer_id}/universes/{universe_id}` | Delete a universe |
//! | GET | `/api/customers/{customer_id}/universes/{universe_id}/masters` | Master endpoints |
//! | GET | `/api/customers/{customer_id}/universes/{universe_id}/yqlservers` | Query-layer endpoints |
//! | POST | `/api/customers/{customer_id}/universes/{universe_id}/nodes` | Add a node record |
//! | DELETE | `/api/customers/{customer_id}/universes/{universe_id}/nodes/{node_name}` | Remove a node record |
//!
//! Failure bodies are always `{"error": "<non-empty message>"}`. Unknown
//! or malformed universe ids map to 400 (legacy client compatibility);
//! ownership denials map to 404 without leaking existence; exhausted
//! optimistic updates map to 409.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};

use metaplane_registry::{OwnershipIndex, TopologyQuery, UniverseStore};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: UniverseStore,
    pub ownership: OwnershipIndex,
    pub query: TopologyQuery,
}

impl ApiState {
    pub fn new(store: UniverseStore, ownership: OwnershipIndex) -> Self {
        let query = TopologyQuery::new(store.clone(), ownership.clone());
        Self {
            store,
            ownership,
            query,
        }
    }
}

/// Build the complete API router.
pub fn build_router(store: UniverseStore, ownership: OwnershipIndex) -> Router {
    let state = ApiState::new(store, ownership);

    let customer_routes = Router::new()
        .route("/universes", post(handlers::create_universe))
        .route(
            "/universes/{universe_id}",
            get(handlers::get_universe).delete(handlers::delete_universe),
        )
        .route("/universes/{universe_id}/masters", get(handlers::list_masters))
        .route(
            "/universes/{universe_id}/yqlservers",
            get(handlers::list_yql_servers),
        )
        .route("/universes/{universe_id}/nodes", post(handlers::add_node))
        .route(
            "/universes/{universe_id}/nodes/{node_name}",
            axum::routing::delete(handlers::remove_node),
        );

    Router::new()
        .route(
            "/metamaster/universe/{universe_id}",
            get(handlers::metamaster_get),
        )
        .nest("/api/customers/{customer_id}", customer_routes)
        .with_state(state)
}
