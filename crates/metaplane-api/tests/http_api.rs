//! End-to-end HTTP tests against the built router.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use metaplane_api::build_router;
use metaplane_registry::{
    FaultTolerance, NodePorts, NodeRecord, NodeState, OwnershipIndex, ReplicationIntent,
    UniverseStore,
};

fn intent() -> ReplicationIntent {
    ReplicationIntent {
        replication_factor: 3,
        fault_tolerance: FaultTolerance::Zone,
    }
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

/// Router over a registry seeded with universe `u1` (owner `c1`) and
/// three running masters `host-n1/2/3` at `10.0.0.1/2/3`.
fn seeded_router() -> Router {
    let store = UniverseStore::new();
    let ownership = OwnershipIndex::new();
    store.create("u1", "c1", intent()).unwrap();
    ownership.add_ownership("c1", "u1").unwrap();
    for (name, ip) in [
        ("host-n3", "10.0.0.3"),
        ("host-n1", "10.0.0.1"),
        ("host-n2", "10.0.0.2"),
    ] {
        store.update("u1", |s| s.with_node(master(name, ip))).unwrap();
    }
    build_router(store, ownership)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_error_body(json: &serde_json::Value) {
    let msg = json["error"].as_str().expect("error field present");
    assert!(!msg.is_empty());
}

#[tokio::test]
async fn metamaster_get_with_invalid_universe() {
    let router = seeded_router();
    let (status, json) = get(
        &router,
        "/metamaster/universe/11111111-2222-3333-4444-555555555555",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(&json);
}

#[tokio::test]
async fn metamaster_get_with_valid_universe() {
    let router = seeded_router();
    let (status, json) = get(&router, "/metamaster/universe/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("error").is_none());

    let masters = json["masters"].as_array().unwrap();
    let got: Vec<(&str, &str)> = masters
        .iter()
        .map(|m| {
            (
                m["name"].as_str().unwrap(),
                m["private_ip"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        got,
        [
            ("host-n1", "10.0.0.1"),
            ("host-n2", "10.0.0.2"),
            ("host-n3", "10.0.0.3"),
        ]
    );
}

#[tokio::test]
async fn yql_get_with_invalid_universe() {
    let router = seeded_router();
    let (status, json) = get(
        &router,
        "/api/customers/c1/universes/11111111-2222-3333-4444-555555555555/yqlservers",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(&json);
}

#[tokio::test]
async fn yql_get_with_valid_universe() {
    let router = seeded_router();
    let (status, json) = get(&router, "/api/customers/c1/universes/u1/yqlservers").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("error").is_none());
    assert_eq!(json["servers"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn foreign_customer_gets_a_plain_not_found() {
    let router = seeded_router();
    for uri in [
        "/api/customers/c2/universes/u1/masters",
        "/api/customers/c2/universes/u1/yqlservers",
        "/api/customers/c2/universes/u1",
    ] {
        let (status, json) = get(&router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_error_body(&json);
        // Body must not reveal that the universe exists under someone else.
        assert_eq!(json["error"].as_str().unwrap(), "universe u1 not found");
    }
}

#[tokio::test]
async fn universe_with_no_running_masters_returns_empty_success() {
    let store = UniverseStore::new();
    let ownership = OwnershipIndex::new();
    store.create("u1", "c1", intent()).unwrap();
    ownership.add_ownership("c1", "u1").unwrap();
    let router = build_router(store, ownership);

    let (status, json) = get(&router, "/metamaster/universe/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["masters"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_get_delete_over_http() {
    let router = build_router(UniverseStore::new(), OwnershipIndex::new());

    let body = serde_json::json!({
        "universe_id": "u1",
        "replication_factor": 3,
        "fault_tolerance": "zone"
    });
    let resp = router
        .clone()
        .oneshot(
            Request::post("/api/customers/c1/universes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(created["version"], 1);
    assert_eq!(created["customer_id"], "c1");

    let (status, json) = get(&router, "/api/customers/c1/universes/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 1);
    assert_eq!(json["intent"]["replication_factor"], 3);

    let resp = router
        .clone()
        .oneshot(
            Request::delete("/api/customers/c1/universes/u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, json) = get(&router, "/api/customers/c1/universes/u1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_body(&json);
}

#[tokio::test]
async fn node_add_and_remove_over_http() {
    let store = UniverseStore::new();
    let ownership = OwnershipIndex::new();
    store.create("u1", "c1", intent()).unwrap();
    ownership.add_ownership("c1", "u1").unwrap();
    let router = build_router(store, ownership);

    let body = serde_json::to_string(&master("host-n1", "10.0.0.1")).unwrap();
    let resp = router
        .clone()
        .oneshot(
            Request::post("/api/customers/c1/universes/u1/nodes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let snap: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(snap["version"], 2);

    let resp = router
        .clone()
        .oneshot(
            Request::delete("/api/customers/c1/universes/u1/nodes/host-n1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, json) = get(&router, "/metamaster/universe/u1").await;
    assert!(json["masters"].as_array().unwrap().is_empty());
}
