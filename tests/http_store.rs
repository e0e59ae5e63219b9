#![cfg(feature = "http")]

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use indexmap::IndexMap;
use scriptgraph::errors::StoreError;
use scriptgraph::model::{Node, NodePatch, NodePosition, NodeType, Position, Snapshot, SnapshotSummary};
use scriptgraph::presence::LocalPresenceChannel;
use scriptgraph::store::{HttpRemoteStore, HttpStoreConfig, RemoteStore, SnapshotStore};
use scriptgraph::EditorContext;

#[derive(Clone, Default)]
struct MockState {
    nodes: Arc<Mutex<IndexMap<String, Node>>>,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
    fail_next: Arc<AtomicBool>,
}

impl MockState {
    fn record(&self, headers: &HeaderMap) {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.tokens.lock().unwrap().push(token);
    }
}

async fn list_nodes(State(state): State<MockState>, headers: HeaderMap) -> Json<Vec<Node>> {
    state.record(&headers);
    Json(state.nodes.lock().unwrap().values().cloned().collect())
}

async fn create_node(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(node): Json<Node>,
) -> Result<(StatusCode, Json<Node>), (StatusCode, String)> {
    state.record(&headers);
    if state.fail_next.swap(false, Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "disk full".to_string()));
    }
    let mut nodes = state.nodes.lock().unwrap();
    if nodes.contains_key(&node.id) {
        return Err((StatusCode::CONFLICT, "exists".to_string()));
    }
    nodes.insert(node.id.clone(), node.clone());
    Ok((StatusCode::CREATED, Json(node)))
}

async fn update_node(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(node): Json<Node>,
) -> StatusCode {
    match state.nodes.lock().unwrap().get_mut(&id) {
        Some(stored) => {
            *stored = node;
            // this store acknowledges updates without echoing the node
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_node(State(state): State<MockState>, Path(id): Path<String>) -> StatusCode {
    match state.nodes.lock().unwrap().shift_remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn update_positions(
    State(state): State<MockState>,
    Json(positions): Json<Vec<NodePosition>>,
) -> StatusCode {
    let mut nodes = state.nodes.lock().unwrap();
    for p in positions {
        if let Some(node) = nodes.get_mut(&p.id) {
            node.position = Some(p.position());
        }
    }
    StatusCode::NO_CONTENT
}

async fn list_snapshots(State(state): State<MockState>) -> Json<Vec<SnapshotSummary>> {
    Json(state.snapshots.lock().unwrap().iter().map(Snapshot::summary).collect())
}

async fn create_snapshot(State(state): State<MockState>, Json(snapshot): Json<Snapshot>) -> StatusCode {
    state.snapshots.lock().unwrap().push(snapshot);
    StatusCode::CREATED
}

async fn get_snapshot(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, StatusCode> {
    state
        .snapshots
        .lock()
        .unwrap()
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn serve(state: MockState) -> Result<String> {
    let app = Router::new()
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route(
            "/api/nodes/:id",
            axum::routing::put(update_node).delete(delete_node),
        )
        .route("/api/positions", axum::routing::put(update_positions))
        .route("/api/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/api/snapshots/:id", get(get_snapshot))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

fn client(base_url: &str, token: Option<&str>) -> Result<HttpRemoteStore> {
    Ok(HttpRemoteStore::new(&HttpStoreConfig {
        base_url: base_url.to_string(),
        api_token: token.map(str::to_string),
        timeout: Duration::from_secs(2),
    })?)
}

#[tokio::test]
async fn test_rest_calls_map_to_endpoints() -> Result<()> {
    let state = MockState::default();
    let base = serve(state.clone()).await?;
    let store = client(&base, Some("secret"))?;

    for node in common::sales_script() {
        store.create_node(&node).await?;
    }
    assert_eq!(store.list_nodes().await?, common::sales_script());
    assert!(state
        .tokens
        .lock()
        .unwrap()
        .iter()
        .all(|t| t.as_deref() == Some("Bearer secret")));

    let mut q1 = common::sales_script()[1].clone();
    q1.body = "Is there budget this quarter?".to_string();
    // empty 204 body falls back to the node that was sent
    assert_eq!(store.update_node("q1", &q1).await?, q1);

    store
        .update_positions(&[NodePosition::new("q1", Position::new(5.0, 6.0))])
        .await?;
    assert_eq!(
        state.nodes.lock().unwrap()["q1"].position,
        Some(Position::new(5.0, 6.0))
    );

    store.delete_node("close").await?;
    assert!(matches!(
        store.delete_node("close").await,
        Err(StoreError::NotFound(id)) if id == "close"
    ));
    assert!(matches!(
        store.create_node(&q1).await,
        Err(StoreError::AlreadyExists(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_rejected_and_retryable() -> Result<()> {
    let state = MockState::default();
    let base = serve(state.clone()).await?;
    let store = client(&base, None)?;

    state.fail_next.store(true, Ordering::SeqCst);
    let err = store
        .create_node(&Node::new("a", NodeType::Pitch, "A", "a"))
        .await
        .unwrap_err();
    assert!(matches!(&err, StoreError::Rejected { status: 500, message } if message == "disk full"));
    assert!(err.is_retryable());
    assert_eq!(state.tokens.lock().unwrap()[0], None);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_is_unavailable() -> Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let store = client(&format!("http://{addr}/api"), None)?;
    let err = store.list_nodes().await.unwrap_err();
    assert_eq!(err.error_code(), "UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn test_snapshot_endpoints() -> Result<()> {
    let state = MockState::default();
    let base = serve(state.clone()).await?;
    let store = client(&base, None)?;

    assert!(matches!(
        store.get_snapshot("missing").await,
        Err(StoreError::SnapshotNotFound(id)) if id == "missing"
    ));
    assert!(store.list_snapshots().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_editor_over_http() -> Result<()> {
    let state = MockState::default();
    {
        let mut nodes = state.nodes.lock().unwrap();
        for node in common::sales_script() {
            nodes.insert(node.id.clone(), node);
        }
    }
    let base = serve(state.clone()).await?;
    let config = scriptgraph::EditorConfig {
        remote_base_url: Some(base),
        ..common::config("alice")
    };

    let editor = EditorContext::connect(config, Arc::new(LocalPresenceChannel::default())).await?;
    assert_eq!(editor.store().read().await.len(), 4);

    let _objection = editor.open_node("objection").await?;
    editor
        .update_node("objection", &NodePatch::title("Tight budget"))
        .await?;
    assert_eq!(state.nodes.lock().unwrap()["objection"].title, "Tight budget");

    let snapshot = editor.create_snapshot("checkpoint").await?;
    assert_eq!(editor.list_snapshots().await?[0].id, snapshot.id);

    editor.undo().await?;
    assert_eq!(state.nodes.lock().unwrap()["objection"].title, "No budget");

    state.fail_next.store(true, Ordering::SeqCst);
    let err = editor
        .create_node(Node::new("pitch", NodeType::Pitch, "Pitch", "Buy"))
        .await
        .unwrap_err();
    assert!(err.is_save_failure());
    assert!(!editor.store().read().await.contains("pitch"));
    Ok(())
}
