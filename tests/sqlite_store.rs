#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use scriptgraph::database::entities::script_nodes;
use scriptgraph::errors::StoreError;
use scriptgraph::model::{Node, NodePosition, NodeType, Position, ScriptDocument, Snapshot};
use scriptgraph::presence::LocalPresenceChannel;
use scriptgraph::store::{RemoteStore, SnapshotStore, SqliteStore};
use scriptgraph::{EditorConfig, EditorContext};
use sea_orm::EntityTrait;

async fn setup_store() -> Result<SqliteStore> {
    let store = SqliteStore::connect(":memory:").await?;
    for node in common::sales_script() {
        store.create_node(&node).await?;
    }
    Ok(store)
}

#[tokio::test]
async fn test_node_crud_round_trips() -> Result<()> {
    let store = setup_store().await?;
    assert_eq!(store.list_nodes().await?, common::sales_script());

    let mut q1 = common::sales_script()[1].clone();
    q1.title = "Budget check".to_string();
    q1.key_points = vec!["confirm amount".to_string()];
    let stored = store.update_node("q1", &q1).await?;
    assert_eq!(stored, q1);
    assert_eq!(store.list_nodes().await?[1], q1);

    store.delete_node("objection").await?;
    assert!(matches!(
        store.delete_node("objection").await,
        Err(StoreError::NotFound(id)) if id == "objection"
    ));
    assert!(matches!(
        store.create_node(&q1).await,
        Err(StoreError::AlreadyExists(_))
    ));
    assert!(matches!(
        store.update_node("ghost", &q1).await,
        Err(StoreError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_positions_live_in_their_own_columns() -> Result<()> {
    let store = setup_store().await?;
    store
        .update_positions(&[
            NodePosition::new("q1", Position::new(10.0, 20.0)),
            NodePosition::new("unknown", Position::new(1.0, 1.0)),
        ])
        .await?;

    let row = script_nodes::Entity::find_by_id("q1".to_string())
        .one(store.connection())
        .await?
        .expect("row exists");
    assert_eq!((row.position_x, row.position_y), (Some(10.0), Some(20.0)));
    assert!(row.payload.get("position").is_none());
    assert_eq!(row.node_type, "question");

    let nodes = store.list_nodes().await?;
    assert_eq!(nodes[1].position, Some(Position::new(10.0, 20.0)));
    assert_eq!(nodes.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_snapshots_list_newest_first() -> Result<()> {
    let store = setup_store().await?;
    let now = Utc::now();
    for (id, age) in [("old", 2), ("new", 0), ("mid", 1)] {
        store
            .create_snapshot(&Snapshot {
                id: id.to_string(),
                label: format!("{id} snapshot"),
                created_at: now - Duration::hours(age),
                created_by: "alice".to_string(),
                data: ScriptDocument::new(common::sales_script()),
            })
            .await?;
    }

    let ids: Vec<String> = store.list_snapshots().await?.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);

    let snapshot = store.get_snapshot("mid").await?;
    assert_eq!(snapshot.data.nodes, common::sales_script());
    assert_eq!(snapshot.summary().node_count, 4);
    assert!(matches!(
        store.get_snapshot("nope").await,
        Err(StoreError::SnapshotNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_editor_on_sqlite_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("script.db");
    let config = EditorConfig {
        holder: "alice".to_string(),
        database_path: Some(path.display().to_string()),
        ..EditorConfig::default()
    };
    let presence = Arc::new(LocalPresenceChannel::default());

    let editor = EditorContext::connect(config.clone(), presence.clone()).await?;
    for node in common::sales_script() {
        editor.create_node(node).await?;
    }
    let snapshot = editor.create_snapshot("first draft").await?;
    editor
        .create_node(Node::new("extra", NodeType::Info, "Extra", "More"))
        .await?;
    editor.shutdown().await?;

    let reopened = EditorContext::connect(config, presence).await?;
    assert_eq!(reopened.store().read().await.len(), 5);
    assert!(!reopened.history().can_undo());

    let plan = reopened.plan_restore(&snapshot.id).await?;
    assert_eq!(plan.import.deleted, vec!["extra"]);
    reopened.restore_snapshot(&plan, plan.confirmation()).await?;
    assert_eq!(reopened.store().read().await.to_vec(), common::sales_script());
    Ok(())
}
