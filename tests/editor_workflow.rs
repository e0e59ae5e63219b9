mod common;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use scriptgraph::errors::{EditorError, HistoryError};
use scriptgraph::editor::EditMode;
use scriptgraph::model::{Edge, Node, NodePatch, NodeType, Position};
use scriptgraph::presence::LocalPresenceChannel;
use scriptgraph::store::{MemoryStore, StoreFault, StoreOp};
use scriptgraph::validation::IssueKind;

use common::{editor, sales_script};

#[tokio::test]
async fn test_example_scenario_single_dead_end() -> Result<()> {
    let remote = MemoryStore::with_nodes(vec![
        Node::new("entry_1", NodeType::Entry, "Hi", "Hello").with_response("go", "q1"),
        Node::new("q1", NodeType::Question, "Ask", "Anything else?"),
    ])
    .await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let report = editor.validate().await;
    let dead_ends: Vec<_> = report.of_kind(IssueKind::DeadEnd).collect();
    assert_eq!(dead_ends.len(), 1);
    assert_eq!(dead_ends[0].node_id.as_deref(), Some("q1"));
    assert_eq!(report.count(IssueKind::Orphan), 0);
    assert_eq!(report.count(IssueKind::Cycle), 0);
    assert!(!report.is_valid());
    Ok(())
}

#[tokio::test]
async fn test_edits_undo_back_to_loaded_graph() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    let loaded = editor.store().read().await.clone();
    let _q1 = editor.open_node("q1").await?;
    let _close = editor.open_node("close").await?;

    editor
        .create_node(Node::new("pitch", NodeType::Pitch, "Pitch", "Our product"))
        .await?;
    editor.add_response("q1", Edge::new("maybe", "pitch")).await?;
    editor
        .update_node("close", &NodePatch::title("Book the demo"))
        .await?;
    editor.move_response("q1", 2, 0).await?;
    editor.move_node("pitch", Position::new(300.0, 40.0)).await?;
    assert_eq!(editor.history().depth(), (5, 0));
    assert_eq!(editor.store().read().await.get("q1").unwrap().responses[0].label, "maybe");

    while editor.undo().await?.is_some() {}

    assert_eq!(*editor.store().read().await, loaded);
    assert_eq!(remote.nodes().await, sales_script());
    assert_eq!(editor.history().depth(), (0, 5));

    assert_eq!(editor.redo().await?.as_deref(), Some("Create node 'pitch'"));
    assert!(remote.node("pitch").await.is_some());
    Ok(())
}

#[tokio::test]
async fn test_failed_save_changes_nothing() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    remote
        .inject_fault(StoreFault::for_node(StoreOp::UpdateNode, "q1"))
        .await;
    let _session = editor.open_node("q1").await?;

    let err = editor
        .update_node("q1", &NodePatch::body("Changed"))
        .await
        .unwrap_err();
    assert!(err.is_save_failure());
    assert_eq!(editor.store().read().await.get("q1").unwrap().body, "Do you have budget?");
    assert!(!editor.history().can_undo());
    Ok(())
}

#[tokio::test]
async fn test_delete_referenced_node_needs_confirmation() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let _session = editor.open_node("objection").await?;
    let err = editor.delete_node("objection", None).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFIRMATION_REQUIRED");
    assert!(editor.store().read().await.contains("objection"));

    let plan = editor.plan_delete("objection").await?;
    assert_eq!(plan.incoming, vec![("q1".to_string(), 1)]);
    editor.delete_node("objection", plan.confirmation()).await?;

    let report = editor.validate().await;
    let broken: Vec<_> = report.of_kind(IssueKind::BrokenReference).collect();
    assert_eq!(broken.len(), 1);
    assert!(broken[0].message.contains("objection"));

    editor.undo().await?;
    assert_eq!(editor.store().read().await.index_of("objection"), Some(2));
    assert!(editor.validate().await.of_kind(IssueKind::BrokenReference).next().is_none());
    Ok(())
}

#[tokio::test]
async fn test_unreferenced_delete_needs_no_confirmation() -> Result<()> {
    let mut nodes = sales_script();
    nodes.push(Node::new("spare", NodeType::Info, "Spare", "Unused").with_response("self", "spare"));
    let remote = MemoryStore::with_nodes(nodes).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let _session = editor.open_node("spare").await?;
    assert!(editor.plan_delete("spare").await?.confirmation().is_none());
    editor.delete_node("spare", None).await?;
    assert!(remote.node("spare").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_rename_repoints_referrers() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let session = editor.open_node("q1").await?;
    editor.rename_node("q1", "budget").await?;
    session.close().await?;
    {
        let store = editor.store().read().await;
        assert!(!store.contains("q1"));
        assert_eq!(store.index_of("budget"), Some(1));
        assert!(store.get("entry_1").unwrap().references("budget"));
        assert!(store.get("objection").unwrap().references("budget"));
    }
    assert!(editor.validate().await.of_kind(IssueKind::BrokenReference).next().is_none());
    assert!(remote.node("q1").await.is_none());

    editor.undo().await?;
    assert_eq!(editor.store().read().await.to_vec(), sales_script());
    let mut stored = remote.nodes().await;
    stored.sort_by(|a, b| a.id.cmp(&b.id));
    let mut expected = sales_script();
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(stored, expected);
    Ok(())
}

#[tokio::test]
async fn test_rename_partial_failure_is_reported() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    remote
        .inject_fault(StoreFault::for_node(StoreOp::UpdateNode, "objection"))
        .await;
    let _session = editor.open_node("q1").await?;

    let err = editor.rename_node("q1", "budget").await.unwrap_err();
    match err {
        EditorError::History(HistoryError::MigrationPartialFailure {
            rewritten,
            pending,
            ..
        }) => {
            assert_eq!(rewritten, vec!["entry_1"]);
            assert_eq!(pending, vec!["objection"]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let store = editor.store().read().await;
    assert!(store.contains("q1") && store.contains("budget"));
    assert!(store.get("entry_1").unwrap().references("budget"));
    assert!(store.get("objection").unwrap().references("q1"));
    assert!(!editor.history().can_undo());
    Ok(())
}

#[tokio::test]
async fn test_apply_layout_twice_is_stable() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let first = editor.apply_layout(&HashMap::new()).await?;
    assert_eq!(first.positions.len(), 4);
    assert_eq!(editor.history().undo_label().as_deref(), Some("Move 4 nodes"));
    assert_eq!(
        remote.node("close").await.and_then(|n| n.position),
        first.positions.get("close").copied()
    );

    let second = editor.apply_layout(&HashMap::new()).await?;
    assert_eq!(first, second);
    assert_eq!(editor.history().depth(), (1, 0));
    Ok(())
}

#[tokio::test]
async fn test_tree_view_handles_cycle() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let forest = editor.tree().await;
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].node_id, "entry_1");
    assert_eq!(
        forest.path_to("objection"),
        Some(vec!["entry_1".to_string(), "q1".to_string(), "objection".to_string()])
    );
    let objection = forest.find("objection").unwrap();
    assert!(objection.children[0].is_link());
    assert_eq!(editor.stats().await.edge_count, 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_locked_node_is_read_only_for_others() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let channel = LocalPresenceChannel::default();
    let alice = editor("alice", &remote, &channel).await?;
    let bob = editor("bob", &remote, &channel).await?;

    let session = alice.open_node("q1").await?;
    assert!(session.is_editable());
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = bob
        .update_node("q1", &NodePatch::title("Mine now"))
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        EditorError::ReadOnly { node_id, holder } if node_id == "q1" && holder == "alice"
    ));
    let viewer = bob.open_node("q1").await?;
    assert_eq!(
        viewer.mode(),
        &EditMode::ReadOnly {
            holder: "alice".to_string()
        }
    );

    // renaming objection would rewrite q1, which alice holds
    let objection = bob.open_node("objection").await?;
    assert!(objection.is_editable());
    assert!(matches!(
        bob.rename_node("objection", "pushback").await,
        Err(EditorError::ReadOnly { node_id, .. }) if node_id == "q1"
    ));
    assert!(bob.store().read().await.contains("objection"));

    session.close().await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(matches!(
        bob.update_node("q1", &NodePatch::title("Mine now")).await,
        Err(EditorError::NotClaimed(id)) if id == "q1"
    ));
    let claimed = bob.open_node("q1").await?;
    assert!(claimed.is_editable());
    bob.update_node("q1", &NodePatch::title("Mine now")).await?;
    assert_eq!(remote.node("q1").await.unwrap().title, "Mine now");

    alice.shutdown().await?;
    bob.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropped_session_releases_lock() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let channel = LocalPresenceChannel::default();
    let alice = editor("alice", &remote, &channel).await?;
    let bob = editor("bob", &remote, &channel).await?;

    {
        let _session = alice.open_node("close").await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(bob.locks().holder_of("close").await?.as_deref(), Some("alice"));
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(bob.locks().holder_of("close").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_content_edits_need_an_open_node() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let err = editor
        .update_node("q1", &NodePatch::title("Unopened"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_CLAIMED");
    assert!(matches!(
        editor.delete_node("close", None).await,
        Err(EditorError::NotClaimed(id)) if id == "close"
    ));
    assert!(remote.calls().await.iter().all(|c| c.op == StoreOp::ListNodes));

    // layout moves and new nodes are not content edits of a claimed node
    editor.move_node("q1", Position::new(10.0, 10.0)).await?;
    editor
        .create_node(Node::new("pitch", NodeType::Pitch, "Pitch", "Buy"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_confirmation_goes_stale_with_new_referrers() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    let _objection = editor.open_node("objection").await?;
    let _close = editor.open_node("close").await?;

    let plan = editor.plan_delete("objection").await?;
    editor
        .add_response("close", Edge::new("not yet", "objection"))
        .await?;

    let err = editor
        .delete_node("objection", plan.confirmation())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFIRMATION_REQUIRED");
    assert!(editor.store().read().await.contains("objection"));

    let fresh = editor.plan_delete("objection").await?;
    assert_eq!(fresh.incoming.len(), 2);
    editor.delete_node("objection", fresh.confirmation()).await?;
    assert!(!editor.store().read().await.contains("objection"));
    Ok(())
}
