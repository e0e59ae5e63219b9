mod common;

use anyhow::Result;
use scriptgraph::errors::{EditorError, ImportExportError};
use scriptgraph::model::{Node, NodePatch, NodeType};
use scriptgraph::presence::LocalPresenceChannel;
use scriptgraph::services::{DocumentFormat, ImportStrategy};
use scriptgraph::store::MemoryStore;

use common::{editor, sales_script};

#[tokio::test]
async fn test_export_file_imports_into_fresh_editor() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("script.yaml");

    let source = MemoryStore::with_nodes(sales_script()).await;
    let alice = editor("alice", &source, &LocalPresenceChannel::default()).await?;
    let _q1 = alice.open_node("q1").await?;
    alice
        .update_node("q1", &NodePatch {
            group: Some(Some("qualify".to_string())),
            ..NodePatch::default()
        })
        .await?;
    let written = alice.export_to_file(&path).await?;
    assert_eq!(written, path);
    assert!(std::fs::read_to_string(&path)?.contains("group: qualify"));

    let target = MemoryStore::new();
    let bob = editor("bob", &target, &LocalPresenceChannel::default()).await?;
    let plan = bob.plan_import_file(&path, ImportStrategy::Merge).await?;
    assert_eq!(plan.created.len(), 4);
    bob.apply_import(&plan, None).await?;

    assert_eq!(
        bob.store().read().await.to_vec(),
        alice.store().read().await.to_vec()
    );
    assert_eq!(target.nodes().await.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_merge_keeps_untouched_nodes_and_clears_history() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    let _close = editor.open_node("close").await?;
    editor
        .update_node("close", &NodePatch::body("Let's book it"))
        .await?;
    assert!(editor.history().can_undo());

    let text = r#"{
        "nodes": [
            {"id": "q1", "type": "question", "title": "Budget", "body": "Any budget left?",
             "responses": [{"label": "yes", "target_id": "close"}]},
            {"id": "vm", "type": "voicemail", "title": "Voicemail", "body": "Leave a message"}
        ],
        "exported_at": "2026-03-01T09:00:00Z"
    }"#;
    let plan = editor
        .plan_import_text(text, None, ImportStrategy::Merge)
        .await?;
    assert_eq!(plan.updated, vec!["q1"]);
    assert_eq!(plan.created, vec!["vm"]);
    editor.apply_import(&plan, None).await?;

    let store = editor.store().read().await;
    assert_eq!(store.len(), 5);
    assert_eq!(store.get("close").unwrap().body, "Let's book it");
    assert_eq!(store.get("objection").unwrap(), &sales_script()[2]);
    assert_eq!(store.get("q1").unwrap().responses.len(), 1);
    assert!(!editor.history().can_undo());
    Ok(())
}

#[tokio::test]
async fn test_malformed_documents_do_not_mutate() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;
    let before = editor.store().read().await.clone();
    let calls_before = remote.calls().await.len();

    let cases = [
        ("not a document", "INVALID_FORMAT"),
        (r#"{"nodes": [{"id": "a", "type": "robot"}], "exported_at": "2026-03-01T09:00:00Z"}"#, "INVALID_FORMAT"),
        (
            r#"{"nodes": [{"id": "a", "type": "info"}, {"id": "a", "type": "info"}], "exported_at": "2026-03-01T09:00:00Z"}"#,
            "DUPLICATE_NODE",
        ),
    ];
    for (text, code) in cases {
        let err = editor
            .plan_import_text(text, None, ImportStrategy::Overwrite)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), code, "for {text}");
    }

    assert_eq!(*editor.store().read().await, before);
    assert_eq!(remote.calls().await.len(), calls_before);
    Ok(())
}

#[tokio::test]
async fn test_overwrite_needs_confirmation() -> Result<()> {
    let remote = MemoryStore::with_nodes(sales_script()).await;
    let editor = editor("alice", &remote, &LocalPresenceChannel::default()).await?;

    let replacement = vec![
        Node::new("start", NodeType::Entry, "Hello", "New opener").with_response("bye", "end"),
        Node::new("end", NodeType::Terminal, "Bye", "Thanks"),
    ];
    let text = document_json(&replacement)?;
    let plan = editor
        .plan_import_text(&text, Some(DocumentFormat::Json), ImportStrategy::Overwrite)
        .await?;
    assert_eq!(plan.deleted.len(), 4);
    let impact = plan.confirmation().expect("overwrite is confirmed").impact().clone();
    assert_eq!(impact.nodes, 4);

    let err = editor.apply_import(&plan, None).await.unwrap_err();
    assert!(matches!(
        err,
        EditorError::ImportExport(ImportExportError::ConfirmationRequired(_))
    ));
    assert_eq!(editor.store().read().await.len(), 4);

    editor.apply_import(&plan, plan.confirmation()).await?;
    assert_eq!(editor.store().read().await.to_vec(), replacement);
    assert_eq!(remote.nodes().await, replacement);
    assert!(editor.validate().await.is_valid());
    Ok(())
}

fn document_json(nodes: &[Node]) -> Result<String> {
    let document = scriptgraph::model::ScriptDocument::new(nodes.to_vec());
    Ok(serde_json::to_string(&document)?)
}
