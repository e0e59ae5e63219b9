#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use scriptgraph::model::{Node, NodeType};
use scriptgraph::presence::LocalPresenceChannel;
use scriptgraph::store::MemoryStore;
use scriptgraph::{EditorConfig, EditorContext};

pub fn config(holder: &str) -> EditorConfig {
    EditorConfig {
        holder: holder.to_string(),
        lease_ttl_ms: 300,
        heartbeat_ms: 100,
        settle_window_ms: 20,
        acquire_timeout_ms: 500,
        ..EditorConfig::default()
    }
}

/// entry -> q1 -> (yes: close, no: objection -> q1)
pub fn sales_script() -> Vec<Node> {
    vec![
        Node::new("entry_1", NodeType::Entry, "Greeting", "Hi, this is Sam")
            .with_response("continue", "q1"),
        Node::new("q1", NodeType::Question, "Budget", "Do you have budget?")
            .with_response("yes", "close")
            .with_response("no", "objection"),
        Node::new("objection", NodeType::Objection, "No budget", "Many start small")
            .with_response("reconsider", "q1"),
        Node::new("close", NodeType::Success, "Close", "Great, let's book it"),
    ]
}

pub async fn editor(
    holder: &str,
    remote: &MemoryStore,
    channel: &LocalPresenceChannel,
) -> Result<EditorContext> {
    let editor = EditorContext::new(
        config(holder),
        Arc::new(remote.clone()),
        Arc::new(remote.clone()),
        Arc::new(channel.clone()),
    )
    .await?;
    editor.load().await?;
    Ok(editor)
}
