use serde::{Deserialize, Serialize};

use super::node_type::{NodeBehavior, NodeType};

/// Canvas coordinate of a node's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position update addressed by node id, as sent to the remote store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            x: position.x,
            y: position.y,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// One labeled choice leading out of a node.
///
/// `target_id` is not required to resolve; dangling targets are reported by
/// the validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub label: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Edge {
    pub fn new(label: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target_id: target_id.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A conversation state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listen_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub responses: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            title: title.into(),
            body: body.into(),
            context: None,
            key_points: Vec::new(),
            listen_for: Vec::new(),
            warnings: Vec::new(),
            responses: Vec::new(),
            group: None,
            position: None,
        }
    }

    pub fn with_response(mut self, label: impl Into<String>, target_id: impl Into<String>) -> Self {
        self.responses.push(Edge::new(label, target_id));
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn behavior(&self) -> NodeBehavior {
        self.node_type.behavior()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.responses.iter().map(|edge| edge.target_id.as_str())
    }

    pub fn references(&self, node_id: &str) -> bool {
        self.targets().any(|target| target == node_id)
    }

    /// Points every response aimed at `from` to `to`; returns how many moved.
    pub fn retarget(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for edge in self.responses.iter_mut().filter(|e| e.target_id == from) {
            edge.target_id = to.to_string();
            moved += 1;
        }
        moved
    }

    /// Copy of this node under a new id; edges looping back to the node follow it.
    pub fn renamed(&self, new_id: &str) -> Node {
        let mut copy = self.clone();
        copy.retarget(&self.id, new_id);
        copy.id = new_id.to_string();
        copy
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.body.trim().is_empty() {
            missing.push("body");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Partial update of a node's content fields.
///
/// Responses and position have their own commands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_for: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Option<String>>,
}

impl NodePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }

    pub fn apply_to(&self, node: &Node) -> Node {
        let mut updated = node.clone();
        if let Some(node_type) = self.node_type {
            updated.node_type = node_type;
        }
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(body) = &self.body {
            updated.body = body.clone();
        }
        if let Some(context) = &self.context {
            updated.context = context.clone();
        }
        if let Some(key_points) = &self.key_points {
            updated.key_points = key_points.clone();
        }
        if let Some(listen_for) = &self.listen_for {
            updated.listen_for = listen_for.clone();
        }
        if let Some(warnings) = &self.warnings {
            updated.warnings = warnings.clone();
        }
        if let Some(group) = &self.group {
            updated.group = group.clone();
        }
        updated
    }
}
