//! Script data model: nodes, their responses, and the documents built from them.

mod document;
mod lock;
mod node;
mod node_type;
mod snapshot;

pub use document::ScriptDocument;
pub use lock::Lock;
pub use node::{Edge, Node, NodePatch, NodePosition, Position};
pub use node_type::{NodeBehavior, NodeType, ParseNodeTypeError};
pub use snapshot::{Snapshot, SnapshotSummary};
