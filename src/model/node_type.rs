use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of conversation state a node represents.
///
/// The set is closed: validation rules hang off [`NodeType::behavior`] rather
/// than off per-type code paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Entry,
    Question,
    Pitch,
    Objection,
    Closing,
    Success,
    Terminal,
    Voicemail,
    Transfer,
    Info,
}

/// Structural expectations attached to a node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeBehavior {
    /// The node is a legitimate starting point of a conversation.
    pub is_entry: bool,
    /// A node of this type with no incoming edge is an orphan.
    pub requires_incoming: bool,
    /// A node of this type with no outgoing edge is a dead end.
    pub requires_outgoing: bool,
}

impl NodeBehavior {
    const fn new(is_entry: bool, requires_incoming: bool, requires_outgoing: bool) -> Self {
        Self {
            is_entry,
            requires_incoming,
            requires_outgoing,
        }
    }
}

impl NodeType {
    pub const ALL: [NodeType; 10] = [
        NodeType::Entry,
        NodeType::Question,
        NodeType::Pitch,
        NodeType::Objection,
        NodeType::Closing,
        NodeType::Success,
        NodeType::Terminal,
        NodeType::Voicemail,
        NodeType::Transfer,
        NodeType::Info,
    ];

    pub fn behavior(self) -> NodeBehavior {
        match self {
            NodeType::Entry => NodeBehavior::new(true, false, true),
            NodeType::Question
            | NodeType::Pitch
            | NodeType::Objection
            | NodeType::Closing
            | NodeType::Info => NodeBehavior::new(false, true, true),
            // Call outcomes: the conversation ends here.
            NodeType::Success
            | NodeType::Terminal
            | NodeType::Voicemail
            | NodeType::Transfer => NodeBehavior::new(false, true, false),
        }
    }

    pub fn is_entry(self) -> bool {
        self.behavior().is_entry
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Entry => "entry",
            NodeType::Question => "question",
            NodeType::Pitch => "pitch",
            NodeType::Objection => "objection",
            NodeType::Closing => "closing",
            NodeType::Success => "success",
            NodeType::Terminal => "terminal",
            NodeType::Voicemail => "voicemail",
            NodeType::Transfer => "transfer",
            NodeType::Info => "info",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown node type: {0}")]
pub struct ParseNodeTypeError(pub String);

impl FromStr for NodeType {
    type Err = ParseNodeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ParseNodeTypeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_needs_no_incoming() {
        let behavior = NodeType::Entry.behavior();
        assert!(behavior.is_entry);
        assert!(!behavior.requires_incoming);
        assert!(behavior.requires_outgoing);
    }

    #[test]
    fn test_outcomes_need_no_outgoing() {
        for node_type in [
            NodeType::Terminal,
            NodeType::Success,
            NodeType::Voicemail,
            NodeType::Transfer,
        ] {
            assert!(!node_type.behavior().requires_outgoing, "{node_type}");
        }
        assert!(NodeType::Question.behavior().requires_outgoing);
    }

    #[test]
    fn test_parse_round_trips_display() {
        for node_type in NodeType::ALL {
            assert_eq!(node_type.to_string().parse::<NodeType>(), Ok(node_type));
        }
        assert_eq!(" Objection ".parse::<NodeType>(), Ok(NodeType::Objection));
        assert!("decision".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&NodeType::Voicemail).unwrap();
        assert_eq!(json, "\"voicemail\"");
    }
}
