//! Edge declarations and resolved edges

use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute used to find the target of an edge declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum MatchKey {
    Id(String),
    Name(String),
    Arn(String),
}

impl MatchKey {
    /// Match by id; `None` for an absent or blank value
    pub fn id(value: Option<&str>) -> Option<Self> {
        non_blank(value).map(MatchKey::Id)
    }

    /// Match by name; `None` for an absent or blank value
    pub fn name(value: Option<&str>) -> Option<Self> {
        non_blank(value).map(MatchKey::Name)
    }

    /// Match by ARN; `None` for an absent or blank value
    pub fn arn(value: Option<&str>) -> Option<Self> {
        non_blank(value).map(MatchKey::Arn)
    }

    pub fn value(&self) -> &str {
        match self {
            MatchKey::Id(v) | MatchKey::Name(v) | MatchKey::Arn(v) => v,
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Id(v) => write!(f, "id={}", v),
            MatchKey::Name(v) => write!(f, "name={}", v),
            MatchKey::Arn(v) => write!(f, "arn={}", v),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Which end of the edge the declaring node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// declaring node -> matched node
    Outgoing,
    /// matched node -> declaring node
    Incoming,
}

/// A reference from a registered node to nodes of another kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeDeclaration {
    pub node: NodeId,
    pub node_kind: String,
    pub other_kind: String,
    pub key: MatchKey,
    pub direction: Direction,
}

/// A resolved directed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeDeclaration {
    /// The edge this declaration yields when `other` matches
    pub fn edge_to(&self, other: NodeId) -> Edge {
        match self.direction {
            Direction::Outgoing => Edge {
                from: self.node,
                to: other,
            },
            Direction::Incoming => Edge {
                from: other,
                to: self.node,
            },
        }
    }
}
