use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::SimpleGraphError;

/// Insertion-ordered attribute name to JSON value mapping. Node bodies and edge
/// properties are both stored as one of these.
pub type AttributeBag = Map<String, Value>;

pub const ID_KEY: &str = "id";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub body: AttributeBag,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: i64,
    pub source: String,
    pub target: String,
    pub properties: AttributeBag,
}

/// A node waiting to be written. Without an explicit id the identifier comes from
/// the body's `id` attribute, or is generated when the body has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNode {
    pub id: Option<String>,
    pub body: AttributeBag,
}

impl NewNode {
    pub fn new(body: AttributeBag) -> Self {
        Self { id: None, body }
    }

    pub fn with_id<T: Into<String>>(mut self, id: T) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    pub properties: AttributeBag,
}

impl EdgeSpec {
    pub fn new<S: Into<String>, T: Into<String>>(source: S, target: T) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            properties: AttributeBag::new(),
        }
    }

    pub fn with_properties(mut self, properties: AttributeBag) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outbound,
    Inbound,
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out" | "outbound" => Ok(Direction::Outbound),
            "in" | "inbound" => Ok(Direction::Inbound),
            "both" | "any" => Ok(Direction::Both),
            other => Err(format!("unknown direction {other}")),
        }
    }
}

/// Kind of a row produced by `traverse_with_bodies`: a node body, or an edge seen
/// from the node being expanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKind {
    Node,
    Outbound,
    Inbound,
}

impl RowKind {
    pub fn marker(self) -> &'static str {
        match self {
            RowKind::Node => "()",
            RowKind::Outbound => "->",
            RowKind::Inbound => "<-",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// For a `Node` row `id` is the node itself; for edge rows it is the endpoint on the
/// far side of the edge and `payload` holds the edge properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraversalRow {
    pub id: String,
    pub kind: RowKind,
    pub payload: AttributeBag,
}

/// Renders an `id` attribute as an identifier. Numbers are accepted so bodies such
/// as `{"id": 1}` address the node `"1"`.
pub fn identifier_from_value(value: &Value) -> Result<String, SimpleGraphError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SimpleGraphError::invalid_input(format!(
            "node id must be a non-empty string or a number, got {other}"
        ))),
    }
}

/// Settles the identifier of a node about to be inserted and makes the body mirror
/// it. The id key is added to the parsed bag, never spliced into text.
pub fn resolve_identity(
    mut body: AttributeBag,
    id: Option<&str>,
) -> Result<(String, AttributeBag), SimpleGraphError> {
    let declared = body.get(ID_KEY).map(identifier_from_value).transpose()?;
    let id = match (id, declared) {
        (Some(""), _) => return Err(SimpleGraphError::invalid_input("node id must be set")),
        (Some(explicit), Some(declared)) if explicit != declared => {
            return Err(SimpleGraphError::invalid_input(format!(
                "explicit id {explicit} conflicts with body id {declared}"
            )));
        }
        (Some(explicit), Some(_)) => explicit.to_string(),
        (Some(explicit), None) => {
            body.insert(ID_KEY.to_string(), Value::String(explicit.to_string()));
            explicit.to_string()
        }
        (None, Some(declared)) => declared,
        (None, None) => {
            let generated = uuid::Uuid::new_v4().to_string();
            body.insert(ID_KEY.to_string(), Value::String(generated.clone()));
            generated
        }
    };
    Ok((id, body))
}

/// Shallow merge: keys from `partial` overwrite, everything else is kept. The stored
/// `id` attribute is left alone.
pub fn merge_bags(
    id: &str,
    mut current: AttributeBag,
    partial: AttributeBag,
) -> Result<AttributeBag, SimpleGraphError> {
    for (key, value) in partial {
        if key == ID_KEY {
            if identifier_from_value(&value)? != id {
                return Err(SimpleGraphError::invalid_input(format!(
                    "cannot change id of node {id}"
                )));
            }
            continue;
        }
        current.insert(key, value);
    }
    Ok(current)
}

pub fn parse_bag(text: &str) -> Result<AttributeBag, SimpleGraphError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SimpleGraphError::malformed(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(SimpleGraphError::malformed(e.to_string())),
    }
}

pub fn encode_bag(bag: &AttributeBag) -> Result<String, SimpleGraphError> {
    serde_json::to_string(bag).map_err(|e| SimpleGraphError::invalid_input(e.to_string()))
}
