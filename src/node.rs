//! The generic document tree every builder works on.
//!
//! Documents are decoded with `serde_yaml` and then lowered into [`Node`], which only
//! distinguishes the shapes the spec grammar cares about: mappings, sequences, strings,
//! integers and everything else.

use crate::error::DecodeError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Vec<Node>),
    String(String),
    Integer(i64),
    Other(Scalar),
}

/// Scalars that are only ever carried around as opaque parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Float(f64),
}

/// A string-keyed mapping that keeps document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
    // Position of each key in `entries`.
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts a value, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl Node {
    /// Decodes YAML (or JSON) text into a tree.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if the text is malformed, a merge key is invalid, or a
    /// mapping uses a key that cannot be expressed as a string.
    pub fn from_yaml_slice(input: &[u8]) -> Result<Node, DecodeError> {
        if input.iter().all(u8::is_ascii_whitespace) {
            return Ok(Node::Other(Scalar::Null));
        }
        let mut value: serde_yaml::Value =
            serde_yaml::from_slice(input).map_err(DecodeError::Syntax)?;
        value.apply_merge().map_err(DecodeError::Merge)?;
        Node::from_yaml(value, &NodePath::root())
    }

    fn from_yaml(value: serde_yaml::Value, path: &NodePath) -> Result<Node, DecodeError> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Node::Other(Scalar::Null),
            Value::Bool(b) => Node::Other(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Integer(i),
                None => Node::Other(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => Node::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Node::from_yaml(item, &path.index(i)))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut mapping = Mapping::with_capacity(map.len());
                for (key, item) in map {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => {
                            return Err(DecodeError::UnsupportedKey {
                                path: path.to_string(),
                            })
                        }
                    };
                    let item = Node::from_yaml(item, &path.key(&key))?;
                    mapping.insert(key, item);
                }
                Node::Mapping(mapping)
            }
            Value::Tagged(tagged) => Node::from_yaml(tagged.value, path)?,
        })
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Short description of the node's shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::String(_) => "string",
            Node::Integer(_) => "integer",
            Node::Other(Scalar::Null) => "null",
            Node::Other(Scalar::Bool(_)) => "boolean",
            Node::Other(Scalar::Float(_)) => "float",
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Integer(i)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Mapping(m) => m.serialize(serializer),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::String(s) => serializer.serialize_str(s),
            Node::Integer(i) => serializer.serialize_i64(*i),
            Node::Other(Scalar::Null) => serializer.serialize_unit(),
            Node::Other(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Node::Other(Scalar::Float(f)) => serializer.serialize_f64(*f),
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Location of a node inside the document, e.g. `endpoints[0].conditions[1].checks[0]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(source: &str) -> Node {
        match Node::from_yaml_slice(source.as_bytes()) {
            Ok(node) => node,
            Err(err) => panic!("{:#}", miette::Report::new(err)),
        }
    }

    #[test]
    fn test_scalars() {
        let node = decode("{ s: text, i: 42, f: 1.5, b: true, n: null }");
        let map = node.as_mapping().unwrap();
        assert_eq!(map.get("s"), Some(&Node::String("text".into())));
        assert_eq!(map.get("i"), Some(&Node::Integer(42)));
        assert_eq!(map.get("f"), Some(&Node::Other(Scalar::Float(1.5))));
        assert_eq!(map.get("b"), Some(&Node::Other(Scalar::Bool(true))));
        assert_eq!(map.get("n"), Some(&Node::Other(Scalar::Null)));
    }

    #[test]
    fn test_mapping_keeps_document_order() {
        let node = decode("zeta: 1\nalpha: 2\nmid: 3\n");
        let keys: Vec<&str> = node.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_numeric_keys_become_strings() {
        let node = decode("200: ok\ntrue: yes\n");
        let map = node.as_mapping().unwrap();
        assert_eq!(map.get("200"), Some(&Node::String("ok".into())));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn test_sequence_key_is_rejected() {
        let err = Node::from_yaml_slice(b"outer:\n  ? [a, b]\n  : value\n").unwrap_err();
        match err {
            DecodeError::UnsupportedKey { path } => assert_eq!(path, "outer"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_keys_are_applied() {
        let node = decode(
            "base: &base { status: 200, format: json }\nresponse:\n  <<: *base\n  body: hi\n",
        );
        let response = node.as_mapping().unwrap().get("response").unwrap();
        let response = response.as_mapping().unwrap();
        assert_eq!(response.get("status"), Some(&Node::Integer(200)));
        assert_eq!(response.get("body"), Some(&Node::String("hi".into())));
        assert!(!response.contains_key("<<"));
    }

    #[test]
    fn test_tags_are_transparent() {
        let node = decode("value: !custom 7\n");
        assert_eq!(
            node.as_mapping().unwrap().get("value"),
            Some(&Node::Integer(7))
        );
    }

    #[test]
    fn test_malformed_input() {
        let err = Node::from_yaml_slice(b"key: [unterminated").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax(_)));
    }

    #[test]
    fn test_empty_document_is_null() {
        assert_eq!(decode(""), Node::Other(Scalar::Null));
    }

    #[test]
    fn test_mapping_insert_replaces_in_place() {
        let mut map = Mapping::new();
        map.insert("a", Node::Integer(1));
        map.insert("b", Node::Integer(2));
        map.insert("a", Node::Integer(3));
        let entries: Vec<(&str, &Node)> = map.iter().collect();
        assert_eq!(entries, vec![("a", &Node::Integer(3)), ("b", &Node::Integer(2))]);
    }

    #[test]
    fn test_wide_mapping() {
        let mut source = String::from("headers:\n");
        for i in 0..20_000 {
            source.push_str(&format!("  h{i}: [v{i}]\n"));
        }
        let node = decode(&source);
        let headers = node.as_mapping().unwrap().get("headers").unwrap();
        let headers = headers.as_mapping().unwrap();
        assert_eq!(headers.len(), 20_000);
        assert_eq!(headers.keys().next(), Some("h0"));
        assert_eq!(
            headers.get("h19999"),
            Some(&Node::Sequence(vec![Node::from("v19999")]))
        );
    }

    #[test]
    fn test_colliding_stringified_keys_keep_last_value() {
        let node = decode("1: number\n\"1\": text\nother: x\n");
        let map = node.as_mapping().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("1"), Some(&Node::from("text")));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1", "other"]);
    }

    #[test]
    fn test_integer_outside_i64_is_float() {
        let node = decode("big: 18446744073709551615\nsmall: -3\n");
        let map = node.as_mapping().unwrap();
        assert_eq!(map.get("big"), Some(&Node::Other(Scalar::Float(u64::MAX as f64))));
        assert_eq!(map.get("small"), Some(&Node::Integer(-3)));
    }

    #[test]
    fn test_path_display() {
        let path = NodePath::root()
            .key("endpoints")
            .index(0)
            .key("conditions")
            .index(2);
        assert_eq!(path.to_string(), "endpoints[0].conditions[2]");
        assert_eq!(NodePath::root().to_string(), "<root>");
    }

    #[test]
    fn test_serialize_to_json() {
        let node = decode("{ a: [1, two, null], b: { c: false } }");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "a": [1, "two", null], "b": { "c": false } })
        );
    }
}
