//! The resolved mock spec handed to the serving engine.

use crate::error::BuildError;
use crate::node::{Mapping, NodePath};
use crate::registry::Namespace;
use serde::Serialize;
use std::collections::BTreeMap;

/// Root of a parsed mock specification.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Spec {
    pub definitions: Definitions,
    pub endpoints: Vec<Endpoint>,
}

impl Spec {
    /// Serializes the resolved graph into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the resolved graph into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Named, reusable fragments. Each namespace is independent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Definitions {
    pub steps: BTreeMap<String, Vec<Step>>,
    pub filters: BTreeMap<String, Vec<Filter>>,
    pub conditions: BTreeMap<String, Vec<Condition>>,
    pub responses: BTreeMap<String, Response>,
}

/// Lookups on already resolved definitions.
///
/// A miss fails with `UnknownDefinition`. There is no referencing node behind such a
/// lookup, so its `path` names the namespace block (`definitions.<namespace>`) the name
/// was looked up in.
impl Definitions {
    pub fn lookup_steps(&self, name: &str) -> Result<&[Step], BuildError> {
        self.steps
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown(Namespace::Steps, name))
    }

    pub fn lookup_filters(&self, name: &str) -> Result<&[Filter], BuildError> {
        self.filters
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown(Namespace::Filters, name))
    }

    pub fn lookup_conditions(&self, name: &str) -> Result<&[Condition], BuildError> {
        self.conditions
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| unknown(Namespace::Conditions, name))
    }

    pub fn lookup_response(&self, name: &str) -> Result<&Response, BuildError> {
        self.responses
            .get(name)
            .ok_or_else(|| unknown(Namespace::Responses, name))
    }
}

fn unknown(namespace: Namespace, name: &str) -> BuildError {
    BuildError::UnknownDefinition {
        path: NodePath::root().key("definitions").key(namespace.as_str()).to_string(),
        namespace,
        name: name.to_string(),
    }
}

/// A single filter operation, e.g. `uppercase` or `replace`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Step {
    pub operation: String,
    pub parameters: Mapping,
}

/// Reads the `source` parameter, runs it through `steps` and stores the result as a
/// request parameter named `target`, or `source` when `target` is empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Filter {
    pub source: String,
    pub target: String,
    pub steps: Vec<Step>,
}

impl Filter {
    /// The parameter name the filter output is stored under.
    pub fn output(&self) -> &str {
        if self.target.is_empty() {
            &self.source
        } else {
            &self.target
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// True when at least one nested condition holds.
    Any(Vec<Condition>),
    /// True when every nested condition holds.
    All(Vec<Condition>),
    #[serde(untagged)]
    Source(SourceCondition),
}

/// True when every check passes against the value of `source`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SourceCondition {
    pub source: String,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Check {
    pub name: String,
    pub parameters: Mapping,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Response {
    pub status: i64,
    /// One of `raw`, `json` or `xml`.
    pub format: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Response {
    /// Content type implied by `format`; `raw` and unknown formats imply none.
    pub fn content_type(&self) -> Option<&'static str> {
        match self.format.as_str() {
            "json" => Some("application/json"),
            "xml" => Some("application/xml"),
            _ => None,
        }
    }
}

/// A matching rule. Sub-endpoints are only considered once the parent matches.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub description: String,
    pub host: String,
    pub method: String,
    pub path: String,
    pub body_format: String,
    pub filters: Vec<Filter>,
    /// Implicitly AND-ed.
    pub conditions: Vec<Condition>,
    pub endpoints: Vec<Endpoint>,
    pub response: Option<Response>,
}
