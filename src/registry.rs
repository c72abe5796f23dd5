use crate::error::BuildError;
use crate::model::{Condition, Definitions, Filter, Response, Step};
use crate::node::{Node, NodePath};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};

/// The four independent definition namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Steps,
    Filters,
    Conditions,
    Responses,
}

impl Namespace {
    /// Population order of the `definitions` block.
    pub const ALL: [Namespace; 4] = [
        Namespace::Steps,
        Namespace::Filters,
        Namespace::Conditions,
        Namespace::Responses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Steps => "steps",
            Namespace::Filters => "filters",
            Namespace::Conditions => "conditions",
            Namespace::Responses => "responses",
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can be stored under a name in [`Definitions`].
pub(crate) trait Definition: Clone {
    const NAMESPACE: Namespace;

    fn slot(definitions: &Definitions) -> &BTreeMap<String, Self>;

    fn slot_mut(definitions: &mut Definitions) -> &mut BTreeMap<String, Self>;

    /// Number of items a reference to this definition splices in.
    fn item_count(&self) -> usize;
}

impl Definition for Vec<Step> {
    const NAMESPACE: Namespace = Namespace::Steps;

    fn slot(definitions: &Definitions) -> &BTreeMap<String, Self> {
        &definitions.steps
    }

    fn slot_mut(definitions: &mut Definitions) -> &mut BTreeMap<String, Self> {
        &mut definitions.steps
    }
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl Definition for Vec<Filter> {
    const NAMESPACE: Namespace = Namespace::Filters;

    fn slot(definitions: &Definitions) -> &BTreeMap<String, Self> {
        &definitions.filters
    }

    fn slot_mut(definitions: &mut Definitions) -> &mut BTreeMap<String, Self> {
        &mut definitions.filters
    }
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl Definition for Vec<Condition> {
    const NAMESPACE: Namespace = Namespace::Conditions;

    fn slot(definitions: &Definitions) -> &BTreeMap<String, Self> {
        &definitions.conditions
    }

    fn slot_mut(definitions: &mut Definitions) -> &mut BTreeMap<String, Self> {
        &mut definitions.conditions
    }
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl Definition for Response {
    const NAMESPACE: Namespace = Namespace::Responses;

    fn slot(definitions: &Definitions) -> &BTreeMap<String, Self> {
        &definitions.responses
    }

    fn slot_mut(definitions: &mut Definitions) -> &mut BTreeMap<String, Self> {
        &mut definitions.responses
    }
    fn item_count(&self) -> usize {
        1
    }
}

/// A definition as it appears in the document, before it is built.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry<'doc> {
    pub name: &'doc str,
    pub node: &'doc Node,
    pub path: NodePath,
}

/// Holds raw definitions, memoizes the built ones and tracks which definitions are
/// currently being built so reference cycles can be reported instead of recursing.
#[derive(Debug, Default)]
pub(crate) struct Registry<'doc> {
    raw: HashMap<(Namespace, String), RawEntry<'doc>>,
    // Registration order, used to build every definition in document order.
    order: Vec<(Namespace, &'doc str)>,
    built: Definitions,
    resolving: Vec<(Namespace, &'doc str)>,
}

impl<'doc> Registry<'doc> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a raw definition. A repeated name replaces the earlier entry.
    pub fn register(
        &mut self,
        namespace: Namespace,
        name: &'doc str,
        node: &'doc Node,
        path: NodePath,
    ) {
        let entry = RawEntry { name, node, path };
        if self
            .raw
            .insert((namespace, name.to_string()), entry)
            .is_none()
        {
            self.order.push((namespace, name));
        }
    }

    pub fn entries(&self) -> Vec<(Namespace, &'doc str)> {
        self.order.clone()
    }

    pub fn count(&self, namespace: Namespace) -> usize {
        self.order.iter().filter(|(ns, _)| *ns == namespace).count()
    }

    pub fn raw(&self, namespace: Namespace, name: &str) -> Option<RawEntry<'doc>> {
        self.raw.get(&(namespace, name.to_string())).cloned()
    }

    pub fn cached<D: Definition>(&self, name: &str) -> Option<&D> {
        D::slot(&self.built).get(name)
    }

    pub fn is_built(&self, namespace: Namespace, name: &str) -> bool {
        match namespace {
            Namespace::Steps => self.built.steps.contains_key(name),
            Namespace::Filters => self.built.filters.contains_key(name),
            Namespace::Conditions => self.built.conditions.contains_key(name),
            Namespace::Responses => self.built.responses.contains_key(name),
        }
    }

    pub fn store<D: Definition>(&mut self, name: &str, value: D) {
        D::slot_mut(&mut self.built).insert(name.to_string(), value);
    }

    /// Marks a definition as in progress, failing if it already is.
    pub fn enter(&mut self, namespace: Namespace, name: &'doc str) -> Result<(), BuildError> {
        if self.resolving.contains(&(namespace, name)) {
            let cycle = self
                .resolving
                .iter()
                .skip_while(|entry| **entry != (namespace, name))
                .chain(std::iter::once(&(namespace, name)))
                .map(|(ns, n)| format!("{ns}.{n}"))
                .collect::<Vec<String>>()
                .join(" -> ");
            return Err(BuildError::CyclicDefinition { cycle });
        }
        self.resolving.push((namespace, name));
        Ok(())
    }

    pub fn leave(&mut self) {
        self.resolving.pop();
    }

    pub fn into_definitions(self) -> Definitions {
        self.built
    }
}
