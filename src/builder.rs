//! Builders that turn mapping nodes into typed entities.
//!
//! There is no tag field in the document: each builder probes for its fields in a fixed
//! order and the first shape that matches wins. `$ref` nodes are resolved through the
//! [`Registry`], building the referenced definition on first use.

use crate::config::ParseOptions;
use crate::error::BuildError;
use crate::extract::Fields;
use crate::model::{
    Check, Condition, Definitions, Endpoint, Filter, Response, SourceCondition, Step,
};
use crate::node::{Mapping, Node, NodePath};
use crate::registry::{Definition, Namespace, Registry};
use log::{debug, trace, warn};

const REF: &str = "$ref";

pub(crate) struct Builder<'doc> {
    registry: Registry<'doc>,
    max_depth: usize,
    depth: usize,
    max_expanded_items: usize,
    expanded_items: usize,
}

impl<'doc> Builder<'doc> {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            registry: Registry::new(),
            max_depth: options.max_depth,
            depth: 0,
            max_expanded_items: options.max_expanded_items,
            expanded_items: 0,
        }
    }

    pub fn finish(self) -> Definitions {
        self.registry.into_definitions()
    }

    // === Definitions ===

    /// Registers every entry of the `definitions` block, then builds each one.
    ///
    /// Registration happens up front so a `$ref` can point at any definition regardless
    /// of where it appears in the document.
    pub fn definitions(&mut self, definitions: Fields<'doc, '_>) -> Result<(), BuildError> {
        for namespace in Namespace::ALL {
            let Some(entries) = definitions.mapping(namespace.as_str())? else {
                continue;
            };
            let base = definitions.field_path(namespace.as_str());
            for (name, node) in entries.iter() {
                self.registry.register(namespace, name, node, base.key(name));
            }
        }

        debug!(
            "registered definitions: {} steps, {} filters, {} conditions, {} responses",
            self.registry.count(Namespace::Steps),
            self.registry.count(Namespace::Filters),
            self.registry.count(Namespace::Conditions),
            self.registry.count(Namespace::Responses),
        );

        // Entries are registered namespace by namespace, so this also builds steps first,
        // then filters, conditions and responses.
        for (namespace, name) in self.registry.entries() {
            if self.registry.is_built(namespace, name) {
                continue;
            }
            let site = definitions.field_path(namespace.as_str()).key(name);
            match namespace {
                Namespace::Steps => {
                    self.resolve(name, &site, Self::steps_definition)?;
                }
                Namespace::Filters => {
                    self.resolve(name, &site, Self::filters_definition)?;
                }
                Namespace::Conditions => {
                    self.resolve(name, &site, Self::conditions_definition)?;
                }
                Namespace::Responses => {
                    self.resolve(name, &site, Self::response_definition)?;
                }
            }
        }
        Ok(())
    }

    fn steps_definition(
        &mut self,
        node: &'doc Node,
        path: &NodePath,
    ) -> Result<Vec<Step>, BuildError> {
        let items = definition_items(node, path, Namespace::Steps)?;
        self.step_items(items, path)
    }

    fn filters_definition(
        &mut self,
        node: &'doc Node,
        path: &NodePath,
    ) -> Result<Vec<Filter>, BuildError> {
        let items = definition_items(node, path, Namespace::Filters)?;
        self.filter_items(items, path)
    }

    fn conditions_definition(
        &mut self,
        node: &'doc Node,
        path: &NodePath,
    ) -> Result<Vec<Condition>, BuildError> {
        let items = definition_items(node, path, Namespace::Conditions)?;
        self.condition_items(items, path)
    }

    fn response_definition(
        &mut self,
        node: &'doc Node,
        path: &NodePath,
    ) -> Result<Response, BuildError> {
        let fields = Fields::of(node, path, "response")?;
        self.response(fields.map(), path)
    }

    /// Returns the definition named `name`, building and memoizing it on first use.
    fn resolve<D, F>(&mut self, name: &str, site: &NodePath, build: F) -> Result<D, BuildError>
    where
        D: Definition,
        F: FnOnce(&mut Self, &'doc Node, &NodePath) -> Result<D, BuildError>,
    {
        let namespace = D::NAMESPACE;
        if let Some(value) = self.registry.cached::<D>(name) {
            self.expanded_items = expand(
                self.expanded_items,
                value.item_count(),
                self.max_expanded_items,
                site,
            )?;
            trace!("`{namespace}.{name}` at `{site}` resolved from cache");
            return Ok(value.clone());
        }

        let Some(entry) = self.registry.raw(namespace, name) else {
            return Err(BuildError::UnknownDefinition {
                path: site.to_string(),
                namespace,
                name: name.to_string(),
            });
        };

        trace!("building `{namespace}.{name}` for `{site}`");
        self.registry.enter(namespace, entry.name)?;
        let built = self.nested(site, |builder| build(builder, entry.node, &entry.path));
        self.registry.leave();

        let value = built?;
        self.expanded_items = expand(
            self.expanded_items,
            value.item_count(),
            self.max_expanded_items,
            site,
        )?;
        self.registry.store(name, value.clone());
        Ok(value)
    }

    /// Runs `f` one nesting level deeper, failing once the configured limit is reached.
    fn nested<T>(
        &mut self,
        path: &NodePath,
        f: impl FnOnce(&mut Self) -> Result<T, BuildError>,
    ) -> Result<T, BuildError> {
        if self.depth >= self.max_depth {
            return Err(BuildError::TooDeeplyNested {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // === Steps ===

    fn step_items(
        &mut self,
        items: &'doc [Node],
        path: &NodePath,
    ) -> Result<Vec<Step>, BuildError> {
        let mut steps = Vec::new();
        for (i, item) in items.iter().enumerate() {
            steps.extend(self.step_item(item, &path.index(i))?);
        }
        Ok(steps)
    }

    /// `{ operation: parameters }`, or `{ $ref: name }` expanding to a group of steps.
    fn step_item(&mut self, node: &'doc Node, path: &NodePath) -> Result<Vec<Step>, BuildError> {
        let fields = Fields::of(node, path, "step item")?;
        let (operation, value) = single_entry(&fields)?;

        if operation == REF {
            let name = value.as_str().ok_or_else(|| BuildError::TypeMismatch {
                path: fields.field_path(REF).to_string(),
                expected: "a string",
            })?;
            return self.resolve(name, path, Self::steps_definition);
        }

        Ok(vec![Step {
            operation: operation.to_string(),
            parameters: parameters(value),
        }])
    }

    // === Filters ===

    fn filter_items(
        &mut self,
        items: &'doc [Node],
        path: &NodePath,
    ) -> Result<Vec<Filter>, BuildError> {
        let mut filters = Vec::new();
        for (i, item) in items.iter().enumerate() {
            filters.extend(self.filter(item, &path.index(i))?);
        }
        Ok(filters)
    }

    fn filter(&mut self, node: &'doc Node, path: &NodePath) -> Result<Vec<Filter>, BuildError> {
        let fields = Fields::of(node, path, "filter item")?;
        if let Some(name) = reference(&fields)? {
            return self.resolve(name, path, Self::filters_definition);
        }

        let mut filter = Filter::default();
        fields.fill_strings(&mut [
            ("source", &mut filter.source),
            ("target", &mut filter.target),
        ])?;
        if filter.source.is_empty() {
            return Err(missing(path, "filter", "source"));
        }

        if let Some(items) = fields.sequence("steps")? {
            filter.steps = self.step_items(items, &fields.field_path("steps"))?;
        }

        Ok(vec![filter])
    }

    // === Conditions ===

    fn condition_items(
        &mut self,
        items: &'doc [Node],
        path: &NodePath,
    ) -> Result<Vec<Condition>, BuildError> {
        let mut conditions = Vec::new();
        for (i, item) in items.iter().enumerate() {
            conditions.extend(self.condition(item, &path.index(i))?);
        }
        Ok(conditions)
    }

    /// Probes `$ref`, then `any`, then `all`, then `source` with `checks`.
    ///
    /// Only a `$ref` can yield more than one condition.
    fn condition(
        &mut self,
        node: &'doc Node,
        path: &NodePath,
    ) -> Result<Vec<Condition>, BuildError> {
        let fields = Fields::of(node, path, "condition item")?;
        if let Some(name) = reference(&fields)? {
            return self.resolve(name, path, Self::conditions_definition);
        }

        if let Some(items) = fields.sequence("any")? {
            let nested = self.nested_conditions(&fields, items, "any")?;
            return Ok(vec![Condition::Any(nested)]);
        }

        if let Some(items) = fields.sequence("all")? {
            let nested = self.nested_conditions(&fields, items, "all")?;
            return Ok(vec![Condition::All(nested)]);
        }

        let mut condition = SourceCondition::default();
        fields.fill_string(&mut condition.source, "source")?;
        if condition.source.is_empty() {
            return Err(missing(path, "condition", "source"));
        }

        let checks = match fields.sequence("checks")? {
            Some(items) if !items.is_empty() => items,
            _ => return Err(missing(path, "condition", "checks")),
        };
        let checks_path = fields.field_path("checks");
        condition.checks = checks
            .iter()
            .enumerate()
            .map(|(i, item)| check(item, &checks_path.index(i)))
            .collect::<Result<_, _>>()?;

        Ok(vec![Condition::Source(condition)])
    }

    fn nested_conditions(
        &mut self,
        fields: &Fields<'doc, '_>,
        items: &'doc [Node],
        field: &'static str,
    ) -> Result<Vec<Condition>, BuildError> {
        if items.is_empty() {
            return Err(missing(fields.path(), "condition", field));
        }
        let path = fields.field_path(field);
        self.nested(&path, |builder| builder.condition_items(items, &path))
    }

    // === Responses ===

    fn response(&mut self, map: &'doc Mapping, path: &NodePath) -> Result<Response, BuildError> {
        let fields = Fields::new(map, path);
        if let Some(name) = reference(&fields)? {
            return self.resolve(name, path, Self::response_definition);
        }

        let mut response = Response::default();
        fields.fill_strings(&mut [
            ("format", &mut response.format),
            ("body", &mut response.body),
        ])?;
        fields.fill_integer(&mut response.status, "status")?;

        if let Some(headers) = fields.mapping("headers")? {
            let headers_path = fields.field_path("headers");
            for (name, values) in headers.iter() {
                let header_path = headers_path.key(name);
                let values = values.as_sequence().ok_or_else(|| BuildError::TypeMismatch {
                    path: header_path.to_string(),
                    expected: "an array of strings",
                })?;
                let values = values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        value.as_str().map(str::to_string).ok_or_else(|| {
                            BuildError::TypeMismatch {
                                path: header_path.index(i).to_string(),
                                expected: "a string",
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                response.headers.insert(name.to_string(), values);
            }
        }

        Ok(response)
    }

    // === Endpoints ===

    pub fn endpoints(
        &mut self,
        items: &'doc [Node],
        path: &NodePath,
    ) -> Result<Vec<Endpoint>, BuildError> {
        let mut endpoints = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = path.index(i);
            endpoints.push(self.nested(&item_path, |builder| builder.endpoint(item, &item_path))?);
        }
        Ok(endpoints)
    }

    fn endpoint(&mut self, node: &'doc Node, path: &NodePath) -> Result<Endpoint, BuildError> {
        let fields = Fields::of(node, path, "endpoint")?;
        let mut endpoint = Endpoint::default();
        fields.fill_strings(&mut [
            ("description", &mut endpoint.description),
            ("host", &mut endpoint.host),
            ("method", &mut endpoint.method),
            ("path", &mut endpoint.path),
            ("bodyFormat", &mut endpoint.body_format),
        ])?;

        if let Some(items) = fields.sequence("filters")? {
            if items.is_empty() {
                return Err(missing(path, "endpoint", "filters"));
            }
            endpoint.filters = self.filter_items(items, &fields.field_path("filters"))?;
        }

        if let Some(items) = fields.sequence("conditions")? {
            if items.is_empty() {
                return Err(missing(path, "endpoint", "conditions"));
            }
            endpoint.conditions = self.condition_items(items, &fields.field_path("conditions"))?;
        }

        if let Some(items) = fields.sequence("endpoints")? {
            endpoint.endpoints = self.endpoints(items, &fields.field_path("endpoints"))?;
        }

        if let Some(map) = fields.mapping("response")? {
            endpoint.response = Some(self.response(map, &fields.field_path("response"))?);
        }

        if endpoint.endpoints.is_empty() && endpoint.response.is_none() {
            return Err(BuildError::IncompleteEndpoint {
                path: path.to_string(),
            });
        }

        Ok(endpoint)
    }
}

/// Adds `count` items to the running total, failing once it passes `limit`.
fn expand(
    total: usize,
    count: usize,
    limit: usize,
    site: &NodePath,
) -> Result<usize, BuildError> {
    let total = total.saturating_add(count);
    if total > limit {
        return Err(BuildError::TooManyExpansions {
            path: site.to_string(),
            limit,
        });
    }
    Ok(total)
}

fn check(node: &Node, path: &NodePath) -> Result<Check, BuildError> {
    let fields = Fields::of(node, path, "check item")?;
    let (name, value) = single_entry(&fields)?;
    if name == REF {
        return Err(BuildError::InvalidShape {
            path: path.to_string(),
            reason: "checks cannot be referenced with `$ref`".to_string(),
        });
    }
    Ok(Check {
        name: name.to_string(),
        parameters: parameters(value),
    })
}

/// The value of a `$ref` field, if the node has one.
fn reference<'n>(fields: &Fields<'n, '_>) -> Result<Option<&'n str>, BuildError> {
    let name = fields.string(REF)?;
    if name.is_some() && fields.len() > 1 {
        let ignored: Vec<&str> = fields.map().keys().filter(|k| *k != REF).collect();
        warn!(
            "ignoring keys {ignored:?} next to `$ref` at `{}`",
            fields.path()
        );
    }
    Ok(name)
}

/// The only key of a single-key object and its value.
fn single_entry<'n>(fields: &Fields<'n, '_>) -> Result<(&'n str, &'n Node), BuildError> {
    let mut entries = fields.map().iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(BuildError::AmbiguousDefinition {
            path: fields.path().to_string(),
            keys: fields.map().keys().map(str::to_string).collect(),
        }),
    }
}

/// Mappings are used as-is; any other value is wrapped as `{ value: <value> }`.
fn parameters(value: &Node) -> Mapping {
    match value {
        Node::Mapping(map) => map.clone(),
        other => [("value".to_string(), other.clone())].into_iter().collect(),
    }
}

fn definition_items<'n>(
    node: &'n Node,
    path: &NodePath,
    namespace: Namespace,
) -> Result<&'n [Node], BuildError> {
    let items = node.as_sequence().ok_or_else(|| BuildError::TypeMismatch {
        path: path.to_string(),
        expected: "an array",
    })?;
    if items.is_empty() {
        return Err(missing(path, "definition", namespace.as_str()));
    }
    Ok(items)
}

fn missing(path: &NodePath, entity: &'static str, field: &str) -> BuildError {
    BuildError::MissingRequiredField {
        path: path.to_string(),
        entity,
        field: field.to_string(),
    }
}
