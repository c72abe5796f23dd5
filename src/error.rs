use crate::registry::Namespace;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SpecError {
    #[error(transparent)]
    #[diagnostic(code(spec::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),
}

/// Failures turning raw text into a [`Node`](crate::node::Node) tree.
#[derive(Error, Debug, Diagnostic)]
pub enum DecodeError {
    #[error("Malformed document: {0}")]
    #[diagnostic(
        code(decode::syntax),
        help("The input must be well-formed YAML (or JSON).")
    )]
    Syntax(#[source] serde_yaml::Error),

    #[error("Could not apply merge keys: {0}")]
    #[diagnostic(
        code(decode::merge),
        help("A `<<` merge key must point to a mapping or a sequence of mappings.")
    )]
    Merge(#[source] serde_yaml::Error),

    #[error("Unsupported mapping key at `{path}`")]
    #[diagnostic(
        code(decode::unsupported_key),
        help("Mapping keys must be strings, numbers or booleans.")
    )]
    UnsupportedKey { path: String },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum BuildError {
    #[error("Invalid shape at `{path}`: {reason}")]
    #[diagnostic(code(build::invalid_shape))]
    InvalidShape { path: String, reason: String },

    #[error("Expected `{path}` to be {expected}")]
    #[diagnostic(
        code(build::type_mismatch),
        help("The field is present but holds a value of the wrong kind.")
    )]
    TypeMismatch { path: String, expected: &'static str },

    #[error("The {entity} at `{path}` requires a non-empty `{field}`")]
    #[diagnostic(code(build::missing_required_field))]
    MissingRequiredField {
        path: String,
        entity: &'static str,
        field: String,
    },

    #[error("Expected `{path}` to have exactly one key, found {}", display_keys(.keys))]
    #[diagnostic(
        code(build::ambiguous_definition),
        help("Steps, checks and step references are written as single-key objects, e.g. `- uppercase: null`.")
    )]
    AmbiguousDefinition { path: String, keys: Vec<String> },

    #[error("Unknown definition `{name}` in {namespace} (referenced at `{path}`)")]
    #[diagnostic(
        code(build::unknown_definition),
        help("Declare it under `definitions.{namespace}` or fix the `$ref` name.")
    )]
    UnknownDefinition {
        path: String,
        namespace: Namespace,
        name: String,
    },

    #[error("Endpoint at `{path}` has neither sub-endpoints nor a response")]
    #[diagnostic(
        code(build::incomplete_endpoint),
        help("Add a `response` or at least one nested entry under `endpoints`.")
    )]
    IncompleteEndpoint { path: String },

    #[error("Circular definition reference: {cycle}")]
    #[diagnostic(code(build::cyclic_definition))]
    CyclicDefinition { cycle: String },

    #[error("Nesting at `{path}` exceeds the limit of {limit} levels")]
    #[diagnostic(
        code(build::too_deeply_nested),
        help("Flatten the condition or endpoint tree, or raise `ParseOptions::max_depth`.")
    )]
    TooDeeplyNested { path: String, limit: usize },

    #[error("Expanding the reference at `{path}` exceeds the limit of {limit} expanded items")]
    #[diagnostic(
        code(build::too_many_expansions),
        help("Definitions that reference each other several times grow exponentially. Flatten them, or raise `ParseOptions::max_expanded_items`.")
    )]
    TooManyExpansions { path: String, limit: usize },
}

fn display_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        return "none".to_string();
    }
    keys.iter()
        .map(|k| format!("`{k}`"))
        .collect::<Vec<_>>()
        .join(", ")
}
