use crate::builder::Builder;
use crate::config::ParseOptions;
use crate::error::{BuildError, SpecError};
use crate::extract::Fields;
use crate::model::Spec;
use crate::node::{Node, NodePath};
use log::debug;
use std::path::Path;

/// Parses a mock specification and resolves every `$ref` in it.
///
/// This is the primary entry point. The input must be YAML (or JSON) whose root is an
/// object with optional `definitions` and `endpoints` fields; other top-level fields
/// are ignored.
///
/// # Errors
///
/// Returns a `SpecError` if the input is malformed or does not describe a valid spec.
pub fn parse(input: &[u8]) -> Result<Spec, SpecError> {
    parse_with_options(input, &ParseOptions::default())
}

/// Same as [`parse`], for string input.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_str(input: &str) -> Result<Spec, SpecError> {
    parse(input.as_bytes())
}

/// Parses with explicit [`ParseOptions`].
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with_options(input: &[u8], options: &ParseOptions) -> Result<Spec, SpecError> {
    debug!("parsing spec ({} bytes)", input.len());
    let root = Node::from_yaml_slice(input)?;
    let spec = build_spec(&root, options)?;
    debug!("parsed spec with {} top-level endpoints", spec.endpoints.len());
    Ok(spec)
}

/// Reads `path` and parses its content.
///
/// # Errors
///
/// I/O failures are returned unchanged as `SpecError::Io`; everything else as in [`parse`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Spec, SpecError> {
    let path = path.as_ref();
    debug!("reading spec from {}", path.display());
    let content = std::fs::read(path)?;
    parse(&content)
}

/// Builds a [`Spec`] from an already decoded document tree.
///
/// Definitions are registered and built first so endpoints can reference them.
///
/// # Errors
///
/// Returns the first `BuildError` encountered; no partial spec is produced.
pub fn build_spec(root: &Node, options: &ParseOptions) -> Result<Spec, BuildError> {
    let root_path = NodePath::root();
    let Node::Mapping(map) = root else {
        return Err(BuildError::InvalidShape {
            path: root_path.to_string(),
            reason: format!("spec must be an object, found {}", root.kind()),
        });
    };
    let fields = Fields::new(map, &root_path);
    let mut builder = Builder::new(options);

    if let Some(definitions) = fields.mapping("definitions")? {
        let definitions_path = fields.field_path("definitions");
        builder.definitions(Fields::new(definitions, &definitions_path))?;
    }

    let endpoints = match fields.sequence("endpoints")? {
        Some(items) => builder.endpoints(items, &fields.field_path("endpoints"))?,
        None => Vec::new(),
    };

    Ok(Spec {
        definitions: builder.finish(),
        endpoints,
    })
}
