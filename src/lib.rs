pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod node;
pub mod registry;
mod builder;

pub use api::{build_spec, parse, parse_file, parse_str, parse_with_options};
pub use config::ParseOptions;
pub use error::{BuildError, DecodeError, SpecError};
pub use model::{
    Check, Condition, Definitions, Endpoint, Filter, Response, SourceCondition, Spec, Step,
};
pub use node::{Mapping, Node, NodePath, Scalar};
pub use registry::Namespace;
