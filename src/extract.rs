//! Typed field accessors over a [`Mapping`].
//!
//! Every accessor treats an absent field as `None` and a field of the wrong shape as a
//! [`BuildError::TypeMismatch`] pointing at that field.

use crate::error::BuildError;
use crate::node::{Mapping, Node, NodePath};

/// A mapping node together with its location in the document.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'n, 'p> {
    map: &'n Mapping,
    path: &'p NodePath,
}

impl<'n, 'p> Fields<'n, 'p> {
    /// Views `node` as a mapping, failing with `InvalidShape` if it is anything else.
    pub fn of(node: &'n Node, path: &'p NodePath, entity: &str) -> Result<Self, BuildError> {
        match node {
            Node::Mapping(map) => Ok(Self { map, path }),
            other => Err(BuildError::InvalidShape {
                path: path.to_string(),
                reason: format!("each {entity} must be an object, found {}", other.kind()),
            }),
        }
    }

    pub fn new(map: &'n Mapping, path: &'p NodePath) -> Self {
        Self { map, path }
    }

    pub fn map(&self) -> &'n Mapping {
        self.map
    }

    pub fn path(&self) -> &'p NodePath {
        self.path
    }

    pub fn field_path(&self, field: &str) -> NodePath {
        self.path.key(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn mapping(&self, field: &str) -> Result<Option<&'n Mapping>, BuildError> {
        self.typed(field, "an object", Node::as_mapping)
    }

    pub fn sequence(&self, field: &str) -> Result<Option<&'n [Node]>, BuildError> {
        self.typed(field, "an array", Node::as_sequence)
    }

    pub fn string(&self, field: &str) -> Result<Option<&'n str>, BuildError> {
        self.typed(field, "a string", Node::as_str)
    }

    pub fn integer(&self, field: &str) -> Result<Option<i64>, BuildError> {
        self.typed(field, "an integer", Node::as_i64)
    }

    /// Overwrites `target` only when the field is present.
    pub fn fill_string(&self, target: &mut String, field: &str) -> Result<(), BuildError> {
        if let Some(value) = self.string(field)? {
            *target = value.to_string();
        }
        Ok(())
    }

    pub fn fill_strings(&self, targets: &mut [(&str, &mut String)]) -> Result<(), BuildError> {
        for (field, target) in targets.iter_mut() {
            self.fill_string(&mut **target, *field)?;
        }
        Ok(())
    }

    pub fn fill_integer(&self, target: &mut i64, field: &str) -> Result<(), BuildError> {
        if let Some(value) = self.integer(field)? {
            *target = value;
        }
        Ok(())
    }

    fn typed<T>(
        &self,
        field: &str,
        expected: &'static str,
        cast: impl FnOnce(&'n Node) -> Option<T>,
    ) -> Result<Option<T>, BuildError> {
        let Some(node) = self.map.get(field) else {
            return Ok(None);
        };
        cast(node).map(Some).ok_or_else(|| BuildError::TypeMismatch {
            path: self.field_path(field).to_string(),
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::from_yaml_slice(
            b"name: users\nstatus: 200\nheaders: { a: [b] }\nitems: [1, 2]\nflag: true\n",
        )
        .unwrap()
    }

    #[test]
    fn test_absent_fields_are_none() {
        let node = sample();
        let path = NodePath::root();
        let fields = Fields::of(&node, &path, "entry").unwrap();
        assert_eq!(fields.string("missing").unwrap(), None);
        assert_eq!(fields.integer("missing").unwrap(), None);
        assert!(fields.mapping("missing").unwrap().is_none());
        assert!(fields.sequence("missing").unwrap().is_none());
    }

    #[test]
    fn test_present_fields_are_typed() {
        let node = sample();
        let path = NodePath::root();
        let fields = Fields::of(&node, &path, "entry").unwrap();
        assert_eq!(fields.string("name").unwrap(), Some("users"));
        assert_eq!(fields.integer("status").unwrap(), Some(200));
        assert_eq!(fields.mapping("headers").unwrap().map(Mapping::len), Some(1));
        assert_eq!(fields.sequence("items").unwrap().map(<[Node]>::len), Some(2));
    }

    #[test]
    fn test_wrong_shape_is_type_mismatch() {
        let node = sample();
        let path = NodePath::root().key("response");
        let fields = Fields::of(&node, &path, "entry").unwrap();
        assert_eq!(
            fields.integer("name"),
            Err(BuildError::TypeMismatch {
                path: "response.name".to_string(),
                expected: "an integer",
            })
        );
        assert!(matches!(
            fields.string("flag"),
            Err(BuildError::TypeMismatch { .. })
        ));
        assert!(matches!(
            fields.sequence("headers"),
            Err(BuildError::TypeMismatch { .. })
        ));
        assert!(matches!(
            fields.mapping("items"),
            Err(BuildError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_fill_leaves_defaults_when_absent() {
        let node = sample();
        let path = NodePath::root();
        let fields = Fields::of(&node, &path, "entry").unwrap();

        let mut name = String::from("default");
        let mut other = String::from("kept");
        fields
            .fill_strings(&mut [("name", &mut name), ("other", &mut other)])
            .unwrap();
        assert_eq!(name, "users");
        assert_eq!(other, "kept");

        let mut status = 0;
        fields.fill_integer(&mut status, "status").unwrap();
        assert_eq!(status, 200);
        let mut untouched = 7;
        fields.fill_integer(&mut untouched, "nope").unwrap();
        assert_eq!(untouched, 7);
    }

    #[test]
    fn test_non_mapping_is_invalid_shape() {
        let node = Node::Integer(3);
        let path = NodePath::root().key("endpoints").index(0);
        let err = Fields::of(&node, &path, "endpoint").unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidShape {
                path: "endpoints[0]".to_string(),
                reason: "each endpoint must be an object, found integer".to_string(),
            }
        );
    }
}
