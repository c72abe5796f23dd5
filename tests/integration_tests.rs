// Integration tests for mockspec-core using test fixtures
use mockspec_core::{parse, parse_file, BuildError, Condition, DecodeError, SpecError};
use std::fs;
use std::path::PathBuf;

fn get_test_file_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}

fn read_test_file(subdir: &str, filename: &str) -> Vec<u8> {
    let path = get_test_file_path(subdir, filename);
    fs::read(&path).unwrap_or_else(|_| panic!("Failed to read test file: {:?}", path))
}

// Tests for valid specs that should parse and resolve successfully
mod ok_tests {
    use super::*;

    #[test]
    fn test_petstore() {
        let result = parse(&read_test_file("ok", "petstore.yaml"));
        assert!(
            result.is_ok(),
            "Should parse successfully: {:?}",
            result.err()
        );
        let spec = result.unwrap();

        assert_eq!(spec.definitions.steps["normalize"].len(), 2);
        let pet_id = &spec.definitions.filters["petId"][0];
        let operations: Vec<&str> = pet_id.steps.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(operations, vec!["trim", "lowercase", "replace"]);

        let root = &spec.endpoints[0];
        assert_eq!(root.host, "pets.example.com");
        assert!(root.response.is_none());
        assert_eq!(root.endpoints.len(), 3);

        let get = &root.endpoints[0];
        assert_eq!(get.filters, spec.definitions.filters["petId"]);
        assert_eq!(get.conditions, spec.definitions.conditions["knownPet"]);

        let delete = &root.endpoints[1];
        assert_eq!(delete.conditions.len(), 2);
        assert!(matches!(&delete.conditions[1], Condition::Any(nested) if nested.len() == 2));

        let fallback = root.endpoints[2].response.as_ref().unwrap();
        assert_eq!(fallback, &spec.definitions.responses["notFound"]);
        assert_eq!(fallback.headers["Cache-Control"], vec!["no-store".to_string()]);
        assert_eq!(fallback.content_type(), Some("application/json"));
    }

    #[test]
    fn test_forward_refs() {
        let spec = parse(&read_test_file("ok", "forward_refs.yaml")).unwrap();

        let steps: Vec<&str> = spec.definitions.steps["full"]
            .iter()
            .map(|s| s.operation.as_str())
            .collect();
        assert_eq!(steps, vec!["trim", "uppercase"]);

        let endpoint = &spec.endpoints[0];
        match &endpoint.conditions[..] {
            [Condition::Any(nested)] => assert_eq!(nested.len(), 2),
            other => panic!("unexpected conditions: {other:?}"),
        }
        assert_eq!(endpoint.response.as_ref().unwrap().body, "ok");
        assert_eq!(spec.definitions.responses["alias"], spec.definitions.responses["ok"]);
    }

    #[test]
    fn test_nested() {
        let spec = parse(&read_test_file("ok", "nested.yaml")).unwrap();
        let users = &spec.endpoints[0].endpoints[0].endpoints[0];
        assert_eq!(users.path, "/v1/users");
        assert_eq!(users.body_format, "json");
        assert_eq!(users.response.as_ref().unwrap().format, "xml");

        let Condition::All(all) = &users.conditions[0] else {
            panic!("expected `all` condition");
        };
        assert_eq!(all.len(), 2);
        match &all[0] {
            Condition::Source(source) => {
                assert_eq!(source.source, "name");
                assert_eq!(source.checks.len(), 2);
                assert_eq!(source.checks[1].name, "maxLength");
            }
            other => panic!("expected source condition, got {other:?}"),
        }
    }

    #[test]
    fn test_json_input() {
        let spec = parse(&read_test_file("ok", "json_input.yaml")).unwrap();
        let response = spec.endpoints[0].response.as_ref().unwrap();
        assert_eq!(response.body, "plain");
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn test_parse_file() {
        let spec = parse_file(get_test_file_path("ok", "petstore.yaml")).unwrap();
        assert_eq!(spec.endpoints.len(), 1);
    }
}

// Tests for invalid specs that should produce errors
mod bad_tests {
    use super::*;

    #[test]
    fn test_unknown_ref() {
        let err = parse(&read_test_file("bad", "unknown_ref.yaml")).unwrap_err();
        match err {
            SpecError::Build(BuildError::UnknownDefinition { path, name, .. }) => {
                assert_eq!(path, "endpoints[0].conditions[0]");
                assert_eq!(name, "missing");
            }
            other => panic!("Expected UnknownDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle() {
        let err = parse(&read_test_file("bad", "cycle.yaml")).unwrap_err();
        assert!(
            matches!(err, SpecError::Build(BuildError::CyclicDefinition { .. })),
            "Should fail with a cycle error: {err:?}"
        );
    }

    #[test]
    fn test_incomplete_endpoint() {
        let err = parse(&read_test_file("bad", "incomplete_endpoint.yaml")).unwrap_err();
        match err {
            SpecError::Build(BuildError::IncompleteEndpoint { path }) => {
                assert_eq!(path, "endpoints[0].endpoints[0]")
            }
            other => panic!("Expected IncompleteEndpoint, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_checks() {
        let err = parse(&read_test_file("bad", "empty_checks.yaml")).unwrap_err();
        assert!(matches!(
            err,
            SpecError::Build(BuildError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_ambiguous_step() {
        let err = parse(&read_test_file("bad", "ambiguous_step.yaml")).unwrap_err();
        match err {
            SpecError::Build(BuildError::AmbiguousDefinition { path, keys }) => {
                assert_eq!(path, "definitions.filters.clean[0].steps[0]");
                assert_eq!(keys, vec!["trim", "lowercase"]);
            }
            other => panic!("Expected AmbiguousDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed() {
        let err = parse(&read_test_file("bad", "malformed.yaml")).unwrap_err();
        assert!(matches!(err, SpecError::Decode(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file(get_test_file_path("bad", "does_not_exist.yaml")).unwrap_err();
        match err {
            SpecError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got {other:?}"),
        }
    }
}
