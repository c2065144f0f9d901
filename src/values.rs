use std::io::Read;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::error::{Result, UpdateError};

/// Combines values files (argument order, later files win) and `key.path=value`
/// assignments (applied last, highest precedence) into one document.
pub fn build_overrides(files: &[String], assignments: &[String]) -> Result<Mapping> {
    let mut base = Mapping::new();

    for path in files {
        let current = load_values_file(path)?;
        merge_values(&mut base, current);
    }

    for assignment in assignments {
        let (keys, value) = parse_assignment(assignment)?;
        set_path(&mut base, &keys, value);
    }

    Ok(base)
}

/// Deep-merges `src` onto `dest`, preferring values from `src`. Mappings merge
/// key by key; anything else, including a mapping replacing a scalar or a
/// scalar replacing a mapping, overwrites the destination entry.
pub fn merge_values(dest: &mut Mapping, src: Mapping) {
    for (key, value) in src {
        match value {
            Value::Mapping(incoming) => {
                if let Some(Value::Mapping(existing)) = dest.get_mut(&key) {
                    merge_values(existing, incoming);
                    continue;
                }
                dest.insert(key, Value::Mapping(incoming));
            }
            other => {
                dest.insert(key, other);
            }
        }
    }
}

pub fn load_values_file(path: &str) -> Result<Mapping> {
    let io_err = |source| UpdateError::Io {
        path: PathBuf::from(path),
        source,
    };

    let text = if path.trim() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).map_err(io_err)?;
        buffer
    } else {
        std::fs::read_to_string(path).map_err(io_err)?
    };

    let parsed: Value =
        serde_yaml::from_str(&text).map_err(|e| UpdateError::InvalidValuesFile {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })?;

    document_from(parsed).map_err(|reason| UpdateError::InvalidValuesFile {
        path: PathBuf::from(path),
        reason,
    })
}

/// Adapter applied to every document entering the merge: the top level must be
/// a mapping (or empty), and every mapping key is normalized to a string.
/// Documents deserialized from other codecs may carry integer or boolean keys.
pub fn document_from(value: Value) -> std::result::Result<Mapping, String> {
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => normalize_mapping(map),
        other => Err(format!("expected a mapping, got {}", kind_of(&other))),
    }
}

fn normalize_mapping(map: Mapping) -> std::result::Result<Mapping, String> {
    let mut out = Mapping::new();
    for (key, value) in map {
        let key = match key {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => return Err(format!("mapping key must be a scalar, got {}", kind_of(&other))),
        };
        let value = match value {
            Value::Mapping(nested) => Value::Mapping(normalize_mapping(nested)?),
            other => other,
        };
        out.insert(Value::String(key), value);
    }
    Ok(out)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Parses one `key.path=value` assignment into its path segments and a typed
/// scalar. Integer literals become i64, `true`/`false` become booleans,
/// everything else stays a string.
pub fn parse_assignment(input: &str) -> Result<(Vec<String>, Value)> {
    let invalid = |reason: &str| UpdateError::InvalidOverride {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (path, raw) = input.split_once('=').ok_or_else(|| invalid("missing '='"))?;
    if path.trim().is_empty() {
        return Err(invalid("empty key path"));
    }

    let mut keys = Vec::new();
    for segment in path.split('.') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(invalid("empty key path segment"));
        }
        keys.push(segment.to_string());
    }

    Ok((keys, parse_scalar(raw)))
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Sets `value` at the nested key path, creating intermediate mappings as
/// needed. A non-mapping value sitting in the middle of the path is replaced.
pub fn set_path(doc: &mut Mapping, keys: &[String], value: Value) {
    let Some((head, rest)) = keys.split_first() else {
        return;
    };
    let key = Value::String(head.clone());

    if rest.is_empty() {
        doc.insert(key, value);
        return;
    }

    if !matches!(doc.get(&key), Some(Value::Mapping(_))) {
        doc.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(child)) = doc.get_mut(&key) {
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_doc(text: &str) -> Mapping {
        document_from(serde_yaml::from_str(text).unwrap()).unwrap()
    }

    fn write_values_file(dir: &tempfile::TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn later_document_wins_over_earlier() {
        let a = parse_doc("replicas: 1\nimage: app");
        let b = parse_doc("replicas: 3");

        let mut merged = a.clone();
        merge_values(&mut merged, b.clone());
        assert_eq!(merged.get("replicas"), Some(&Value::from(3)));
        assert_eq!(merged.get("image"), Some(&Value::from("app")));

        // Not commutative: the other order keeps the first document's value.
        let mut reversed = b;
        merge_values(&mut reversed, a);
        assert_eq!(reversed.get("replicas"), Some(&Value::from(1)));
    }

    #[test]
    fn merging_a_document_onto_itself_changes_nothing() {
        let doc = parse_doc("a: 1\nnested:\n  b: two");
        let mut merged = doc.clone();
        merge_values(&mut merged, doc.clone());
        assert_eq!(merged, doc);
    }

    #[test]
    fn nested_mappings_merge_key_by_key() {
        let mut dest = parse_doc("app:\n  replicas: 1\n  image: web");
        let src = parse_doc("app:\n  replicas: 5");
        merge_values(&mut dest, src);

        let app = dest.get("app").and_then(Value::as_mapping).unwrap();
        assert_eq!(app.get("replicas"), Some(&Value::from(5)));
        assert_eq!(app.get("image"), Some(&Value::from("web")));
    }

    #[test]
    fn type_mismatch_resolves_in_favor_of_the_incoming_side() {
        let mut dest = parse_doc("app: plain-string");
        merge_values(&mut dest, parse_doc("app:\n  replicas: 2"));
        let app = dest.get("app").and_then(Value::as_mapping).unwrap();
        assert_eq!(app.get("replicas"), Some(&Value::from(2)));

        let mut dest = parse_doc("app:\n  replicas: 2");
        merge_values(&mut dest, parse_doc("app: plain-string"));
        assert_eq!(dest.get("app"), Some(&Value::from("plain-string")));
    }

    #[test]
    fn lists_overwrite_instead_of_concatenating() {
        let mut dest = parse_doc("hosts:\n  - a\n  - b");
        merge_values(&mut dest, parse_doc("hosts:\n  - c"));
        let hosts = dest.get("hosts").and_then(Value::as_sequence).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0], Value::from("c"));
    }

    #[test]
    fn assignments_win_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_values_file(&dir, "values.yaml", "k: from-file\nother: kept");

        let merged = build_overrides(&[file], &["k=5".to_string()]).unwrap();
        assert_eq!(merged.get("k"), Some(&Value::from(5)));
        assert_eq!(merged.get("other"), Some(&Value::from("kept")));
    }

    #[test]
    fn assignment_literals_are_typed() {
        let merged = build_overrides(
            &[],
            &[
                "x=10".to_string(),
                "y=true".to_string(),
                "z=hi".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(merged.get("x"), Some(&Value::from(10i64)));
        assert_eq!(merged.get("y"), Some(&Value::from(true)));
        assert_eq!(merged.get("z"), Some(&Value::from("hi")));
    }

    #[test]
    fn assignment_paths_create_nested_mappings() {
        let merged = build_overrides(&[], &["app.db.port=5432".to_string()]).unwrap();
        let port = merged
            .get("app")
            .and_then(Value::as_mapping)
            .and_then(|m| m.get("db"))
            .and_then(Value::as_mapping)
            .and_then(|m| m.get("port"));
        assert_eq!(port, Some(&Value::from(5432)));
    }

    #[test]
    fn assignment_path_replaces_scalar_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_values_file(&dir, "values.yaml", "app: scalar");
        let merged = build_overrides(&[file], &["app.replicas=2".to_string()]).unwrap();
        let app = merged.get("app").and_then(Value::as_mapping).unwrap();
        assert_eq!(app.get("replicas"), Some(&Value::from(2)));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        for bad in ["no-equals", "=5", "a..b=1", "  =1"] {
            let err = build_overrides(&[], &[bad.to_string()]).unwrap_err();
            assert!(
                matches!(err, UpdateError::InvalidOverride { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn missing_file_aborts_with_its_path() {
        let err = build_overrides(&["/no/such/values.yaml".to_string()], &[]).unwrap_err();
        match err {
            UpdateError::Io { path, .. } => {
                assert_eq!(path, PathBuf::from("/no/such/values.yaml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_mapping_file_is_a_parse_error_naming_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_values_file(&dir, "list.yaml", "- a\n- b");
        let err = build_overrides(&[file.clone()], &[]).unwrap_err();
        match err {
            UpdateError::InvalidValuesFile { path, .. } => {
                assert_eq!(path, PathBuf::from(file))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_file_merges_as_an_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_values_file(&dir, "empty.yaml", "");
        let merged = build_overrides(&[file], &[]).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn non_string_keys_are_normalized_before_merging() {
        let doc = parse_doc("1: one\ntrue: yes\nnested:\n  2: two");
        assert_eq!(doc.get("1"), Some(&Value::from("one")));
        assert_eq!(doc.get("true"), Some(&Value::from("yes")));
        let nested = doc.get("nested").and_then(Value::as_mapping).unwrap();
        assert_eq!(nested.get("2"), Some(&Value::from("two")));
    }

    #[test]
    fn complex_keys_are_rejected() {
        let parsed: Value = serde_yaml::from_str("[a, b]: value").unwrap();
        assert!(document_from(parsed).is_err());
    }
}
