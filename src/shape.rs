//! Set-shape canonicalization for JSON fields.
//!
//! DID Documents encode "sets" loosely: a field may carry a bare scalar, an
//! array, or a single-key map whose value is empty. [`expand`] normalizes any
//! of these into a list when reading, and [`flatten`] collapses singleton sets
//! back into scalars when writing. [`expand_map`] and [`flatten_map`] do the
//! same for string maps such as a service endpoint. All shape decisions for
//! document fields live here.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Error;

/// Returns true for the "no value" markers of a single-key set map
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Normalizes a raw field value into a list.
///
/// - a scalar becomes a one-element list
/// - an array is returned as is
/// - a single-key map with an empty value becomes a list holding the key
/// - `null` becomes an empty list
///
/// Any other map is rejected.
pub fn expand(field: &str, value: Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            let mut entries = map.into_iter();
            match (entries.next(), entries.next()) {
                (Some((key, value)), None) if is_empty_value(&value) => Ok(vec![Value::String(key)]),
                _ => Err(Error::invalid_field(
                    field,
                    "expected a value, an array, or a single-key map with an empty value",
                )),
            }
        }
        scalar => Ok(vec![scalar]),
    }
}

/// Removes `field` from `object` and expands it with [`expand`].
///
/// An absent field yields an empty list unless it is `required`.
pub fn take_expanded(
    object: &mut Map<String, Value>,
    field: &str,
    required: bool,
) -> Result<Vec<Value>, Error> {
    match object.remove(field) {
        Some(value) => expand(field, value),
        None if required => Err(Error::MissingField(field.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Expands `field` into a list of strings.
pub fn take_expanded_strings(
    object: &mut Map<String, Value>,
    field: &str,
    required: bool,
) -> Result<Vec<String>, Error> {
    take_expanded(object, field, required)?
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(Error::invalid_field(
                field,
                format!("expected a string, found {}", other),
            )),
        })
        .collect()
}

/// Normalizes a raw map-bearing value into a string map.
///
/// A map is taken as is (a `null` value reads as the empty string), an array
/// of strings becomes a map of those keys to empty values, and a single string
/// becomes a one-key map with an empty value.
pub fn expand_map(field: &str, value: Value) -> Result<BTreeMap<String, String>, Error> {
    let as_string = |item: Value| match item {
        Value::String(s) => Ok(s),
        other => Err(Error::invalid_field(
            field,
            format!("expected a string, found {}", other),
        )),
    };

    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| match value {
                Value::Null => Ok((key, String::new())),
                value => as_string(value).map(|value| (key, value)),
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| as_string(item).map(|key| (key, String::new())))
            .collect(),
        Value::String(s) => Ok(BTreeMap::from([(s, String::new())])),
        other => Err(Error::invalid_field(
            field,
            format!("expected a string, an array, or a map, found {}", other),
        )),
    }
}

/// Collapses a set-shaped value into its canonical form.
///
/// A one-element array becomes its element and a single-key map with an empty
/// value becomes its key. Everything else is left untouched.
pub fn flatten(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        Value::Object(map) if map.len() == 1 => {
            let mut entries = map.into_iter();
            match entries.next() {
                Some((key, value)) if is_empty_value(&value) => Value::String(key),
                Some((key, value)) => Value::Object(Map::from_iter([(key, value)])),
                None => Value::Object(Map::new()),
            }
        }
        other => other,
    }
}

/// Encodes a string map, collapsing it with [`flatten`].
///
/// Only a single key with an empty value collapses, to that key; every other
/// map, including one whose values are all empty, stays a map.
/// [`expand_map`] reverses both forms.
pub fn flatten_map(map: &BTreeMap<String, String>) -> Value {
    flatten(Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect(),
    ))
}

/// Applies [`flatten`] to each of the named fields present in `object`.
pub fn flatten_fields(object: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(value) = object.remove(*field) {
            object.insert(field.to_string(), flatten(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_shapes() {
        assert_eq!(expand("f", json!("a")).unwrap(), vec![json!("a")]);
        assert_eq!(expand("f", json!(["a", "b"])).unwrap(), vec![json!("a"), json!("b")]);
        assert_eq!(expand("f", json!({"a": ""})).unwrap(), vec![json!("a")]);
        assert_eq!(expand("f", json!({"a": null})).unwrap(), vec![json!("a")]);
        assert_eq!(expand("f", json!([])).unwrap(), Vec::<Value>::new());
        assert_eq!(expand("f", Value::Null).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_expand_rejects_other_maps() {
        for value in [json!({"a": "b"}), json!({"a": "", "b": ""}), json!({})] {
            assert!(matches!(
                expand("controller", value),
                Err(Error::InvalidField { ref field, .. }) if field == "controller"
            ));
        }
    }

    #[test]
    fn test_take_expanded() {
        let mut object = json!({"@context": "https://www.w3.org/ns/did/v1"})
            .as_object()
            .cloned()
            .unwrap();

        let context = take_expanded_strings(&mut object, "@context", true).unwrap();
        assert_eq!(context, vec!["https://www.w3.org/ns/did/v1"]);
        assert!(object.is_empty());

        assert!(take_expanded(&mut object, "controller", false).unwrap().is_empty());
        assert!(matches!(
            take_expanded(&mut object, "controller", true),
            Err(Error::MissingField(ref f)) if f == "controller"
        ));

        object.insert("type".into(), json!(["a", 1]));
        assert!(take_expanded_strings(&mut object, "type", false).is_err());
    }

    #[test]
    fn test_expand_map() {
        let expected = BTreeMap::from([("https://a.example".to_string(), String::new())]);
        assert_eq!(expand_map("e", json!("https://a.example")).unwrap(), expected);
        assert_eq!(expand_map("e", json!(["https://a.example"])).unwrap(), expected);
        assert_eq!(expand_map("e", json!({"https://a.example": ""})).unwrap(), expected);
        assert_eq!(expand_map("e", json!({"https://a.example": null})).unwrap(), expected);

        let map = expand_map("e", json!({"origins": "https://a.example"})).unwrap();
        assert_eq!(map["origins"], "https://a.example");

        assert!(expand_map("e", json!(42)).is_err());
        assert!(expand_map("e", json!({"a": 1})).is_err());
        assert!(expand_map("e", json!([1])).is_err());
    }

    #[test]
    fn test_flatten() {
        assert_eq!(flatten(json!(["a"])), json!("a"));
        assert_eq!(flatten(json!(["a", "b"])), json!(["a", "b"]));
        assert_eq!(flatten(json!([])), json!([]));
        assert_eq!(flatten(json!({"a": ""})), json!("a"));
        assert_eq!(flatten(json!({"a": "b"})), json!({"a": "b"}));
        assert_eq!(flatten(json!({"a": "", "b": ""})), json!({"a": "", "b": ""}));
        assert_eq!(flatten(json!("a")), json!("a"));
    }

    #[test]
    fn test_flatten_is_idempotent_and_inverts_expand() {
        for value in [json!("a"), json!(["a", "b"]), json!({"a": ""})] {
            let once = flatten(value.clone());
            assert_eq!(flatten(once.clone()), once);

            let items = expand("f", value).unwrap();
            let back = expand("f", flatten(Value::Array(items.clone()))).unwrap();
            assert_eq!(back, items);
        }
    }

    #[test]
    fn test_flatten_map() {
        let single = BTreeMap::from([("https://a.example".to_string(), String::new())]);
        assert_eq!(flatten_map(&single), json!("https://a.example"));

        let keys = BTreeMap::from([
            ("https://a.example".to_string(), String::new()),
            ("https://b.example".to_string(), String::new()),
        ]);
        assert_eq!(
            flatten_map(&keys),
            json!({"https://a.example": "", "https://b.example": ""})
        );

        let named = BTreeMap::from([("origins".to_string(), "https://a.example".to_string())]);
        assert_eq!(flatten_map(&named), json!({"origins": "https://a.example"}));

        assert_eq!(flatten_map(&BTreeMap::new()), json!({}));

        for map in [single, keys, named, BTreeMap::new()] {
            assert_eq!(expand_map("e", flatten_map(&map)).unwrap(), map);
        }
    }

    #[test]
    fn test_flatten_fields() {
        let mut object = json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "controller": ["did:example:a", "did:example:b"],
            "alsoKnownAs": ["https://a.example"],
        })
        .as_object()
        .cloned()
        .unwrap();

        flatten_fields(&mut object, &["@context", "controller", "missing"]);

        assert_eq!(
            Value::Object(object),
            json!({
                "@context": "https://www.w3.org/ns/did/v1",
                "controller": ["did:example:a", "did:example:b"],
                "alsoKnownAs": ["https://a.example"],
            })
        );
    }
}
