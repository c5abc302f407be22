//! Conversion between nested YAML sub-trees and flat canonical-path
//! configurations.

use crate::types::{ComponentDefinition, FieldKind, PathIndex};
use crate::value::{key_string, number_value, parse_duration, ConfigValue, Configuration};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Flatten one instance's configuration sub-tree into canonical paths.
///
/// Mappings are descended while the schema declares fields below them. A
/// declared leaf field is converted whole according to its [`FieldKind`].
/// Mappings the schema knows nothing about are descended too, unless one of
/// their keys contains a `.` and would not survive being joined into a path.
pub fn flatten(definition: &ComponentDefinition, mapping: &Mapping) -> Configuration {
    let mut out = Configuration::new();
    flatten_into(definition, "", mapping, &mut out);
    out
}

fn flatten_into(definition: &ComponentDefinition, prefix: &str, mapping: &Mapping, out: &mut Configuration) {
    let index = definition.path_index();

    for (key, value) in mapping {
        let Some(key) = key_string(key) else {
            tracing::warn!(
                "Skipping non-scalar configuration key under '{}' on {}",
                prefix,
                definition.name
            );
            continue;
        };
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Mapping(inner) if descends(index, &path, inner) => {
                flatten_into(definition, &path, inner, out);
            }
            _ => {
                let converted = match definition.field(&path) {
                    Some(field) => convert(field.kind, value),
                    None => ConfigValue::from_yaml(value),
                };
                out.insert(path, converted);
            }
        }
    }
}

fn descends(index: &PathIndex, path: &str, mapping: &Mapping) -> bool {
    if index.has_children(path) {
        return true;
    }
    if index.is_canonical(path) {
        return false;
    }
    !mapping.is_empty()
        && mapping.keys().all(|k| {
            key_string(k).is_some_and(|s| !s.is_empty() && !s.contains('.'))
        })
}

/// Convert a YAML node to the value kind a field declares.
///
/// Values that do not fit the declared kind fall back to untyped inference
/// rather than being dropped; the constraint layer is advisory and so is this.
pub fn convert(kind: FieldKind, value: &Value) -> ConfigValue {
    let converted = match (kind, value) {
        (FieldKind::String | FieldKind::Enum, Value::String(s)) => Some(ConfigValue::String(s.clone())),
        (FieldKind::Bool, Value::Bool(b)) => Some(ConfigValue::Bool(*b)),
        (FieldKind::Int, Value::Number(n)) => n.as_i64().map(ConfigValue::Int),
        (FieldKind::Double, Value::Number(n)) => n.as_f64().map(ConfigValue::Double),
        (FieldKind::Duration, Value::String(s)) => parse_duration(s).map(ConfigValue::Duration),
        (FieldKind::StringArray, Value::Sequence(seq)) => seq
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ConfigValue::StringArray),
        (FieldKind::Array, Value::Sequence(seq)) => {
            Some(ConfigValue::Array(seq.iter().map(ConfigValue::from_yaml).collect()))
        }
        (FieldKind::StringMap, Value::Mapping(m)) => m
            .iter()
            .map(|(k, v)| Some((key_string(k)?, v.as_str()?.to_string())))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(ConfigValue::StringMap),
        (FieldKind::Map, Value::Mapping(m)) => Some(ConfigValue::Map(
            m.iter()
                .filter_map(|(k, v)| Some((key_string(k)?, ConfigValue::from_yaml(v))))
                .collect(),
        )),
        (_, Value::Null) => Some(ConfigValue::Null),
        (_, Value::Tagged(tagged)) => return convert(kind, &tagged.value),
        _ => None,
    };

    converted.unwrap_or_else(|| match value {
        Value::Number(n) => number_value(n),
        other => ConfigValue::from_yaml(other),
    })
}

enum Node {
    Leaf(Value),
    Branch(BTreeMap<String, Node>),
}

/// Rebuild the nested sub-tree from canonical dotted paths, keys sorted.
///
/// A path that runs through a value already placed at a shorter path (`p`
/// and `p.x` both set) is written as a literal dotted key at the top level,
/// which [`flatten`] reads back to the same path.
pub fn unflatten(configuration: &Configuration) -> Mapping {
    let mut root = BTreeMap::new();

    for (path, value) in configuration {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };

        if let Err(value) = insert_nested(&mut root, parents, last, value.to_yaml()) {
            tracing::debug!("Configuration path '{}' runs through a value, keeping it dotted", path);
            root.insert(path.clone(), Node::Leaf(value));
        }
    }

    into_mapping(root)
}

/// Place `value` at `parents.last`, handing it back if a leaf is in the way
fn insert_nested(
    level: &mut BTreeMap<String, Node>,
    parents: &[&str],
    last: &str,
    value: Value,
) -> Result<(), Value> {
    match parents.split_first() {
        None => {
            if level.contains_key(last) {
                return Err(value);
            }
            level.insert(last.to_string(), Node::Leaf(value));
            Ok(())
        }
        Some((segment, rest)) => {
            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            match node {
                Node::Branch(children) => insert_nested(children, rest, last, value),
                Node::Leaf(_) => Err(value),
            }
        }
    }
}

fn into_mapping(branch: BTreeMap<String, Node>) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, node) in branch {
        let value = match node {
            Node::Leaf(value) => value,
            Node::Branch(children) => Value::Mapping(into_mapping(children)),
        };
        mapping.insert(Value::String(key), value);
    }
    mapping
}
