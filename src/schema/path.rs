//! Raw configuration key -> canonical schema path.

use crate::types::ComponentDefinition;
use crate::value::Configuration;
use std::borrow::Cow;

/// Maps raw configuration keys to the canonical dotted paths of a definition.
///
/// Resolution order for a raw key:
/// 1. an existing canonical path is returned unchanged,
/// 2. an unambiguous short field name resolves to its canonical path,
/// 3. anything else passes through untouched as custom data.
///
/// The function is total and idempotent:
/// `canonicalize(d, canonicalize(d, k)) == canonicalize(d, k)`.
pub struct PathNormalizer;

impl PathNormalizer {
    /// Canonical path for `raw_key` under `definition`
    pub fn canonicalize<'a>(definition: &'a ComponentDefinition, raw_key: &'a str) -> Cow<'a, str> {
        let index = definition.path_index();
        if index.is_canonical(raw_key) {
            return Cow::Borrowed(raw_key);
        }
        match index.path_for(raw_key) {
            Some(path) => Cow::Borrowed(path),
            None => Cow::Borrowed(raw_key),
        }
    }

    /// Whether `raw_key` resolves against the schema at all
    pub fn is_resolved(definition: &ComponentDefinition, raw_key: &str) -> bool {
        let index = definition.path_index();
        index.is_canonical(raw_key) || index.path_for(raw_key).is_some()
    }

    /// Rewrite every key of a configuration to its canonical form.
    ///
    /// When a short-name key and its canonical spelling are both present, the
    /// canonical spelling wins.
    pub fn canonicalize_all(definition: &ComponentDefinition, configuration: Configuration) -> Configuration {
        let mut normalized = Configuration::new();
        let mut rewritten = Vec::new();

        for (key, value) in configuration {
            let path = Self::canonicalize(definition, &key);
            if path == key.as_str() {
                normalized.insert(key, value);
            } else {
                rewritten.push((path.into_owned(), value));
            }
        }

        for (path, value) in rewritten {
            if normalized.contains_key(&path) {
                tracing::debug!(
                    "Dropping short-name key for '{}' on {}: canonical key already set",
                    path,
                    definition.name
                );
                continue;
            }
            normalized.insert(path, value);
        }

        normalized
    }
}
