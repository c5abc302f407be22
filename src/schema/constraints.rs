//! Advisory constraint evaluation.
//!
//! Violations never block a mutation, an export or a save; they are reported
//! back to the caller for presentation.

use crate::schema::path::PathNormalizer;
use crate::types::{ComponentDefinition, ConstraintGroup, ConstraintKind};
use crate::value::Configuration;
use serde::Serialize;
use std::fmt;

/// Which rule produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationRule {
    Constraint(ConstraintKind),
    /// A required field without default is unset
    Required,
}

/// A single advisory finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: ViolationRule,
    /// Keys as declared by the schema
    pub keys: Vec<String>,
    /// Number of keys considered set
    pub count: usize,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Evaluates constraint groups and required fields against a configuration
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Evaluate every constraint group of `definition`
    pub fn evaluate(definition: &ComponentDefinition, configuration: &Configuration) -> Vec<Violation> {
        definition
            .constraints
            .iter()
            .filter_map(|group| Self::evaluate_group(definition, group, configuration))
            .collect()
    }

    /// Evaluate one group; `None` when it passes
    pub fn evaluate_group(
        definition: &ComponentDefinition,
        group: &ConstraintGroup,
        configuration: &Configuration,
    ) -> Option<Violation> {
        let count = group
            .keys
            .iter()
            .filter(|key| is_key_set(configuration, &PathNormalizer::canonicalize(definition, key)))
            .count();
        let total = group.keys.len();
        let keys = format!("[{}]", group.keys.join(", "));

        let generated = match group.kind {
            ConstraintKind::AnyOf if count < 1 => {
                format!("at least one of {} must be set", keys)
            }
            ConstraintKind::OneOf if count != 1 => {
                format!("exactly one of {} must be set (currently {})", keys, count)
            }
            ConstraintKind::AtMostOne if count > 1 => {
                format!("at most one of {} may be set (currently {})", keys, count)
            }
            ConstraintKind::AllOf if count != total => {
                format!("all of {} must be set (currently {}/{})", keys, count, total)
            }
            _ => return None,
        };

        let message = match &group.message {
            Some(custom) => format!("{}: {}", custom, generated),
            None => generated,
        };

        Some(Violation {
            rule: ViolationRule::Constraint(group.kind),
            keys: group.keys.clone(),
            count,
            message,
        })
    }

    /// Required fields that are unset and have no schema default
    pub fn missing_required(definition: &ComponentDefinition, configuration: &Configuration) -> Vec<Violation> {
        definition
            .fields
            .iter()
            .filter(|field| field.required && field.default.is_none())
            .filter(|field| !is_key_set(configuration, field.canonical_path()))
            .map(|field| Violation {
                rule: ViolationRule::Required,
                keys: vec![field.canonical_path().to_string()],
                count: 0,
                message: format!("{} is required", field.canonical_path()),
            })
            .collect()
    }

    /// Constraint groups followed by missing required fields
    pub fn validate(definition: &ComponentDefinition, configuration: &Configuration) -> Vec<Violation> {
        let mut violations = Self::evaluate(definition, configuration);
        violations.extend(Self::missing_required(definition, configuration));
        violations
    }
}

/// A key is set when its own value is, or when any value nested below it is
fn is_key_set(configuration: &Configuration, path: &str) -> bool {
    if configuration.get(path).is_some_and(|value| value.is_set()) {
        return true;
    }
    let prefix = format!("{}.", path);
    configuration
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .any(|(_, value)| value.is_set())
}
