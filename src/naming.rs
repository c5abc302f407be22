//! Collision-free instance names of the form `base` or `base/alias`.

use std::collections::HashSet;

/// Separator between base component name and alias
pub const NAME_SEPARATOR: char = '/';

/// Allocate a name for a new or renamed instance.
///
/// `requested_alias` may be given with or without a leading `base/` or `/`.
/// An empty alias asks for the bare base name; on collision the allocator
/// tries `base/1`, `base/2`, ... For a non-empty alias it tries
/// `base/alias-1`, `base/alias-2`, ... The counter is unbounded, so the loop
/// always terminates for a finite `existing` set.
pub fn allocate(base_name: &str, requested_alias: &str, existing: &HashSet<String>) -> String {
    let alias = normalize_alias(base_name, requested_alias);

    let candidate = join(base_name, alias);
    if !existing.contains(&candidate) {
        return candidate;
    }

    (1u64..)
        .map(|n| {
            if alias.is_empty() {
                format!("{}{}{}", base_name, NAME_SEPARATOR, n)
            } else {
                format!("{}{}{}-{}", base_name, NAME_SEPARATOR, alias, n)
            }
        })
        .find(|name| !existing.contains(name))
        .unwrap_or(candidate)
}

/// Alias part of `full_name` for display: empty for the bare base name
pub fn alias_of<'a>(base_name: &str, full_name: &'a str) -> &'a str {
    if full_name == base_name {
        return "";
    }
    full_name
        .strip_prefix(base_name)
        .and_then(|rest| rest.strip_prefix(NAME_SEPARATOR))
        .unwrap_or(full_name)
}

/// Split an instance name on its first `/` into base name and alias
pub fn split_instance_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once(NAME_SEPARATOR) {
        Some((base, alias)) => (base, Some(alias)),
        None => (name, None),
    }
}

fn normalize_alias<'a>(base_name: &str, requested_alias: &'a str) -> &'a str {
    let alias = requested_alias.trim();
    let alias = alias
        .strip_prefix(base_name)
        .and_then(|rest| rest.strip_prefix(NAME_SEPARATOR))
        .unwrap_or(alias);
    alias.trim_start_matches(NAME_SEPARATOR)
}

fn join(base_name: &str, alias: &str) -> String {
    if alias.is_empty() {
        base_name.to_string()
    } else {
        format!("{}{}{}", base_name, NAME_SEPARATOR, alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allocate_bare_name() {
        assert_eq!(allocate("otlp", "", &names(&[])), "otlp");
        assert_eq!(allocate("otlp", "", &names(&["otlp"])), "otlp/1");
        assert_eq!(allocate("otlp", "", &names(&["otlp", "otlp/1"])), "otlp/2");
    }

    #[test]
    fn test_allocate_alias() {
        assert_eq!(allocate("otlp", "custom", &names(&[])), "otlp/custom");
        assert_eq!(allocate("otlp", "custom", &names(&["otlp/custom"])), "otlp/custom-1");
        assert_eq!(
            allocate("otlp", "custom", &names(&["otlp/custom", "otlp/custom-1"])),
            "otlp/custom-2"
        );
    }

    #[test]
    fn test_allocate_strips_prefixes() {
        assert_eq!(allocate("otlp", "otlp/custom", &names(&[])), "otlp/custom");
        assert_eq!(allocate("otlp", "/custom", &names(&[])), "otlp/custom");
        assert_eq!(allocate("otlp", "/", &names(&[])), "otlp");
    }

    #[test]
    fn test_alias_of() {
        assert_eq!(alias_of("otlp", "otlp"), "");
        assert_eq!(alias_of("otlp", "otlp/custom"), "custom");
        assert_eq!(alias_of("otlp", "otlp/a/b"), "a/b");
    }

    #[test]
    fn test_split_instance_name() {
        assert_eq!(split_instance_name("otlp"), ("otlp", None));
        assert_eq!(split_instance_name("otlp/2"), ("otlp", Some("2")));
        assert_eq!(split_instance_name("a/b/c"), ("a", Some("b/c")));
    }
}
