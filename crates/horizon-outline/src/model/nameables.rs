//! `@key@` placeholder handling shared by record implementations.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static NAMEABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^@\n]+)@").expect("nameable pattern is a valid regex"));

/// Adds every `@key@` placeholder found in `text` to `map`.
///
/// Keys already present keep their value.
pub fn extract_nameables(text: &str, map: &mut HashMap<String, String>) {
    for caps in NAMEABLE.captures_iter(text) {
        let key = &caps[1];
        map.entry(key.to_string()).or_insert_with(|| key.to_string());
    }
}

/// Replaces `@key@` placeholders in `text` with their value from `map`.
///
/// Unknown keys are left as-is.
pub fn apply_nameables(text: &str, map: &HashMap<String, String>) -> String {
    NAMEABLE
        .replace_all(text, |caps: &regex::Captures<'_>| match map.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
