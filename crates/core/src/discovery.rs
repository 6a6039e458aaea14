//! Work-set discovery.
//!
//! A run processes exactly the uploaded videos that have no detection
//! document yet. Inputs and outputs are paired by base name: the key
//! with its final extension removed. `a.mp4` is considered done once
//! `a.json` exists in the results location, so the detection document
//! doubles as the completion marker.

use std::collections::HashSet;

/// Returns `key` with its final extension stripped.
///
/// Only the last `.suffix` is removed (`clip.tar.mp4` -> `clip.tar`);
/// keys without an extension are returned unchanged. Matching is
/// case-sensitive throughout.
#[must_use]
pub fn base_name(key: &str) -> &str {
    match key.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => key,
    }
}

/// Result-document key for an input video key.
#[must_use]
pub fn detection_key(input_key: &str) -> String {
    format!("{}.json", base_name(input_key))
}

/// Annotated-video key for an input video key: the configured prefix
/// prepended to the full original file name.
#[must_use]
pub fn visual_key(prefix: &str, input_key: &str) -> String {
    format!("{prefix}{input_key}")
}

/// Computes the work set: input keys with no matching result document,
/// sorted lexicographically for a deterministic processing order.
#[must_use]
pub fn pending_items(input_keys: &[String], result_keys: &[String]) -> Vec<String> {
    let completed: HashSet<&str> = result_keys.iter().map(|key| base_name(key)).collect();

    let mut pending: Vec<String> = input_keys
        .iter()
        .filter(|key| !completed.contains(base_name(key)))
        .cloned()
        .collect();
    pending.sort();
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn base_name_strips_final_extension_only() {
        assert_eq!(base_name("a.mp4"), "a");
        assert_eq!(base_name("clip.tar.mp4"), "clip.tar");
        assert_eq!(base_name("noext"), "noext");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn detection_and_visual_keys() {
        assert_eq!(detection_key("a.mp4"), "a.json");
        assert_eq!(detection_key("clip.tar.mp4"), "clip.tar.json");
        assert_eq!(visual_key("viz_", "a.mp4"), "viz_a.mp4");
        assert_eq!(visual_key("annotated-", "a.mp4"), "annotated-a.mp4");
    }

    #[test]
    fn pending_skips_completed_inputs() {
        let inputs = keys(&["a.mp4", "b.mp4"]);
        let results = keys(&["a.json"]);
        assert_eq!(pending_items(&inputs, &results), keys(&["b.mp4"]));
    }

    #[test]
    fn pending_is_empty_when_all_done() {
        let inputs = keys(&["a.mp4", "b.mp4"]);
        let results = keys(&["a.json", "b.json"]);
        assert!(pending_items(&inputs, &results).is_empty());
    }

    #[test]
    fn pending_ignores_unrelated_results() {
        let inputs = keys(&["a.mp4"]);
        let results = keys(&["z.json"]);
        assert_eq!(pending_items(&inputs, &results), keys(&["a.mp4"]));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let inputs = keys(&["A.mp4"]);
        let results = keys(&["a.json"]);
        assert_eq!(pending_items(&inputs, &results), keys(&["A.mp4"]));
    }

    #[test]
    fn pending_is_sorted() {
        let inputs = keys(&["c.mp4", "a.mp4", "b.mp4"]);
        let pending = pending_items(&inputs, &[]);
        assert_eq!(pending, keys(&["a.mp4", "b.mp4", "c.mp4"]));
    }

    #[test]
    fn different_extensions_share_a_base() {
        // An input uploaded as .mov is still paired with its .json marker.
        let inputs = keys(&["a.mov"]);
        let results = keys(&["a.json"]);
        assert!(pending_items(&inputs, &results).is_empty());
    }
}
