//! Tag-set operations for account segmentation.
//!
//! Tags are plain strings like `interest:tarot` or `level:beginner`.
//! The set semantics matter: adding never duplicates, removing an absent
//! tag is a no-op, and existing insertion order is preserved so repeated
//! updates do not shuffle the stored list.

/// Union `additions` into `existing`, skipping tags already present.
#[must_use]
pub fn add_tags(existing: &[String], additions: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = existing.to_vec();
    for tag in additions {
        if !merged.iter().any(|t| t == tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Remove every tag in `removals` from `existing`.
#[must_use]
pub fn remove_tags(existing: &[String], removals: &[String]) -> Vec<String> {
    existing
        .iter()
        .filter(|t| !removals.iter().any(|r| r == *t))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let existing = tags(&["interest:tarot", "level:beginner"]);
        let merged = add_tags(&existing, &tags(&["interest:tarot"]));
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_add_appends_new_tags() {
        let existing = tags(&["interest:tarot"]);
        let merged = add_tags(&existing, &tags(&["interest:crystals", "interest:tarot"]));
        assert_eq!(merged, tags(&["interest:tarot", "interest:crystals"]));
    }

    #[test]
    fn test_add_dedupes_within_additions() {
        let merged = add_tags(&[], &tags(&["a", "a", "b"]));
        assert_eq!(merged, tags(&["a", "b"]));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let existing = tags(&["interest:tarot"]);
        let result = remove_tags(&existing, &tags(&["interest:herbs"]));
        assert_eq!(result, existing);
    }

    #[test]
    fn test_remove_preserves_order() {
        let existing = tags(&["a", "b", "c"]);
        let result = remove_tags(&existing, &tags(&["b"]));
        assert_eq!(result, tags(&["a", "c"]));
    }
}
