// Header cell normalization

use once_cell::sync::Lazy;
use regex::Regex;

static NON_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"));

/// Normalize a header cell into a column identifier.
///
/// Runs of characters outside `[A-Za-z0-9_]` collapse to one `_`, and
/// underscores at either end are stripped. Applying it twice changes nothing.
pub fn sanitize(cell: &str) -> String {
    NON_IDENT
        .replace_all(cell.trim(), "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("name"), "name");
        assert_eq!(sanitize("  First Name "), "First_Name");
        assert_eq!(sanitize("Price ($)"), "Price");
        assert_eq!(sanitize("a -- b"), "a_b");
        assert_eq!(sanitize("__id__"), "id");
        assert_eq!(sanitize("Čas"), "as");
        assert_eq!(sanitize("!!!"), "");
        assert_eq!(sanitize(""), "");
    }

    proptest! {
        #[test]
        fn prop_sanitize_idempotent(cell in "\\PC{0,24}") {
            let once = sanitize(&cell);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}
