/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized, case-folded form used for equality and containment checks.
pub fn fold(s: &str) -> String {
    normalize_text(s).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_internal_whitespace() {
        assert_eq!(normalize_text("  Voltage \n  Accuracy\t"), "Voltage Accuracy");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn fold_lowercases() {
        assert_eq!(fold(" FAIL "), "fail");
    }
}
