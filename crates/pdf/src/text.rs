use unicode_normalization::UnicodeNormalization;

/// NFKC-fold ligatures and compatibility forms, collapse whitespace, trim.
pub fn normalize(s: &str) -> String {
    let folded: String = s.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_ligatures_and_spaces() {
        assert_eq!(normalize("  E\u{FB03}cient \u{00A0} mode\n"), "Efficient mode");
    }

    #[test]
    fn normalize_blank_is_empty() {
        assert_eq!(normalize(" \t "), "");
    }
}
