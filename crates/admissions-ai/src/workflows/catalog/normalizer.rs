pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join("")
}

/// Collapse whitespace and strip invisible characters from free-text cells.
pub(crate) fn normalize_text(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{a0}'], " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse numeric cells written as `12.5`, `12.5%`, `1,204` or `-`.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_end_matches('%').replace(',', "");
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| !number.is_nan())
}

/// Eligibility indicators are stored as `1`/`0` (or YES/NO in newer exports).
pub(crate) fn parse_indicator(value: &str) -> bool {
    match value.trim().to_ascii_uppercase().as_str() {
        "Y" | "YES" | "TRUE" | "O" => true,
        other => other.parse::<f64>().map(|number| number >= 1.0).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_percent_and_separators() {
        assert_eq!(parse_number(" 12.5% "), Some(12.5));
        assert_eq!(parse_number("1,204"), Some(1204.0));
        assert_eq!(parse_number("-9999"), Some(-9999.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn indicators_accept_numeric_and_textual_flags() {
        assert!(parse_indicator("1"));
        assert!(parse_indicator("1.0"));
        assert!(parse_indicator("yes"));
        assert!(!parse_indicator("0"));
        assert!(!parse_indicator(""));
    }

    #[test]
    fn text_collapses_whitespace() {
        assert_eq!(normalize_text("\u{feff}한양대학교\u{a0} 신소재  공학과"), "한양대학교 신소재 공학과");
        assert_eq!(normalize_header(" 2024년_입결70% "), "2024년_입결70%");
    }
}
