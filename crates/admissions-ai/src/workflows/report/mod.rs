mod narrative;
mod prompts;
mod summary;
pub mod views;

pub use narrative::{NarrativeError, NarrativeGenerator, NarrativeKind, NarrativeRequest};
pub use summary::{ReportAssembler, ScreeningReport};

/// Report formatting for optional numbers: `-` when absent, two decimals otherwise.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(number) if number.is_finite() => format!("{number:.2}"),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::format_value;

    #[test]
    fn format_value_uses_dash_and_two_decimals() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(f64::NAN)), "-");
        assert_eq!(format_value(Some(7.0)), "7.00");
        assert_eq!(format_value(Some(1.456)), "1.46");
    }
}
