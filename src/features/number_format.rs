//! Display formatting for evaluated values.

use crate::features::evaluator::EvalError;
use serde::{Deserialize, Serialize};

/// Shown instead of raw `NaN`/`inf` text.
pub const ERROR_TEXT: &str = "Error";

const NEAR_INTEGER_TOLERANCE: f64 = 1e-9;
const SIGNIFICANT_DIGITS: usize = 12;
const SCIENTIFIC_FRACTION_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatMode {
    #[default]
    Plain,
    Thousands,
    Scientific,
}

impl FormatMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" => Some(FormatMode::Plain),
            "thousands" => Some(FormatMode::Thousands),
            "scientific" => Some(FormatMode::Scientific),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatMode::Plain => "plain",
            FormatMode::Thousands => "thousands",
            FormatMode::Scientific => "scientific",
        }
    }
}

pub fn format_number(value: f64, mode: FormatMode) -> String {
    if !value.is_finite() {
        return ERROR_TEXT.to_string();
    }
    match mode {
        FormatMode::Plain => format_plain(value),
        FormatMode::Thousands => group_thousands(&format_plain(value)),
        FormatMode::Scientific => format_scientific(value),
    }
}

/// Localized message for a failed evaluation.
pub fn error_message(err: &EvalError, locale: &str) -> String {
    let message = match err {
        EvalError::Syntax(_) => rust_i18n::t!("error.syntax", locale = locale),
        EvalError::Domain(_) => rust_i18n::t!("error.domain", locale = locale),
        EvalError::DivisionByZero => rust_i18n::t!("error.division_by_zero", locale = locale),
        EvalError::Overflow => rust_i18n::t!("error.overflow", locale = locale),
    };
    message.to_string()
}

// Snap to the nearest integer when within tolerance, otherwise drop the
// binary noise past 12 significant digits (0.1+0.2 -> 0.3).
fn normalize(value: f64) -> f64 {
    let rounded = value.round();
    let snapped = if (value - rounded).abs() < NEAR_INTEGER_TOLERANCE {
        rounded
    } else {
        round_significant(value)
    };
    positive_zero(snapped)
}

fn round_significant(value: f64) -> f64 {
    format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
        .parse()
        .unwrap_or(value)
}

fn positive_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

fn format_plain(value: f64) -> String {
    // f64's Display is the shortest round-trip form and never uses an exponent.
    format!("{}", normalize(value))
}

fn group_thousands(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, digit) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

// No integer snap here: 1e-10 must stay 1E-10 rather than collapse to 0E0.
fn format_scientific(value: f64) -> String {
    let rounded = positive_zero(round_significant(value));
    let raw = format!("{:.*e}", SCIENTIFIC_FRACTION_DIGITS, rounded);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    format!("{}E{exponent}", trim_fraction(mantissa))
}

fn trim_fraction(number: &str) -> &str {
    if !number.contains('.') {
        return number;
    }
    number.trim_end_matches('0').trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_drops_trailing_zeros_and_integral_point() {
        assert_eq!(format_number(4.0, FormatMode::Plain), "4");
        assert_eq!(format_number(2.5, FormatMode::Plain), "2.5");
        assert_eq!(format_number(-12.0, FormatMode::Plain), "-12");
        assert_eq!(format_number(1_000_000.0, FormatMode::Plain), "1000000");
        assert_eq!(format_number(1e20, FormatMode::Plain), "100000000000000000000");
    }

    #[test]
    fn plain_hides_binary_noise() {
        assert_eq!(format_number(0.1 + 0.2, FormatMode::Plain), "0.3");
        assert_eq!(format_number(1.0 / 3.0, FormatMode::Plain), "0.333333333333");
        assert_eq!(format_number(2.0_f64.sqrt() * 2.0_f64.sqrt(), FormatMode::Plain), "2");
    }

    #[test]
    fn values_indistinguishable_from_zero_render_as_zero() {
        assert_eq!(format_number(-0.0, FormatMode::Plain), "0");
        assert_eq!(format_number(std::f64::consts::PI.sin(), FormatMode::Plain), "0");
        assert_eq!(format_number(-1e-12, FormatMode::Thousands), "0");
        assert_eq!(format_number(-0.0, FormatMode::Scientific), "0E0");
    }

    #[test]
    fn plain_is_idempotent() {
        for value in [0.0, 3.0, -2.75, 1234.5678, 1e-5, 98765432.1] {
            let once = format_number(value, FormatMode::Plain);
            let reparsed: f64 = once.parse().unwrap();
            assert_eq!(format_number(reparsed, FormatMode::Plain), once);
        }
    }

    #[test]
    fn thousands_groups_integer_digits() {
        assert_eq!(format_number(1_000_000.0, FormatMode::Thousands), "1,000,000");
        assert_eq!(format_number(-1234.5, FormatMode::Thousands), "-1,234.5");
        assert_eq!(format_number(100_000.25, FormatMode::Thousands), "100,000.25");
    }

    #[test]
    fn thousands_matches_plain_below_one_thousand() {
        for value in [0.0, 7.0, 999.0, -999.5, 0.125] {
            assert_eq!(
                format_number(value, FormatMode::Thousands),
                format_number(value, FormatMode::Plain)
            );
        }
        assert_ne!(
            format_number(1000.0, FormatMode::Thousands),
            format_number(1000.0, FormatMode::Plain)
        );
    }

    #[test]
    fn scientific_uses_exponent_marker() {
        assert_eq!(format_number(1_000_000.0, FormatMode::Scientific), "1E6");
        assert_eq!(format_number(1_500_000.0, FormatMode::Scientific), "1.5E6");
        assert_eq!(format_number(-0.001234567, FormatMode::Scientific), "-1.234567E-3");
        assert_eq!(format_number(0.5, FormatMode::Scientific), "5E-1");
        for value in [0.0, 1.0, 42.0, 1e-7, 6.02e23] {
            assert!(format_number(value, FormatMode::Scientific).contains('E'));
        }
    }

    #[test]
    fn scientific_keeps_tiny_magnitudes() {
        assert_eq!(format_number(1e-10, FormatMode::Scientific), "1E-10");
        assert_eq!(format_number(6.626e-34, FormatMode::Scientific), "6.626E-34");
        assert_eq!(format_number(-2.5e-12, FormatMode::Scientific), "-2.5E-12");
        // the integer snap still applies to the other modes
        assert_eq!(format_number(1e-10, FormatMode::Plain), "0");
    }

    #[test]
    fn scientific_renders_evaluated_small_results() {
        use crate::features::evaluator::{evaluate, AngleMode};

        let value = evaluate("1/10^12", AngleMode::Radians).unwrap();
        assert_eq!(format_number(value, FormatMode::Scientific), "1E-12");
    }

    #[test]
    fn non_finite_values_render_error_text() {
        for mode in [FormatMode::Plain, FormatMode::Thousands, FormatMode::Scientific] {
            assert_eq!(format_number(f64::NAN, mode), ERROR_TEXT);
            assert_eq!(format_number(f64::INFINITY, mode), ERROR_TEXT);
            assert_eq!(format_number(f64::NEG_INFINITY, mode), ERROR_TEXT);
        }
    }

    #[test]
    fn error_messages_are_localized() {
        assert_eq!(error_message(&EvalError::DivisionByZero, "en"), "Division by zero");
        assert!(error_message(&EvalError::DivisionByZero, "fr").contains("zéro"));
        assert_eq!(error_message(&EvalError::Syntax("x".into()), "en"), "Syntax error");
        assert_eq!(error_message(&EvalError::Overflow, "xx"), "Overflow");
    }

    #[test]
    fn format_mode_parses_case_insensitively() {
        assert_eq!(FormatMode::parse("SCIENTIFIC"), Some(FormatMode::Scientific));
        assert_eq!(FormatMode::parse(" thousands "), Some(FormatMode::Thousands));
        assert_eq!(FormatMode::parse("hex"), None);
    }
}
