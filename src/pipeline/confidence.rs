//! Context confidence normalization.
//!
//! The context stage reports confidence either as a fraction (0.73) or as a
//! percentage (73). Values at or below 1 are treated as fractions.

use serde_json::Value;

/// Placeholder shown when no confidence is available.
pub const NO_CONFIDENCE: &str = "—";

/// Confidence as a plain number, if the backend sent one.
pub fn raw_confidence(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Integer percentage in [0,100].
pub fn normalize_confidence(value: Option<&Value>) -> Option<u8> {
    raw_confidence(value).map(to_percent)
}

/// Scale a raw confidence to a percentage.
pub fn to_percent(raw: f64) -> u8 {
    let scaled = if raw <= 1.0 { raw * 100.0 } else { raw };
    scaled.round().clamp(0.0, 100.0) as u8
}

/// Display form: `73%` or `—`.
pub fn format_confidence(percent: Option<u8>) -> String {
    match percent {
        Some(p) => format!("{p}%"),
        None => NO_CONFIDENCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fraction_becomes_percentage() {
        assert_eq!(normalize_confidence(Some(&json!(0.73))), Some(73));
    }

    #[test]
    fn percentage_is_kept() {
        assert_eq!(normalize_confidence(Some(&json!(73))), Some(73));
    }

    #[test]
    fn exactly_one_is_full_confidence() {
        assert_eq!(normalize_confidence(Some(&json!(1))), Some(100));
    }

    #[test]
    fn null_and_missing_have_no_confidence() {
        assert_eq!(normalize_confidence(Some(&Value::Null)), None);
        assert_eq!(normalize_confidence(None), None);
        assert_eq!(format_confidence(None), "—");
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(normalize_confidence(Some(&json!(250))), Some(100));
        assert_eq!(normalize_confidence(Some(&json!(-0.5))), Some(0));
    }

    #[test]
    fn non_numeric_has_no_confidence() {
        assert_eq!(normalize_confidence(Some(&json!("sure"))), None);
    }

    #[test]
    fn display_format() {
        assert_eq!(format_confidence(Some(73)), "73%");
        assert_eq!(format_confidence(Some(0)), "0%");
    }
}
