//! Risk score normalization and banding.
//!
//! The backend reports scores as `risk` or `risk_score`, usually as an
//! integer but occasionally as a float, a numeric string, or garbage.
//! Everything is coerced into [0,100]; anything non-numeric becomes 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound of the risk scale.
pub const RISK_MAX: u8 = 100;

/// Scores below this are low risk.
pub const MODERATE_THRESHOLD: u8 = 40;

/// Scores at or above this are high risk.
pub const HIGH_THRESHOLD: u8 = 70;

/// Dashboard risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn from_score(score: u8) -> Self {
        if score < MODERATE_THRESHOLD {
            RiskBand::Low
        } else if score < HIGH_THRESHOLD {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    /// Meter/badge color.
    pub fn color(self) -> &'static str {
        match self {
            RiskBand::Low => "green",
            RiskBand::Moderate => "yellow",
            RiskBand::High => "red",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Coerce any JSON value into a [0,100] score.
pub fn clamp_score(value: &Value) -> u8 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, f64::from(RISK_MAX)) as u8,
        _ => 0,
    }
}

/// Score from the first present of `risk` / `risk_score`, `None` if both are absent.
pub fn pick_score(risk: Option<&Value>, risk_score: Option<&Value>) -> Option<u8> {
    risk.filter(|v| !v.is_null())
        .or(risk_score.filter(|v| !v.is_null()))
        .map(clamp_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn band_boundaries() {
        assert_eq!(RiskBand::from_score(0), RiskBand::Low);
        assert_eq!(RiskBand::from_score(39), RiskBand::Low);
        assert_eq!(RiskBand::from_score(40), RiskBand::Moderate);
        assert_eq!(RiskBand::from_score(69), RiskBand::Moderate);
        assert_eq!(RiskBand::from_score(70), RiskBand::High);
        assert_eq!(RiskBand::from_score(100), RiskBand::High);
    }

    #[test]
    fn band_holds_for_every_score() {
        for score in 0..=RISK_MAX {
            let band = RiskBand::from_score(score);
            let expected = if score < 40 {
                RiskBand::Low
            } else if score < 70 {
                RiskBand::Moderate
            } else {
                RiskBand::High
            };
            assert_eq!(band, expected, "score {score}");
        }
    }

    #[test]
    fn band_colors() {
        assert_eq!(RiskBand::Low.color(), "green");
        assert_eq!(RiskBand::Moderate.color(), "yellow");
        assert_eq!(RiskBand::High.color(), "red");
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(clamp_score(&json!(150)), 100);
        assert_eq!(clamp_score(&json!(-20)), 0);
        assert_eq!(clamp_score(&json!(62)), 62);
    }

    #[test]
    fn rounds_fractional_scores() {
        assert_eq!(clamp_score(&json!(61.6)), 62);
        assert_eq!(clamp_score(&json!(0.4)), 0);
    }

    #[test]
    fn non_numeric_is_zero() {
        assert_eq!(clamp_score(&json!("high")), 0);
        assert_eq!(clamp_score(&json!(null)), 0);
        assert_eq!(clamp_score(&json!(true)), 0);
        assert_eq!(clamp_score(&json!({"v": 5})), 0);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(clamp_score(&json!(" 45 ")), 45);
    }

    #[test]
    fn pick_prefers_risk_then_risk_score() {
        let risk = json!(10);
        let risk_score = json!(80);
        assert_eq!(pick_score(Some(&risk), Some(&risk_score)), Some(10));
        assert_eq!(pick_score(None, Some(&risk_score)), Some(80));
        assert_eq!(pick_score(Some(&Value::Null), Some(&risk_score)), Some(80));
        assert_eq!(pick_score(None, None), None);
    }
}
