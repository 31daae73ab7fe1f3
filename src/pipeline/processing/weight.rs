//! Free-text product weights to kilograms.

use once_cell::sync::Lazy;
use regex::Regex;

use super::RejectReason;
use crate::table::Cell;

static WEIGHT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.kgmlx]").expect("static weight regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum WeightOutcome {
    Kilograms(f64),
    Rejected(RejectReason),
}

impl WeightOutcome {
    pub fn kilograms(&self) -> Option<f64> {
        match self {
            WeightOutcome::Kilograms(kg) => Some(*kg),
            WeightOutcome::Rejected(_) => None,
        }
    }
}

/// Parse a weight such as `1.2kg`, `500g`, `250ml` or `12 x 100g`.
///
/// Unit checks are ordered: `kg` before the multipack `x`, then `ml`, then a
/// bare `g`. A value with no unit token is rejected.
pub fn normalize_weight(raw: &str) -> WeightOutcome {
    let value = WEIGHT_NOISE.replace_all(raw, "");
    if value.is_empty() {
        return WeightOutcome::Rejected(RejectReason::Empty);
    }

    let outcome = if value.contains("kg") {
        parse_numeral(&value.replace("kg", ""))
    } else if let Some((count, grams)) = value.split_once('x') {
        parse_multipack(count, &grams.replace('g', ""))
    } else if value.contains("ml") {
        parse_numeral(&value.replace("ml", "")).map(|ml| ml / 1000.0)
    } else if value.contains('g') && !value.contains('k') {
        parse_numeral(&value.replace('g', "")).map(|g| g / 1000.0)
    } else {
        let numeral = value.parse::<f64>().ok();
        Err(RejectReason::NoUnit { numeral })
    };

    match outcome {
        Ok(kg) => WeightOutcome::Kilograms(kg),
        Err(reason) => WeightOutcome::Rejected(reason),
    }
}

pub fn normalize_weight_cell(cell: &Cell) -> WeightOutcome {
    match cell.to_text() {
        Some(text) => normalize_weight(&text),
        None => WeightOutcome::Rejected(RejectReason::Empty),
    }
}

fn parse_numeral(text: &str) -> Result<f64, RejectReason> {
    if text.is_empty() {
        return Err(RejectReason::Empty);
    }
    text.parse::<f64>()
        .map_err(|_| RejectReason::Unparsable(text.to_string()))
}

fn parse_multipack(count: &str, grams: &str) -> Result<f64, RejectReason> {
    let count = count
        .parse::<u64>()
        .map_err(|_| RejectReason::Unparsable(count.to_string()))?;
    let grams = grams
        .parse::<u64>()
        .map_err(|_| RejectReason::Unparsable(grams.to_string()))?;
    let total = count
        .checked_mul(grams)
        .ok_or_else(|| RejectReason::Unparsable(format!("{}x{}", count, grams)))?;
    Ok(total as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kg(raw: &str) -> f64 {
        normalize_weight(raw)
            .kilograms()
            .unwrap_or_else(|| panic!("{raw} should parse"))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_documented_examples() {
        assert!(close(kg("1.2kg"), 1.2));
        assert!(close(kg("12 x 100g"), 1.2));
        assert!(close(kg("250ml"), 0.25));
        assert!(close(kg("500g"), 0.5));
    }

    #[test]
    fn test_unitless_value_is_rejected_with_fallback_numeral() {
        assert_eq!(
            normalize_weight("77  ."),
            WeightOutcome::Rejected(RejectReason::NoUnit { numeral: Some(77.0) })
        );
        assert_eq!(
            normalize_weight("16oz"),
            WeightOutcome::Rejected(RejectReason::NoUnit { numeral: Some(16.0) })
        );
    }

    #[test]
    fn test_noise_and_empty_inputs() {
        assert!(close(kg("77g ."), 0.077));
        assert_eq!(normalize_weight("   "), WeightOutcome::Rejected(RejectReason::Empty));
        assert_eq!(normalize_weight_cell(&Cell::Null), WeightOutcome::Rejected(RejectReason::Empty));
        assert!(matches!(
            normalize_weight("2 x 12.5g"),
            WeightOutcome::Rejected(RejectReason::Unparsable(_))
        ));
    }

    #[test]
    fn test_oversized_multipack_is_rejected() {
        assert_eq!(
            normalize_weight("99999999999 x 99999999999g"),
            WeightOutcome::Rejected(RejectReason::Unparsable("99999999999x99999999999".to_string()))
        );
    }

    #[test]
    fn test_same_mass_in_different_units() {
        let values = ["1kg", "1000g", "1000ml", "4 x 250g", "1.0kg"];
        for raw in values {
            assert!(close(kg(raw), 1.0), "{raw}");
        }
    }

    #[test]
    fn test_results_are_non_negative() {
        for raw in ["-5kg", "- 300g", "0g"] {
            assert!(kg(raw) >= 0.0, "{raw}");
        }
    }
}
