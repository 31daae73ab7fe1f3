use super::RejectReason;
use crate::table::Cell;

/// Keep ASCII digits only. Decimal points are dropped too; counts are integers.
pub fn scrub_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn parse_count(raw: &str) -> Result<i64, RejectReason> {
    let digits = scrub_digits(raw);
    if digits.is_empty() {
        return Err(RejectReason::Empty);
    }
    digits
        .parse::<i64>()
        .map_err(|_| RejectReason::Unparsable(digits))
}

pub fn parse_count_cell(cell: &Cell) -> Result<i64, RejectReason> {
    match cell {
        Cell::Int(i) if *i >= 0 => Ok(*i),
        other => other
            .to_text()
            .map(|s| parse_count(&s))
            .unwrap_or(Err(RejectReason::Empty)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_strips_noise() {
        assert_eq!(scrub_digits("AB12cd34"), "1234");
        assert_eq!(scrub_digits("J78"), "78");
        assert_eq!(scrub_digits("3n9"), "39");
        assert_eq!(scrub_digits("1.5"), "15");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("AB12cd34"), Ok(1234));
        assert_eq!(parse_count(" 30 "), Ok(30));
    }

    #[test]
    fn test_all_alpha_is_rejected_not_zero() {
        assert_eq!(parse_count("NULL"), Err(RejectReason::Empty));
        assert_eq!(parse_count(""), Err(RejectReason::Empty));
        assert_eq!(parse_count_cell(&Cell::Null), Err(RejectReason::Empty));
    }

    #[test]
    fn test_overflow_is_unparsable() {
        let huge = "9".repeat(30);
        assert!(matches!(parse_count(&huge), Err(RejectReason::Unparsable(_))));
    }
}
