//! Cleaning primitives. Each works on cell values or a single column and
//! knows nothing about where the table came from.

pub mod category;
pub mod dates;
pub mod numeric;
pub mod weight;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a value could not be coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    /// Nothing left after scrubbing, or the source value was absent.
    Empty,
    /// Text remained but did not parse as a number.
    Unparsable(String),
    /// A number was found but no unit token; carries the unitless numeral.
    NoUnit { numeral: Option<f64> },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty value"),
            RejectReason::Unparsable(s) => write!(f, "unparsable value '{}'", s),
            RejectReason::NoUnit { numeral: Some(n) } => write!(f, "no unit on numeral {}", n),
            RejectReason::NoUnit { numeral: None } => write!(f, "no unit and no numeral"),
        }
    }
}

/// What a step does with a row whose value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Remove the row.
    #[default]
    Drop,
    /// Keep the row with the cell set to `Missing`.
    Flag,
}

/// What a date step does with a row whose date became missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    #[default]
    Keep,
    Drop,
}
