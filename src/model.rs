use std::fmt;

use serde::{Deserialize, Serialize};

/// Trade direction label attached to a bar by the upstream signal source.
///
/// Classification is closed: only the exact labels `"LONG"` and `"SHORT"`
/// map to their variants, everything else (empty, missing, lowercase,
/// unknown labels) is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    None,
}

impl Direction {
    pub fn classify(label: &str) -> Self {
        match label {
            "LONG" => Self::Long,
            "SHORT" => Self::Short,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the input table: an OHLCV bar plus the signal columns.
///
/// Bars are kept in file order; timestamps are expected unique and
/// non-decreasing but the transformation never enforces or repairs that.
#[derive(Debug, Clone)]
pub struct PriceBar {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub direction: Direction,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl PriceBar {
    /// Render the bar as a single line for the assistant prompt, in the
    /// original column order.
    pub fn describe(&self) -> String {
        format!(
            "timestamp: {}, open: {}, high: {}, low: {}, close: {}, volume: {}, direction: {}, Support: {:?}, Resistance: {:?}",
            self.timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.direction,
            self.support,
            self.resistance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_exact_labels() {
        assert_eq!(Direction::classify("LONG"), Direction::Long);
        assert_eq!(Direction::classify("SHORT"), Direction::Short);
    }

    #[test]
    fn classify_everything_else_is_none() {
        for label in ["", "long", "short", "HOLD", "Long", " LONG", "NONE"] {
            assert_eq!(Direction::classify(label), Direction::None, "label: {label:?}");
        }
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Long.to_string(), "LONG");
        assert_eq!(Direction::Short.to_string(), "SHORT");
        assert_eq!(Direction::None.to_string(), "NONE");
    }

    #[test]
    fn direction_serde_round_trip() {
        let json = serde_json::to_string(&Direction::Long).unwrap();
        let parsed: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Direction::Long);
    }

    #[test]
    fn describe_contains_all_columns() {
        let bar = PriceBar {
            timestamp: "2024-01-01".into(),
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 105.0,
            volume: 1_000_000.0,
            direction: Direction::Long,
            support: vec![90.0, 95.0],
            resistance: vec![110.0, 115.0],
        };
        let line = bar.describe();
        for field in ["2024-01-01", "LONG", "90.0", "115.0", "1000000"] {
            assert!(line.contains(field), "missing {field} in {line}");
        }
    }
}
