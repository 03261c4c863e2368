use std::io::Read;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;
use tracing::debug;

use crate::error::DatasetError;
use crate::model::{Direction, PriceBar};

/// Raw CSV row as it appears in the file. `Support` and `Resistance`
/// hold list literals as text (e.g. `"[100.5, 98.2]"`), decoded into
/// numeric lists during conversion.
#[derive(Debug, Deserialize)]
struct RawRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    direction: String,
    #[serde(rename = "Support", default)]
    support: Option<String>,
    #[serde(rename = "Resistance", default)]
    resistance: Option<String>,
}

impl RawRecord {
    fn into_bar(self) -> PriceBar {
        PriceBar {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            direction: Direction::classify(&self.direction),
            support: parse_levels(self.support.as_deref()),
            resistance: parse_levels(self.resistance.as_deref()),
        }
    }
}

/// Decode a level-list cell into a numeric list.
///
/// Lenient by contract: an empty/missing cell, a malformed literal, or a
/// literal that is not a sequence (e.g. a bare number) all yield an empty
/// list. Decode problems never propagate past this boundary.
fn parse_levels(cell: Option<&str>) -> Vec<f64> {
    let Some(raw) = cell else {
        return Vec::new();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    serde_json::from_str::<Vec<f64>>(raw).unwrap_or_default()
}

/// Load all price bars from the CSV file at `path`, in file order.
pub fn load(path: &Path) -> Result<Vec<PriceBar>, Report<DatasetError>> {
    let file = std::fs::File::open(path)
        .change_context(DatasetError::OpenFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let bars = read_bars(file)?;

    debug!(path = %path.display(), rows = bars.len(), "dataset loaded");

    Ok(bars)
}

fn read_bars<R: Read>(reader: R) -> Result<Vec<PriceBar>, Report<DatasetError>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();

    for (index, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
        // Row numbers are 1-based and skip the header line.
        let record = result.change_context(DatasetError::ReadRow { row: index + 1 })?;
        bars.push(record.into_bar());
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "timestamp,open,high,low,close,volume,direction,Support,Resistance\n";

    fn read(rows: &str) -> Vec<PriceBar> {
        let data = format!("{HEADER}{rows}");
        read_bars(data.as_bytes()).expect("read failed")
    }

    #[test]
    fn well_formed_row_parses() {
        let bars = read("2024-01-01,100,110,95,105,1000000,LONG,\"[90,95]\",\"[110,115]\"\n");
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.timestamp, "2024-01-01");
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.direction, Direction::Long);
        assert_eq!(bar.support, vec![90.0, 95.0]);
        assert_eq!(bar.resistance, vec![110.0, 115.0]);
    }

    #[test]
    fn row_order_preserved() {
        let bars = read(
            "2024-01-02,1,2,0,1,10,SHORT,,\n\
             2024-01-01,1,2,0,1,10,LONG,,\n",
        );
        assert_eq!(bars[0].timestamp, "2024-01-02");
        assert_eq!(bars[1].timestamp, "2024-01-01");
    }

    #[test]
    fn unknown_direction_classifies_as_none() {
        let bars = read("2024-01-01,1,2,0,1,10,HOLD,,\n");
        assert_eq!(bars[0].direction, Direction::None);
    }

    #[test]
    fn empty_direction_classifies_as_none() {
        let bars = read("2024-01-01,1,2,0,1,10,,,\n");
        assert_eq!(bars[0].direction, Direction::None);
    }

    #[test]
    fn malformed_numeric_field_is_an_error() {
        let data = format!("{HEADER}2024-01-01,abc,2,0,1,10,LONG,,\n");
        let result = read_bars(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn parse_levels_round_trip() {
        assert_eq!(parse_levels(Some("[100, 102.5]")), vec![100.0, 102.5]);
    }

    #[test]
    fn parse_levels_empty_and_missing() {
        assert_eq!(parse_levels(None), Vec::<f64>::new());
        assert_eq!(parse_levels(Some("")), Vec::<f64>::new());
        assert_eq!(parse_levels(Some("   ")), Vec::<f64>::new());
    }

    #[test]
    fn parse_levels_malformed_degrades_to_empty() {
        assert_eq!(parse_levels(Some("[100,")), Vec::<f64>::new());
        assert_eq!(parse_levels(Some("not a list")), Vec::<f64>::new());
    }

    #[test]
    fn parse_levels_non_list_scalar_degrades_to_empty() {
        assert_eq!(parse_levels(Some("100.5")), Vec::<f64>::new());
    }
}
