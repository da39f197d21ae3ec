//! CSV tick source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use trading_core::error::FeedError;
use trading_core::types::PriceTick;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "Timestamp", alias = "time")]
    timestamp: String,
    #[serde(alias = "Symbol", alias = "ticker")]
    symbol: String,
    #[serde(alias = "Price", alias = "close", alias = "Close")]
    price: Decimal,
}

/// Historical ticks loaded from a `timestamp,symbol,price` CSV file.
pub struct CsvTickSource {
    ticks: Vec<PriceTick>,
}

impl CsvTickSource {
    /// Load ticks from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FeedError::NoDataAvailable);
        }
        let file = std::fs::File::open(path).map_err(|e| FeedError::Parse(e.to_string()))?;
        Self::from_reader(file)
    }

    /// Load ticks from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeedError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut ticks = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| FeedError::Parse(e.to_string()))?;
            let timestamp = parse_timestamp(&record.timestamp)?;
            ticks.push(PriceTick::new(record.symbol, record.price, timestamp));
        }

        // Stable sort keeps file order for equal timestamps
        ticks.sort_by_key(|t| t.timestamp);

        Ok(Self { ticks })
    }

    pub fn ticks(&self) -> &[PriceTick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn into_ticks(self) -> Vec<PriceTick> {
        self.ticks
    }
}

/// Parse RFC 3339, common date formats, or unix seconds/milliseconds.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FeedError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
    ];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    if let Ok(ts) = raw.parse::<i64>() {
        // Assume milliseconds if > 10 digits
        let millis = if ts > 10_000_000_000 { ts } else { ts * 1000 };
        if let Some(dt) = Utc.timestamp_millis_opt(millis).single() {
            return Ok(dt);
        }
    }

    Err(FeedError::Parse(format!("Could not parse timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-01-15").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_ok());
        assert!(parse_timestamp("1705312800000").is_ok()); // Unix ms
        assert!(parse_timestamp("1705312800").is_ok()); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_loads_and_sorts() {
        let data = "\
timestamp,symbol,price
2024-01-15T10:00:02Z,BTC,70100.5
2024-01-15T10:00:00Z,BTC,70000
2024-01-15T10:00:01Z,ETH,2500
";
        let source = CsvTickSource::from_reader(data.as_bytes()).unwrap();
        assert_eq!(source.len(), 3);

        let ticks = source.ticks();
        assert_eq!(ticks[0].price, dec!(70000));
        assert_eq!(ticks[1].symbol, "ETH");
        assert_eq!(ticks[2].price, dec!(70100.5));
    }

    #[test]
    fn test_bad_price_is_parse_error() {
        let data = "timestamp,symbol,price\n2024-01-15,BTC,abc\n";
        assert!(matches!(
            CsvTickSource::from_reader(data.as_bytes()),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvTickSource::from_path("/definitely/not/here.csv"),
            Err(FeedError::NoDataAvailable)
        ));
    }
}
