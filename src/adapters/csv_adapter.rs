//! CSV price files (`<asset>.csv` with `timestamp,price` columns).
//!
//! Timestamps are Unix seconds or RFC 3339 date-times.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use super::json_series_adapter::list_assets_with_extension;
use crate::domain::error::StrategistError;
use crate::domain::series::{Sample, TimeSeries};
use crate::ports::data_port::PriceHistoryPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset))
    }

    pub fn list_assets(&self) -> Result<Vec<String>, StrategistError> {
        list_assets_with_extension(&self.base_path, "csv")
    }
}

fn parse_timestamp(value: &str) -> Result<f64, String> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        if !seconds.is_finite() {
            return Err(format!("timestamp \"{}\" is not finite", value));
        }
        return Ok(seconds);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp() as f64)
        .map_err(|e| format!("invalid timestamp \"{}\": {}", value, e))
}

/// Read a whole CSV series; rows may be in any order.
pub fn read_csv_series(path: &Path, granularity_seconds: f64) -> Result<TimeSeries, StrategistError> {
    let content = fs::read_to_string(path).map_err(|e| StrategistError::SeriesFileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let malformed = |reason: String| StrategistError::SeriesFileMalformed {
        path: path.display().to_string(),
        reason,
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut samples = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| malformed(format!("CSV parse error: {}", e)))?;
        let line = row + 2;

        let timestamp = record
            .get(0)
            .ok_or_else(|| malformed(format!("line {}: missing timestamp column", line)))?;
        let x = parse_timestamp(timestamp).map_err(|e| malformed(format!("line {}: {}", line, e)))?;

        let y: f64 = record
            .get(1)
            .ok_or_else(|| malformed(format!("line {}: missing price column", line)))?
            .trim()
            .parse()
            .map_err(|e| malformed(format!("line {}: invalid price: {}", line, e)))?;
        if !y.is_finite() {
            return Err(malformed(format!("line {}: price {} is not finite", line, y)));
        }

        samples.push(Sample::new(x, y));
    }

    Ok(TimeSeries::from_unsorted(samples, granularity_seconds))
}

impl PriceHistoryPort for CsvAdapter {
    fn get_price_history(
        &self,
        asset: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity_seconds: f64,
    ) -> Result<TimeSeries, StrategistError> {
        let series = read_csv_series(&self.csv_path(asset), granularity_seconds)?;
        Ok(series.between(Some(start.timestamp() as f64), Some(end.timestamp() as f64)))
    }
}
