//! JSON series files: `{"Points": [{"X": .., "Y": ..}, ..], "Granularity": ..}`.
//!
//! A directory of `<asset>.json` files doubles as a price history source.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::StrategistError;
use crate::domain::series::TimeSeries;
use crate::ports::data_port::PriceHistoryPort;

/// Read a series file. Unreadable files and malformed content are reported
/// as different errors; out-of-order points are sorted.
pub fn read_series_file(path: &Path) -> Result<TimeSeries, StrategistError> {
    let content = fs::read_to_string(path).map_err(|e| StrategistError::SeriesFileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let series: TimeSeries =
        serde_json::from_str(&content).map_err(|e| StrategistError::SeriesFileMalformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if series.is_sorted() {
        Ok(series)
    } else {
        tracing::warn!(path = %path.display(), "series points out of order, sorting");
        let granularity = series.granularity;
        Ok(TimeSeries::from_unsorted(series.iter().copied(), granularity))
    }
}

/// Write a series as pretty-printed JSON.
///
/// JSON has no NaN or infinity, so a non-finite sample or granularity is
/// refused and nothing is written.
pub fn write_series_file(series: &TimeSeries, path: &Path) -> Result<(), StrategistError> {
    let failed = |reason: String| StrategistError::SeriesFileWrite {
        path: path.display().to_string(),
        reason,
    };
    if let Some((i, p)) = series
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(failed(format!("sample {} ({}, {}) is not finite", i, p.x, p.y)));
    }
    if !series.granularity.is_finite() {
        return Err(failed(format!("granularity {} is not finite", series.granularity)));
    }
    let json = serde_json::to_string_pretty(series).map_err(|e| failed(e.to_string()))?;
    fs::write(path, json).map_err(|e| failed(e.to_string()))
}

pub struct JsonSeriesAdapter {
    base_path: PathBuf,
}

impl JsonSeriesAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", asset))
    }

    /// Assets with a series file in the directory, sorted.
    pub fn list_assets(&self) -> Result<Vec<String>, StrategistError> {
        list_assets_with_extension(&self.base_path, "json")
    }
}

impl PriceHistoryPort for JsonSeriesAdapter {
    fn get_price_history(
        &self,
        asset: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        _granularity_seconds: f64,
    ) -> Result<TimeSeries, StrategistError> {
        let series = read_series_file(&self.series_path(asset))?;
        Ok(series.between(Some(start.timestamp() as f64), Some(end.timestamp() as f64)))
    }
}

pub(crate) fn list_assets_with_extension(dir: &Path, extension: &str) -> Result<Vec<String>, StrategistError> {
    let entries = fs::read_dir(dir).map_err(|e| StrategistError::DataSource {
        asset: "*".to_string(),
        reason: format!("failed to read directory {}: {}", dir.display(), e),
    })?;

    let mut assets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == extension) {
            if let Some(stem) = path.file_stem() {
                assets.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    assets.sort();
    Ok(assets)
}
