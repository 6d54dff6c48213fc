//! Price history port trait.

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::StrategistError;
use crate::domain::series::TimeSeries;

pub trait PriceHistoryPort {
    /// Samples of `asset` with timestamps (seconds since the Unix epoch) in
    /// `[start, end]`, in ascending order.
    fn get_price_history(
        &self,
        asset: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity_seconds: f64,
    ) -> Result<TimeSeries, StrategistError>;

    /// Fetch `[start, end]` in consecutive chunks of at most `chunk` and
    /// concatenate them. Chunks share their boundaries; a sample sitting
    /// exactly on one is kept once. A chunk reaching past the representable
    /// date range covers the rest of `[start, end]`.
    fn get_price_history_chunked(
        &self,
        asset: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity_seconds: f64,
        chunk: Duration,
    ) -> Result<TimeSeries, StrategistError> {
        if chunk <= Duration::zero() {
            return Err(StrategistError::DataSource {
                asset: asset.to_string(),
                reason: "chunk length must be positive".to_string(),
            });
        }
        let mut series = TimeSeries::new(granularity_seconds);
        let mut chunk_start = start;
        while chunk_start <= end {
            let chunk_end = chunk_start
                .checked_add_signed(chunk)
                .map_or(end, |next| next.min(end));
            let fetched = self.get_price_history(asset, chunk_start, chunk_end, granularity_seconds)?;
            let part = match series.last() {
                Some(last) => {
                    let boundary = last.x;
                    TimeSeries::from_sorted(
                        fetched.iter().filter(|p| p.x > boundary).copied().collect(),
                        granularity_seconds,
                    )
                }
                None => fetched,
            };
            tracing::debug!(asset, from = %chunk_start, to = %chunk_end, samples = part.len(), "fetched chunk");
            series.add(&part);
            if chunk_end >= end {
                break;
            }
            chunk_start = chunk_end;
        }
        Ok(series)
    }
}
