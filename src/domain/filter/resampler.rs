//! Regrid a series onto uniform spacing.
//!
//! The grid starts at the first sample and has
//! `round(span / frequency) + 1` points, each interpolated with
//! [`TimeSeries::value_at`]. Grid queries are clamped into the series
//! domain, which only matters for the final point when rounding goes up.

use crate::domain::error::FilterError;
use crate::domain::series::{Sample, TimeSeries};

/// Largest grid a single resample may produce.
pub const MAX_RESAMPLED_POINTS: usize = 50_000_000;

pub fn resample(series: &TimeSeries, frequency: f64) -> Result<TimeSeries, FilterError> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(FilterError::InvalidFrequency { frequency });
    }

    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first.x, last.x),
        _ => return Ok(series.clone()),
    };

    let span = last - first;
    let too_large = FilterError::ResampleTooLarge {
        span,
        frequency,
        limit: MAX_RESAMPLED_POINTS,
    };
    let steps = (span / frequency).round();
    if !(steps.is_finite() && steps >= 0.0 && steps < MAX_RESAMPLED_POINTS as f64) {
        return Err(too_large);
    }
    let count = (steps as usize).checked_add(1).ok_or(too_large)?;

    let points = (0..count)
        .map(|k| {
            let x = first + k as f64 * frequency;
            series.value_at(x.clamp(first, last)).map(|y| Sample::new(x, y))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TimeSeries::from_sorted(points, frequency))
}
