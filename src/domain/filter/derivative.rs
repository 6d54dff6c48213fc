//! Discrete derivative dy/dx between consecutive samples.
//!
//! The slope of each pair is placed at the later sample's x, so the output
//! has one sample fewer than the input and stays causal.

use crate::domain::error::FilterError;
use crate::domain::series::{Sample, TimeSeries};

pub fn derivative(series: &TimeSeries) -> Result<TimeSeries, FilterError> {
    let points = series.points();
    let mut out = Vec::with_capacity(points.len().saturating_sub(1));

    for (i, w) in points.windows(2).enumerate() {
        let dx = w[1].x - w[0].x;
        if dx <= 0.0 || dx.is_nan() {
            tracing::warn!(index = i + 1, dx, "derivative aborted on non-increasing x");
            return Err(FilterError::NonIncreasingX { index: i + 1, dx });
        }
        out.push(Sample::new(w[1].x, (w[1].y - w[0].y) / dx));
    }

    Ok(TimeSeries::from_sorted(out, series.granularity))
}
