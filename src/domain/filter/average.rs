//! Causal running mean.
//!
//! Output[i] averages the last `kernel_size` samples ending at i. Before a
//! full window is available the window shrinks to samples [0, i].

use crate::domain::error::FilterError;
use crate::domain::series::TimeSeries;

pub fn average(series: &TimeSeries, kernel_size: usize) -> Result<TimeSeries, FilterError> {
    if kernel_size == 0 {
        return Err(FilterError::InvalidKernelSize);
    }

    let points = series.points();
    let values = (0..points.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(kernel_size);
            let window = &points[start..=i];
            window.iter().map(|p| p.y).sum::<f64>() / window.len() as f64
        })
        .collect();

    Ok(series.with_values(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::Sample;
    use approx::assert_relative_eq;

    fn make_series(prices: &[f64]) -> TimeSeries {
        TimeSeries::from_sorted(
            prices
                .iter()
                .enumerate()
                .map(|(i, &y)| Sample::new(i as f64 * 60.0, y))
                .collect(),
            60.0,
        )
    }

    fn ys(series: &TimeSeries) -> Vec<f64> {
        series.iter().map(|p| p.y).collect()
    }

    #[test]
    fn kernel_one_is_identity() {
        let input = make_series(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let out = average(&input, 1).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn shrinking_window_at_start() {
        let out = average(&make_series(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3).unwrap();
        let y = ys(&out);
        assert_relative_eq!(y[0], 10.0);
        assert_relative_eq!(y[1], 15.0);
        assert_relative_eq!(y[2], 20.0);
        assert_relative_eq!(y[3], 30.0);
        assert_relative_eq!(y[4], 40.0);
    }

    #[test]
    fn keeps_x_values() {
        let input = make_series(&[1.0, 2.0, 3.0]);
        let out = average(&input, 2).unwrap();
        let xs: Vec<f64> = out.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 60.0, 120.0]);
        assert_relative_eq!(out.granularity, 60.0);
    }

    #[test]
    fn kernel_larger_than_series() {
        let out = average(&make_series(&[2.0, 4.0]), 10).unwrap();
        assert_eq!(ys(&out), vec![2.0, 3.0]);
    }

    #[test]
    fn empty_series() {
        let out = average(&TimeSeries::new(1.0), 3).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_kernel_fails() {
        assert_eq!(
            average(&make_series(&[1.0]), 0),
            Err(FilterError::InvalidKernelSize)
        );
    }
}
