//! Gaussian smoothing, two-sided and causal.
//!
//! Kernel weights come from a Gaussian in `sigma` evaluated on a fixed time
//! scale of 2.7 / (kernel_size / 2) per sample offset, then normalized to sum
//! to 1. The scale does not depend on `sigma`.
//!
//! Samples outside the series are replaced by the nearest edge sample, so the
//! kernel never shrinks.

use crate::domain::error::FilterError;
use crate::domain::series::{DEFAULT_SPACING_TOLERANCE_PCT, TimeSeries};

const KERNEL_EXTENT: f64 = 2.7;

pub(crate) fn validate_parameters(sigma: f64, kernel_size: usize) -> Result<(), FilterError> {
    if kernel_size == 0 {
        return Err(FilterError::InvalidKernelSize);
    }
    if kernel_size % 2 == 0 {
        return Err(FilterError::EvenKernelSize { kernel_size });
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(FilterError::InvalidSigma { sigma });
    }
    Ok(())
}

fn gaussian_weight(t: f64, sigma: f64) -> f64 {
    (-(t * t) / (2.0 * sigma * sigma)).exp()
}

fn normalize(mut kernel: Vec<f64>) -> Vec<f64> {
    let total: f64 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= total;
    }
    kernel
}

/// Symmetric kernel indexed by offset `-half..=half`.
pub fn symmetric_kernel(sigma: f64, kernel_size: usize) -> Vec<f64> {
    let half = kernel_size / 2;
    if half == 0 {
        return vec![1.0];
    }
    let step = KERNEL_EXTENT / half as f64;
    let kernel = (0..kernel_size)
        .map(|i| {
            let offset = i as f64 - half as f64;
            gaussian_weight(offset * step, sigma)
        })
        .collect();
    normalize(kernel)
}

/// Causal kernel indexed by lag `0..kernel_size` (0 = current sample).
pub fn causal_kernel(sigma: f64, kernel_size: usize) -> Vec<f64> {
    if kernel_size <= 1 {
        return vec![1.0];
    }
    let step = KERNEL_EXTENT / (kernel_size - 1) as f64;
    let kernel = (0..kernel_size)
        .map(|lag| gaussian_weight(lag as f64 * step, sigma))
        .collect();
    normalize(kernel)
}

fn require_even_spacing(series: &TimeSeries) -> Result<(), FilterError> {
    let (even, average_spacing) = series.is_evenly_spaced(DEFAULT_SPACING_TOLERANCE_PCT)?;
    if !even {
        return Err(FilterError::NotEvenlySpaced { average_spacing });
    }
    Ok(())
}

pub fn gaussian(series: &TimeSeries, sigma: f64, kernel_size: usize) -> Result<TimeSeries, FilterError> {
    validate_parameters(sigma, kernel_size)?;
    if series.len() < 2 {
        return Ok(series.clone());
    }
    require_even_spacing(series)?;

    let kernel = symmetric_kernel(sigma, kernel_size);
    let half = (kernel_size / 2) as isize;
    let points = series.points();
    let last = points.len() as isize - 1;

    let values = (0..points.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = (i + k as isize - half).clamp(0, last);
                    w * points[j as usize].y
                })
                .sum()
        })
        .collect();

    Ok(series.with_values(values))
}

/// Causal Gaussian: output[i] reads only samples i, i-1, ... i-kernel_size+1.
pub fn left_gaussian(
    series: &TimeSeries,
    sigma: f64,
    kernel_size: usize,
) -> Result<TimeSeries, FilterError> {
    validate_parameters(sigma, kernel_size)?;
    if series.len() < 2 {
        return Ok(series.clone());
    }
    require_even_spacing(series)?;

    let kernel = causal_kernel(sigma, kernel_size);
    let points = series.points();

    let values = (0..points.len())
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(lag, w)| w * points[i.saturating_sub(lag)].y)
                .sum()
        })
        .collect();

    Ok(series.with_values(values))
}
