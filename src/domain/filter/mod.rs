//! Signal filters applied to a price series before a strategy walks it.
//!
//! - `Filter`: enum naming a filter and its parameters (serialized as
//!   `{"Type": .., "Parameters": {..}}`)
//! - `apply_filters`: left fold of a filter list over a series
//!
//! Every filter is a pure `&TimeSeries -> TimeSeries`; the input is never
//! mutated.

pub mod average;
pub mod derivative;
pub mod gaussian;
pub mod resampler;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::FilterError;
use crate::domain::series::TimeSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Parameters", rename_all_fields = "PascalCase")]
pub enum Filter {
    Average {
        kernel_size: usize,
    },
    Gaussian {
        sigma: f64,
        kernel_size: usize,
    },
    LeftGaussian {
        sigma: f64,
        kernel_size: usize,
    },
    Derivative,
    Resampler {
        sample_frequency_seconds: f64,
    },
}

impl Filter {
    pub fn apply(&self, series: &TimeSeries) -> Result<TimeSeries, FilterError> {
        match *self {
            Filter::Average { kernel_size } => average::average(series, kernel_size),
            Filter::Gaussian { sigma, kernel_size } => {
                gaussian::gaussian(series, sigma, kernel_size)
            }
            Filter::LeftGaussian { sigma, kernel_size } => {
                gaussian::left_gaussian(series, sigma, kernel_size)
            }
            Filter::Derivative => derivative::derivative(series),
            Filter::Resampler {
                sample_frequency_seconds,
            } => resampler::resample(series, sample_frequency_seconds),
        }
    }

    /// Check the parameters without touching any data.
    pub fn validate(&self) -> Result<(), FilterError> {
        match *self {
            Filter::Average { kernel_size } => {
                if kernel_size == 0 {
                    return Err(FilterError::InvalidKernelSize);
                }
                Ok(())
            }
            Filter::Gaussian { sigma, kernel_size } | Filter::LeftGaussian { sigma, kernel_size } => {
                gaussian::validate_parameters(sigma, kernel_size)
            }
            Filter::Derivative => Ok(()),
            Filter::Resampler {
                sample_frequency_seconds,
            } => {
                if !(sample_frequency_seconds.is_finite() && sample_frequency_seconds > 0.0) {
                    return Err(FilterError::InvalidFrequency {
                        frequency: sample_frequency_seconds,
                    });
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Average { kernel_size } => write!(f, "AVERAGE({})", kernel_size),
            Filter::Gaussian { sigma, kernel_size } => {
                write!(f, "GAUSSIAN({},{})", sigma, kernel_size)
            }
            Filter::LeftGaussian { sigma, kernel_size } => {
                write!(f, "LEFT_GAUSSIAN({},{})", sigma, kernel_size)
            }
            Filter::Derivative => write!(f, "DERIVATIVE"),
            Filter::Resampler {
                sample_frequency_seconds,
            } => write!(f, "RESAMPLER({})", sample_frequency_seconds),
        }
    }
}

/// Fold `filters` left to right over `series`, stopping at the first error.
pub fn apply_filters(filters: &[Filter], series: &TimeSeries) -> Result<TimeSeries, FilterError> {
    filters
        .iter()
        .try_fold(series.clone(), |current, filter| filter.apply(&current))
}
