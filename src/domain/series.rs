//! Ordered (x, y) sample container.
//!
//! `x` is a timestamp in seconds and `y` a price. Samples are kept sorted
//! ascending by `x` by [`TimeSeries::insert`]; [`TimeSeries::add`] appends
//! without checking and relies on the caller for ordering.
//!
//! The JSON form is `{"Points": [{"X": .., "Y": ..}, ..], "Granularity": ..}`.

use serde::{Deserialize, Serialize};

use crate::domain::error::SeriesError;

/// Default tolerance for [`TimeSeries::is_evenly_spaced`], in percent.
pub const DEFAULT_SPACING_TOLERANCE_PCT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Sample { x, y }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(rename = "Points")]
    points: Vec<Sample>,
    /// Expected seconds between samples. Advisory only.
    #[serde(rename = "Granularity", default)]
    pub granularity: f64,
}

impl TimeSeries {
    pub fn new(granularity: f64) -> Self {
        TimeSeries {
            points: Vec::new(),
            granularity,
        }
    }

    /// Wrap samples that are already sorted by `x`.
    pub fn from_sorted(points: Vec<Sample>, granularity: f64) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].x <= w[1].x));
        TimeSeries {
            points,
            granularity,
        }
    }

    /// Build a series from samples in any order, inserting one by one.
    pub fn from_unsorted(points: impl IntoIterator<Item = Sample>, granularity: f64) -> Self {
        let mut series = TimeSeries::new(granularity);
        for sample in points {
            series.insert(sample);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Sample] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&Sample> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.points.iter()
    }

    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|w| w[0].x <= w[1].x)
    }

    /// Insert keeping ascending `x`. A sample whose `x` equals existing ones
    /// goes before them.
    pub fn insert(&mut self, sample: Sample) {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first.x, last.x),
            _ => {
                self.points.push(sample);
                return;
            }
        };

        if sample.x < first {
            self.points.insert(0, sample);
        } else if sample.x > last {
            self.points.push(sample);
        } else {
            let index = self.binary_search_for_x(sample.x);
            self.points.insert(index, sample);
        }
    }

    /// Index of the first sample whose `x` is not less than `x`, or `len()`
    /// if there is none. An exact match returns the matching index.
    pub fn binary_search_for_x(&self, x: f64) -> usize {
        self.points.partition_point(|p| p.x < x)
    }

    /// Interpolated `y` at `x`.
    ///
    /// Between two samples the result is weighted by inverse distance to
    /// each neighbour. A query landing on a sample returns its `y` exactly.
    pub fn value_at(&self, x: f64) -> Result<f64, SeriesError> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(SeriesError::Empty),
        };
        if !x.is_finite() {
            return Err(SeriesError::NonFinite { x });
        }
        if x < first.x {
            return Err(SeriesError::BeforeStart { x, first: first.x });
        }
        if x > last.x {
            return Err(SeriesError::AfterEnd { x, last: last.x });
        }
        if x == first.x {
            return Ok(first.y);
        }

        let index = self.binary_search_for_x(x);
        let right = self.points[index];
        if right.x == x {
            return Ok(right.y);
        }
        let left = self.points[index - 1];

        let inv_left = 1.0 / (x - left.x);
        let inv_right = 1.0 / (right.x - x);
        let total = inv_left + inv_right;
        Ok(left.y * (inv_left / total) + right.y * (inv_right / total))
    }

    /// The sample `x` nearest to `x`. `None` on an empty series.
    pub fn closest_x_to(&self, x: f64) -> Option<f64> {
        match self.points.len() {
            0 => None,
            1 => Some(self.points[0].x),
            len => {
                let index = self.binary_search_for_x(x).min(len - 1);
                let candidate = self.points[index].x;
                if index == 0 {
                    return Some(candidate);
                }
                let left = self.points[index - 1].x;
                if (x - left).abs() < (candidate - x).abs() {
                    Some(left)
                } else {
                    Some(candidate)
                }
            }
        }
    }

    /// Whether consecutive spacings all stay within `tolerance_pct` percent
    /// of the average spacing. Returns the flag and the average spacing.
    pub fn is_evenly_spaced(&self, tolerance_pct: f64) -> Result<(bool, f64), SeriesError> {
        if self.points.len() < 2 {
            return Err(SeriesError::TooFewSamples {
                len: self.points.len(),
                required: 2,
            });
        }

        let mut largest = f64::MIN;
        let mut smallest = f64::MAX;
        let mut total = 0.0;
        for w in self.points.windows(2) {
            let spacing = w[1].x - w[0].x;
            largest = largest.max(spacing);
            smallest = smallest.min(spacing);
            total += spacing;
        }
        let average = total / (self.points.len() - 1) as f64;
        let allowed = average.abs() * tolerance_pct / 100.0;

        let even = (largest - average).abs() <= allowed && (smallest - average).abs() <= allowed;
        Ok((even, average))
    }

    /// Append every sample of `other` without re-sorting.
    ///
    /// The caller guarantees `other` starts at or after the end of `self`,
    /// as chunked history downloads do.
    pub fn add(&mut self, other: &TimeSeries) {
        debug_assert!(
            match (self.points.last(), other.points.first()) {
                (Some(last), Some(first)) => last.x <= first.x,
                _ => true,
            },
            "appended range starts before the end of the series"
        );
        self.points.extend_from_slice(&other.points);
    }

    /// Samples with `start <= x <= end`; open bounds are unbounded.
    pub fn between(&self, start: Option<f64>, end: Option<f64>) -> TimeSeries {
        let from = start.map_or(0, |s| self.binary_search_for_x(s));
        let to = end.map_or(self.points.len(), |e| {
            self.points.partition_point(|p| p.x <= e)
        });
        let points = if from < to {
            self.points[from..to].to_vec()
        } else {
            Vec::new()
        };
        TimeSeries {
            points,
            granularity: self.granularity,
        }
    }

    /// Copy with the same `x` values and new `y` values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> TimeSeries {
        debug_assert_eq!(values.len(), self.points.len());
        let points = self
            .points
            .iter()
            .zip(values)
            .map(|(p, y)| Sample::new(p.x, y))
            .collect();
        TimeSeries {
            points,
            granularity: self.granularity,
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
