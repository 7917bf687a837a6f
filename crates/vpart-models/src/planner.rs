//! Segment planning.
//!
//! Splits a total duration into fixed-length segments. How many segments an
//! exact multiple produces is a policy decision, see [`SegmentCountPolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::segment::SegmentDescriptor;

/// Relative tolerance for treating a duration ratio as an exact multiple.
const EXACT_MULTIPLE_EPSILON: f64 = 1e-9;

/// Errors produced while planning segments.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Segment length must be a positive, finite number of seconds (got {0})")]
    InvalidSegmentLength(f64),

    #[error("Total duration must be a non-negative, finite number of seconds (got {0})")]
    InvalidDuration(f64),

    #[error("Segment count {0} exceeds the supported maximum")]
    TooManySegments(f64),

    #[error("Unknown segment count policy: {0}")]
    UnknownPolicy(String),
}

/// How to count segments when the duration is an exact multiple of the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentCountPolicy {
    /// `ceil(total / length)`: no trailing empty segment.
    #[default]
    Ceil,
    /// `floor(total / length) + 1`: always one extra segment on exact multiples.
    FloorPlusOne,
}

impl SegmentCountPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentCountPolicy::Ceil => "ceil",
            SegmentCountPolicy::FloorPlusOne => "floor_plus_one",
        }
    }
}

impl fmt::Display for SegmentCountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentCountPolicy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ceil" => Ok(SegmentCountPolicy::Ceil),
            "floor_plus_one" | "floor+1" => Ok(SegmentCountPolicy::FloorPlusOne),
            other => Err(PlanError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Number of segments for a duration under the given policy.
pub fn segment_count(
    total_duration: f64,
    segment_length: f64,
    policy: SegmentCountPolicy,
) -> Result<u32, PlanError> {
    if !segment_length.is_finite() || segment_length <= 0.0 {
        return Err(PlanError::InvalidSegmentLength(segment_length));
    }
    if !total_duration.is_finite() || total_duration < 0.0 {
        return Err(PlanError::InvalidDuration(total_duration));
    }

    let ratio = total_duration / segment_length;
    let nearest = ratio.round();
    // A ratio that rounds to zero is never an exact multiple
    let is_exact = nearest >= 1.0 && (ratio - nearest).abs() <= EXACT_MULTIPLE_EPSILON * nearest;

    let mut count = match policy {
        SegmentCountPolicy::Ceil if is_exact => nearest,
        SegmentCountPolicy::Ceil => ratio.ceil(),
        SegmentCountPolicy::FloorPlusOne if is_exact => nearest + 1.0,
        SegmentCountPolicy::FloorPlusOne => ratio.floor() + 1.0,
    };
    if total_duration > 0.0 {
        count = count.max(1.0);
    }

    if count > f64::from(u32::MAX) {
        return Err(PlanError::TooManySegments(count));
    }
    Ok(count as u32)
}

/// Plan the ordered segment sequence for a source.
///
/// Segment `i` starts at `i * segment_length` and is labeled `prefix + (i + 1)`.
pub fn plan_segments(
    total_duration: f64,
    segment_length: f64,
    policy: SegmentCountPolicy,
    label_prefix: &str,
) -> Result<Vec<SegmentDescriptor>, PlanError> {
    let count = segment_count(total_duration, segment_length, policy)?;
    Ok((0..count)
        .map(|index| SegmentDescriptor::new(index, segment_length, label_prefix))
        .collect())
}
