//! Rover-centred coordinates of mask pixels.
//!
//! The rover frame has its origin at the rover's ground contact point,
//! which sits at the middle of the bottom edge of the rectified image.
//! `x` points forward (up the image) and `y` points left.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::classify::BinaryMask;
//! use rover_perception::projection::{rover_coords, to_polar};
//!
//! let mut mask = BinaryMask::new(4, 4);
//! mask.set(2, 0, true); // top row, centre column
//!
//! let pts = rover_coords(&mask);
//! assert_eq!((pts.x[0], pts.y[0]), (4.0, 0.0));
//!
//! let polar = to_polar(&pts);
//! assert_eq!(polar.dists[0], 4.0);
//! assert_eq!(polar.angles[0], 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::classify::BinaryMask;

/// Rover-frame Cartesian coordinates of a set of pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoverPoints {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

impl RoverPoints {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Project every set pixel of `mask` into the rover frame.
///
/// An empty mask yields empty coordinate vectors.
pub fn rover_coords(mask: &BinaryMask) -> RoverPoints {
    let h = mask.height() as f32;
    let half_w = mask.width() as f32 / 2.0;
    let (x, y) = mask
        .set_pixels()
        .map(|(col, row)| (h - row as f32, half_w - col as f32))
        .unzip();
    RoverPoints { x, y }
}

/// Rover-frame polar coordinates: distance in rectified pixels, angle in
/// radians (`0` straight ahead, positive to the left).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationSample {
    pub dists: Vec<f32>,
    pub angles: Vec<f32>,
}

impl NavigationSample {
    /// Pixel count of the class this tick.
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Mean heading in degrees, or `None` when there is no data.
    pub fn mean_angle_deg(&self) -> Option<f32> {
        if self.angles.is_empty() {
            return None;
        }
        let sum: f64 = self.angles.iter().map(|a| f64::from(*a)).sum();
        Some((sum / self.angles.len() as f64).to_degrees() as f32)
    }
}

/// Convert rover-frame points to `(distance, angle)` pairs, preserving order.
pub fn to_polar(points: &RoverPoints) -> NavigationSample {
    let (dists, angles) = points
        .iter()
        .map(|(x, y)| (x.hypot(y), y.atan2(x)))
        .unzip();
    NavigationSample { dists, angles }
}
