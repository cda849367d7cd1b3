//! Fixed-threshold colour classification.
//!
//! Bright ground is navigable, everything else is an obstacle, and yellow
//! pixels (high red and green, low blue) are rock samples.  The rock mask is
//! independent of the other two and may overlap either of them.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::classify::{ColorClassifier, ColorThresholds};
//! use rover_types::Frame;
//!
//! let mut frame = Frame::blank(2, 1);
//! frame.set_pixel(0, 0, [200, 200, 200]); // sand
//! frame.set_pixel(1, 0, [180, 150, 20]);  // rock sample
//!
//! let masks = ColorClassifier::new(ColorThresholds::default()).classify(&frame);
//! assert!(masks.navigable.get(0, 0));
//! assert!(masks.obstacle.get(1, 0));
//! assert!(masks.rock.get(1, 0));
//! ```

use rover_types::Frame;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// BinaryMask
// ────────────────────────────────────────────────────────────────────────────

/// A single-channel boolean image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// An all-clear mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at column `x`, row `y` is set.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.bits[y as usize * self.width as usize + x as usize] = value;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// `(column, row)` of every set pixel, in row-major order.
    pub fn set_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }

    /// Pixel-wise logical negation.
    pub fn complement(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            bits: self.bits.iter().map(|b| !b).collect(),
        }
    }

    fn from_pixels(frame: &Frame, pred: impl Fn([u8; 3]) -> bool) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            bits: frame.pixels().map(pred).collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Colour bound for rock samples: `R > min_red`, `G > min_green`,
/// `B < max_blue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RockBound {
    pub min_red: u8,
    pub min_green: u8,
    pub max_blue: u8,
}

/// The classifier's fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    /// A pixel is navigable when every channel is strictly above this triple.
    pub navigable: [u8; 3],
    pub rock: RockBound,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            navigable: [160, 160, 160],
            rock: RockBound {
                min_red: 120,
                min_green: 120,
                max_blue: 80,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ColorClassifier
// ────────────────────────────────────────────────────────────────────────────

/// The three masks derived from one rectified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMask {
    pub navigable: BinaryMask,
    /// Always the complement of `navigable`.
    pub obstacle: BinaryMask,
    pub rock: BinaryMask,
}

impl ClassifiedMask {
    /// Diagnostic image for the HUD: obstacle in red, rock in green,
    /// navigable in blue, each scaled to 0 / 255.
    pub fn vision_image(&self) -> Frame {
        let mut data = Vec::with_capacity(self.navigable.bits.len() * 3);
        for ((obstacle, rock), navigable) in self
            .obstacle
            .bits
            .iter()
            .zip(&self.rock.bits)
            .zip(&self.navigable.bits)
        {
            data.push(if *obstacle { 255 } else { 0 });
            data.push(if *rock { 255 } else { 0 });
            data.push(if *navigable { 255 } else { 0 });
        }
        Frame {
            width: self.navigable.width,
            height: self.navigable.height,
            data,
        }
    }
}

/// Splits a rectified frame into navigable, obstacle, and rock masks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorClassifier {
    thresholds: ColorThresholds,
}

impl ColorClassifier {
    pub fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify every pixel of `frame`.
    pub fn classify(&self, frame: &Frame) -> ClassifiedMask {
        let [nr, ng, nb] = self.thresholds.navigable;
        let rock = self.thresholds.rock;

        let navigable = BinaryMask::from_pixels(frame, |[r, g, b]| r > nr && g > ng && b > nb);
        let rock = BinaryMask::from_pixels(frame, |[r, g, b]| {
            r > rock.min_red && g > rock.min_green && b < rock.max_blue
        });
        let obstacle = navigable.complement();

        ClassifiedMask {
            navigable,
            obstacle,
            rock,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
