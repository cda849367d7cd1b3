//! Perspective warp primitive.
//!
//! The rectifier only owns geometry; the actual resampling goes through the
//! [`Warp`] trait so a faster (or GPU) implementation can be plugged in.
//! [`HomographyWarp`] is the built-in implementation: it solves the 3×3
//! perspective transform from four point correspondences and resamples by
//! inverse mapping with nearest-neighbour lookup.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::warp::Homography;
//!
//! let square = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
//! let shifted = [[5.0, 0.0], [15.0, 0.0], [15.0, 10.0], [5.0, 10.0]];
//!
//! let h = Homography::from_quads(&square, &shifted).unwrap();
//! let (x, y) = h.apply(2.0, 3.0).unwrap();
//! assert!((x - 7.0).abs() < 1e-9);
//! assert!((y - 3.0).abs() < 1e-9);
//! ```

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use rover_types::Frame;
use tracing::warn;

/// Four `[x, y]` pixel coordinates (column, row).
pub type Quad = [[f32; 2]; 4];

// ────────────────────────────────────────────────────────────────────────────
// Homography
// ────────────────────────────────────────────────────────────────────────────

/// A planar perspective transform, normalised so that `h[2][2] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Solve the transform that maps every corner of `src` onto the matching
    /// corner of `dst`.
    ///
    /// Returns `None` when the correspondences are degenerate (e.g. three
    /// collinear corners).
    pub fn from_quads(src: &Quad, dst: &Quad) -> Option<Self> {
        if has_collinear_corners(src) || has_collinear_corners(dst) {
            return None;
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y) = (f64::from(s[0]), f64::from(s[1]));
            let (u, v) = (f64::from(d[0]), f64::from(d[1]));
            let r = 2 * i;

            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -x * u;
            a[(r, 7)] = -y * u;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -x * v;
            a[(r + 1, 7)] = -y * v;
            b[r + 1] = v;
        }

        let h = a.lu().solve(&b)?;
        let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        m.iter().all(|v| v.is_finite()).then_some(Self(m))
    }

    /// Map a point through the transform.
    ///
    /// Returns `None` for points on the line at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.0 * Vector3::new(x, y, 1.0);
        if p.z.abs() < f64::EPSILON {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }
}

/// True when any three of the four corners lie on one line.
fn has_collinear_corners(q: &Quad) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let (ax, ay) = (f64::from(q[a][0]), f64::from(q[a][1]));
        let (bx, by) = (f64::from(q[b][0]), f64::from(q[b][1]));
        let (cx, cy) = (f64::from(q[c][0]), f64::from(q[c][1]));
        ((bx - ax) * (cy - ay) - (by - ay) * (cx - ax)).abs() < 1e-9
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Warp trait
// ────────────────────────────────────────────────────────────────────────────

/// An image-resampling routine that maps the region framed by `src` onto
/// `dst`, keeping the input resolution.
pub trait Warp: Send + Sync {
    fn warp(&self, image: &Frame, src: &Quad, dst: &Quad) -> Frame;
}

/// Nearest-neighbour perspective warp with a black constant border.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomographyWarp;

impl Warp for HomographyWarp {
    fn warp(&self, image: &Frame, src: &Quad, dst: &Quad) -> Frame {
        let mut out = Frame::blank(image.width, image.height);

        // Solve dst → src directly so every output pixel pulls from the input.
        let Some(inverse) = Homography::from_quads(dst, src) else {
            warn!("degenerate warp quadrilaterals; returning blank frame");
            return out;
        };

        let (w, h) = (f64::from(image.width), f64::from(image.height));
        for row in 0..image.height {
            for col in 0..image.width {
                let Some((sx, sy)) = inverse.apply(f64::from(col), f64::from(row)) else {
                    continue;
                };
                let (sx, sy) = (sx.round(), sy.round());
                if sx < 0.0 || sy < 0.0 || sx >= w || sy >= h {
                    continue;
                }
                out.set_pixel(col, row, image.pixel(sx as u32, sy as u32));
            }
        }
        out
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
