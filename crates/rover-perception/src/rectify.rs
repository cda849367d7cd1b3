//! Camera-to-ground rectification.
//!
//! The source quadrilateral frames a one-metre grid square as seen by the
//! rover camera; the destination quadrilateral is the same square drawn
//! top-down, centred horizontally and sitting `bottom_offset` pixels above
//! the bottom edge of the image.  Everything else is the warp's business.

use rover_types::{Frame, RoverError};
use serde::{Deserialize, Serialize};

use crate::warp::{Homography, HomographyWarp, Quad, Warp};

/// Fixed geometry of the camera-to-ground rectification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierConfig {
    /// Expected camera image width in pixels.
    pub image_width: u32,
    /// Expected camera image height in pixels.
    pub image_height: u32,
    /// Calibration square corners in the raw camera image.
    pub source: Quad,
    /// Half the side of the rectified calibration square, in pixels.
    pub dst_size: f32,
    /// Gap between the rectified square and the image bottom, in pixels.
    pub bottom_offset: f32,
}

impl Default for RectifierConfig {
    fn default() -> Self {
        Self {
            image_width: 320,
            image_height: 160,
            source: [[15.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_size: 5.0,
            bottom_offset: 6.0,
        }
    }
}

impl RectifierConfig {
    /// Destination quadrilateral for an image of the given size.
    pub fn destination(&self, width: u32, height: u32) -> Quad {
        let cx = width as f32 / 2.0;
        let h = height as f32;
        let d = self.dst_size;
        let b = self.bottom_offset;
        [
            [cx - d, h - b],
            [cx + d, h - b],
            [cx + d, h - 2.0 * d - b],
            [cx - d, h - 2.0 * d - b],
        ]
    }

    /// Rectified pixels per world unit.
    pub fn world_scale(&self) -> f32 {
        2.0 * self.dst_size
    }
}

/// Produces a top-down view of the ground in front of the rover.
pub struct PerspectiveRectifier {
    config: RectifierConfig,
    warp: Box<dyn Warp>,
}

impl PerspectiveRectifier {
    /// Build a rectifier backed by [`HomographyWarp`].
    ///
    /// # Errors
    ///
    /// See [`PerspectiveRectifier::with_warp`].
    pub fn new(config: RectifierConfig) -> Result<Self, RoverError> {
        Self::with_warp(config, Box::new(HomographyWarp))
    }

    /// Build a rectifier that delegates resampling to `warp`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::Config`] for a non-positive `dst_size` and
    /// [`RoverError::DegenerateQuad`] when the configured quadrilaterals admit
    /// no perspective transform.
    pub fn with_warp(config: RectifierConfig, warp: Box<dyn Warp>) -> Result<Self, RoverError> {
        if config.dst_size.is_nan() || config.dst_size <= 0.0 {
            return Err(RoverError::Config(format!(
                "dst_size must be positive, got {}",
                config.dst_size
            )));
        }
        let dst = config.destination(config.image_width, config.image_height);
        Homography::from_quads(&config.source, &dst).ok_or(RoverError::DegenerateQuad)?;
        Ok(Self { config, warp })
    }

    pub fn config(&self) -> &RectifierConfig {
        &self.config
    }

    /// Warp `frame` to the top-down view, keeping its resolution.
    pub fn rectify(&self, frame: &Frame) -> Frame {
        let dst = self.config.destination(frame.width, frame.height);
        self.warp.warp(frame, &self.config.source, &dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records the quadrilaterals it was called with.
    struct RecordingWarp {
        calls: Arc<Mutex<Vec<(Quad, Quad)>>>,
    }

    impl Warp for RecordingWarp {
        fn warp(&self, image: &Frame, src: &Quad, dst: &Quad) -> Frame {
            self.calls.lock().unwrap().push((*src, *dst));
            image.clone()
        }
    }

    #[test]
    fn default_destination_matches_calibration_square() {
        let cfg = RectifierConfig::default();
        let dst = cfg.destination(320, 160);
        assert_eq!(dst[0], [155.0, 154.0]);
        assert_eq!(dst[1], [165.0, 154.0]);
        assert_eq!(dst[2], [165.0, 144.0]);
        assert_eq!(dst[3], [155.0, 144.0]);
        assert!((cfg.world_scale() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn rectifier_passes_fixed_geometry_to_warp() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let rectifier = PerspectiveRectifier::with_warp(
            RectifierConfig::default(),
            Box::new(RecordingWarp {
                calls: calls.clone(),
            }),
        )
        .unwrap();

        let frame = Frame::blank(320, 160);
        let out = rectifier.rectify(&frame);
        assert_eq!(out.width, 320);
        assert_eq!(out.height, 160);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, RectifierConfig::default().source);
        assert_eq!(calls[0].1, RectifierConfig::default().destination(320, 160));
    }

    #[test]
    fn rectified_frame_keeps_resolution() {
        let rectifier = PerspectiveRectifier::new(RectifierConfig::default()).unwrap();
        let out = rectifier.rectify(&Frame::blank(320, 160));
        assert_eq!((out.width, out.height), (320, 160));
    }

    #[test]
    fn ground_lands_in_front_of_the_rover() {
        use crate::classify::{ColorClassifier, ColorThresholds};
        use crate::projection::{rover_coords, to_polar};

        // Sand below row 88, dark rock wall above.
        let mut frame = Frame::blank(320, 160);
        for y in 0..160 {
            for x in 0..320 {
                let rgb = if y >= 88 { [205, 185, 165] } else { [95, 75, 60] };
                frame.set_pixel(x, y, rgb);
            }
        }

        let rectifier = PerspectiveRectifier::new(RectifierConfig::default()).unwrap();
        let warped = rectifier.rectify(&frame);
        let masks = ColorClassifier::new(ColorThresholds::default()).classify(&warped);

        let navigable = masks.navigable.count();
        assert!(navigable > 500, "navigable={navigable}");
        for (col, row) in masks.navigable.set_pixels() {
            assert!(row >= 120, "navigable pixel too far out at ({col}, {row})");
        }

        let heading = to_polar(&rover_coords(&masks.navigable))
            .mean_angle_deg()
            .unwrap();
        assert!(heading.abs() < 5.0, "heading={heading}");
    }

    #[test]
    fn collinear_source_is_rejected() {
        let cfg = RectifierConfig {
            source: [[0.0, 0.0], [10.0, 0.0], [20.0, 0.0], [30.0, 0.0]],
            ..RectifierConfig::default()
        };
        assert!(matches!(
            PerspectiveRectifier::new(cfg),
            Err(RoverError::DegenerateQuad)
        ));
    }

    #[test]
    fn non_positive_dst_size_is_rejected() {
        let cfg = RectifierConfig {
            dst_size: 0.0,
            ..RectifierConfig::default()
        };
        assert!(matches!(
            PerspectiveRectifier::new(cfg),
            Err(RoverError::Config(_))
        ));
    }
}
