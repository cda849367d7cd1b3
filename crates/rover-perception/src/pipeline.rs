//! Per-tick perception pipeline.
//!
//! ```text
//! raw frame ─▶ rectify ─▶ classify ─┬─▶ rover coords ─▶ polar   (navigation stats)
//!                                   └─▶ rover coords ─▶ fuse    (map evidence)
//! ```
//!
//! The pipeline is a pure transform: it never touches the persistent map.
//! The caller merges the returned [`Evidence`] itself.

use rover_types::{Frame, RoverError, RoverPose};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{ColorClassifier, ColorThresholds};
use crate::projection::{NavigationSample, rover_coords, to_polar};
use crate::rectify::{PerspectiveRectifier, RectifierConfig};
use crate::warp::{HomographyWarp, Warp};
use crate::world_map::{Evidence, WorldMapFuser};

/// Everything the perception stage needs, fixed at mission start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Side length of the square world grid, in cells.
    pub world_size: usize,
    pub rectifier: RectifierConfig,
    pub thresholds: ColorThresholds,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            world_size: 200,
            rectifier: RectifierConfig::default(),
            thresholds: ColorThresholds::default(),
        }
    }
}

/// Output of one perception pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Perception {
    pub navigable: NavigationSample,
    pub rock: NavigationSample,
    pub evidence: Evidence,
    /// Obstacle / rock / navigable masks as a red / green / blue image.
    /// Observational only.
    pub vision_image: Frame,
}

/// Rectifier, classifier, and fuser wired together.
pub struct PerceptionPipeline {
    rectifier: PerspectiveRectifier,
    classifier: ColorClassifier,
    fuser: WorldMapFuser,
}

impl PerceptionPipeline {
    /// Build the pipeline with the default [`HomographyWarp`].
    ///
    /// # Errors
    ///
    /// See [`PerceptionPipeline::with_warp`].
    pub fn new(config: &PerceptionConfig) -> Result<Self, RoverError> {
        Self::with_warp(config, Box::new(HomographyWarp))
    }

    /// Build the pipeline with a caller-supplied warp primitive.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::DegenerateQuad`] or [`RoverError::Config`] when
    /// the rectification geometry or grid parameters are invalid.
    pub fn with_warp(config: &PerceptionConfig, warp: Box<dyn Warp>) -> Result<Self, RoverError> {
        let rectifier = PerspectiveRectifier::with_warp(config.rectifier.clone(), warp)?;
        let fuser = WorldMapFuser::new(config.world_size, config.rectifier.world_scale())?;
        Ok(Self {
            rectifier,
            classifier: ColorClassifier::new(config.thresholds),
            fuser,
        })
    }

    pub fn world_size(&self) -> usize {
        self.fuser.world_size()
    }

    /// Run one frame through the pipeline.
    pub fn process(&self, frame: &Frame, pose: &RoverPose) -> Perception {
        let warped = self.rectifier.rectify(frame);
        let masks = self.classifier.classify(&warped);

        let nav_points = rover_coords(&masks.navigable);
        let obstacle_points = rover_coords(&masks.obstacle);
        let rock_points = rover_coords(&masks.rock);

        let evidence = self
            .fuser
            .fuse(&nav_points, &obstacle_points, &rock_points, pose);

        debug!(
            navigable = nav_points.len(),
            obstacle = obstacle_points.len(),
            rock = rock_points.len(),
            attitude_ok = evidence.attitude_ok,
            "perception pass"
        );

        Perception {
            navigable: to_polar(&nav_points),
            rock: to_polar(&rock_points),
            evidence,
            vision_image: masks.vision_image(),
        }
    }
}
