//! Mission-wide configuration, fixed at mission start.

use rover_perception::PerceptionConfig;
use rover_types::RoverError;
use serde::{Deserialize, Serialize};

use crate::navigation::NavigationConfig;

/// Perception geometry plus navigation thresholds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub perception: PerceptionConfig,
    pub navigation: NavigationConfig,
}

impl MissionConfig {
    /// Reject configurations the rover cannot run with.
    ///
    /// Quadrilateral degeneracy is checked later, when the rectifier is
    /// built.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), RoverError> {
        let p = &self.perception;
        let n = &self.navigation;
        if p.world_size == 0 {
            return Err(RoverError::Config("world_size must be positive".into()));
        }
        if p.rectifier.dst_size.is_nan() || p.rectifier.dst_size <= 0.0 {
            return Err(RoverError::Config(format!(
                "dst_size must be positive, got {}",
                p.rectifier.dst_size
            )));
        }
        if p.rectifier.image_width == 0 || p.rectifier.image_height == 0 {
            return Err(RoverError::Config("image size must be non-zero".into()));
        }
        if n.throttle_set.is_nan() || n.throttle_set <= 0.0 {
            return Err(RoverError::Config(format!(
                "throttle_set must be positive, got {}",
                n.throttle_set
            )));
        }
        if n.go_forward < n.stop_forward {
            return Err(RoverError::Config(format!(
                "go_forward ({}) must be at least stop_forward ({})",
                n.go_forward, n.stop_forward
            )));
        }
        Ok(())
    }
}
