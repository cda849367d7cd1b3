//! Generic `Camera` trait for the rover's forward-facing camera.

use rover_types::{Frame, RoverError};

/// A source of raw RGB frames.
pub trait Camera: Send + Sync {
    /// Stable identifier for this camera, e.g. `"front_rgb"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareFault`] if no frame can be delivered
    /// (e.g. the telemetry link dropped).
    fn capture(&mut self) -> Result<Frame, RoverError>;
}
