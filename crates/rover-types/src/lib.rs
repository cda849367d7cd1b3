use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw RGB24 image, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Interleaved `R, G, B` bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl Frame {
    /// An all-black frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// Wrap an existing RGB24 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::FrameSize`] when `data` does not hold exactly
    /// `width * height` RGB triples.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RoverError> {
        let frame = Self {
            width,
            height,
            data,
        };
        frame.check()?;
        Ok(frame)
    }

    /// Confirm the buffer length matches the declared shape.
    ///
    /// Frames built field by field or deserialized from a log skip
    /// [`Frame::from_rgb`]; consumers call this before indexing pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::FrameSize`] on a mismatch.
    pub fn check(&self) -> Result<(), RoverError> {
        let expected = self.pixel_count() * 3;
        if self.data.len() != expected {
            return Err(RoverError::FrameSize {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The RGB triple at column `x`, row `y`.
    ///
    /// Panics if the coordinate lies outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite the RGB triple at column `x`, row `y`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Iterate over every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * 3
    }
}

/// Rover position in world units and attitude in degrees, each in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoverPose {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Per-tick vehicle telemetry read from the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub pose: RoverPose,
    /// Forward speed (world units per second).
    pub velocity: f32,
    /// `true` when a rock sample is within pickup range.
    pub near_sample: bool,
    /// `true` while the pickup arm is running.
    pub picking_up: bool,
}

/// Discrete behavior mode of the navigation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Forward,
    Stop,
    Pickup,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Forward => write!(f, "forward"),
            Mode::Stop => write!(f, "stop"),
            Mode::Pickup => write!(f, "pickup"),
        }
    }
}

/// The matched throttle / brake / steer triple sent to the vehicle.
///
/// `steer` is in degrees, positive to the left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
}

/// Everything the actuator channel receives after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    pub drive: DriveCommand,
    /// Request the pickup arm to collect the nearby sample.
    pub send_pickup: bool,
}

/// Error type shared by configuration, perception setup, and hardware seams.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum RoverError {
    #[error("Degenerate rectification quadrilateral: no homography maps source onto destination")]
    DegenerateQuad,

    #[error("Frame buffer holds {got} bytes, expected {expected}")]
    FrameSize { expected: usize, got: usize },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
