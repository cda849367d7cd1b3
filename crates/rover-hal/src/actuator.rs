//! Generic `Actuator` trait for the rover's drive and sample-pickup channel.
//!
//! One tick produces one [`Command`]: a matched throttle / brake / steer
//! triple plus the pickup request.  Drivers apply it as a unit.

use rover_types::{Command, RoverError};

/// The vehicle command channel.
pub trait Actuator: Send + Sync {
    /// Stable identifier for this actuator, e.g. `"drive"`.
    fn id(&self) -> &str;

    /// Apply a full tick's command.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareFault`] if the command cannot be
    /// delivered.
    fn dispatch(&mut self, command: &Command) -> Result<(), RoverError>;

    /// The most recently applied command, if any.
    fn last_command(&self) -> Option<Command>;
}
