//! `rover-hal` – hardware seams for the rover's external collaborators.
//!
//! The control core never talks to the simulator directly.  Frames come in
//! through a [`Camera`][camera::Camera] and commands leave through an
//! [`Actuator`][actuator::Actuator], so drivers can be swapped without
//! touching perception or navigation logic.
//!
//! # Modules
//!
//! - [`camera`] – [`Camera`][camera::Camera]: frame source.
//! - [`actuator`] – [`Actuator`][actuator::Actuator]: throttle / brake /
//!   steer / pickup command sink.
//! - [`sim`] – in-process stand-ins ([`SimCamera`][sim::SimCamera],
//!   [`SimActuator`][sim::SimActuator], [`SimRover`][sim::SimRover]) for
//!   headless runs and tests.

pub mod actuator;
pub mod camera;
pub mod sim;

pub use actuator::Actuator;
pub use camera::Camera;
pub use sim::{SimActuator, SimCamera, SimRover, SimScene};
