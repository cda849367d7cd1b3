//! `rover-runtime` – the rover's control loop.
//!
//! # Modules
//!
//! - [`navigation`] – [`NavigationStateMachine`]: the pure
//!   forward / stop / pickup decision step, with stuck recovery.
//! - [`mission`] – [`Mission`]: owns the [`RoverState`] and world map and
//!   runs one perception-plus-decision tick at a time, optionally reading a
//!   [`Camera`][rover_hal::Camera] and driving an
//!   [`Actuator`][rover_hal::Actuator].
//! - [`config`] – [`MissionConfig`]: perception geometry and navigation
//!   thresholds, validated at mission start.
//! - [`telemetry`] – [`init_tracing`]: global `tracing` subscriber with
//!   optional OTLP span export.

pub mod config;
pub mod mission;
pub mod navigation;
pub mod telemetry;

pub use config::MissionConfig;
pub use mission::{Mission, TickReport};
pub use navigation::{NavigationConfig, NavigationStateMachine, RoverState, TickInputs};
pub use telemetry::{TracerProviderGuard, init_tracing};
