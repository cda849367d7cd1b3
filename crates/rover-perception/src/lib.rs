//! `rover-perception` – camera-to-map geometry for the exploration rover.
//!
//! Turns one camera frame plus the rover's pose into navigation statistics
//! and world-map evidence.
//!
//! # Modules
//!
//! - [`warp`] – [`Warp`][warp::Warp]: the perspective-resampling seam, with
//!   a default [`HomographyWarp`][warp::HomographyWarp] implementation.
//! - [`rectify`] – [`PerspectiveRectifier`][rectify::PerspectiveRectifier]:
//!   owns the fixed camera-to-ground quadrilaterals and produces the
//!   top-down view.
//! - [`classify`] – [`ColorClassifier`][classify::ColorClassifier]: fixed
//!   RGB thresholds that split a rectified frame into navigable, obstacle,
//!   and rock masks.
//! - [`projection`] – rover-centred Cartesian and polar coordinates of mask
//!   pixels ([`rover_coords`][projection::rover_coords],
//!   [`to_polar`][projection::to_polar]).
//! - [`world_map`] – [`WorldMapFuser`][world_map::WorldMapFuser] and the
//!   persistent three-channel [`WorldMap`][world_map::WorldMap].
//! - [`pipeline`] – [`PerceptionPipeline`][pipeline::PerceptionPipeline]:
//!   runs all of the above once per tick.

pub mod classify;
pub mod pipeline;
pub mod projection;
pub mod rectify;
pub mod warp;
pub mod world_map;

pub use classify::{BinaryMask, ClassifiedMask, ColorClassifier, ColorThresholds, RockBound};
pub use pipeline::{Perception, PerceptionConfig, PerceptionPipeline};
pub use projection::{NavigationSample, RoverPoints, rover_coords, to_polar};
pub use rectify::{PerspectiveRectifier, RectifierConfig};
pub use warp::{Homography, HomographyWarp, Quad, Warp};
pub use world_map::{Cell, Channel, Evidence, WorldMap, WorldMapFuser, attitude_ok};
