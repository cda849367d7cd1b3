//! World-frame map fusion.
//!
//! Rover-frame points are rotated by the rover's yaw, scaled from rectified
//! pixels to world units, translated by the rover's position, and clipped
//! onto a fixed square grid.  Each tick's result is an [`Evidence`] value
//! that is folded into the persistent [`WorldMap`] with [`WorldMap::merge`].
//!
//! Navigable terrain is only trusted while the rover sits level: the
//! rectification assumes a flat ground plane, so under pitch or roll the
//! projected cells are wrong.  Rocks and obstacles are written regardless.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::projection::RoverPoints;
//! use rover_perception::world_map::{Channel, WorldMap, WorldMapFuser};
//! use rover_types::RoverPose;
//!
//! let fuser = WorldMapFuser::new(200, 10.0).unwrap();
//! let pose = RoverPose { x: 100.0, y: 50.0, ..RoverPose::default() };
//!
//! let ahead = RoverPoints { x: vec![20.0], y: vec![0.0] };
//! let evidence = fuser.fuse(&ahead, &RoverPoints::default(), &RoverPoints::default(), &pose);
//!
//! let map = WorldMap::new(200).merge(&evidence);
//! assert_eq!(map.count(Channel::Navigable), 1);
//! assert!(map.is_set(Channel::Navigable, evidence.navigable[0]));
//! assert_eq!((evidence.navigable[0].x, evidence.navigable[0].y), (102, 50));
//! ```

use rover_types::{Frame, RoverError, RoverPose};
use tracing::debug;

use crate::projection::RoverPoints;

/// Pitch must be within this many degrees of level for navigable writes.
pub const PITCH_TOLERANCE_DEG: f32 = 0.08;
/// Roll must be within this many degrees of level for navigable writes.
pub const ROLL_TOLERANCE_DEG: f32 = 0.7;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// True when the rover is level enough for its ground-plane projection to
/// be trusted.  Angles are in `[0, 360)`, so "near zero" also accepts values
/// just below 360.
pub fn attitude_ok(pose: &RoverPose) -> bool {
    near_level(pose.pitch, PITCH_TOLERANCE_DEG) && near_level(pose.roll, ROLL_TOLERANCE_DEG)
}

fn near_level(angle_deg: f32, tolerance: f32) -> bool {
    angle_deg <= tolerance || angle_deg >= 360.0 - tolerance
}

/// Rotate a point counter-clockwise by `yaw_deg`.
pub fn rotate(x: f64, y: f64, yaw_deg: f64) -> (f64, f64) {
    rotate_by(x, y, yaw_deg.to_radians().sin_cos())
}

fn rotate_by(x: f64, y: f64, (sin, cos): (f64, f64)) -> (f64, f64) {
    (x * cos - y * sin, x * sin + y * cos)
}

/// Scale rotated rover-frame pixels to world units and shift by the rover
/// position.
pub fn translate(x_rot: f64, y_rot: f64, x_pos: f64, y_pos: f64, scale: f64) -> (f64, f64) {
    (x_rot / scale + x_pos, y_rot / scale + y_pos)
}

/// Inverse of [`translate`] followed by [`rotate`]: world coordinates back to
/// the rover frame of `pose`.
pub fn world_to_rover(x_world: f64, y_world: f64, pose: &RoverPose, scale: f64) -> (f64, f64) {
    let x_rot = (x_world - f64::from(pose.x)) * scale;
    let y_rot = (y_world - f64::from(pose.y)) * scale;
    rotate(x_rot, y_rot, -f64::from(pose.yaw))
}

// ────────────────────────────────────────────────────────────────────────────
// Cells and evidence
// ────────────────────────────────────────────────────────────────────────────

/// Integer grid coordinates; the map is indexed `[y][x]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

/// The three map channels, in display order (red, green, blue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Obstacle,
    Rock,
    Navigable,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::Obstacle => 0,
            Channel::Rock => 1,
            Channel::Navigable => 2,
        }
    }
}

/// One tick's worth of map observations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub navigable: Vec<Cell>,
    pub obstacle: Vec<Cell>,
    pub rock: Vec<Cell>,
    /// Result of the attitude gate for this tick; when `false` the
    /// navigable cells are recorded but not merged.
    pub attitude_ok: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// WorldMapFuser
// ────────────────────────────────────────────────────────────────────────────

/// Projects rover-frame points onto the world grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMapFuser {
    world_size: usize,
    scale: f32,
}

impl WorldMapFuser {
    /// `scale` is rectified pixels per world unit.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::Config`] for an empty grid or non-positive scale.
    pub fn new(world_size: usize, scale: f32) -> Result<Self, RoverError> {
        if world_size == 0 {
            return Err(RoverError::Config("world_size must be at least 1".to_string()));
        }
        if scale.is_nan() || scale <= 0.0 {
            return Err(RoverError::Config(format!(
                "world scale must be positive, got {scale}"
            )));
        }
        Ok(Self { world_size, scale })
    }

    pub fn world_size(&self) -> usize {
        self.world_size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Grid cell of a single rover-frame point.  Out-of-range coordinates
    /// are clipped onto the map edge rather than dropped.
    pub fn to_world(&self, x: f32, y: f32, pose: &RoverPose) -> Cell {
        self.place(x, y, pose, f64::from(pose.yaw).to_radians().sin_cos())
    }

    /// Grid cells of every point, in input order.
    pub fn project(&self, points: &RoverPoints, pose: &RoverPose) -> Vec<Cell> {
        let sin_cos = f64::from(pose.yaw).to_radians().sin_cos();
        points
            .iter()
            .map(|(x, y)| self.place(x, y, pose, sin_cos))
            .collect()
    }

    fn place(&self, x: f32, y: f32, pose: &RoverPose, sin_cos: (f64, f64)) -> Cell {
        let (x_rot, y_rot) = rotate_by(f64::from(x), f64::from(y), sin_cos);
        let (x_world, y_world) = translate(
            x_rot,
            y_rot,
            f64::from(pose.x),
            f64::from(pose.y),
            f64::from(self.scale),
        );
        Cell {
            x: self.clip(x_world),
            y: self.clip(y_world),
        }
    }

    /// Project all three classes and evaluate the attitude gate.
    pub fn fuse(
        &self,
        navigable: &RoverPoints,
        obstacle: &RoverPoints,
        rock: &RoverPoints,
        pose: &RoverPose,
    ) -> Evidence {
        let gate = attitude_ok(pose);
        if !gate {
            debug!(
                pitch = pose.pitch,
                roll = pose.roll,
                "attitude gate closed; navigable evidence will not be merged"
            );
        }
        Evidence {
            navigable: self.project(navigable, pose),
            obstacle: self.project(obstacle, pose),
            rock: self.project(rock, pose),
            attitude_ok: gate,
        }
    }

    fn clip(&self, v: f64) -> usize {
        let max = (self.world_size - 1) as f64;
        v.trunc().clamp(0.0, max) as usize
    }
}

// ────────────────────────────────────────────────────────────────────────────
// WorldMap
// ────────────────────────────────────────────────────────────────────────────

/// A square grid with independent obstacle, rock, and navigable channels.
///
/// Cells only ever move from 0 to 1, except that a navigable observation
/// clears the obstacle channel of the same cell.  No exclusivity between
/// channels is enforced: a later obstacle observation can re-flag a cell
/// that was seen as navigable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMap {
    size: usize,
    channels: [Vec<u8>; 3],
}

impl WorldMap {
    /// An empty `size × size` map.
    pub fn new(size: usize) -> Self {
        let cells = size * size;
        Self {
            size,
            channels: [vec![0; cells], vec![0; cells], vec![0; cells]],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, channel: Channel, cell: Cell) -> u8 {
        self.channels[channel.index()][cell.y * self.size + cell.x]
    }

    pub fn is_set(&self, channel: Channel, cell: Cell) -> bool {
        self.get(channel, cell) != 0
    }

    /// Raw row-major values of one channel.
    pub fn channel(&self, channel: Channel) -> &[u8] {
        &self.channels[channel.index()]
    }

    /// Number of set cells in one channel.
    pub fn count(&self, channel: Channel) -> usize {
        self.channel(channel).iter().filter(|v| **v != 0).count()
    }

    /// Fold one tick's evidence into the map.
    ///
    /// Order: navigable (and obstacle clear) when the gate passed, then
    /// obstacle, then rock.
    pub fn merge(mut self, evidence: &Evidence) -> Self {
        if evidence.attitude_ok {
            for cell in &evidence.navigable {
                self.write(Channel::Navigable, *cell, 1);
                self.write(Channel::Obstacle, *cell, 0);
            }
        }
        for cell in &evidence.obstacle {
            self.write(Channel::Obstacle, *cell, 1);
        }
        for cell in &evidence.rock {
            self.write(Channel::Rock, *cell, 1);
        }
        self
    }

    /// Render the map for display: obstacle red, rock green, navigable blue.
    pub fn to_image(&self) -> Frame {
        let mut frame = Frame::blank(self.size as u32, self.size as u32);
        for y in 0..self.size {
            for x in 0..self.size {
                let cell = Cell { x, y };
                let px = |c: Channel| u8::from(self.is_set(c, cell)) * 255;
                frame.set_pixel(
                    x as u32,
                    y as u32,
                    [px(Channel::Obstacle), px(Channel::Rock), px(Channel::Navigable)],
                );
            }
        }
        frame
    }

    fn write(&mut self, channel: Channel, cell: Cell, value: u8) {
        let i = cell.y * self.size + cell.x;
        if let Some(slot) = self.channels[channel.index()].get_mut(i) {
            *slot = value;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
