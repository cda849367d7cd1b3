//! In-process simulation drivers for headless runs and CI.
//!
//! [`SimRover`] is a toy kinematic model of the rover in a square arena with
//! a handful of rock samples.  It integrates the last [`Command`] into speed
//! and pose, reports [`Telemetry`], and picks the [`SimScene`] that
//! [`SimCamera`] should render next.  The frames are synthetic: sand below a
//! horizon, dark rock above, and a yellow blob when a sample is ahead.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::camera::Camera;
//! use rover_hal::sim::{SimCamera, SimRover};
//! use rover_types::{Command, DriveCommand};
//!
//! let mut rover = SimRover::new(200.0, vec![]);
//! let mut camera = SimCamera::new("front_rgb", 320, 160);
//!
//! let go = Command { drive: DriveCommand { throttle: 0.2, brake: 0.0, steer: 0.0 }, send_pickup: false };
//! rover.apply(&go, 0.1);
//! assert!(rover.telemetry().velocity > 0.0);
//!
//! camera.set_scene(rover.scene());
//! let frame = camera.capture().unwrap();
//! assert_eq!((frame.width, frame.height), (320, 160));
//! ```

use rover_types::{Command, Frame, RoverError, RoverPose, Telemetry};
use tracing::{debug, info};

use crate::actuator::Actuator;
use crate::camera::Camera;

const SAND: [u8; 3] = [205, 185, 165];
const ROCK_WALL: [u8; 3] = [95, 75, 60];
const SAMPLE: [u8; 3] = [190, 160, 20];

/// Fraction of the image height above which everything is rock wall.
const HORIZON: f32 = 0.55;

/// Speed gained per second per unit throttle.
const THROTTLE_GAIN: f32 = 5.0;
/// Speed lost per second per unit brake.
const BRAKE_GAIN: f32 = 1.0;
/// Proportional speed loss per second.
const DRAG: f32 = 0.2;
/// Yaw rate in degrees per second per degree of steer.
const TURN_GAIN: f32 = 2.0;
/// Pickup range in world units.
const PICKUP_RANGE: f32 = 2.0;
/// Sample visibility: range in world units and half field of view in degrees.
const SIGHT_RANGE: f32 = 12.0;
const SIGHT_HALF_FOV: f32 = 30.0;
/// Distance from the arena edge at which the camera sees only wall.
const WALL_MARGIN: f32 = 4.0;
/// Ticks the arm stays busy after a pickup request.
const PICKUP_TICKS: u32 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Stub camera
// ────────────────────────────────────────────────────────────────────────────

/// What the simulated camera currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimScene {
    /// Sand below the horizon, rock wall above.
    #[default]
    OpenGround,
    /// Rock wall filling the view.
    Wall,
    /// Open ground with a sample just ahead and left of centre.
    RockAhead,
}

/// A simulated camera rendering synthetic frames for the current scene.
/// Always succeeds.
pub struct SimCamera {
    id: String,
    width: u32,
    height: u32,
    scene: SimScene,
}

impl SimCamera {
    /// Create a new simulated camera with the given identifier and size.
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            scene: SimScene::default(),
        }
    }

    pub fn set_scene(&mut self, scene: SimScene) {
        self.scene = scene;
    }

    fn render(&self) -> Frame {
        let mut frame = Frame::blank(self.width, self.height);
        let horizon = (self.height as f32 * HORIZON) as u32;
        for y in 0..self.height {
            for x in 0..self.width {
                let ground = self.scene != SimScene::Wall && y >= horizon;
                frame.set_pixel(x, y, if ground { SAND } else { ROCK_WALL });
            }
        }
        if self.scene == SimScene::RockAhead {
            let (x0, x1) = (self.width * 2 / 5, self.width / 2);
            let (y0, y1) = (self.height * 13 / 20, self.height * 3 / 4);
            for y in y0..y1 {
                for x in x0..x1 {
                    frame.set_pixel(x, y, SAMPLE);
                }
            }
        }
        frame
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Frame, RoverError> {
        Ok(self.render())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub actuator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated command channel that records everything dispatched to it.
/// Always succeeds.
pub struct SimActuator {
    id: String,
    history: Vec<Command>,
}

impl SimActuator {
    /// Create a new simulated actuator with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: Vec::new(),
        }
    }

    /// Every command dispatched so far, oldest first.
    pub fn history(&self) -> &[Command] {
        &self.history
    }
}

impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn dispatch(&mut self, command: &Command) -> Result<(), RoverError> {
        self.history.push(*command);
        Ok(())
    }

    fn last_command(&self) -> Option<Command> {
        self.history.last().copied()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Kinematic rover
// ────────────────────────────────────────────────────────────────────────────

/// Toy rover dynamics inside a square arena of side `arena_size`.
#[derive(Debug, Clone)]
pub struct SimRover {
    pose: RoverPose,
    velocity: f32,
    arena_size: f32,
    samples: Vec<(f32, f32)>,
    collected: usize,
    pickup_ticks_left: u32,
}

impl SimRover {
    /// A rover at the centre of the arena facing +x, with rock samples at
    /// the given world positions.
    pub fn new(arena_size: f32, samples: Vec<(f32, f32)>) -> Self {
        Self {
            pose: RoverPose {
                x: arena_size / 2.0,
                y: arena_size / 2.0,
                ..RoverPose::default()
            },
            velocity: 0.0,
            arena_size,
            samples,
            collected: 0,
            pickup_ticks_left: 0,
        }
    }

    /// Place the rover at a specific pose.
    pub fn with_pose(mut self, pose: RoverPose) -> Self {
        self.pose = pose;
        self
    }

    /// Number of samples collected so far.
    pub fn collected(&self) -> usize {
        self.collected
    }

    /// Current sensor readout.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            pose: self.pose,
            velocity: self.velocity,
            near_sample: self.nearest_sample().is_some_and(|(_, d)| d < PICKUP_RANGE),
            picking_up: self.pickup_ticks_left > 0,
        }
    }

    /// What the camera would see from the current pose.
    pub fn scene(&self) -> SimScene {
        if self.facing_wall() {
            return SimScene::Wall;
        }
        let sample_ahead = self.samples.iter().any(|&(sx, sy)| {
            let (dx, dy) = (sx - self.pose.x, sy - self.pose.y);
            let bearing = dy.atan2(dx).to_degrees() - self.pose.yaw;
            let bearing = (bearing + 180.0).rem_euclid(360.0) - 180.0;
            dx.hypot(dy) < SIGHT_RANGE && bearing.abs() < SIGHT_HALF_FOV
        });
        if sample_ahead {
            SimScene::RockAhead
        } else {
            SimScene::OpenGround
        }
    }

    /// Integrate one command over `dt` seconds.
    pub fn apply(&mut self, command: &Command, dt: f32) {
        let drive = command.drive;

        let mut v = self.velocity + (drive.throttle * THROTTLE_GAIN - DRAG * self.velocity) * dt;
        v -= drive.brake * BRAKE_GAIN * dt;
        // Driving into the wall stalls the rover.
        if self.facing_wall() && self.at_edge() {
            v = 0.0;
        }
        self.velocity = v.max(0.0);

        self.pose.yaw = (self.pose.yaw + drive.steer * TURN_GAIN * dt).rem_euclid(360.0);
        let yaw = self.pose.yaw.to_radians();
        let max = self.arena_size - 1.0;
        self.pose.x = (self.pose.x + self.velocity * yaw.cos() * dt).clamp(0.0, max);
        self.pose.y = (self.pose.y + self.velocity * yaw.sin() * dt).clamp(0.0, max);

        if self.pickup_ticks_left > 0 {
            self.pickup_ticks_left -= 1;
            if self.pickup_ticks_left == 0 {
                self.finish_pickup();
            }
        } else if command.send_pickup && self.telemetry().near_sample {
            debug!("pickup arm started");
            self.pickup_ticks_left = PICKUP_TICKS;
        }
    }

    fn finish_pickup(&mut self) {
        if let Some((i, d)) = self.nearest_sample()
            && d < PICKUP_RANGE
        {
            let (x, y) = self.samples.remove(i);
            self.collected += 1;
            info!(x, y, collected = self.collected, "sample collected");
        }
    }

    fn nearest_sample(&self) -> Option<(usize, f32)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, &(sx, sy))| (i, (sx - self.pose.x).hypot(sy - self.pose.y)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn at_edge(&self) -> bool {
        let max = self.arena_size - 1.0;
        self.pose.x <= 0.0 || self.pose.y <= 0.0 || self.pose.x >= max || self.pose.y >= max
    }

    fn facing_wall(&self) -> bool {
        let yaw = self.pose.yaw.to_radians();
        let ahead_x = self.pose.x + WALL_MARGIN * yaw.cos();
        let ahead_y = self.pose.y + WALL_MARGIN * yaw.sin();
        let max = self.arena_size - 1.0;
        ahead_x <= 0.0 || ahead_y <= 0.0 || ahead_x >= max || ahead_y >= max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::DriveCommand;

    fn drive(throttle: f32, brake: f32, steer: f32) -> Command {
        Command {
            drive: DriveCommand {
                throttle,
                brake,
                steer,
            },
            send_pickup: false,
        }
    }

    #[test]
    fn open_ground_frame_has_sand_below_horizon() {
        let mut cam = SimCamera::new("front_rgb", 320, 160);
        let frame = cam.capture().unwrap();
        assert_eq!(frame.pixel(160, 159), SAND);
        assert_eq!(frame.pixel(160, 10), ROCK_WALL);
    }

    #[test]
    fn wall_frame_has_no_sand() {
        let mut cam = SimCamera::new("front_rgb", 32, 16);
        cam.set_scene(SimScene::Wall);
        let frame = cam.capture().unwrap();
        assert!(frame.pixels().all(|p| p == ROCK_WALL));
    }

    #[test]
    fn rock_scene_draws_sample() {
        let mut cam = SimCamera::new("front_rgb", 320, 160);
        cam.set_scene(SimScene::RockAhead);
        let frame = cam.capture().unwrap();
        assert_eq!(frame.pixel(140, 110), SAMPLE);
    }

    #[test]
    fn sim_actuator_records_history() {
        let mut act = SimActuator::new("drive");
        act.dispatch(&drive(0.2, 0.0, 1.0)).unwrap();
        act.dispatch(&drive(0.0, 10.0, 0.0)).unwrap();
        assert_eq!(act.history().len(), 2);
        assert_eq!(act.last_command().unwrap().drive.brake, 10.0);
    }

    #[test]
    fn throttle_accelerates_and_brake_stops() {
        let mut rover = SimRover::new(200.0, vec![]);
        for _ in 0..10 {
            rover.apply(&drive(0.2, 0.0, 0.0), 0.1);
        }
        let moving = rover.telemetry();
        assert!(moving.velocity > 0.5);
        assert!(moving.pose.x > 100.0);

        for _ in 0..10 {
            rover.apply(&drive(0.0, 10.0, 0.0), 0.1);
        }
        assert_eq!(rover.telemetry().velocity, 0.0);
    }

    #[test]
    fn steer_turns_left() {
        let mut rover = SimRover::new(200.0, vec![]);
        rover.apply(&drive(0.0, 0.0, 15.0), 1.0);
        assert!((rover.telemetry().pose.yaw - 30.0).abs() < 1e-4);
    }

    #[test]
    fn sample_ahead_changes_scene_and_can_be_collected() {
        let mut rover = SimRover::new(200.0, vec![(101.0, 100.0)]);
        assert_eq!(rover.scene(), SimScene::RockAhead);
        assert!(rover.telemetry().near_sample);

        let pickup = Command {
            send_pickup: true,
            ..Command::default()
        };
        rover.apply(&pickup, 0.1);
        assert!(rover.telemetry().picking_up);
        for _ in 0..PICKUP_TICKS {
            rover.apply(&Command::default(), 0.1);
        }
        assert_eq!(rover.collected(), 1);
        assert!(!rover.telemetry().near_sample);
    }

    #[test]
    fn facing_the_edge_shows_wall() {
        let rover = SimRover::new(200.0, vec![]).with_pose(RoverPose {
            x: 197.0,
            y: 100.0,
            ..RoverPose::default()
        });
        assert_eq!(rover.scene(), SimScene::Wall);
    }
}
