//! [`Mission`] – the per-tick orchestrator.
//!
//! A mission owns the only writable copies of the [`RoverState`] and the
//! [`WorldMap`].  Each tick:
//!
//! 1. **Perceive** – run the frame through the [`PerceptionPipeline`].
//! 2. **Decide** – step the [`NavigationStateMachine`].
//! 3. **Fuse and publish** – merge the tick's evidence into the world map
//!    and swap in the new state alongside it.
//!
//! Nothing is written back until perception and the decision step have
//! both produced their results, so readers only ever see whole ticks.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::{SimActuator, SimCamera};
//! use rover_runtime::config::MissionConfig;
//! use rover_runtime::mission::Mission;
//! use rover_types::Telemetry;
//!
//! let mut mission = Mission::new(&MissionConfig::default()).unwrap();
//! let mut camera = SimCamera::new("front_rgb", 320, 160);
//! let mut actuator = SimActuator::new("drive");
//!
//! let report = mission
//!     .run_once(&mut camera, &mut actuator, &Telemetry::default())
//!     .unwrap();
//! assert_eq!(report.tick, 1);
//! assert_eq!(actuator.history().len(), 1);
//! ```

use rover_hal::{Actuator, Camera};
use rover_perception::{PerceptionPipeline, WorldMap};
use rover_types::{Command, Frame, Mode, RoverError, Telemetry};
use tracing::{debug, info, instrument};

use crate::config::MissionConfig;
use crate::navigation::{NavigationConfig, NavigationStateMachine, RoverState, TickInputs};

/// What one tick produced, for logging and visualisation.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// 1-based tick number within the mission.
    pub tick: u64,
    pub command: Command,
    pub mode: Mode,
    pub stuck_count: u32,
    pub navigable_pixels: usize,
    pub rock_pixels: usize,
    pub attitude_ok: bool,
    /// Obstacle / rock / navigable masks as a red / green / blue image.
    pub vision_image: Frame,
}

/// Perception, world map, and navigation state for one mission.
pub struct Mission {
    pipeline: PerceptionPipeline,
    machine: NavigationStateMachine,
    state: RoverState,
    map: WorldMap,
    ticks: u64,
    pickups_requested: u64,
}

impl Mission {
    /// Validate `config` and build a fresh mission.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::Config`] or [`RoverError::DegenerateQuad`] when
    /// the configuration cannot drive a rover.
    pub fn new(config: &MissionConfig) -> Result<Self, RoverError> {
        config.validate()?;
        let pipeline = PerceptionPipeline::new(&config.perception)?;
        info!(
            world_size = pipeline.world_size(),
            throttle_set = config.navigation.throttle_set,
            "mission initialised"
        );
        Ok(Self::with_pipeline(pipeline, config.navigation))
    }

    /// Build a mission around an already constructed pipeline.
    pub fn with_pipeline(pipeline: PerceptionPipeline, navigation: NavigationConfig) -> Self {
        let map = WorldMap::new(pipeline.world_size());
        Self {
            pipeline,
            machine: NavigationStateMachine::new(navigation),
            state: RoverState::default(),
            map,
            ticks: 0,
            pickups_requested: 0,
        }
    }

    pub fn state(&self) -> &RoverState {
        &self.state
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of ticks on which a pickup was requested.
    pub fn pickups_requested(&self) -> u64 {
        self.pickups_requested
    }

    /// Run one full perception and decision tick.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::FrameSize`] when the frame buffer does not match
    /// its declared shape.  The mission is left untouched.
    #[instrument(skip_all, fields(tick = self.ticks + 1))]
    pub fn tick(
        &mut self,
        frame: &Frame,
        telemetry: &Telemetry,
    ) -> Result<TickReport, RoverError> {
        frame.check()?;

        // ── 1. Perceive ──────────────────────────────────────────────────────
        let perception = self.pipeline.process(frame, &telemetry.pose);

        // ── 2. Decide ────────────────────────────────────────────────────────
        let inputs = TickInputs {
            navigable: &perception.navigable,
            rock: &perception.rock,
            velocity: telemetry.velocity,
            near_sample: telemetry.near_sample,
            picking_up: telemetry.picking_up,
        };
        let (state, command) = self.machine.step(&self.state, &inputs);

        // ── 3. Fuse and publish ──────────────────────────────────────────────
        let prior_map = std::mem::replace(&mut self.map, WorldMap::new(0));
        self.map = prior_map.merge(&perception.evidence);
        self.state = state;
        self.ticks += 1;
        if command.send_pickup {
            self.pickups_requested += 1;
        }

        debug!(
            mode = %state.mode,
            throttle = command.drive.throttle,
            brake = command.drive.brake,
            steer = command.drive.steer,
            send_pickup = command.send_pickup,
            "tick complete"
        );

        Ok(TickReport {
            tick: self.ticks,
            command,
            mode: state.mode,
            stuck_count: state.stuck_count,
            navigable_pixels: perception.navigable.len(),
            rock_pixels: perception.rock.len(),
            attitude_ok: perception.evidence.attitude_ok,
            vision_image: perception.vision_image,
        })
    }

    /// Capture a frame, tick, and dispatch the resulting command.
    ///
    /// # Errors
    ///
    /// Propagates camera, frame-shape, and actuator failures.  A failed
    /// capture or a malformed frame leaves the mission untouched and nothing
    /// is dispatched; a failed dispatch happens after the tick has been
    /// applied.
    pub fn run_once(
        &mut self,
        camera: &mut dyn Camera,
        actuator: &mut dyn Actuator,
        telemetry: &Telemetry,
    ) -> Result<TickReport, RoverError> {
        let frame = camera.capture()?;
        let report = self.tick(&frame, telemetry)?;
        actuator.dispatch(&report.command)?;
        Ok(report)
    }

    /// Feed a recorded sequence of ticks through the mission in order.
    ///
    /// # Errors
    ///
    /// Stops at the first malformed frame; earlier ticks stay applied.
    pub fn replay<I>(&mut self, ticks: I) -> Result<Vec<TickReport>, RoverError>
    where
        I: IntoIterator<Item = (Frame, Telemetry)>,
    {
        ticks
            .into_iter()
            .map(|(frame, telemetry)| self.tick(&frame, &telemetry))
            .collect()
    }
}
