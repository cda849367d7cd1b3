//! [`NavigationStateMachine`] – the rover's three-mode decision step.
//!
//! The machine is a pure function of the prior [`RoverState`] and one tick's
//! [`TickInputs`]: [`NavigationStateMachine::step`] returns a fresh state and
//! the [`Command`] to dispatch, and never mutates its arguments.
//!
//! # Modes
//!
//! ```text
//!            near sample / stuck / too little ground
//!   Forward ─────────────────────────────────────────▶ Stop
//!      ▲                                               │  │
//!      │        enough ground ahead (go_forward)       │  │ near sample,
//!      └───────────────────────────────────────────────┘  │ stopped
//!      ▲                                                  ▼
//!      └──────────────── not requesting ─────────────── Pickup
//! ```
//!
//! # Example
//!
//! ```rust
//! use rover_perception::NavigationSample;
//! use rover_runtime::navigation::{NavigationConfig, NavigationStateMachine, RoverState, TickInputs};
//! use rover_types::Mode;
//!
//! let machine = NavigationStateMachine::new(NavigationConfig::default());
//! let empty = NavigationSample::default();
//! let inputs = TickInputs {
//!     navigable: &empty,
//!     rock: &empty,
//!     velocity: 0.0,
//!     near_sample: false,
//!     picking_up: false,
//! };
//!
//! // No perception data: creep forward blind, mode unchanged.
//! let (state, cmd) = machine.step(&RoverState::default(), &inputs);
//! assert_eq!(state.mode, Mode::Forward);
//! assert_eq!(cmd.drive.throttle, 0.2);
//! assert_eq!(cmd.drive.steer, 0.0);
//! ```

use rover_perception::NavigationSample;
use rover_types::{Command, DriveCommand, Mode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Consecutive stalled ticks in forward mode that count as stuck.
pub const STUCK_TICKS: u32 = 20;
/// Steering is always clipped to ±this many degrees.
pub const STEER_LIMIT_DEG: f32 = 15.0;

/// Steering bias while driving forward, keeps the rover hugging one wall.
const FORWARD_BIAS_DEG: f32 = 5.0;
/// Below this speed a forward-mode tick counts toward the stuck counter.
const STALL_VELOCITY: f32 = 0.1;
/// At or below this speed the rover counts as stopped.
const STOPPED_VELOCITY: f32 = 0.2;
/// Stuck recovery only drives off once the heading is this close to straight.
const ALIGNED_DEG: f32 = 3.0;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and state
// ─────────────────────────────────────────────────────────────────────────────

/// Tunable thresholds, fixed at mission start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Cruise throttle.
    pub throttle_set: f32,
    /// Full brake.
    pub brake_set: f32,
    /// Speed ceiling with no rock in view.
    pub max_vel: f32,
    /// Forward mode stops when fewer navigable pixels than this are visible.
    pub stop_forward: usize,
    /// Stop mode drives off once this many navigable pixels are visible.
    pub go_forward: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            throttle_set: 0.2,
            brake_set: 10.0,
            max_vel: 2.0,
            stop_forward: 50,
            go_forward: 500,
        }
    }
}

/// Control-loop record carried from one tick to the next.
///
/// `command` is the last drive output; branches that do not set a field
/// keep its previous value.  `send_pickup` only holds for the tick that
/// raised it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoverState {
    pub mode: Mode,
    pub stuck_count: u32,
    pub command: DriveCommand,
    pub send_pickup: bool,
}

/// Everything one decision step reads besides the prior state.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs<'a> {
    pub navigable: &'a NavigationSample,
    pub rock: &'a NavigationSample,
    pub velocity: f32,
    pub near_sample: bool,
    pub picking_up: bool,
}

/// Mean headings derived once per tick.
#[derive(Debug, Clone, Copy)]
struct Headings {
    nav: f32,
    /// `None` when no rock pixels are visible.
    rock: Option<f32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// NavigationStateMachine
// ─────────────────────────────────────────────────────────────────────────────

/// Decides mode and drive command from perception statistics and telemetry.
#[derive(Debug, Clone, Default)]
pub struct NavigationStateMachine {
    config: NavigationConfig,
}

impl NavigationStateMachine {
    pub fn new(config: NavigationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Run one decision step.
    pub fn step(&self, prior: &RoverState, inputs: &TickInputs<'_>) -> (RoverState, Command) {
        let mut next = RoverState {
            send_pickup: false,
            ..*prior
        };

        if inputs.velocity < STALL_VELOCITY && prior.mode == Mode::Forward {
            next.stuck_count += 1;
        }

        match inputs.navigable.mean_angle_deg() {
            None => {
                next.command = DriveCommand {
                    throttle: self.config.throttle_set,
                    brake: 0.0,
                    steer: 0.0,
                };
            }
            Some(nav) => {
                let headings = Headings {
                    nav,
                    rock: inputs.rock.mean_angle_deg(),
                };
                match prior.mode {
                    Mode::Forward => self.forward(&mut next, inputs, headings),
                    Mode::Stop => self.stop(&mut next, inputs, headings),
                    Mode::Pickup => self.pickup(&mut next, inputs),
                }
            }
        }

        if next.mode != prior.mode {
            info!(
                from = %prior.mode,
                to = %next.mode,
                stuck_count = next.stuck_count,
                "mode transition"
            );
        }

        let command = Command {
            drive: next.command,
            send_pickup: next.send_pickup,
        };
        (next, command)
    }

    fn forward(&self, next: &mut RoverState, inputs: &TickInputs<'_>, h: Headings) {
        let rock = h.rock.is_some();
        if inputs.near_sample {
            next.mode = Mode::Stop;
        } else if next.stuck_count >= STUCK_TICKS {
            warn!(stuck_count = next.stuck_count, "rover stuck, stopping");
            next.mode = Mode::Stop;
            next.command = self.full_brake();
        } else if inputs.navigable.len() >= self.config.stop_forward || rock {
            // A rock in view cuts the speed ceiling to a third.
            let cap = if rock {
                self.config.max_vel * (1.0 - 2.0 / 3.0)
            } else {
                self.config.max_vel
            };
            if inputs.velocity < cap {
                next.command.throttle = self.config.throttle_set;
            } else {
                next.command.throttle = 0.0;
                next.command.brake = 0.0;
            }
            next.command.steer = blend(h, FORWARD_BIAS_DEG);
        } else {
            next.mode = Mode::Stop;
            next.command = self.full_brake();
        }
    }

    fn stop(&self, next: &mut RoverState, inputs: &TickInputs<'_>, h: Headings) {
        let stuck = next.stuck_count >= STUCK_TICKS;
        if inputs.velocity > STOPPED_VELOCITY {
            next.command = self.full_brake();
        } else if inputs.near_sample {
            next.mode = Mode::Pickup;
        } else if stuck && h.nav.abs() < ALIGNED_DEG {
            info!(heading = h.nav, "stuck recovery: driving off");
            next.stuck_count = 0;
            next.command = DriveCommand {
                throttle: self.config.throttle_set,
                brake: 0.0,
                steer: blend(h, 0.0),
            };
        } else if inputs.navigable.len() < self.config.go_forward || stuck {
            // Turn in place.
            next.command = DriveCommand {
                throttle: 0.0,
                brake: 0.0,
                steer: STEER_LIMIT_DEG,
            };
        } else {
            next.mode = Mode::Forward;
            next.command = DriveCommand {
                throttle: self.config.throttle_set,
                brake: 0.0,
                steer: blend(h, 0.0),
            };
        }
    }

    fn pickup(&self, next: &mut RoverState, inputs: &TickInputs<'_>) {
        if !inputs.picking_up && inputs.near_sample {
            debug!("requesting sample pickup");
            next.send_pickup = true;
        } else {
            next.mode = Mode::Forward;
            next.command.brake = 0.0;
            next.command.throttle = self.config.throttle_set;
        }
    }

    fn full_brake(&self) -> DriveCommand {
        DriveCommand {
            throttle: 0.0,
            brake: self.config.brake_set,
            steer: 0.0,
        }
    }
}

/// Steer at the rock if one is visible, otherwise at the biased ground heading.
fn blend(h: Headings, bias: f32) -> f32 {
    h.rock
        .unwrap_or(h.nav + bias)
        .clamp(-STEER_LIMIT_DEG, STEER_LIMIT_DEG)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(count: usize, heading_deg: f32) -> NavigationSample {
        NavigationSample {
            dists: vec![10.0; count],
            angles: vec![heading_deg.to_radians(); count],
        }
    }

    fn inputs<'a>(nav: &'a NavigationSample, rock: &'a NavigationSample) -> TickInputs<'a> {
        TickInputs {
            navigable: nav,
            rock,
            velocity: 1.0,
            near_sample: false,
            picking_up: false,
        }
    }

    fn state(mode: Mode) -> RoverState {
        RoverState {
            mode,
            ..RoverState::default()
        }
    }

    fn machine() -> NavigationStateMachine {
        NavigationStateMachine::default()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    // ── No perception data ───────────────────────────────────────────────────

    #[test]
    fn empty_navigable_sample_creeps_forward() {
        let nav = NavigationSample::default();
        let rock = sample(5, 20.0);
        let prior = RoverState {
            mode: Mode::Stop,
            command: DriveCommand {
                throttle: 0.0,
                brake: 10.0,
                steer: 12.0,
            },
            ..RoverState::default()
        };
        let (next, cmd) = machine().step(&prior, &inputs(&nav, &rock));
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(
            cmd.drive,
            DriveCommand {
                throttle: 0.2,
                brake: 0.0,
                steer: 0.0
            }
        );
    }

    #[test]
    fn first_tick_without_data_keeps_forward() {
        let nav = NavigationSample::default();
        let mut i = inputs(&nav, &nav);
        i.velocity = 0.0;
        let (next, cmd) = machine().step(&RoverState::default(), &i);
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert_eq!(cmd.drive.brake, 0.0);
        assert_eq!(cmd.drive.steer, 0.0);
        assert!(!cmd.send_pickup);
    }

    // ── Forward ──────────────────────────────────────────────────────────────

    #[test]
    fn forward_near_sample_stops_without_changing_command() {
        let nav = sample(800, 4.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            command: DriveCommand {
                throttle: 0.2,
                brake: 0.0,
                steer: 7.0,
            },
            ..RoverState::default()
        };
        let mut i = inputs(&nav, &empty);
        i.near_sample = true;
        let (next, cmd) = machine().step(&prior, &i);
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(cmd.drive, prior.command);
    }

    #[test]
    fn forward_open_ground_accelerates_with_bias() {
        let nav = sample(800, 4.0);
        let empty = NavigationSample::default();
        let (next, cmd) = machine().step(&state(Mode::Forward), &inputs(&nav, &empty));
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert!(close(cmd.drive.steer, 9.0));
    }

    #[test]
    fn forward_at_speed_cap_coasts() {
        let nav = sample(800, -2.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            command: DriveCommand {
                throttle: 0.2,
                brake: 3.0,
                steer: 0.0,
            },
            ..RoverState::default()
        };
        let mut i = inputs(&nav, &empty);
        i.velocity = 2.0;
        let (next, cmd) = machine().step(&prior, &i);
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.0);
        assert_eq!(cmd.drive.brake, 0.0);
        assert!(close(cmd.drive.steer, 3.0));
    }

    #[test]
    fn rock_in_view_lowers_cap_and_overrides_heading() {
        let nav = sample(10, -10.0);
        let rock = sample(3, 8.0);
        let mut i = inputs(&nav, &rock);

        // 1.0 is above a third of max_vel, so coast toward the rock.
        i.velocity = 1.0;
        let (next, cmd) = machine().step(&state(Mode::Forward), &i);
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.0);
        assert!(close(cmd.drive.steer, 8.0));

        i.velocity = 0.5;
        let (_, cmd) = machine().step(&state(Mode::Forward), &i);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert!(close(cmd.drive.steer, 8.0));
    }

    #[test]
    fn forward_throttle_keeps_previous_brake() {
        let nav = sample(800, 0.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            command: DriveCommand {
                throttle: 0.0,
                brake: 4.0,
                steer: 0.0,
            },
            ..RoverState::default()
        };
        let (_, cmd) = machine().step(&prior, &inputs(&nav, &empty));
        assert_eq!(cmd.drive.throttle, 0.2);
        assert_eq!(cmd.drive.brake, 4.0);
    }

    #[test]
    fn forward_sparse_ground_brakes_to_stop() {
        let nav = sample(49, 0.0);
        let empty = NavigationSample::default();
        let (next, cmd) = machine().step(&state(Mode::Forward), &inputs(&nav, &empty));
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(
            cmd.drive,
            DriveCommand {
                throttle: 0.0,
                brake: 10.0,
                steer: 0.0
            }
        );
    }

    #[test]
    fn stalled_forward_stops_on_twentieth_tick() {
        let nav = sample(800, 0.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.05;

        let m = machine();
        let mut s = RoverState::default();
        for tick in 1..=STUCK_TICKS {
            let (next, cmd) = m.step(&s, &i);
            assert_eq!(next.stuck_count, tick);
            if tick < STUCK_TICKS {
                assert_eq!(next.mode, Mode::Forward, "tick {tick}");
            } else {
                assert_eq!(next.mode, Mode::Stop);
                assert_eq!(cmd.drive.throttle, 0.0);
                assert_eq!(cmd.drive.brake, 10.0);
                assert_eq!(cmd.drive.steer, 0.0);
            }
            s = next;
        }
    }

    // ── Stop ─────────────────────────────────────────────────────────────────

    #[test]
    fn stop_while_moving_keeps_braking() {
        let nav = sample(800, 0.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.5;
        i.near_sample = true;
        let (next, cmd) = machine().step(&state(Mode::Stop), &i);
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(cmd.drive.brake, 10.0);
        assert_eq!(cmd.drive.throttle, 0.0);
    }

    #[test]
    fn stopped_near_sample_enters_pickup_unchanged() {
        let nav = sample(800, 0.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            mode: Mode::Stop,
            command: DriveCommand {
                throttle: 0.0,
                brake: 10.0,
                steer: 0.0,
            },
            ..RoverState::default()
        };
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.15;
        i.near_sample = true;
        let (next, cmd) = machine().step(&prior, &i);
        assert_eq!(next.mode, Mode::Pickup);
        assert_eq!(cmd.drive, prior.command);
        assert!(!cmd.send_pickup);
    }

    #[test]
    fn stuck_and_aligned_drives_off_and_resets_counter() {
        let nav = sample(100, 2.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            mode: Mode::Stop,
            stuck_count: STUCK_TICKS,
            ..RoverState::default()
        };
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.0;
        let (next, cmd) = machine().step(&prior, &i);
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(next.stuck_count, 0);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert_eq!(cmd.drive.brake, 0.0);
        assert!(close(cmd.drive.steer, 2.0));
    }

    #[test]
    fn stuck_and_misaligned_turns_in_place() {
        let nav = sample(800, 10.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            mode: Mode::Stop,
            stuck_count: 25,
            ..RoverState::default()
        };
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.0;
        let (next, cmd) = machine().step(&prior, &i);
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(next.stuck_count, 25);
        assert_eq!(
            cmd.drive,
            DriveCommand {
                throttle: 0.0,
                brake: 0.0,
                steer: 15.0
            }
        );
    }

    #[test]
    fn stopped_with_sparse_ground_turns_in_place() {
        let nav = sample(499, 0.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.0;
        let (next, cmd) = machine().step(&state(Mode::Stop), &i);
        assert_eq!(next.mode, Mode::Stop);
        assert_eq!(cmd.drive.steer, 15.0);
        assert_eq!(cmd.drive.throttle, 0.0);
    }

    #[test]
    fn stopped_with_open_ground_resumes_without_bias() {
        let nav = sample(500, -6.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.2;
        let (next, cmd) = machine().step(&state(Mode::Stop), &i);
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert_eq!(cmd.drive.brake, 0.0);
        assert!(close(cmd.drive.steer, -6.0));
    }

    #[test]
    fn stop_mode_never_increments_stuck_counter() {
        let nav = sample(10, 0.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.0;
        let prior = RoverState {
            mode: Mode::Stop,
            stuck_count: 3,
            ..RoverState::default()
        };
        let (next, _) = machine().step(&prior, &i);
        assert_eq!(next.stuck_count, 3);
    }

    // ── Pickup ───────────────────────────────────────────────────────────────

    #[test]
    fn pickup_near_sample_raises_request_once() {
        let nav = sample(100, 0.0);
        let empty = NavigationSample::default();
        let mut i = inputs(&nav, &empty);
        i.velocity = 0.0;
        i.near_sample = true;

        let m = machine();
        let (next, cmd) = m.step(&state(Mode::Pickup), &i);
        assert_eq!(next.mode, Mode::Pickup);
        assert!(cmd.send_pickup);

        // Arm busy: request is not repeated and the rover moves on.
        i.picking_up = true;
        let (after, cmd) = m.step(&next, &i);
        assert!(!cmd.send_pickup);
        assert_eq!(after.mode, Mode::Forward);
        assert_eq!(cmd.drive.throttle, 0.2);
        assert_eq!(cmd.drive.brake, 0.0);
    }

    #[test]
    fn pickup_without_sample_returns_to_forward() {
        let nav = sample(100, 0.0);
        let empty = NavigationSample::default();
        let prior = RoverState {
            mode: Mode::Pickup,
            command: DriveCommand {
                throttle: 0.0,
                brake: 10.0,
                steer: 4.0,
            },
            ..RoverState::default()
        };
        let (next, cmd) = machine().step(&prior, &inputs(&nav, &empty));
        assert_eq!(next.mode, Mode::Forward);
        assert_eq!(
            cmd.drive,
            DriveCommand {
                throttle: 0.2,
                brake: 0.0,
                steer: 4.0
            }
        );
    }

    // ── Properties ───────────────────────────────────────────────────────────

    #[test]
    fn steering_is_always_clipped() {
        let empty = NavigationSample::default();
        let m = machine();
        for heading in [-90.0_f32, -40.0, -15.5, 12.0, 40.0, 89.0] {
            let nav = sample(800, heading);
            let (_, cmd) = m.step(&state(Mode::Forward), &inputs(&nav, &empty));
            assert!(cmd.drive.steer.abs() <= STEER_LIMIT_DEG, "heading {heading}");
        }
        let nav = sample(800, 60.0);
        let (_, cmd) = m.step(&state(Mode::Forward), &inputs(&nav, &empty));
        assert_eq!(cmd.drive.steer, 15.0);
    }

    #[test]
    fn stuck_counter_only_counts_slow_forward_ticks() {
        let nav = sample(800, 0.0);
        let empty = NavigationSample::default();
        let m = machine();
        let mut i = inputs(&nav, &empty);

        i.velocity = 0.1;
        let (next, _) = m.step(&state(Mode::Forward), &i);
        assert_eq!(next.stuck_count, 0);

        i.velocity = 0.09;
        let (next, _) = m.step(&state(Mode::Forward), &i);
        assert_eq!(next.stuck_count, 1);
        let (next, _) = m.step(&state(Mode::Pickup), &i);
        assert_eq!(next.stuck_count, 0);
    }

    #[test]
    fn step_leaves_prior_state_untouched() {
        let nav = sample(10, 0.0);
        let empty = NavigationSample::default();
        let prior = state(Mode::Forward);
        let snapshot = prior;
        let _ = machine().step(&prior, &inputs(&nav, &empty));
        assert_eq!(prior, snapshot);
    }
}
