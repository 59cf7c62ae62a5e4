mod config;
mod contacts;
pub mod input;
mod movement;
mod plugin;
mod setup;
mod state;
mod stepup;

pub use config::{ControllerConfig, ControllerSettings, GROUND_RAY_LIFT, GROUND_RAY_TOLERANCE};
pub use contacts::{
    GroundContactTracker, GroundProbe, GroundTransition, GroundTransitionMessage, ListenerId,
};
pub use input::LookInput;
pub use movement::{consume_jump, integrate, movement_force, world_input};
pub use plugin::{PlayerPlugin, spawn_character};
pub use setup::{CharacterParts, SetupError, check_character};
pub use state::*;
pub use stepup::{
    BodyState, StepCandidate, StepOutcome, SteppedUp, detect_step, probe_step_surface, step_up,
    try_resolve_step,
};
