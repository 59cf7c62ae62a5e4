use bevy::ecs::observer::On;
use bevy::prelude::{Component, Deref, DerefMut, EntityEvent, Query, Vec2};
use bevy_enhanced_input::prelude::*;

use super::state::MovementState;

/// Move in a direction (WASD / left stick)
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct MoveAction;

/// Look around (mouse delta)
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct LookAction;

/// Jump action
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct JumpAction;

/// Stores the current look input delta
#[derive(Component, Default, Deref, DerefMut)]
pub struct LookInput(pub Vec2);

/// System to handle move input via observer
pub fn handle_move_input(trigger: On<Fire<MoveAction>>, mut query: Query<&mut MovementState>) {
    if let Ok(mut state) = query.get_mut(trigger.event_target()) {
        state.set_input(trigger.value);
    }
}

/// Clear move input when all movement keys are released
pub fn handle_move_end(trigger: On<Complete<MoveAction>>, mut query: Query<&mut MovementState>) {
    if let Ok(mut state) = query.get_mut(trigger.event_target()) {
        state.set_input(Vec2::ZERO);
    }
}

/// System to handle look input via observer
pub fn handle_look_input(trigger: On<Fire<LookAction>>, mut query: Query<&mut LookInput>) {
    if let Ok(mut look_input) = query.get_mut(trigger.event_target()) {
        look_input.0 = trigger.value;
    }
}

/// Latches a jump request until a grounded physics tick consumes it
pub fn handle_jump_start(trigger: On<Start<JumpAction>>, mut query: Query<&mut MovementState>) {
    if let Ok(mut state) = query.get_mut(trigger.event_target()) {
        state.queued_jump = true;
    }
}

/// Clears look input each frame
pub fn clear_look_input(mut query: Query<&mut LookInput>) {
    for mut look in &mut query {
        look.0 = Vec2::ZERO;
    }
}
