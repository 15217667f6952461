//! Player input handling
//!
//! Keyboard state is sampled once per frame into an [`InputSnapshot`] so the reconciler sees a
//! consistent view of held keys for the whole tick.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use shared::{CameraController, GameTuning, InputSnapshot, KeyBindings, MovementCommand};

use crate::states::GameState;

/// Movement command resolved from this frame's snapshot.
#[derive(Resource, Default)]
pub struct CurrentCommand(pub MovementCommand);

/// Sample held keys and resolve them into a movement command.
pub fn handle_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut snapshot: ResMut<InputSnapshot>,
    mut command: ResMut<CurrentCommand>,
) {
    *snapshot = InputSnapshot::from_held(keyboard.get_pressed().copied());
    command.0 = bindings.command(&snapshot);
}

/// Switch between first and third person on the toggle key.
pub fn handle_camera_toggle(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    controller: Option<ResMut<CameraController>>,
) {
    let Some(mut controller) = controller else {
        return;
    };

    if keyboard.just_pressed(bindings.toggle_camera) {
        let mode = controller.toggle();
        info!("Camera mode: {:?}", mode);
    }
}

/// Route mouse motion to whichever camera is attached.
pub fn handle_mouse_input(
    mut mouse_motion: MessageReader<MouseMotion>,
    tuning: Res<GameTuning>,
    controller: Option<ResMut<CameraController>>,
) {
    let mut delta = Vec2::ZERO;
    for motion in mouse_motion.read() {
        delta += motion.delta;
    }

    let Some(mut controller) = controller else {
        return;
    };

    if delta != Vec2::ZERO {
        controller.apply_look(delta, tuning.camera.mouse_sensitivity);
    }
}

/// Tab opens the in-game menu.
pub fn handle_menu_key(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(bindings.open_menu) {
        next_state.set(GameState::Paused);
    }
}
