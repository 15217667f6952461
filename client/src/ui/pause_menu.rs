//! In-game menu
//!
//! Opening it stops movement animations and sounds, freezes physics, suspends audio and
//! hands the cursor back.

use bevy::app::AppExit;
use bevy::prelude::*;
use shared::KeyBindings;

use super::styles::*;
use crate::states::GameState;
use crate::systems::{freeze_physics, release_cursor, resume_physics, stop_player_animation};

pub struct PauseMenuPlugin;

impl Plugin for PauseMenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(GameState::Paused),
            (spawn_pause_menu, release_cursor, freeze_physics, stop_player_animation),
        );
        app.add_systems(OnExit(GameState::Paused), (despawn_pause_menu, resume_physics));
        app.add_systems(
            Update,
            (button_interactions, handle_pause_actions, handle_resume_key).run_if(in_state(GameState::Paused)),
        );
    }
}

/// Marker for the pause menu root
#[derive(Component)]
struct PauseMenuRoot;

/// Pause menu button actions
#[derive(Component, Clone, Copy)]
enum PauseButton {
    Resume,
    MainMenu,
    Exit,
}

fn spawn_pause_menu(mut commands: Commands) {
    commands
        .spawn((
            PauseMenuRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.02, 0.04, 0.08, 0.75)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("PAUSED"),
                title_text_style(),
                TextColor(TEXT_COLOR),
                Node {
                    margin: UiRect::bottom(Val::Px(40.0)),
                    ..default()
                },
            ));

            spawn_button(parent, "RESUME", PauseButton::Resume);
            spawn_button(parent, "MAIN MENU", PauseButton::MainMenu);
            spawn_button(parent, "EXIT GAME", PauseButton::Exit);

            parent.spawn((
                Text::new("Press TAB to resume"),
                hint_text_style(),
                TextColor(TEXT_MUTED),
                Node {
                    margin: UiRect::top(Val::Px(30.0)),
                    ..default()
                },
            ));
        });
}

fn despawn_pause_menu(mut commands: Commands, query: Query<Entity, With<PauseMenuRoot>>) {
    for entity in query.iter() {
        commands.entity(entity).despawn();
    }
}

fn handle_pause_actions(
    buttons: Query<(&Interaction, &PauseButton), Changed<Interaction>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    for (interaction, action) in buttons.iter() {
        if *interaction == Interaction::Pressed {
            match action {
                PauseButton::Resume => {
                    next_state.set(GameState::Playing);
                }
                PauseButton::MainMenu => {
                    info!("Leaving the world for the main menu");
                    next_state.set(GameState::MainMenu);
                }
                PauseButton::Exit => {
                    info!("Exiting game...");
                    exit.write(AppExit::Success);
                }
            }
        }
    }
}

fn handle_resume_key(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(bindings.open_menu) {
        next_state.set(GameState::Playing);
    }
}
