//! Start menu and the loading overlay

use bevy::app::AppExit;
use bevy::prelude::*;

use super::styles::*;
use crate::states::GameState;

pub struct MainMenuPlugin;

impl Plugin for MainMenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::MainMenu), spawn_main_menu);
        app.add_systems(OnExit(GameState::MainMenu), despawn_screen::<MainMenuRoot>);
        app.add_systems(OnEnter(GameState::Loading), spawn_loading_overlay);
        app.add_systems(OnExit(GameState::Loading), despawn_screen::<LoadingRoot>);
        app.add_systems(
            Update,
            (button_interactions, handle_menu_actions, animate_title).run_if(in_state(GameState::MainMenu)),
        );
    }
}

/// Marker for the main menu root
#[derive(Component)]
struct MainMenuRoot;

/// Marker for the loading overlay root
#[derive(Component)]
struct LoadingRoot;

/// Gently pulsing title
#[derive(Component)]
struct MenuTitle {
    time: f32,
}

/// Button action types
#[derive(Component, Clone, Copy)]
enum MenuButton {
    CreateGame,
    Exit,
}

fn spawn_main_menu(mut commands: Commands) {
    commands
        .spawn((
            MainMenuRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(MENU_BACKGROUND),
        ))
        .with_children(|parent| {
            parent.spawn((
                MenuTitle { time: 0.0 },
                Text::new("COLD ESCAPE"),
                title_text_style(),
                TextColor(ACCENT_COLOR),
                Node {
                    margin: UiRect::bottom(Val::Px(60.0)),
                    ..default()
                },
            ));

            parent
                .spawn(Node {
                    flex_direction: FlexDirection::Column,
                    align_items: AlignItems::Center,
                    padding: UiRect::all(Val::Px(10.0)),
                    ..default()
                })
                .with_children(|buttons| {
                    spawn_button(buttons, "CREATE GAME", MenuButton::CreateGame);
                    spawn_button(buttons, "EXIT GAME", MenuButton::Exit);
                });

            parent.spawn((
                Text::new("WASD move | SHIFT run | SPACE jump | C camera | TAB menu"),
                hint_text_style(),
                TextColor(TEXT_MUTED),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(20.0),
                    ..default()
                },
            ));
        });
}

fn spawn_loading_overlay(mut commands: Commands) {
    commands
        .spawn((
            LoadingRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(MENU_BACKGROUND),
        ))
        .with_children(|parent| {
            parent.spawn((Text::new("LOADING..."), button_text_style(), TextColor(TEXT_MUTED)));
        });
}

fn despawn_screen<T: Component>(mut commands: Commands, query: Query<Entity, With<T>>) {
    for entity in query.iter() {
        commands.entity(entity).despawn();
    }
}

fn handle_menu_actions(
    buttons: Query<(&Interaction, &MenuButton), Changed<Interaction>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit_writer: MessageWriter<AppExit>,
) {
    for (interaction, action) in buttons.iter() {
        if *interaction == Interaction::Pressed {
            match action {
                MenuButton::CreateGame => {
                    info!("Create game pressed - building the world");
                    next_state.set(GameState::Loading);
                }
                MenuButton::Exit => {
                    info!("Exit pressed - quitting game");
                    exit_writer.write(AppExit::Success);
                }
            }
        }
    }
}

fn animate_title(time: Res<Time>, mut titles: Query<(&mut MenuTitle, &mut Transform)>) {
    for (mut title, mut transform) in titles.iter_mut() {
        title.time += time.delta_secs();
        // Subtle breathing animation
        transform.scale = Vec3::splat(1.0 + (title.time * 0.5).sin() * 0.015);
    }
}
