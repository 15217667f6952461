//! Shared UI styles - ColdEscape frost palette

use bevy::prelude::*;

/// Deep night-blue background for menus
pub const MENU_BACKGROUND: Color = Color::srgb(0.04, 0.06, 0.10);

/// Button colors - dark slate warming up to ice on interaction
pub const BUTTON_NORMAL: Color = Color::srgb(0.08, 0.11, 0.16);
pub const BUTTON_HOVERED: Color = Color::srgb(0.13, 0.20, 0.28);
pub const BUTTON_PRESSED: Color = Color::srgb(0.22, 0.36, 0.48);

/// Button border - frosted steel
pub const BUTTON_BORDER: Color = Color::srgb(0.25, 0.33, 0.42);

/// Accent color - glacier blue (matches the fog)
pub const ACCENT_COLOR: Color = Color::srgb(0.792, 0.886, 0.965); // #CAE2F6

/// Text colors
pub const TEXT_COLOR: Color = Color::srgb(0.93, 0.96, 1.0);
pub const TEXT_MUTED: Color = Color::srgb(0.48, 0.55, 0.63);

/// Standard button style
pub fn button_style() -> Node {
    Node {
        width: Val::Px(280.0),
        height: Val::Px(55.0),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        margin: UiRect::all(Val::Px(8.0)),
        border: UiRect::all(Val::Px(2.0)),
        ..default()
    }
}

/// Standard button text style
pub fn button_text_style() -> TextFont {
    TextFont {
        font_size: 22.0,
        ..default()
    }
}

/// Title text style
pub fn title_text_style() -> TextFont {
    TextFont {
        font_size: 72.0,
        ..default()
    }
}

/// Small print under titles and at the bottom of screens
pub fn hint_text_style() -> TextFont {
    TextFont {
        font_size: 14.0,
        ..default()
    }
}

/// Spawn a menu button carrying `action`.
pub fn spawn_button<A: Component>(parent: &mut ChildSpawnerCommands<'_>, text: &str, action: A) {
    parent
        .spawn((
            Button,
            action,
            button_style(),
            BackgroundColor(BUTTON_NORMAL),
            BorderColor::from(BUTTON_BORDER),
            BorderRadius::all(Val::Px(6.0)),
        ))
        .with_children(|btn| {
            btn.spawn((Text::new(text), button_text_style(), TextColor(TEXT_COLOR)));
        });
}

/// Hover/press feedback shared by every menu
pub fn button_interactions(
    mut buttons: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor),
        (Changed<Interaction>, With<Button>),
    >,
) {
    for (interaction, mut bg_color, mut border_color) in buttons.iter_mut() {
        match interaction {
            Interaction::Pressed => {
                *bg_color = BackgroundColor(BUTTON_PRESSED);
                *border_color = BorderColor::from(ACCENT_COLOR);
            }
            Interaction::Hovered => {
                *bg_color = BackgroundColor(BUTTON_HOVERED);
                *border_color = BorderColor::from(ACCENT_COLOR);
            }
            Interaction::None => {
                *bg_color = BackgroundColor(BUTTON_NORMAL);
                *border_color = BorderColor::from(BUTTON_BORDER);
            }
        };
    }
}
