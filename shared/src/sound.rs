//! Movement sound reactor
//!
//! Footsteps are latched: one footstep clip at a time, released when the clip ends or
//! when the floor under the avatar changes. Landing sounds ignore the latch.

use serde::{Deserialize, Serialize};

use crate::player::PlayerState;
use crate::surface::SurfaceLabel;

/// Every clip the player can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    WalkingOnSnow,
    WalkingOnIce,
    WalkingOnTiles,
    FallingOnSnow,
    FallingOnIce,
}

impl SoundId {
    pub const ALL: [SoundId; 5] = [
        SoundId::WalkingOnSnow,
        SoundId::WalkingOnIce,
        SoundId::WalkingOnTiles,
        SoundId::FallingOnSnow,
        SoundId::FallingOnIce,
    ];

    pub fn asset_path(self) -> &'static str {
        match self {
            SoundId::WalkingOnSnow => "audio/sfx/human_footsteps_snow.ogg",
            SoundId::WalkingOnIce => "audio/sfx/human_footsteps_ice.ogg",
            SoundId::WalkingOnTiles => "audio/sfx/human_footsteps_tiles.ogg",
            SoundId::FallingOnSnow => "audio/sfx/human_falling_snow.ogg",
            SoundId::FallingOnIce => "audio/sfx/human_falling_ice.ogg",
        }
    }
}

/// Why a clip was started. Structures use the same clip for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundRole {
    Footstep,
    Landing,
}

/// Audio playback collaborator.
pub trait SoundSink {
    fn play(&mut self, id: SoundId, role: SoundRole);
    fn stop(&mut self, id: SoundId);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementSoundReactor {
    /// Footstep currently holding the latch.
    playing: Option<SoundId>,
    /// Surface the latched footstep belongs to.
    current_floor: Option<SurfaceLabel>,
}

impl MovementSoundReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self) -> Option<SoundId> {
        self.playing
    }

    pub fn current_floor(&self) -> Option<SurfaceLabel> {
        self.current_floor
    }

    /// React to a moving tick. Returns the footstep started, if any.
    pub fn on_moving(&mut self, player: &PlayerState, sink: &mut impl SoundSink) -> Option<SoundId> {
        if !player.is_moving {
            return None;
        }

        if self.current_floor.is_some_and(|floor| floor != player.walking_on) {
            self.stop_all(sink);
        }
        self.current_floor = Some(player.walking_on);

        if self.playing.is_some() {
            return None;
        }

        let id = player.walking_on.info().footstep;
        self.playing = Some(id);
        sink.play(id, SoundRole::Footstep);
        Some(id)
    }

    /// React to the avatar landing.
    pub fn on_touch_down(&self, player: &PlayerState, sink: &mut impl SoundSink) -> SoundId {
        let id = player.walking_on.info().landing;
        sink.play(id, SoundRole::Landing);
        id
    }

    /// Only a footstep ending releases the latch.
    pub fn on_sound_ended(&mut self, id: SoundId, role: SoundRole) {
        if role == SoundRole::Footstep && self.playing == Some(id) {
            self.playing = None;
        }
    }

    pub fn stop_all(&mut self, sink: &mut impl SoundSink) {
        for id in SoundId::ALL {
            sink.stop(id);
        }
        self.playing = None;
    }
}
