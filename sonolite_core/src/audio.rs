// Copyright 2023 drey7925
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Sounds shipped with the host and known to every client by name.
///
/// Game content can also use [`SoundRef::Custom`] for sounds provided via
/// resource packs or media downloads; the engine treats both uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinSound {
    AmbientCave,
    BlockBreak,
    BlockPlace,
    DoorClose,
    DoorOpen,
    Explosion,
    Footstep,
    ItemPickup,
    LevelUp,
    NoteBell,
    PortalHum,
    Rain,
    Thunder,
    UiClick,
    WaterFlow,
    WindGust,
}

impl BuiltinSound {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BuiltinSound::AmbientCave => "ambient_cave",
            BuiltinSound::BlockBreak => "block_break",
            BuiltinSound::BlockPlace => "block_place",
            BuiltinSound::DoorClose => "door_close",
            BuiltinSound::DoorOpen => "door_open",
            BuiltinSound::Explosion => "explosion",
            BuiltinSound::Footstep => "footstep",
            BuiltinSound::ItemPickup => "item_pickup",
            BuiltinSound::LevelUp => "level_up",
            BuiltinSound::NoteBell => "note_bell",
            BuiltinSound::PortalHum => "portal_hum",
            BuiltinSound::Rain => "rain",
            BuiltinSound::Thunder => "thunder",
            BuiltinSound::UiClick => "ui_click",
            BuiltinSound::WaterFlow => "water_flow",
            BuiltinSound::WindGust => "wind_gust",
        }
    }
}

/// Reference to a playable sound: either a built-in sound or a free-form
/// custom sound name. Exactly one of the two, by construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundRef {
    Builtin(BuiltinSound),
    Custom(String),
}

impl SoundRef {
    pub fn name(&self) -> &str {
        match self {
            SoundRef::Builtin(sound) => sound.as_str(),
            SoundRef::Custom(name) => name.as_str(),
        }
    }
}

impl From<BuiltinSound> for SoundRef {
    fn from(sound: BuiltinSound) -> SoundRef {
        SoundRef::Builtin(sound)
    }
}

impl Display for SoundRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mixer category a sound is tagged with. The engine does no mixing itself;
/// categories are passed through to the host's playback primitive, which may
/// use them for client-side volume sliders or selective stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCategory {
    Master,
    Music,
    Ambient,
    Weather,
    Blocks,
    Players,
    Effects,
    Voice,
}

impl SoundCategory {
    pub const ALL: [SoundCategory; 8] = [
        SoundCategory::Master,
        SoundCategory::Music,
        SoundCategory::Ambient,
        SoundCategory::Weather,
        SoundCategory::Blocks,
        SoundCategory::Players,
        SoundCategory::Effects,
        SoundCategory::Voice,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SoundCategory::Master => "master",
            SoundCategory::Music => "music",
            SoundCategory::Ambient => "ambient",
            SoundCategory::Weather => "weather",
            SoundCategory::Blocks => "blocks",
            SoundCategory::Players => "players",
            SoundCategory::Effects => "effects",
            SoundCategory::Voice => "voice",
        }
    }
}

impl FromStr for SoundCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for category in SoundCategory::ALL {
            if category.as_str() == s {
                return Ok(category);
            }
        }
        bail!("Unknown sound category: {}", s);
    }
}

impl Display for SoundCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
