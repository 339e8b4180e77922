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

use std::time::Duration;

use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    constants::defaults,
    coordinates::Position,
    ids::PlayerId,
};

/// A declarative, self-contained effect: what to play, to whom, and how.
///
/// Targets are either an explicit player list, everyone online (`global`), or
/// a fixed location; with a fade-in the effect plays as music, with `looping`
/// it becomes a looping instance, otherwise it is a one-shot emission.
#[derive(Clone, Debug)]
pub struct AudioEffect {
    pub(crate) sound: Option<SoundRef>,
    pub(crate) category: SoundCategory,
    pub(crate) volume: f32,
    pub(crate) pitch: f32,
    pub(crate) target_players: Vec<PlayerId>,
    pub(crate) global: bool,
    pub(crate) location: Option<Position>,
    pub(crate) fade_in: f32,
    pub(crate) fade_out: f32,
    pub(crate) duration: f32,
    pub(crate) looping: bool,
    pub(crate) loop_interval: u32,
}

impl AudioEffect {
    pub fn builder() -> AudioEffectBuilder {
        AudioEffectBuilder {
            effect: AudioEffect {
                sound: None,
                category: SoundCategory::Master,
                volume: 1.0,
                pitch: 1.0,
                target_players: Vec::new(),
                global: false,
                location: None,
                fade_in: 0.0,
                fade_out: 0.0,
                duration: 0.0,
                looping: false,
                loop_interval: defaults::LOOP_INTERVAL_TICKS,
            },
        }
    }

    pub fn sound(&self) -> Option<&SoundRef> {
        self.sound.as_ref()
    }
    pub fn category(&self) -> SoundCategory {
        self.category
    }
    pub fn volume(&self) -> f32 {
        self.volume
    }
    pub fn pitch(&self) -> f32 {
        self.pitch
    }
    pub fn target_players(&self) -> &[PlayerId] {
        &self.target_players
    }
    pub fn is_global(&self) -> bool {
        self.global
    }
    pub fn location(&self) -> Option<Position> {
        self.location
    }
    pub fn fade_in(&self) -> f32 {
        self.fade_in
    }
    pub fn fade_out(&self) -> f32 {
        self.fade_out
    }
    pub fn duration(&self) -> f32 {
        self.duration
    }
    pub fn is_looping(&self) -> bool {
        self.looping
    }
    pub fn loop_interval(&self) -> u32 {
        self.loop_interval
    }

    /// How long a sequence waits before starting the next effect: the stated
    /// duration (defaulting to one second) plus both fade windows.
    pub(crate) fn schedule_delay(&self) -> Duration {
        let base = if self.duration > 0.0 {
            self.duration
        } else {
            1.0
        };
        Duration::from_secs_f32(base + self.fade_in + self.fade_out)
    }
}

pub struct AudioEffectBuilder {
    effect: AudioEffect,
}

impl AudioEffectBuilder {
    pub fn sound(mut self, sound: impl Into<SoundRef>) -> Self {
        self.effect.sound = Some(sound.into());
        self
    }
    pub fn category(mut self, category: SoundCategory) -> Self {
        self.effect.category = category;
        self
    }
    pub fn volume(mut self, volume: f32) -> Self {
        self.effect.volume = volume;
        self
    }
    pub fn pitch(mut self, pitch: f32) -> Self {
        self.effect.pitch = pitch;
        self
    }
    pub fn player(mut self, player: PlayerId) -> Self {
        self.effect.target_players.push(player);
        self
    }
    pub fn players(mut self, players: impl IntoIterator<Item = PlayerId>) -> Self {
        self.effect.target_players.extend(players);
        self
    }
    pub fn global(mut self) -> Self {
        self.effect.global = true;
        self
    }
    pub fn location(mut self, location: Position) -> Self {
        self.effect.location = Some(location);
        self
    }
    pub fn fade_in(mut self, seconds: f32) -> Self {
        self.effect.fade_in = seconds.max(0.0);
        self
    }
    pub fn fade_out(mut self, seconds: f32) -> Self {
        self.effect.fade_out = seconds.max(0.0);
        self
    }
    pub fn duration(mut self, seconds: f32) -> Self {
        self.effect.duration = seconds.max(0.0);
        self
    }
    pub fn looping(mut self, loop_interval_ticks: u32) -> Self {
        self.effect.looping = true;
        self.effect.loop_interval = loop_interval_ticks.max(1);
        self
    }
    pub fn build(self) -> AudioEffect {
        self.effect
    }
}

/// An ordered (or concurrent) list of effects.
///
/// Sequential mode starts each subsequent effect after the previous one's
/// [`AudioEffect::schedule_delay`]; concurrent mode fires them all at once.
#[derive(Clone, Debug)]
pub struct AudioSequence {
    pub(crate) effects: Vec<AudioEffect>,
    pub(crate) concurrent: bool,
}

impl AudioSequence {
    pub fn builder() -> AudioSequenceBuilder {
        AudioSequenceBuilder {
            effects: Vec::new(),
            concurrent: false,
        }
    }

    pub fn effects(&self) -> &[AudioEffect] {
        &self.effects
    }
    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }
}

pub struct AudioSequenceBuilder {
    effects: Vec<AudioEffect>,
    concurrent: bool,
}

impl AudioSequenceBuilder {
    pub fn then(mut self, effect: AudioEffect) -> Self {
        self.effects.push(effect);
        self
    }
    pub fn effects(mut self, effects: impl IntoIterator<Item = AudioEffect>) -> Self {
        self.effects.extend(effects);
        self
    }
    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }
    pub fn build(self) -> AudioSequence {
        AudioSequence {
            effects: self.effects,
            concurrent: self.concurrent,
        }
    }
}
