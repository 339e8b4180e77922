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

use std::time::Instant;

use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    constants::FADE_FLOOR,
    coordinates::Position,
    ids::{SoundId, WorldId},
    util::clamp_unit,
};

use crate::playback::{AudioOutput, EmitTarget};

/// Lifecycle of a sound instance.
///
/// `Created → Playing ⇄ FadingIn/FadingOut → Stopped`, with `Paused`
/// reachable from `Playing`. `Stopped` is terminal; the slot must go back
/// through the pool (and a fresh `reset`) before it plays again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Created,
    Playing,
    Paused,
    Stopped,
    FadingIn,
    FadingOut,
}

/// Everything needed to (re)initialize a pooled instance.
pub(crate) struct InstanceParams {
    pub sound: SoundRef,
    pub category: SoundCategory,
    pub volume: f32,
    pub pitch: f32,
    pub target: EmitTarget,
    /// World the instance is pinned to, when known. Location targets always
    /// know their world; player targets inherit the player's world at
    /// creation time.
    pub world: Option<WorldId>,
    pub looping: bool,
    pub interval_ticks: u32,
}

/// A single scheduled sound emission with its own fade/loop state.
///
/// Storage is owned by the [`InstancePool`](super::pool::InstancePool) and
/// physically reused after release; a vacant instance has no id, no sound and
/// no target. An instance that has lost its target (vacant, or defensively
/// constructed) cannot emit: the state machine still advances, the playback
/// call is simply skipped.
pub(crate) struct SoundInstance {
    id: Option<SoundId>,
    sound: Option<SoundRef>,
    category: SoundCategory,
    volume: f32,
    target_volume: f32,
    pitch: f32,
    target: Option<EmitTarget>,
    world: Option<WorldId>,
    looping: bool,
    interval_ticks: u32,
    current_tick: u32,
    state: InstanceState,

    start_volume: f32,
    fade_seconds: f32,
    fade_started: Option<Instant>,
}

impl SoundInstance {
    /// An empty slot, waiting in the pool.
    pub(crate) fn vacant() -> SoundInstance {
        SoundInstance {
            id: None,
            sound: None,
            category: SoundCategory::Master,
            volume: 0.0,
            target_volume: 0.0,
            pitch: 0.0,
            target: None,
            world: None,
            looping: false,
            interval_ticks: 1,
            current_tick: 0,
            state: InstanceState::Created,
            start_volume: 0.0,
            fade_seconds: 0.0,
            fade_started: None,
        }
    }

    /// Re-initializes a recycled slot for a new emission.
    pub(crate) fn reset(&mut self, id: SoundId, params: InstanceParams) {
        self.id = Some(id);
        self.sound = Some(params.sound);
        self.category = params.category;
        self.volume = clamp_unit(params.volume);
        self.target_volume = self.volume;
        self.pitch = params.pitch;
        self.target = Some(params.target);
        self.world = params.world;
        self.looping = params.looping;
        self.interval_ticks = params.interval_ticks.max(1);
        self.current_tick = 0;
        self.state = InstanceState::Created;
        self.start_volume = 0.0;
        self.fade_seconds = 0.0;
        self.fade_started = None;
    }

    /// Strips identity and parameters before the slot goes back on the free
    /// list, so a recycled slot can never leak its previous occupant.
    pub(crate) fn clear(&mut self) {
        *self = SoundInstance::vacant();
    }

    pub(crate) fn id(&self) -> Option<SoundId> {
        self.id
    }
    pub(crate) fn sound(&self) -> Option<&SoundRef> {
        self.sound.as_ref()
    }
    pub(crate) fn category(&self) -> SoundCategory {
        self.category
    }
    pub(crate) fn volume(&self) -> f32 {
        self.volume
    }
    pub(crate) fn pitch(&self) -> f32 {
        self.pitch
    }
    pub(crate) fn target(&self) -> Option<&EmitTarget> {
        self.target.as_ref()
    }
    pub(crate) fn state(&self) -> InstanceState {
        self.state
    }
    pub(crate) fn interval_ticks(&self) -> u32 {
        self.interval_ticks
    }
    pub(crate) fn is_looping(&self) -> bool {
        self.looping
    }
    pub(crate) fn world(&self) -> Option<WorldId> {
        self.world
    }
    /// True when the instance is pinned to a particular world and should be
    /// cut off if its player leaves that world.
    pub(crate) fn is_world_specific(&self) -> bool {
        self.world.is_some()
    }
    pub(crate) fn is_fading(&self) -> bool {
        matches!(
            self.state,
            InstanceState::FadingIn | InstanceState::FadingOut
        )
    }
    pub(crate) fn is_playing(&self) -> bool {
        matches!(
            self.state,
            InstanceState::Playing | InstanceState::FadingIn | InstanceState::FadingOut
        )
    }

    pub(crate) fn set_state(&mut self, state: InstanceState) {
        self.state = state;
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_unit(volume);
        self.target_volume = self.volume;
    }

    pub(crate) fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    pub(crate) fn set_location(&mut self, position: Position) {
        self.target = Some(EmitTarget::Location(position));
        self.world = Some(position.world);
    }

    /// Issues one playback call at the current volume/pitch and transitions
    /// to `Playing`. No-op once `Stopped`.
    pub(crate) fn play(&mut self, output: &dyn AudioOutput) {
        if self.state == InstanceState::Stopped {
            return;
        }
        self.emit_at_volume(self.volume, output);
        self.state = InstanceState::Playing;
    }

    pub(crate) fn pause(&mut self) {
        if self.state == InstanceState::Playing {
            self.state = InstanceState::Paused;
        }
    }

    /// Stops playback and transitions to the terminal `Stopped` state.
    /// Idempotent. Only player-targeted instances can actually be silenced;
    /// location emissions are fire-and-forget on the host side.
    pub(crate) fn stop(&mut self, output: &dyn AudioOutput) {
        if self.state == InstanceState::Stopped {
            return;
        }
        if let (Some(EmitTarget::Player(player)), Some(sound)) = (self.target, &self.sound) {
            output.silence(player, sound, self.category);
        }
        self.state = InstanceState::Stopped;
    }

    /// Starts a fade from the audible floor up to the requested volume over
    /// `seconds`, issuing one playback call at the floor. No-op for
    /// non-positive durations or stopped instances.
    pub(crate) fn fade_in(&mut self, seconds: f32, output: &dyn AudioOutput) {
        if seconds <= 0.0 || self.state == InstanceState::Stopped {
            return;
        }
        self.start_volume = FADE_FLOOR;
        self.fade_seconds = seconds;
        self.fade_started = Some(Instant::now());
        self.state = InstanceState::FadingIn;
        self.emit_at_volume(self.start_volume, output);
    }

    /// Starts a fade from the current volume down to silence over `seconds`.
    /// Degrades to an immediate `stop` for non-positive durations. No replay
    /// is issued here; the next fade tick handles volume changes.
    pub(crate) fn fade_out(&mut self, seconds: f32, output: &dyn AudioOutput) {
        if seconds <= 0.0 || self.state == InstanceState::Stopped {
            self.stop(output);
            return;
        }
        self.start_volume = self.volume;
        self.fade_seconds = seconds;
        self.fade_started = Some(Instant::now());
        self.state = InstanceState::FadingOut;
    }

    /// Advances an in-progress fade as of `now` and returns the new volume.
    ///
    /// Linear interpolation, clamped at the endpoints: a fade-in lands exactly
    /// on the target volume and transitions to `Playing`; a fade-out decays to
    /// zero and stops. The caller decides whether to re-issue the playback
    /// call at the returned volume; fades do not auto-replay.
    pub(crate) fn update_fading(&mut self, now: Instant, output: &dyn AudioOutput) -> f32 {
        if !self.is_fading() {
            return self.volume;
        }
        let started = match self.fade_started {
            Some(started) => started,
            None => return self.volume,
        };
        let elapsed = now.saturating_duration_since(started).as_secs_f32();
        let progress = (elapsed / self.fade_seconds).min(1.0);

        if self.state == InstanceState::FadingIn {
            self.volume = self.start_volume + (self.target_volume - self.start_volume) * progress;
            if progress >= 1.0 {
                self.volume = self.target_volume;
                self.state = InstanceState::Playing;
            }
        } else {
            self.volume = self.start_volume * (1.0 - progress);
            if progress >= 1.0 {
                self.stop(output);
            }
        }
        self.volume
    }

    /// Advances the loop counter; once it reaches the interval, re-issues the
    /// playback call and wraps to zero. Only looping, `Playing` instances
    /// advance.
    pub(crate) fn increment_tick(&mut self, output: &dyn AudioOutput) {
        if !self.looping || self.state != InstanceState::Playing {
            return;
        }
        self.current_tick += 1;
        if self.current_tick >= self.interval_ticks {
            self.current_tick = 0;
            self.play(output);
        }
    }

    pub(crate) fn snapshot(&self) -> Option<InstanceSnapshot> {
        Some(InstanceSnapshot {
            id: self.id?,
            sound: self.sound.clone()?,
            category: self.category,
            volume: self.volume,
            pitch: self.pitch,
            target: self.target?,
            state: self.state,
            looping: self.looping,
            interval_ticks: self.interval_ticks,
        })
    }

    fn emit_at_volume(&self, volume: f32, output: &dyn AudioOutput) {
        if let (Some(target), Some(sound)) = (&self.target, &self.sound) {
            output.emit(target, sound, self.category, volume, self.pitch);
        }
    }
}

/// Read-only copy of an instance's externally visible fields, handed out by
/// lookups instead of a live reference into the pool.
#[derive(Clone, Debug)]
pub struct InstanceSnapshot {
    pub id: SoundId,
    pub sound: SoundRef,
    pub category: SoundCategory,
    pub volume: f32,
    pub pitch: f32,
    pub target: EmitTarget,
    pub state: InstanceState,
    pub looping: bool,
    pub interval_ticks: u32,
}
