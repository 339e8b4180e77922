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

use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    coordinates::Position,
    ids::{WorldId, ZoneId},
    util::clamp_unit,
};

/// A persistent spherical region that periodically emits a sound to players
/// inside it, attenuated by distance.
///
/// Zones are few and long-lived compared to sound instances, so they are not
/// pooled. A zone is pinned to one world for its whole lifetime; radius,
/// volume, pitch and interval are mutable, the center and world are not.
pub(crate) struct ZoneInstance {
    id: ZoneId,
    center: Position,
    radius: f64,
    sound: SoundRef,
    category: SoundCategory,
    volume: f32,
    pitch: f32,
    interval_ticks: u32,
    active: bool,
    current_tick: u32,
}

impl ZoneInstance {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ZoneId,
        center: Position,
        radius: f64,
        sound: SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
        interval_ticks: u32,
    ) -> ZoneInstance {
        ZoneInstance {
            id,
            center,
            radius,
            sound,
            category,
            volume: clamp_unit(volume),
            pitch,
            interval_ticks: interval_ticks.max(1),
            active: false,
            current_tick: 0,
        }
    }

    pub(crate) fn id(&self) -> ZoneId {
        self.id
    }
    pub(crate) fn center(&self) -> Position {
        self.center
    }
    pub(crate) fn world(&self) -> WorldId {
        self.center.world
    }
    pub(crate) fn radius(&self) -> f64 {
        self.radius
    }
    pub(crate) fn radius_squared(&self) -> f64 {
        self.radius * self.radius
    }
    pub(crate) fn sound(&self) -> &SoundRef {
        &self.sound
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
    pub(crate) fn interval_ticks(&self) -> u32 {
        self.interval_ticks
    }
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }
    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_unit(volume);
    }
    pub(crate) fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }
    pub(crate) fn set_interval_ticks(&mut self, ticks: u32) {
        self.interval_ticks = ticks.max(1);
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Advances the rolling counter, wrapping to zero at the interval.
    /// Inactive zones do not advance.
    pub(crate) fn increment_tick(&mut self) {
        if !self.active {
            return;
        }
        self.current_tick += 1;
        if self.current_tick >= self.interval_ticks {
            self.current_tick = 0;
        }
    }

    /// The zone emits on the ticks where the counter has just wrapped.
    pub(crate) fn fires_this_tick(&self) -> bool {
        self.active && self.current_tick == 0
    }

    pub(crate) fn snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot {
            id: self.id,
            center: self.center,
            radius: self.radius,
            sound: self.sound.clone(),
            category: self.category,
            volume: self.volume,
            pitch: self.pitch,
            interval_ticks: self.interval_ticks,
            active: self.active,
        }
    }
}

/// Read-only copy of a zone's fields, handed out by lookups instead of a live
/// reference.
#[derive(Clone, Debug)]
pub struct ZoneSnapshot {
    pub id: ZoneId,
    pub center: Position,
    pub radius: f64,
    pub sound: SoundRef,
    pub category: SoundCategory,
    pub volume: f32,
    pub pitch: f32,
    pub interval_ticks: u32,
    pub active: bool,
}
