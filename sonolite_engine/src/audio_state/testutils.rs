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

//! Scripted playback and roster doubles for unit and scenario tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    coordinates::Position,
    ids::{PlayerId, WorldId},
};

use crate::playback::{AudioOutput, EmitTarget, WorldRoster};

#[derive(Clone, Debug)]
pub(crate) struct EmitRecord {
    pub(crate) target: EmitTarget,
    pub(crate) sound: SoundRef,
    pub(crate) category: SoundCategory,
    pub(crate) volume: f32,
    pub(crate) pitch: f32,
}

/// An [`AudioOutput`] that records every emission and silence call.
#[derive(Default)]
pub(crate) struct RecordingOutput {
    emits: Mutex<Vec<EmitRecord>>,
    silences: Mutex<Vec<(PlayerId, SoundRef, SoundCategory)>>,
}

impl RecordingOutput {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit_count(&self) -> usize {
        self.emits.lock().len()
    }

    pub(crate) fn last_emit(&self) -> Option<EmitRecord> {
        self.emits.lock().last().cloned()
    }

    pub(crate) fn emits(&self) -> Vec<EmitRecord> {
        self.emits.lock().clone()
    }

    pub(crate) fn emits_for_player(&self, player: PlayerId) -> Vec<EmitRecord> {
        self.emits
            .lock()
            .iter()
            .filter(|record| record.target == EmitTarget::Player(player))
            .cloned()
            .collect()
    }

    pub(crate) fn silences_for_player(&self, player: PlayerId) -> usize {
        self.silences
            .lock()
            .iter()
            .filter(|(recipient, _, _)| *recipient == player)
            .count()
    }

    pub(crate) fn clear(&self) {
        self.emits.lock().clear();
        self.silences.lock().clear();
    }
}

impl AudioOutput for RecordingOutput {
    fn emit_to_player(
        &self,
        player: PlayerId,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        self.emits.lock().push(EmitRecord {
            target: EmitTarget::Player(player),
            sound: sound.clone(),
            category,
            volume,
            pitch,
        });
    }

    fn emit_at_location(
        &self,
        location: Position,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        self.emits.lock().push(EmitRecord {
            target: EmitTarget::Location(location),
            sound: sound.clone(),
            category,
            volume,
            pitch,
        });
    }

    fn silence(&self, player: PlayerId, sound: &SoundRef, category: SoundCategory) {
        self.silences.lock().push((player, sound.clone(), category));
    }
}

/// An [`AudioOutput`] that panics on its first emission and records like a
/// [`RecordingOutput`] afterwards, for exercising fault absorption.
pub(crate) struct PanicOnceOutput {
    armed: AtomicBool,
    inner: RecordingOutput,
}

impl PanicOnceOutput {
    pub(crate) fn new() -> Self {
        Self {
            armed: AtomicBool::new(true),
            inner: RecordingOutput::new(),
        }
    }

    pub(crate) fn emit_count(&self) -> usize {
        self.inner.emit_count()
    }

    fn trip(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            panic!("injected playback fault");
        }
    }
}

impl AudioOutput for PanicOnceOutput {
    fn emit_to_player(
        &self,
        player: PlayerId,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        self.trip();
        self.inner
            .emit_to_player(player, sound, category, volume, pitch);
    }

    fn emit_at_location(
        &self,
        location: Position,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        self.trip();
        self.inner
            .emit_at_location(location, sound, category, volume, pitch);
    }

    fn silence(&self, player: PlayerId, sound: &SoundRef, category: SoundCategory) {
        self.inner.silence(player, sound, category);
    }
}

/// A [`WorldRoster`] whose membership is placed explicitly by the test.
#[derive(Default)]
pub(crate) struct ScriptedRoster {
    positions: Mutex<FxHashMap<PlayerId, Position>>,
    position_queries: AtomicU32,
}

impl ScriptedRoster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn place(&self, player: PlayerId, position: Position) {
        self.positions.lock().insert(player, position);
    }

    pub(crate) fn remove(&self, player: PlayerId) {
        self.positions.lock().remove(&player);
    }

    /// Number of times `player_position` has been consulted; used to verify
    /// that the distance cache actually short-circuits lookups.
    pub(crate) fn position_queries(&self) -> u32 {
        self.position_queries.load(Ordering::Relaxed)
    }
}

impl WorldRoster for ScriptedRoster {
    fn players_in_world(&self, world: WorldId) -> Vec<PlayerId> {
        self.positions
            .lock()
            .iter()
            .filter(|(_, position)| position.world == world)
            .map(|(player, _)| *player)
            .collect()
    }

    fn player_position(&self, player: PlayerId) -> Option<Position> {
        self.position_queries.fetch_add(1, Ordering::Relaxed);
        self.positions.lock().get(&player).copied()
    }

    fn online_players(&self) -> Vec<PlayerId> {
        self.positions.lock().keys().copied().collect()
    }
}
