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

//! The audio engine proper: pooled sound instances, spatial zones, the event
//! bus, and the per-tick processor, all owned by [`AudioState`].

use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    constants::AUDIBLE_EPSILON,
    coordinates::Position,
    ids::{PlayerId, SoundId, ZoneId},
    util::clamp_unit,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::playback::{AudioOutput, EmitTarget, WorldRoster};
use crate::settings::EngineSettings;

pub mod effects;
pub mod events;
pub mod instance;
pub mod zone;

pub(crate) mod handlers;
mod pool;
mod processor;
mod spatial;

#[cfg(test)]
pub(crate) mod testutils;
#[cfg(test)]
mod tests;

pub use effects::{AudioEffect, AudioSequence};
pub use events::{AudioEvent, EventHandler, EventPriority, SubscriberId, Subscription};
pub use instance::{InstanceSnapshot, InstanceState};
pub use zone::ZoneSnapshot;

use instance::InstanceParams;
use pool::{InstanceKey, InstancePool};
use processor::AudioProcessor;
use spatial::{SpatialIndex, ZoneRef};
use zone::ZoneInstance;

/// The engine facade. Owns the instance pool, the spatial zone index, the
/// event bus and the processor; the host owns an `Arc<AudioState>` and drives
/// it either by calling [`tick`](AudioState::tick) from its own scheduler or
/// by spawning the built-in ticker.
///
/// All operations are defensive: an offline player, a missing id, or an
/// exhausted pool degrades to a no-op or an absent result, never an error the
/// caller has to handle mid-gameplay.
pub struct AudioState {
    settings: EngineSettings,
    output: Arc<dyn AudioOutput>,
    roster: Arc<dyn WorldRoster>,
    pool: InstancePool,
    spatial: SpatialIndex,
    events: events::EventBus,
    processor: AudioProcessor,

    /// Tracked live instances: the id handed to callers, and the pool key
    /// behind it. Sole owner of the id→key association.
    active_sounds: RwLock<FxHashMap<SoundId, InstanceKey>>,
    /// Current music instance per player, so a new track replaces the old.
    music: RwLock<FxHashMap<PlayerId, SoundId>>,
    zones: RwLock<FxHashMap<ZoneId, ZoneRef>>,

    global_volume: Mutex<f32>,
    player_volumes: RwLock<FxHashMap<PlayerId, f32>>,

    early_shutdown: CancellationToken,
}

impl AudioState {
    pub fn new(
        settings: EngineSettings,
        output: Arc<dyn AudioOutput>,
        roster: Arc<dyn WorldRoster>,
    ) -> Arc<AudioState> {
        let pool = InstancePool::new(settings.max_pool_size, settings.max_active_sounds);
        let spatial = SpatialIndex::new(settings.cache_ttl());
        Arc::new(AudioState {
            settings,
            output,
            roster,
            pool,
            spatial,
            events: events::EventBus::new(),
            processor: AudioProcessor::new(),
            active_sounds: RwLock::new(FxHashMap::default()),
            music: RwLock::new(FxHashMap::default()),
            zones: RwLock::new(FxHashMap::default()),
            global_volume: Mutex::new(1.0),
            player_volumes: RwLock::new(FxHashMap::default()),
            early_shutdown: CancellationToken::new(),
        })
    }

    // === Volume model ===

    pub fn set_global_volume(&self, volume: f32) {
        *self.global_volume.lock() = clamp_unit(volume);
    }

    pub fn global_volume(&self) -> f32 {
        *self.global_volume.lock()
    }

    pub fn set_player_volume(&self, player: PlayerId, volume: f32) {
        self.player_volumes
            .write()
            .insert(player, clamp_unit(volume));
    }

    /// Per-player volume override, 1.0 unless set.
    pub fn player_volume(&self, player: PlayerId) -> f32 {
        self.player_volumes
            .read()
            .get(&player)
            .copied()
            .unwrap_or(1.0)
    }

    pub(crate) fn normalized_volume(&self, base: f32) -> f32 {
        clamp_unit(base) * self.global_volume()
    }

    pub(crate) fn normalized_player_volume(&self, base: f32, player: PlayerId) -> f32 {
        self.normalized_volume(base) * self.player_volume(player)
    }

    // === Direct playback (pass-through, not pooled) ===

    /// One-shot emission at a world location, scaled by the global volume.
    /// Suppressed below the audibility epsilon.
    pub fn play_sound_at(
        &self,
        location: Position,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        let effective = self.normalized_volume(volume);
        if effective < AUDIBLE_EPSILON {
            return;
        }
        self.output
            .emit_at_location(location, sound, category, effective, pitch);
    }

    /// One-shot emission to a player, scaled by the global and per-player
    /// volumes. No-op for offline players.
    pub fn play_sound_to_player(
        &self,
        player: PlayerId,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        if !self.roster.is_online(player) {
            return;
        }
        let effective = self.normalized_player_volume(volume, player);
        if effective < AUDIBLE_EPSILON {
            return;
        }
        self.output
            .emit_to_player(player, sound, category, effective, pitch);
    }

    /// Silences a named sound on a player's client.
    pub fn stop_sound(&self, player: PlayerId, sound: &SoundRef, category: SoundCategory) {
        self.output.silence(player, sound, category);
    }

    // === Music ===

    /// Starts (or replaces) a player's music track. Any of the player's
    /// existing music-category instances are stopped and released first. With
    /// a positive `fade_in_seconds` the track fades up from the floor;
    /// otherwise it starts at the normalized volume immediately. Returns
    /// `None` for offline players or when the pool is exhausted.
    pub fn play_music(
        &self,
        player: PlayerId,
        sound: SoundRef,
        volume: f32,
        pitch: f32,
        fade_in_seconds: f32,
    ) -> Option<SoundId> {
        let position = self.roster.player_position(player)?;
        self.stop_player_music_instances(player);

        let (id, key) = self.pool.obtain(InstanceParams {
            sound,
            category: SoundCategory::Music,
            volume,
            pitch,
            target: EmitTarget::Player(player),
            world: Some(position.world),
            looping: false,
            interval_ticks: 1,
        })?;
        self.active_sounds.write().insert(id, key);
        self.music.write().insert(player, id);

        if fade_in_seconds > 0.0 {
            self.pool
                .with_instance(key, |inst| inst.fade_in(fade_in_seconds, &*self.output));
        } else {
            self.pool.with_instance(key, |inst| {
                let effective = self.normalized_player_volume(inst.volume(), player);
                if effective >= AUDIBLE_EPSILON {
                    if let Some(sound) = inst.sound() {
                        self.output.emit_to_player(
                            player,
                            sound,
                            inst.category(),
                            effective,
                            inst.pitch(),
                        );
                    }
                }
                inst.set_state(InstanceState::Playing);
            });
        }
        Some(id)
    }

    /// Fades out (or immediately stops) the player's current music. The
    /// instance stays tracked until the processor reaps it once `Stopped`.
    pub fn stop_music(&self, player: PlayerId, fade_out_seconds: f32) {
        let id = match self.music.write().remove(&player) {
            Some(id) => id,
            None => return,
        };
        let key = match self.active_sounds.read().get(&id).copied() {
            Some(key) => key,
            None => return,
        };
        self.pool.with_instance(key, |inst| {
            if fade_out_seconds > 0.0 {
                inst.fade_out(fade_out_seconds, &*self.output);
            } else {
                inst.stop(&*self.output);
            }
        });
    }

    // === Looping sounds ===

    /// Starts a pooled looping sound that replays every `interval_ticks`
    /// processor ticks. A player target must be online; a location target is
    /// pinned to its world. Returns `None` when the target is invalid or the
    /// pool is exhausted.
    pub fn play_looping_sound(
        &self,
        target: EmitTarget,
        sound: SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
        interval_ticks: u32,
    ) -> Option<SoundId> {
        let world = match target {
            EmitTarget::Player(player) => Some(self.roster.player_position(player)?.world),
            EmitTarget::Location(location) => Some(location.world),
        };
        let (id, key) = self.pool.obtain(InstanceParams {
            sound,
            category,
            volume,
            pitch,
            target,
            world,
            looping: true,
            interval_ticks,
        })?;
        self.active_sounds.write().insert(id, key);
        self.pool.with_instance(key, |inst| inst.play(&*self.output));
        Some(id)
    }

    /// Stops a looping (or any tracked) sound by id. The slot is reaped by
    /// the next processor tick.
    pub fn stop_looping_sound(&self, id: SoundId) {
        let key = match self.active_sounds.read().get(&id).copied() {
            Some(key) => key,
            None => return,
        };
        self.pool.with_instance(key, |inst| inst.stop(&*self.output));
    }

    /// Adjusts a tracked instance's volume (clamped to [0, 1]). Takes effect
    /// on its next emission: the next loop replay or fade step.
    pub fn set_sound_volume(&self, id: SoundId, volume: f32) {
        if let Some(key) = self.active_sounds.read().get(&id).copied() {
            self.pool.with_instance(key, |inst| inst.set_volume(volume));
        }
    }

    /// Adjusts a tracked instance's pitch, effective on its next emission.
    pub fn set_sound_pitch(&self, id: SoundId, pitch: f32) {
        if let Some(key) = self.active_sounds.read().get(&id).copied() {
            self.pool.with_instance(key, |inst| inst.set_pitch(pitch));
        }
    }

    /// Moves a tracked instance to a new location target, re-pinning it to
    /// the location's world.
    pub fn set_sound_location(&self, id: SoundId, location: Position) {
        if let Some(key) = self.active_sounds.read().get(&id).copied() {
            self.pool.with_instance(key, |inst| inst.set_location(location));
        }
    }

    // === Zones ===

    /// Creates and activates a spherical ambiance zone. Rejects non-positive
    /// radii with `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_sound_zone(
        &self,
        center: Position,
        radius: f64,
        sound: SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
        interval_ticks: u32,
    ) -> Option<ZoneId> {
        if !radius.is_finite() || radius <= 0.0 {
            warn!("Rejecting sound zone with invalid radius {radius}");
            return None;
        }
        let id = ZoneId::new_random();
        let mut zone = ZoneInstance::new(
            id,
            center,
            radius,
            sound,
            category,
            volume,
            pitch,
            interval_ticks,
        );
        zone.activate();
        let zone_ref: ZoneRef = Arc::new(Mutex::new(zone));
        self.zones.write().insert(id, zone_ref.clone());
        self.spatial.add_zone(zone_ref);
        Some(id)
    }

    pub fn remove_sound_zone(&self, id: ZoneId) {
        let zone_ref = match self.zones.write().remove(&id) {
            Some(zone_ref) => zone_ref,
            None => return,
        };
        let world = {
            let mut zone = zone_ref.lock();
            zone.deactivate();
            zone.world()
        };
        self.spatial.remove_zone(world, id);
    }

    /// Changes a zone's radius and re-indexes it. Non-finite or non-positive
    /// radii are ignored.
    pub fn set_zone_radius(&self, id: ZoneId, radius: f64) {
        if !radius.is_finite() || radius <= 0.0 {
            warn!("Ignoring invalid radius {radius} for zone {id}");
            return;
        }
        if let Some(zone_ref) = self.zones.read().get(&id).cloned() {
            zone_ref.lock().set_radius(radius);
            self.spatial.update_zone(&zone_ref);
        }
    }

    pub fn set_zone_volume(&self, id: ZoneId, volume: f32) {
        if let Some(zone_ref) = self.zones.read().get(&id) {
            zone_ref.lock().set_volume(volume);
        }
    }

    pub fn set_zone_pitch(&self, id: ZoneId, pitch: f32) {
        if let Some(zone_ref) = self.zones.read().get(&id) {
            zone_ref.lock().set_pitch(pitch);
        }
    }

    pub fn set_zone_interval(&self, id: ZoneId, interval_ticks: u32) {
        if let Some(zone_ref) = self.zones.read().get(&id) {
            zone_ref.lock().set_interval_ticks(interval_ticks);
        }
    }

    // === Lookup ===

    pub fn sound_instance(&self, id: SoundId) -> Option<InstanceSnapshot> {
        let key = self.active_sounds.read().get(&id).copied()?;
        self.pool.with_instance(key, |inst| inst.snapshot()).flatten()
    }

    pub fn zone_instance(&self, id: ZoneId) -> Option<ZoneSnapshot> {
        self.zones.read().get(&id).map(|zone| zone.lock().snapshot())
    }

    /// Active zones the player is currently inside, judged by the cached
    /// distance (so this can lag live movement by up to the cache TTL).
    pub fn zones_containing(&self, player: PlayerId) -> Vec<ZoneSnapshot> {
        self.spatial
            .zones_in_range(player, &*self.roster, std::time::Instant::now())
            .iter()
            .map(|zone| zone.lock().snapshot())
            .collect()
    }

    // === Bulk control ===

    /// Stops and releases every tracked instance targeting `player`, and
    /// forgets their music association.
    pub fn stop_all_sounds_for(&self, player: PlayerId) {
        self.music.write().remove(&player);
        for (id, key) in self.player_instances(player) {
            self.pool.with_instance(key, |inst| inst.stop(&*self.output));
            self.remove_sound_instance(id);
        }
    }

    /// Stops and releases every tracked instance.
    pub fn stop_all_sounds(&self) {
        self.music.write().clear();
        for (id, key) in self.active_sound_entries() {
            self.pool.with_instance(key, |inst| inst.stop(&*self.output));
            self.remove_sound_instance(id);
        }
    }

    // === Events ===

    /// Registers a batch of handlers under one fresh subscriber id; the whole
    /// batch can later be torn down with
    /// [`unregister_events`](AudioState::unregister_events).
    pub fn register_events(&self, subscriptions: Vec<Subscription>) -> SubscriberId {
        let owner = self.events.new_subscriber();
        self.events.register_all(owner, subscriptions);
        owner
    }

    /// Registers a single handler under a fresh subscriber id.
    pub fn register_handler(
        &self,
        event: impl Into<String>,
        priority: EventPriority,
        ignore_cancelled: bool,
        handler: EventHandler,
    ) -> SubscriberId {
        let owner = self.events.new_subscriber();
        self.events
            .register(owner, event, priority, ignore_cancelled, handler);
        owner
    }

    pub fn unregister_events(&self, owner: SubscriberId) {
        self.events.unregister(owner);
    }

    /// Fires an event through the bus. Returns whether any handler ran.
    pub fn trigger_event(&self, event: &mut AudioEvent) -> bool {
        self.events.fire(event)
    }

    // === Composite effects ===

    /// Plays one declarative effect. Fade-in wins over looping: a fading
    /// effect plays as music even when a loop interval is set; a non-fading
    /// looping effect becomes a pooled looping instance; everything else is a
    /// direct one-shot emission. Player targets (or every online player for a
    /// global effect) take precedence; the location is the fallback target
    /// when no player is addressed.
    pub fn play_effect(&self, effect: &AudioEffect) {
        let sound = match effect.sound() {
            Some(sound) => sound.clone(),
            None => {
                warn!("Ignoring audio effect with no sound");
                return;
            }
        };
        let players: Vec<PlayerId> = if effect.is_global() {
            self.roster.online_players()
        } else {
            effect.target_players().to_vec()
        };

        if effect.fade_in() > 0.0 {
            if !players.is_empty() {
                for player in players {
                    self.play_music(
                        player,
                        sound.clone(),
                        effect.volume(),
                        effect.pitch(),
                        effect.fade_in(),
                    );
                }
            } else if let Some(location) = effect.location() {
                // Location emissions have no per-player channel to fade.
                self.play_sound_at(
                    location,
                    &sound,
                    effect.category(),
                    effect.volume(),
                    effect.pitch(),
                );
            }
        } else if effect.is_looping() {
            if !players.is_empty() {
                for player in players {
                    self.play_looping_sound(
                        EmitTarget::Player(player),
                        sound.clone(),
                        effect.category(),
                        effect.volume(),
                        effect.pitch(),
                        effect.loop_interval(),
                    );
                }
            } else if let Some(location) = effect.location() {
                self.play_looping_sound(
                    EmitTarget::Location(location),
                    sound,
                    effect.category(),
                    effect.volume(),
                    effect.pitch(),
                    effect.loop_interval(),
                );
            }
        } else if !players.is_empty() {
            for player in players {
                self.play_sound_to_player(
                    player,
                    &sound,
                    effect.category(),
                    effect.volume(),
                    effect.pitch(),
                );
            }
        } else if let Some(location) = effect.location() {
            self.play_sound_at(
                location,
                &sound,
                effect.category(),
                effect.volume(),
                effect.pitch(),
            );
        }
    }

    /// Plays a sequence of effects. Concurrent sequences fire everything now;
    /// sequential ones play the first effect immediately and schedule each
    /// subsequent effect after the previous one's duration plus fades, on the
    /// current tokio runtime. Without a runtime the remainder degrades to
    /// immediate playback.
    pub fn play_sequence(self: &Arc<Self>, sequence: AudioSequence) {
        let mut effects = sequence.effects().to_vec();
        if effects.is_empty() {
            return;
        }
        if sequence.is_concurrent() {
            for effect in &effects {
                self.play_effect(effect);
            }
            return;
        }

        let first = effects.remove(0);
        self.play_effect(&first);
        if effects.is_empty() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No tokio runtime for sequential audio sequence; playing remainder now");
            for effect in &effects {
                self.play_effect(effect);
            }
            return;
        }

        let state = self.clone();
        let mut previous_delay = first.schedule_delay();
        tokio::spawn(
            async move {
                for effect in effects {
                    tokio::select! {
                        _ = state.early_shutdown.cancelled() => return,
                        _ = tokio::time::sleep(previous_delay) => {}
                    }
                    state.play_effect(&effect);
                    previous_delay = effect.schedule_delay();
                }
            }
            .instrument(tracing::info_span!("audio_sequence")),
        );
    }

    // === Player lifecycle hooks (called by the host) ===

    /// Host hook for a player disconnecting: stops their sounds, drops their
    /// volume override and their cached zone distances.
    pub fn handle_player_quit(&self, player: PlayerId) {
        self.stop_all_sounds_for(player);
        self.player_volumes.write().remove(&player);
        self.spatial.clear_player_cache(player);
    }

    /// Host hook for a player switching worlds: stops their world-pinned
    /// instances that no longer match, and invalidates their distance cache.
    pub fn handle_player_world_change(&self, player: PlayerId) {
        let new_world = self.roster.player_position(player).map(|p| p.world);
        for (id, key) in self.player_instances(player) {
            let orphaned = self
                .pool
                .with_instance(key, |inst| {
                    inst.is_world_specific() && inst.world() != new_world
                })
                .unwrap_or(false);
            if orphaned {
                self.pool.with_instance(key, |inst| inst.stop(&*self.output));
                self.remove_sound_instance(id);
            }
        }
        self.spatial.clear_player_cache(player);
    }

    // === Ticking and shutdown ===

    /// Runs one processing pass. Safe to call from any thread; overlapping
    /// calls are skipped by the processor's guard.
    pub fn tick(&self) {
        self.processor.tick(self);
    }

    /// Spawns a tokio task driving [`tick`](AudioState::tick) at the
    /// configured rate until [`shutdown`](AudioState::shutdown). Missed ticks
    /// are skipped, not queued.
    pub fn spawn_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(state.settings.tick_period());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = state.early_shutdown.cancelled() => break,
                        _ = interval.tick() => state.tick(),
                    }
                }
            }
            .instrument(tracing::info_span!("audio_ticker")),
        )
    }

    /// Stops everything and cancels the ticker. Idempotent; the engine cannot
    /// be restarted afterwards.
    pub fn shutdown(&self) {
        if self.early_shutdown.is_cancelled() {
            return;
        }
        self.early_shutdown.cancel();
        self.stop_all_sounds();
        for zone_ref in self.zones.write().drain().map(|(_, z)| z) {
            zone_ref.lock().deactivate();
        }
        self.spatial.clear();
        log::info!("Audio engine shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.early_shutdown.is_cancelled()
    }

    // === Diagnostics ===

    pub fn active_sound_count(&self) -> u32 {
        self.pool.active_count()
    }

    pub fn pooled_count(&self) -> u32 {
        self.pool.pooled_count()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // === Internal plumbing ===

    pub(crate) fn pool(&self) -> &InstancePool {
        &self.pool
    }

    pub(crate) fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub(crate) fn output(&self) -> &dyn AudioOutput {
        &*self.output
    }

    pub(crate) fn roster(&self) -> &dyn WorldRoster {
        &*self.roster
    }

    pub(crate) fn active_sound_entries(&self) -> Vec<(SoundId, InstanceKey)> {
        self.active_sounds
            .read()
            .iter()
            .map(|(id, key)| (*id, *key))
            .collect()
    }

    pub(crate) fn zone_refs(&self) -> Vec<ZoneRef> {
        self.zones.read().values().cloned().collect()
    }

    /// Forgets a tracked instance and returns its slot to the pool.
    pub(crate) fn remove_sound_instance(&self, id: SoundId) {
        let key = match self.active_sounds.write().remove(&id) {
            Some(key) => key,
            None => return,
        };
        self.music.write().retain(|_, music_id| *music_id != id);
        self.pool.release(key);
    }

    /// Stops and releases the player's current music-category instances.
    fn stop_player_music_instances(&self, player: PlayerId) {
        self.music.write().remove(&player);
        for (id, key) in self.player_instances(player) {
            let is_music = self
                .pool
                .with_instance(key, |inst| inst.category() == SoundCategory::Music)
                .unwrap_or(false);
            if is_music {
                self.pool.with_instance(key, |inst| inst.stop(&*self.output));
                self.remove_sound_instance(id);
            }
        }
    }

    fn player_instances(&self, player: PlayerId) -> Vec<(SoundId, InstanceKey)> {
        self.active_sound_entries()
            .into_iter()
            .filter(|(_, key)| {
                self.pool
                    .with_instance(*key, |inst| {
                        inst.target() == Some(&EmitTarget::Player(player))
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}
