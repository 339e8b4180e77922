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

//! Per-tick driver: advances fades and loop counters, fires zone ambiance,
//! reaps stopped instances, and periodically sweeps the distance cache.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

use smallvec::SmallVec;
use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    constants::AUDIBLE_EPSILON,
    ids::SoundId,
};

use super::handlers::run_handler_impl;
use super::instance::InstanceState;
use super::AudioState;
use crate::playback::EmitTarget;

pub(crate) struct AudioProcessor {
    running: AtomicBool,
    cleanup_counter: AtomicU32,
}

impl AudioProcessor {
    pub(crate) fn new() -> AudioProcessor {
        AudioProcessor {
            running: AtomicBool::new(false),
            cleanup_counter: AtomicU32::new(0),
        }
    }

    /// Runs one processing pass. If a previous pass is still in flight (a slow
    /// tick overlapping the next timer fire), this one is skipped rather than
    /// run concurrently.
    pub(crate) fn tick(&self, state: &AudioState) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Audio tick overran its interval; skipping this tick");
            return;
        }
        let result = run_handler_impl(
            || {
                self.tick_inner(state);
                Ok(())
            },
            "audio_tick",
        );
        if let Err(e) = result {
            log::error!("Audio tick failed: {e:?}");
        }
        self.running.store(false, Ordering::Release);
    }

    fn tick_inner(&self, state: &AudioState) {
        let now = Instant::now();
        self.advance_instances(state, now);
        self.fire_zones(state, now);

        let counter = self.cleanup_counter.fetch_add(1, Ordering::AcqRel) + 1;
        if counter >= state.settings().spatial_cleanup_interval_ticks {
            self.cleanup_counter.store(0, Ordering::Release);
            state.spatial().cleanup(now);
        }
    }

    /// Advances fades and loop counters for every tracked instance, then
    /// releases the ones that reached `Stopped`.
    fn advance_instances(&self, state: &AudioState, now: Instant) {
        let mut finished: SmallVec<[SoundId; 8]> = SmallVec::new();

        for (id, key) in state.active_sound_entries() {
            let survived = state.pool().with_instance(key, |instance| {
                if instance.state() == InstanceState::Stopped {
                    return false;
                }
                if instance.is_fading() {
                    let volume = instance.update_fading(now, state.output());
                    if instance.is_fading() {
                        self.emit_fade_step(state, instance, volume);
                    } else if instance.state() == InstanceState::Stopped {
                        return false;
                    }
                }
                if instance.is_looping() && instance.state() == InstanceState::Playing {
                    instance.increment_tick(state.output());
                }
                instance.state() != InstanceState::Stopped
            });
            match survived {
                Some(true) => {}
                // Stopped, or the key went stale under us.
                Some(false) | None => finished.push(id),
            }
        }

        for id in finished {
            state.remove_sound_instance(id);
        }
    }

    /// Re-issues the playback call for a mid-fade instance at the scaled
    /// volume, honoring the global and per-player overrides.
    fn emit_fade_step(
        &self,
        state: &AudioState,
        instance: &super::instance::SoundInstance,
        fade_volume: f32,
    ) {
        let (target, sound) = match (instance.target(), instance.sound()) {
            (Some(target), Some(sound)) => (*target, sound),
            _ => return,
        };
        let effective = match target {
            EmitTarget::Player(player) => state.normalized_player_volume(fade_volume, player),
            EmitTarget::Location(_) => state.normalized_volume(fade_volume),
        };
        if effective < AUDIBLE_EPSILON {
            return;
        }
        state
            .output()
            .emit(&target, sound, instance.category(), effective, instance.pitch());
    }

    /// Advances every active zone's interval counter and, on firing ticks,
    /// emits the zone sound to each in-range player at distance-scaled volume.
    fn fire_zones(&self, state: &AudioState, now: Instant) {
        struct Firing {
            world: sonolite_core::ids::WorldId,
            radius_squared: f64,
            sound: SoundRef,
            category: SoundCategory,
            volume: f32,
            pitch: f32,
        }

        for zone_ref in state.zone_refs() {
            let firing = {
                let mut zone = zone_ref.lock();
                if !zone.is_active() {
                    continue;
                }
                zone.increment_tick();
                if !zone.fires_this_tick() {
                    continue;
                }
                Firing {
                    world: zone.world(),
                    radius_squared: zone.radius_squared(),
                    sound: zone.sound().clone(),
                    category: zone.category(),
                    volume: zone.volume(),
                    pitch: zone.pitch(),
                }
            };

            for player in state.roster().players_in_world(firing.world) {
                let distance_squared = match state
                    .spatial()
                    .cached_distance_squared(player, &zone_ref, state.roster(), now)
                {
                    Some(distance_squared) => distance_squared,
                    None => continue,
                };
                if distance_squared > firing.radius_squared {
                    continue;
                }
                let falloff = Self::falloff_factor(distance_squared, firing.radius_squared);
                let effective =
                    state.normalized_player_volume(firing.volume * falloff, player);
                if effective < AUDIBLE_EPSILON {
                    continue;
                }
                state.output().emit_to_player(
                    player,
                    &firing.sound,
                    firing.category,
                    effective,
                    firing.pitch,
                );
            }
        }
    }

    /// Quadratic attenuation of a zone's volume with distance from the center:
    /// full volume at the center, zero at the radius.
    fn falloff_factor(distance_squared: f64, radius_squared: f64) -> f32 {
        if distance_squared <= 0.0 || radius_squared <= 0.0 {
            return 1.0;
        }
        let linear = 1.0 - (distance_squared / radius_squared).sqrt();
        (linear * linear) as f32
    }
}
