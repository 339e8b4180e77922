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

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use sonolite_core::ids::{PlayerId, WorldId, ZoneId};

use crate::playback::WorldRoster;

use super::zone::ZoneInstance;

struct CachedDistance {
    distance_squared: f64,
    computed_at: Instant,
}

pub(crate) type ZoneRef = Arc<Mutex<ZoneInstance>>;

/// Per-world zone index with a time-bounded (player, zone) distance cache.
///
/// The cached squared distance is the single source of truth for both zone
/// membership and loudness: the two can therefore never disagree within a TTL
/// window, at the cost of lagging live positions by up to the TTL. The TTL is
/// deliberately much shorter than the travel time across a typical zone
/// radius, but long enough that a (player, zone) pair is not recomputed every
/// tick.
pub(crate) struct SpatialIndex {
    /// Insertion-ordered buckets; zone overlap is legitimate and all matching
    /// zones fire, so no sorting or tie-breaking happens here.
    world_zones: RwLock<FxHashMap<WorldId, Vec<ZoneRef>>>,
    distance_cache: RwLock<FxHashMap<PlayerId, FxHashMap<ZoneId, CachedDistance>>>,
    cache_ttl: Duration,
}

impl SpatialIndex {
    pub(crate) fn new(cache_ttl: Duration) -> SpatialIndex {
        SpatialIndex {
            world_zones: RwLock::new(FxHashMap::default()),
            distance_cache: RwLock::new(FxHashMap::default()),
            cache_ttl,
        }
    }

    pub(crate) fn add_zone(&self, zone: ZoneRef) {
        let world = zone.lock().world();
        self.world_zones.write().entry(world).or_default().push(zone);
    }

    pub(crate) fn remove_zone(&self, world: WorldId, id: ZoneId) {
        let mut world_zones = self.world_zones.write();
        if let Some(zones) = world_zones.get_mut(&world) {
            zones.retain(|zone| zone.lock().id() != id);
            if zones.is_empty() {
                world_zones.remove(&world);
            }
        }
    }

    /// Re-indexes a zone after a geometry change (remove + add).
    pub(crate) fn update_zone(&self, zone: &ZoneRef) {
        let (world, id) = {
            let zone = zone.lock();
            (zone.world(), zone.id())
        };
        self.remove_zone(world, id);
        self.add_zone(zone.clone());
    }

    /// Active zones in the player's world whose cached-or-recomputed distance
    /// puts the player inside the radius, in bucket insertion order.
    pub(crate) fn zones_in_range(
        &self,
        player: PlayerId,
        roster: &dyn WorldRoster,
        now: Instant,
    ) -> SmallVec<[ZoneRef; 8]> {
        let mut result = SmallVec::new();
        let position = match roster.player_position(player) {
            Some(position) => position,
            None => return result,
        };
        let zones: Vec<ZoneRef> = match self.world_zones.read().get(&position.world) {
            Some(zones) => zones.clone(),
            None => return result,
        };
        for zone in zones {
            let radius_squared = {
                let zone = zone.lock();
                if !zone.is_active() {
                    continue;
                }
                zone.radius_squared()
            };
            if let Some(distance_squared) =
                self.cached_distance_squared(player, &zone, roster, now)
            {
                if distance_squared <= radius_squared {
                    result.push(zone);
                }
            }
        }
        result
    }

    /// Squared player-zone distance, served from the cache while the entry is
    /// younger than the TTL and recomputed from live positions otherwise.
    /// `None` when the player is offline or in a different world than the
    /// zone (nothing is cached in that case).
    pub(crate) fn cached_distance_squared(
        &self,
        player: PlayerId,
        zone: &ZoneRef,
        roster: &dyn WorldRoster,
        now: Instant,
    ) -> Option<f64> {
        let (zone_id, center) = {
            let zone = zone.lock();
            (zone.id(), zone.center())
        };

        {
            let cache = self.distance_cache.read();
            if let Some(entry) = cache.get(&player).and_then(|c| c.get(&zone_id)) {
                if now.saturating_duration_since(entry.computed_at) < self.cache_ttl {
                    return Some(entry.distance_squared);
                }
            }
        }

        let position = roster.player_position(player)?;
        let distance_squared = position.distance_squared(&center)?;
        self.distance_cache
            .write()
            .entry(player)
            .or_default()
            .insert(
                zone_id,
                CachedDistance {
                    distance_squared,
                    computed_at: now,
                },
            );
        Some(distance_squared)
    }

    /// Purges cache entries older than 3x the TTL and drops emptied per-player
    /// buckets. Run periodically (not every tick) by the processor so
    /// steady-state memory stays bounded without a per-tick sweep cost.
    pub(crate) fn cleanup(&self, now: Instant) {
        let expiry = self.cache_ttl * 3;
        let mut cache = self.distance_cache.write();
        for entries in cache.values_mut() {
            entries.retain(|_, entry| now.saturating_duration_since(entry.computed_at) <= expiry);
        }
        cache.retain(|_, entries| !entries.is_empty());
    }

    /// Drops all cached distances for a disconnected player.
    pub(crate) fn clear_player_cache(&self, player: PlayerId) {
        self.distance_cache.write().remove(&player);
    }

    pub(crate) fn clear(&self) {
        self.world_zones.write().clear();
        self.distance_cache.write().clear();
    }

    #[cfg(test)]
    fn cached_entry_count(&self) -> usize {
        self.distance_cache
            .read()
            .values()
            .map(|entries| entries.len())
            .sum()
    }
}
