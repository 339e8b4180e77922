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

/// Final volumes below this are treated as inaudible and the playback call is
/// suppressed entirely. Not an error; the sound is simply dropped.
pub const AUDIBLE_EPSILON: f32 = 0.01;

/// Starting volume for fade-ins. Just audible, so the client allocates a
/// playback channel immediately rather than when the fade ramps up.
pub const FADE_FLOOR: f32 = 0.01;

pub mod defaults {
    /// Upper bound on pooled instance storage (live + recycled).
    pub const MAX_POOL_SIZE: u32 = 128;
    /// Hard cap on concurrently active sound instances.
    pub const MAX_ACTIVE_SOUNDS: u32 = 64;
    /// How long a cached (player, zone) distance stays fresh.
    pub const DISTANCE_CACHE_TTL_MS: u64 = 500;
    /// Distance-cache sweep cadence, in ticks.
    pub const SPATIAL_CLEANUP_INTERVAL_TICKS: u32 = 100;
    /// Nominal host tick rate.
    pub const TICKS_PER_SECOND: u32 = 20;
    /// Loop interval when game content does not specify one.
    pub const LOOP_INTERVAL_TICKS: u32 = 20;
    /// Zone emission interval when game content does not specify one.
    pub const ZONE_INTERVAL_TICKS: u32 = 40;
}
