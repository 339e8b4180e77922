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

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sonolite_core::constants::defaults;

/// Engine tuning knobs. Defaults match the nominal 20Hz host tick and are
/// sized for a mid-size server; hosts can override via a RON file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound on pooled instance storage (live + recycled slots).
    pub max_pool_size: u32,
    /// Hard cap on concurrently active sound instances. Obtaining past the
    /// cap yields an absent result ("sound dropped"), never an error.
    pub max_active_sounds: u32,
    /// Freshness window for cached (player, zone) squared distances.
    pub distance_cache_ttl_ms: u64,
    /// How many ticks between distance-cache sweeps.
    pub spatial_cleanup_interval_ticks: u32,
    /// Tick rate used by the optional built-in ticker task.
    pub ticks_per_second: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_pool_size: defaults::MAX_POOL_SIZE,
            max_active_sounds: defaults::MAX_ACTIVE_SOUNDS,
            distance_cache_ttl_ms: defaults::DISTANCE_CACHE_TTL_MS,
            spatial_cleanup_interval_ticks: defaults::SPATIAL_CLEANUP_INTERVAL_TICKS,
            ticks_per_second: defaults::TICKS_PER_SECOND,
        }
    }
}

impl EngineSettings {
    pub fn from_ron_file(path: &Path) -> Result<EngineSettings> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading engine settings from {:?}", path))?;
        ron::from_str(&text).with_context(|| format!("Parsing engine settings from {:?}", path))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.distance_cache_ttl_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second.max(1) as f64)
    }
}
