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

use std::fmt::Debug;

use cgmath::{vec3, InnerSpace, Vector3};

use crate::ids::WorldId;

/// A point in a specific world.
///
/// Distances are only meaningful between positions in the same world; the
/// distance helpers return `None` across worlds rather than inventing a value.
#[derive(Clone, Copy, PartialEq)]
pub struct Position {
    pub world: WorldId,
    pub vector: Vector3<f64>,
}

impl Position {
    pub fn new(world: WorldId, x: f64, y: f64, z: f64) -> Position {
        Position {
            world,
            vector: vec3(x, y, z),
        }
    }

    #[inline]
    pub fn same_world(&self, other: &Position) -> bool {
        self.world == other.world
    }

    /// Squared Euclidean distance to `other`, or `None` if the positions are
    /// in different worlds.
    pub fn distance_squared(&self, other: &Position) -> Option<f64> {
        if !self.same_world(other) {
            return None;
        }
        Some((self.vector - other.vector).magnitude2())
    }

    pub fn distance(&self, other: &Position) -> Option<f64> {
        self.distance_squared(other).map(f64::sqrt)
    }
}

impl Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "[{}, {}, {}] in {:?}",
            self.vector.x, self.vector.y, self.vector.z, self.world
        ))
    }
}
