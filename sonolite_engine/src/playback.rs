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
    ids::{PlayerId, WorldId},
};

/// Where a sound emission is aimed: a single player's ears, or a fixed point
/// in a world that the host makes audible to whoever it deems in earshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EmitTarget {
    Player(PlayerId),
    Location(Position),
}

/// The host's playback primitive. The engine decides *what* plays, *when* and
/// *how loud*; all actual I/O (network packets, client mixing) happens behind
/// this trait.
///
/// Implementations must be cheap and non-blocking; these are called from the
/// tick thread with internal locks held.
pub trait AudioOutput: Send + Sync + 'static {
    /// Plays `sound` for a single player.
    fn emit_to_player(
        &self,
        player: PlayerId,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    );

    /// Plays `sound` at a fixed world location.
    fn emit_at_location(
        &self,
        position: Position,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    );

    /// Stops an already-playing sound for a player. Only meaningful for
    /// player-targeted playback; location emissions are fire-and-forget.
    fn silence(&self, player: PlayerId, sound: &SoundRef, category: SoundCategory);

    /// Dispatches on an [`EmitTarget`].
    fn emit(
        &self,
        target: &EmitTarget,
        sound: &SoundRef,
        category: SoundCategory,
        volume: f32,
        pitch: f32,
    ) {
        match target {
            EmitTarget::Player(player) => {
                self.emit_to_player(*player, sound, category, volume, pitch)
            }
            EmitTarget::Location(position) => {
                self.emit_at_location(*position, sound, category, volume, pitch)
            }
        }
    }
}

/// The host's view of who is online and where they are.
///
/// A player that has disconnected (or is mid-teleport with no position yet)
/// reports `None` from [`WorldRoster::player_position`]; the engine treats
/// that as "offline" and degrades to no-ops rather than erroring.
pub trait WorldRoster: Send + Sync + 'static {
    fn players_in_world(&self, world: WorldId) -> Vec<PlayerId>;

    fn player_position(&self, player: PlayerId) -> Option<Position>;

    fn online_players(&self) -> Vec<PlayerId>;

    fn is_online(&self, player: PlayerId) -> bool {
        self.player_position(player).is_some()
    }
}
