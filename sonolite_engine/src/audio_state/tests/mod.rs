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

//! End-to-end scenarios driven through the facade with a recording output.

use std::sync::Arc;
use std::time::Duration;

use sonolite_core::{
    audio::{BuiltinSound, SoundCategory},
    constants::FADE_FLOOR,
    coordinates::Position,
    ids::{PlayerId, WorldId},
};

use super::testutils::{RecordingOutput, ScriptedRoster};
use super::{AudioEffect, AudioSequence, AudioState, InstanceState};
use crate::playback::EmitTarget;
use crate::settings::EngineSettings;

#[ctor::ctor]
fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

fn test_engine() -> (Arc<AudioState>, Arc<RecordingOutput>, Arc<ScriptedRoster>) {
    let output = Arc::new(RecordingOutput::new());
    let roster = Arc::new(ScriptedRoster::new());
    let state = AudioState::new(EngineSettings::default(), output.clone(), roster.clone());
    (state, output, roster)
}

#[test]
fn zone_fires_attenuated_volume_after_interval() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 5.0, 0.0, 0.0));

    state
        .create_sound_zone(
            Position::new(world, 0.0, 0.0, 0.0),
            10.0,
            BuiltinSound::AmbientCave.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            20,
        )
        .unwrap();

    for _ in 0..19 {
        state.tick();
    }
    assert_eq!(output.emit_count(), 0, "zone must not fire mid-interval");

    state.tick();
    assert_eq!(output.emit_count(), 1);
    let emit = output.last_emit().unwrap();
    // Distance 5 of radius 10: (1 - 0.5)^2 = 0.25.
    assert!((emit.volume - 0.25).abs() < 1e-5, "volume was {}", emit.volume);
    assert_eq!(emit.target, EmitTarget::Player(player));
}

#[test]
fn zone_is_silent_exactly_at_its_radius() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 10.0, 0.0, 0.0));

    state
        .create_sound_zone(
            Position::new(world, 0.0, 0.0, 0.0),
            10.0,
            BuiltinSound::WindGust.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            1,
        )
        .unwrap();

    for _ in 0..3 {
        state.tick();
    }
    assert_eq!(output.emit_count(), 0);
}

#[test]
fn looping_sound_replays_on_its_interval() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 64.0, 0.0));

    state
        .play_looping_sound(
            EmitTarget::Player(player),
            BuiltinSound::PortalHum.into(),
            SoundCategory::Effects,
            0.7,
            1.0,
            5,
        )
        .unwrap();
    assert_eq!(output.emit_count(), 1, "initial play emits once");

    for _ in 0..12 {
        state.tick();
    }
    // Replays land on ticks 5 and 10.
    assert_eq!(output.emit_count(), 3);
}

#[test]
fn music_fade_in_reaches_target_volume() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let id = state
        .play_music(player, BuiltinSound::NoteBell.into(), 0.8, 1.0, 0.05)
        .unwrap();
    assert_eq!(output.emit_count(), 1, "fade-in starts at the floor");

    std::thread::sleep(Duration::from_millis(80));
    state.tick();

    let snapshot = state.sound_instance(id).unwrap();
    assert_eq!(snapshot.state, InstanceState::Playing);
    assert!((snapshot.volume - 0.8).abs() < 1e-5);
}

#[test]
fn music_fade_out_stops_and_reaps_the_instance() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let id = state
        .play_music(player, BuiltinSound::Rain.into(), 1.0, 1.0, 0.0)
        .unwrap();
    assert_eq!(state.active_sound_count(), 1);

    state.stop_music(player, 0.03);
    std::thread::sleep(Duration::from_millis(60));
    state.tick();

    assert!(state.sound_instance(id).is_none());
    assert_eq!(state.active_sound_count(), 0);
    assert_eq!(output.silences_for_player(player), 1);
}

#[test]
fn new_music_replaces_the_previous_track() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let first = state
        .play_music(player, BuiltinSound::AmbientCave.into(), 1.0, 1.0, 0.0)
        .unwrap();
    let second = state
        .play_music(player, BuiltinSound::NoteBell.into(), 1.0, 1.0, 0.0)
        .unwrap();

    assert!(state.sound_instance(first).is_none());
    assert!(state.sound_instance(second).is_some());
    assert_eq!(state.active_sound_count(), 1);
    assert_eq!(output.silences_for_player(player), 1);
}

#[test]
fn zero_global_volume_suppresses_direct_playback() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    state.set_global_volume(0.0);
    state.play_sound_to_player(
        player,
        &BuiltinSound::UiClick.into(),
        SoundCategory::Master,
        1.0,
        1.0,
    );
    assert_eq!(output.emit_count(), 0);

    state.set_global_volume(1.0);
    state.play_sound_to_player(
        player,
        &BuiltinSound::UiClick.into(),
        SoundCategory::Master,
        1.0,
        1.0,
    );
    assert_eq!(output.emit_count(), 1);
}

#[test]
fn player_quit_releases_their_sounds_and_overrides() {
    let (state, _output, roster) = test_engine();
    let world = WorldId::new_random();
    let leaver = PlayerId::new_random();
    let stayer = PlayerId::new_random();
    roster.place(leaver, Position::new(world, 0.0, 0.0, 0.0));
    roster.place(stayer, Position::new(world, 4.0, 0.0, 0.0));

    state.set_player_volume(leaver, 0.5);
    state
        .play_looping_sound(
            EmitTarget::Player(leaver),
            BuiltinSound::Footstep.into(),
            SoundCategory::Players,
            1.0,
            1.0,
            10,
        )
        .unwrap();
    state
        .play_looping_sound(
            EmitTarget::Player(stayer),
            BuiltinSound::Footstep.into(),
            SoundCategory::Players,
            1.0,
            1.0,
            10,
        )
        .unwrap();

    roster.remove(leaver);
    state.handle_player_quit(leaver);

    assert_eq!(state.active_sound_count(), 1);
    assert_eq!(state.player_volume(leaver), 1.0);
}

#[test]
fn world_change_stops_world_pinned_sounds() {
    let (state, output, roster) = test_engine();
    let overworld = WorldId::new_random();
    let nether = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(overworld, 0.0, 0.0, 0.0));

    state
        .play_looping_sound(
            EmitTarget::Player(player),
            BuiltinSound::WaterFlow.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            10,
        )
        .unwrap();
    assert_eq!(state.active_sound_count(), 1);

    roster.place(player, Position::new(nether, 0.0, 0.0, 0.0));
    state.handle_player_world_change(player);

    assert_eq!(state.active_sound_count(), 0);
    assert_eq!(output.silences_for_player(player), 1);
}

#[test]
fn removed_zone_never_fires_again() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 1.0, 0.0, 0.0));

    let zone = state
        .create_sound_zone(
            Position::new(world, 0.0, 0.0, 0.0),
            10.0,
            BuiltinSound::Thunder.into(),
            SoundCategory::Weather,
            1.0,
            1.0,
            2,
        )
        .unwrap();
    state.tick();
    state.tick();
    let fired = output.emit_count();
    assert_eq!(fired, 1);

    state.remove_sound_zone(zone);
    assert!(state.zone_instance(zone).is_none());
    for _ in 0..4 {
        state.tick();
    }
    assert_eq!(output.emit_count(), fired);
}

#[test]
fn shutdown_is_idempotent_and_silences_everything() {
    let (state, _output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    state
        .play_looping_sound(
            EmitTarget::Player(player),
            BuiltinSound::PortalHum.into(),
            SoundCategory::Effects,
            1.0,
            1.0,
            10,
        )
        .unwrap();
    state
        .create_sound_zone(
            Position::new(world, 0.0, 0.0, 0.0),
            8.0,
            BuiltinSound::AmbientCave.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            20,
        )
        .unwrap();

    state.shutdown();
    state.shutdown();

    assert!(state.is_shutting_down());
    assert_eq!(state.active_sound_count(), 0);
    assert!(state.zone_refs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_sequence_plays_everything_at_once() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let sequence = AudioSequence::builder()
        .then(
            AudioEffect::builder()
                .sound(BuiltinSound::LevelUp)
                .player(player)
                .build(),
        )
        .then(
            AudioEffect::builder()
                .sound(BuiltinSound::ItemPickup)
                .player(player)
                .build(),
        )
        .concurrent()
        .build();
    state.play_sequence(sequence);

    assert_eq!(output.emit_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn sequential_sequence_spaces_effects_by_duration() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let sequence = AudioSequence::builder()
        .then(
            AudioEffect::builder()
                .sound(BuiltinSound::LevelUp)
                .player(player)
                .duration(0.05)
                .build(),
        )
        .then(
            AudioEffect::builder()
                .sound(BuiltinSound::NoteBell)
                .player(player)
                .build(),
        )
        .build();
    state.play_sequence(sequence);
    assert_eq!(output.emit_count(), 1, "second effect is deferred");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(output.emit_count(), 2);
}

#[test]
fn zone_membership_uses_cached_distance() {
    let (state, _output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 3.0, 0.0, 0.0));

    let near = state
        .create_sound_zone(
            Position::new(world, 0.0, 0.0, 0.0),
            10.0,
            BuiltinSound::AmbientCave.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            20,
        )
        .unwrap();
    state
        .create_sound_zone(
            Position::new(world, 500.0, 0.0, 0.0),
            10.0,
            BuiltinSound::WindGust.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            20,
        )
        .unwrap();

    let containing = state.zones_containing(player);
    assert_eq!(containing.len(), 1);
    assert_eq!(containing[0].id, near);
}

#[test]
fn events_drive_playback_through_handlers() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let state_for_handler = Arc::downgrade(&state);
    state.register_handler(
        "player_level_up",
        super::EventPriority::Normal,
        false,
        Box::new(move |event| {
            if let (Some(state), Some(sound)) =
                (state_for_handler.upgrade(), event.sound.clone())
            {
                for target in event.target_players.clone() {
                    state.play_sound_to_player(
                        target,
                        &sound,
                        event.category,
                        event.volume,
                        event.pitch,
                    );
                }
            }
            Ok(())
        }),
    );

    let mut event = super::AudioEvent::new("player_level_up")
        .with_target_player(player)
        .with_sound(BuiltinSound::LevelUp.into())
        .with_volume(0.9);
    assert!(state.trigger_event(&mut event));
    assert_eq!(output.emit_count(), 1);
    assert!((output.last_emit().unwrap().volume - 0.9).abs() < 1e-5);
}

#[test]
fn fading_effect_with_a_loop_interval_plays_as_music() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));

    let effect = AudioEffect::builder()
        .sound(BuiltinSound::AmbientCave)
        .category(SoundCategory::Ambient)
        .player(player)
        .volume(0.8)
        .fade_in(1.0)
        .looping(5)
        .build();
    state.play_effect(&effect);

    // The fade takes precedence: one music-channel emission at the fade
    // floor, not a full-volume looping start.
    assert_eq!(output.emit_count(), 1);
    let emit = output.last_emit().unwrap();
    assert_eq!(emit.category, SoundCategory::Music);
    assert!(emit.volume <= FADE_FLOOR + 1e-5, "volume was {}", emit.volume);
    assert_eq!(state.active_sound_count(), 1);
}

#[test]
fn effect_targets_players_before_its_location() {
    let (state, output, roster) = test_engine();
    let world = WorldId::new_random();
    let player = PlayerId::new_random();
    roster.place(player, Position::new(world, 0.0, 0.0, 0.0));
    let location = Position::new(world, 3.0, 0.0, 0.0);

    let effect = AudioEffect::builder()
        .sound(BuiltinSound::UiClick)
        .category(SoundCategory::Effects)
        .player(player)
        .location(location)
        .build();
    state.play_effect(&effect);

    // The addressed player absorbs the effect; the location is only a
    // fallback and must not produce a second emission.
    assert_eq!(output.emit_count(), 1);
    assert_eq!(output.last_emit().unwrap().target, EmitTarget::Player(player));

    output.clear();
    let effect = AudioEffect::builder()
        .sound(BuiltinSound::UiClick)
        .category(SoundCategory::Effects)
        .location(location)
        .build();
    state.play_effect(&effect);
    assert_eq!(output.emit_count(), 1);
    assert_eq!(
        output.last_emit().unwrap().target,
        EmitTarget::Location(location)
    );
}

#[test]
fn looping_sound_can_be_retuned_mid_flight() {
    let (state, output, _roster) = test_engine();
    let world = WorldId::new_random();
    let origin = Position::new(world, 0.0, 0.0, 0.0);

    let id = state
        .play_looping_sound(
            EmitTarget::Location(origin),
            BuiltinSound::PortalHum.into(),
            SoundCategory::Blocks,
            1.0,
            1.0,
            4,
        )
        .unwrap();
    assert_eq!(output.emit_count(), 1);

    let moved = Position::new(world, 8.0, 0.0, 0.0);
    state.set_sound_volume(id, 0.5);
    state.set_sound_pitch(id, 1.5);
    state.set_sound_location(id, moved);

    let snapshot = state.sound_instance(id).unwrap();
    assert_eq!(snapshot.volume, 0.5);
    assert_eq!(snapshot.pitch, 1.5);
    assert_eq!(snapshot.target, EmitTarget::Location(moved));

    for _ in 0..4 {
        state.tick();
    }
    // The next loop replay carries the retuned parameters.
    assert_eq!(output.emit_count(), 2);
    let emit = output.last_emit().unwrap();
    assert_eq!(emit.target, EmitTarget::Location(moved));
    assert!((emit.volume - 0.5).abs() < 1e-5);
    assert!((emit.pitch - 1.5).abs() < 1e-5);
}

#[test]
fn invalid_zone_radii_are_rejected() {
    let (state, _output, _roster) = test_engine();
    let world = WorldId::new_random();
    let center = Position::new(world, 0.0, 0.0, 0.0);
    let sound = BuiltinSound::AmbientCave;

    for radius in [f64::NAN, f64::INFINITY, -1.0, 0.0] {
        assert!(
            state
                .create_sound_zone(
                    center,
                    radius,
                    sound.into(),
                    SoundCategory::Ambient,
                    1.0,
                    1.0,
                    20,
                )
                .is_none(),
            "radius {radius} must be rejected"
        );
    }

    let id = state
        .create_sound_zone(
            center,
            10.0,
            sound.into(),
            SoundCategory::Ambient,
            1.0,
            1.0,
            20,
        )
        .unwrap();
    state.set_zone_radius(id, f64::NAN);
    state.set_zone_radius(id, -2.0);
    assert_eq!(state.zone_instance(id).unwrap().radius, 10.0);
}
