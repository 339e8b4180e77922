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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::error;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use sonolite_core::{
    audio::{SoundCategory, SoundRef},
    coordinates::Position,
    ids::{EventId, PlayerId},
};

use super::handlers::run_handler_impl;

/// Dispatch priority. Lower values fire first; CRITICAL handlers run last and
/// get the final say (e.g. to veto by cancelling after everyone else ran).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// A named audio event flowing through the bus. Carries enough context for
/// handlers to decide what (if anything) should play: who triggered it, where,
/// and a suggested sound/volume/pitch that handlers may override.
#[derive(Clone, Debug)]
pub struct AudioEvent {
    id: EventId,
    name: String,
    pub source_player: Option<PlayerId>,
    pub target_players: Vec<PlayerId>,
    pub global: bool,
    pub location: Option<Position>,
    pub sound: Option<SoundRef>,
    pub category: SoundCategory,
    pub volume: f32,
    pub pitch: f32,
    pub priority: EventPriority,
    created_at: Instant,
    cancelled: bool,
}

impl AudioEvent {
    pub fn new(name: impl Into<String>) -> AudioEvent {
        AudioEvent {
            id: EventId::new_random(),
            name: name.into(),
            source_player: None,
            target_players: Vec::new(),
            global: false,
            location: None,
            sound: None,
            category: SoundCategory::Master,
            volume: 1.0,
            pitch: 1.0,
            priority: EventPriority::Normal,
            created_at: Instant::now(),
            cancelled: false,
        }
    }

    pub fn with_source_player(mut self, player: PlayerId) -> Self {
        self.source_player = Some(player);
        self
    }
    pub fn with_target_player(mut self, player: PlayerId) -> Self {
        self.target_players.push(player);
        self
    }
    pub fn with_location(mut self, location: Position) -> Self {
        self.location = Some(location);
        self
    }
    pub fn with_sound(mut self, sound: SoundRef) -> Self {
        self.sound = Some(sound);
        self
    }
    pub fn with_category(mut self, category: SoundCategory) -> Self {
        self.category = category;
        self
    }
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn id(&self) -> EventId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
    /// Cancellation is advisory: later handlers that opted into
    /// `ignore_cancelled` still run, everyone else is skipped.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// An event handler. May mutate the event (including cancelling it); errors
/// are logged and do not abort dispatch to later handlers.
pub type EventHandler = Box<dyn Fn(&mut AudioEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identifies the registering party so a whole batch of handlers can be torn
/// down at once (the typed replacement for "owner object identity").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// One declarative handler registration, used with
/// [`AudioState::register_events`](super::AudioState::register_events) to
/// register a batch under a single owner.
pub struct Subscription {
    pub event: String,
    pub priority: EventPriority,
    pub ignore_cancelled: bool,
    pub handler: EventHandler,
}

impl Subscription {
    pub fn new(event: impl Into<String>, handler: EventHandler) -> Subscription {
        Subscription {
            event: event.into(),
            priority: EventPriority::Normal,
            ignore_cancelled: false,
            handler,
        }
    }
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }
    pub fn ignoring_cancelled(mut self) -> Self {
        self.ignore_cancelled = true;
        self
    }
}

struct Registration {
    owner: SubscriberId,
    priority: EventPriority,
    seq: u64,
    ignore_cancelled: bool,
    handler: EventHandler,
}

/// Named-event, priority-ordered, cancellation-aware publish/subscribe
/// registry.
///
/// Dispatch order is ascending priority, ties broken by registration order
/// (stable), which makes dispatch deterministic and testable. Handlers run on
/// the firing thread; registrations are snapshotted before dispatch so a
/// handler may register or unregister without deadlocking the bus.
pub(crate) struct EventBus {
    listeners: RwLock<FxHashMap<String, Vec<Arc<Registration>>>>,
    next_subscriber: AtomicU64,
    next_seq: AtomicU64,
}

impl EventBus {
    pub(crate) fn new() -> EventBus {
        EventBus {
            listeners: RwLock::new(FxHashMap::default()),
            next_subscriber: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn new_subscriber(&self) -> SubscriberId {
        SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register(
        &self,
        owner: SubscriberId,
        event: impl Into<String>,
        priority: EventPriority,
        ignore_cancelled: bool,
        handler: EventHandler,
    ) {
        let event = event.into();
        if event.is_empty() {
            return;
        }
        let registration = Arc::new(Registration {
            owner,
            priority,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            ignore_cancelled,
            handler,
        });
        let mut listeners = self.listeners.write();
        let entries = listeners.entry(event).or_default();
        entries.push(registration);
        // Stable order: priority, then registration sequence.
        entries.sort_by_key(|r| (r.priority, r.seq));
    }

    pub(crate) fn register_all(&self, owner: SubscriberId, subscriptions: Vec<Subscription>) {
        for subscription in subscriptions {
            self.register(
                owner,
                subscription.event,
                subscription.priority,
                subscription.ignore_cancelled,
                subscription.handler,
            );
        }
    }

    /// Removes all of `owner`'s registrations across every event name.
    pub(crate) fn unregister(&self, owner: SubscriberId) {
        let mut listeners = self.listeners.write();
        for entries in listeners.values_mut() {
            entries.retain(|registration| registration.owner != owner);
        }
        listeners.retain(|_, entries| !entries.is_empty());
    }

    /// Dispatches `event` to its registered handlers in priority order.
    /// Returns true iff at least one handler executed successfully. An
    /// already-cancelled or unnamed event, or one with no handlers, is a
    /// no-op returning false.
    pub(crate) fn fire(&self, event: &mut AudioEvent) -> bool {
        if event.is_cancelled() || event.name().is_empty() {
            return false;
        }
        let name = event.name().to_owned();
        let snapshot: Vec<Arc<Registration>> = match self.listeners.read().get(&name) {
            Some(entries) if !entries.is_empty() => entries.clone(),
            _ => return false,
        };

        let mut handled = false;
        for registration in snapshot {
            if event.is_cancelled() && !registration.ignore_cancelled {
                continue;
            }
            match run_handler_impl(|| (registration.handler)(&mut *event), &name) {
                Ok(()) => handled = true,
                Err(e) => error!("Error firing audio event {}: {:#}", name, e),
            }
        }
        handled
    }

    #[cfg(test)]
    fn registration_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}
