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

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parking_lot::{Mutex, RwLock};
use sonolite_core::ids::SoundId;

use super::instance::{InstanceParams, SoundInstance};

/// Generation-checked handle into the pool's slot arena.
///
/// Releasing a slot bumps its generation, so a handle held past release fails
/// the generation check and every keyed operation degrades to a no-op. A
/// stale handle can never observe the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct InstanceKey {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    instance: SoundInstance,
}

/// Bounded arena pool for sound instances.
///
/// Two limits: `max_active` is a hard cap on concurrently live instances (the
/// sole authority on how many sounds may play at once); `max_pool` bounds the
/// total slot storage (live + recycled). Under sustained emission churn the
/// same slots cycle through the free list instead of being reallocated.
///
/// `obtain`/`release` can race with the tick's cleanup pass, so the free list
/// is a lock-free queue and the active count is maintained with CAS; the slot
/// table itself only takes a write lock on the rare growth path.
pub(crate) struct InstancePool {
    slots: RwLock<Vec<Arc<Mutex<Slot>>>>,
    free: SegQueue<u32>,
    active: AtomicU32,
    max_active: u32,
    max_pool: u32,
}

impl InstancePool {
    pub(crate) fn new(max_pool: u32, max_active: u32) -> InstancePool {
        let pool = InstancePool {
            slots: RwLock::new(Vec::new()),
            free: SegQueue::new(),
            active: AtomicU32::new(0),
            max_active,
            max_pool,
        };
        // Warm up a quarter of the arena so the first burst of sounds doesn't
        // pay the allocation cost.
        {
            let mut slots = pool.slots.write();
            for index in 0..max_pool / 4 {
                slots.push(Arc::new(Mutex::new(Slot {
                    generation: 0,
                    instance: SoundInstance::vacant(),
                })));
                pool.free.push(index);
            }
        }
        pool
    }

    /// Takes a slot and initializes it for a new emission, returning the
    /// instance's fresh id and its generation-checked key.
    ///
    /// Returns `None` when the active cap is reached, or when no recycled
    /// slot is free and the arena is already at `max_pool` slots. Callers
    /// treat `None` as "sound dropped", not an error.
    pub(crate) fn obtain(&self, params: InstanceParams) -> Option<(SoundId, InstanceKey)> {
        // Claim an active slot with CAS so the cap holds under races.
        if self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                if count >= self.max_active {
                    None
                } else {
                    Some(count + 1)
                }
            })
            .is_err()
        {
            return None;
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let mut slots = self.slots.write();
                if slots.len() as u32 >= self.max_pool {
                    self.active.fetch_sub(1, Ordering::AcqRel);
                    return None;
                }
                slots.push(Arc::new(Mutex::new(Slot {
                    generation: 0,
                    instance: SoundInstance::vacant(),
                })));
                (slots.len() - 1) as u32
            }
        };

        let slot_ref = self.slot(index)?;
        let mut slot = slot_ref.lock();
        let id = SoundId::new_random();
        slot.instance.reset(id, params);
        Some((
            id,
            InstanceKey {
                index,
                generation: slot.generation,
            },
        ))
    }

    /// Returns a slot to the free list, stripping the instance's identity and
    /// parameters. Safe to call with a stale or already-released key; the
    /// generation check turns the double release into a no-op.
    pub(crate) fn release(&self, key: InstanceKey) {
        let slot_ref = match self.slot(key.index) {
            Some(slot_ref) => slot_ref,
            None => return,
        };
        {
            let mut slot = slot_ref.lock();
            if slot.generation != key.generation {
                return;
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.instance.clear();
        }
        self.free.push(key.index);
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    /// Runs `f` against the live instance behind `key`, or returns `None` if
    /// the key is stale.
    pub(crate) fn with_instance<R>(
        &self,
        key: InstanceKey,
        f: impl FnOnce(&mut SoundInstance) -> R,
    ) -> Option<R> {
        let slot_ref = self.slot(key.index)?;
        let mut slot = slot_ref.lock();
        if slot.generation != key.generation {
            return None;
        }
        Some(f(&mut slot.instance))
    }

    pub(crate) fn active_count(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn pooled_count(&self) -> u32 {
        self.free.len() as u32
    }

    pub(crate) fn max_active(&self) -> u32 {
        self.max_active
    }

    fn slot(&self, index: u32) -> Option<Arc<Mutex<Slot>>> {
        self.slots.read().get(index as usize).cloned()
    }
}
