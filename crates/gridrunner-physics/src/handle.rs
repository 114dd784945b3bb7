//! Body handles and the slot arena that backs the body registry.
//!
//! A [`BodyHandle`] is a 64-bit handle that packs a *generation* counter in
//! the high 32 bits and a slot *index* in the low 32 bits. The generation is
//! bumped every time a slot is freed, so a handle kept past its body's
//! removal is detected on the next lookup instead of aliasing a new body.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// BodyHandle
// ---------------------------------------------------------------------------

/// A generational handle to a body registered with the physics engine.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(u64);

impl BodyHandle {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// SlotArena
// ---------------------------------------------------------------------------

/// Stores values in reusable slots addressed by [`BodyHandle`]s.
///
/// Free slots are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index. Iteration always walks
/// slots in index order, which keeps per-frame processing deterministic.
///
/// The arena serializes with its free list and generations, so a restored
/// arena hands out the same handles as the one it was captured from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotArena<T> {
    generations: Vec<u32>,
    slots: Vec<Option<T>>,
    free_indices: VecDeque<u32>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            slots: Vec::new(),
            free_indices: VecDeque::new(),
            len: 0,
        }
    }

    /// Insert a value, reusing a freed slot if one is available.
    pub fn insert(&mut self, value: T) -> BodyHandle {
        self.len += 1;
        if let Some(index) = self.free_indices.pop_front() {
            // Generation was already bumped on removal.
            self.slots[index as usize] = Some(value);
            BodyHandle::new(index, self.generations[index as usize])
        } else {
            let index = self.slots.len() as u32;
            self.generations.push(0);
            self.slots.push(Some(value));
            BodyHandle::new(index, 0)
        }
    }

    /// Remove the value behind `handle`, invalidating the handle.
    ///
    /// Returns `None` if the handle is stale or was never issued.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let idx = handle.index() as usize;
        let value = self.slots[idx].take();
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(handle.index());
        self.len -= 1;
        value
    }

    /// Whether `handle` refers to a live slot with a matching generation.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        let idx = handle.index() as usize;
        idx < self.slots.len()
            && self.generations[idx] == handle.generation()
            && self.slots[idx].is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&T> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index() as usize].as_ref()
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        self.slots[handle.index() as usize].as_mut()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &T)> {
        let generations = &self.generations;
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .map(|v| (BodyHandle::new(i as u32, generations[i]), v))
        })
    }

    /// Iterate live values mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut T)> {
        let generations = &self.generations;
        self.slots.iter_mut().enumerate().filter_map(move |(i, slot)| {
            slot.as_mut()
                .map(|v| (BodyHandle::new(i as u32, generations[i]), v))
        })
    }

    /// Drop every value. Outstanding handles all become stale.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.generations[i] = self.generations[i].wrapping_add(1);
                self.free_indices.push_back(i as u32);
            }
        }
        self.len = 0;
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
