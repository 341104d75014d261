//! Bounded arena for transient per-session artifacts.
//!
//! Entries are owned by the arena and reached only through an opaque
//! [`SessionKey`]. A key carries the generation of its slot, so a key whose
//! entry was evicted or removed never resolves to a later occupant.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    index: u32,
    generation: u32,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

#[derive(Debug)]
pub struct SessionArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    order: VecDeque<SessionKey>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl<T> SessionArena<T> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn insert(&mut self, value: T) -> SessionKey {
        self.insert_at(value, Instant::now())
    }

    pub fn insert_at(&mut self, value: T, now: Instant) -> SessionKey {
        self.purge_expired_at(now);
        while self.order.len() >= self.capacity {
            match self.order.front().copied() {
                Some(oldest) => {
                    self.remove(oldest);
                }
                None => break,
            }
        }

        let entry = Entry { value, inserted_at: now };
        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                SessionKey { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                SessionKey { index, generation: 0 }
            }
        };
        self.order.push_back(key);
        key
    }

    pub fn get(&self, key: SessionKey) -> Option<&T> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: SessionKey, now: Instant) -> Option<&T> {
        let entry = self.live_entry(key)?;
        if self.is_expired(entry, now) {
            return None;
        }
        Some(&entry.value)
    }

    pub fn remove(&mut self, key: SessionKey) -> Option<T> {
        self.live_entry(key)?;
        let slot = &mut self.slots[key.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.order.retain(|candidate| *candidate != key);
        Some(entry.value)
    }

    /// Drops every entry older than the TTL. Returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let expired = self
            .order
            .iter()
            .copied()
            .filter(|key| self.live_entry(*key).is_some_and(|entry| self.is_expired(entry, now)))
            .collect::<Vec<_>>();
        for key in &expired {
            self.remove(*key);
        }
        expired.len()
    }

    /// Live, unexpired entries in insertion order.
    pub fn iter_at(&self, now: Instant) -> impl Iterator<Item = (SessionKey, &T)> + '_ {
        self.order.iter().filter_map(move |key| {
            let entry = self.live_entry(*key)?;
            (!self.is_expired(entry, now)).then_some((*key, &entry.value))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionKey, &T)> + '_ {
        self.iter_at(Instant::now())
    }

    fn live_entry(&self, key: SessionKey) -> Option<&Entry<T>> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn is_expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        self.ttl.is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }
}
