// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Slot arena with most-recently-used ordering
//!
//! Surfaces live in a `Vec` of slots and are addressed by [`SurfaceId`], a
//! slot index plus a generation counter. Removing a surface bumps the slot's
//! generation so stale ids held by the renderer resolve to `None` instead of
//! aliasing whatever reuses the slot.
//!
//! MRU order is an intrusive doubly linked list threaded through the slots:
//! `head` is the most recently used entry and `tail` the least.

/// Generational handle to a surface held by a [`Pool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    index: u32,
    generation: u32,
}

const NIL: u32 = u32::MAX;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
    prev: u32,
    next: u32,
}

/// Arena of surfaces ordered by recency
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value as the most recently used entry
    pub fn insert_front(&mut self, value: T) -> SurfaceId {
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                    prev: NIL,
                    next: NIL,
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.link_front(index);
        self.len += 1;
        SurfaceId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn slot(&self, id: SurfaceId) -> Option<&Slot<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.value.is_some())
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: SurfaceId) -> Option<&T> {
        self.slot(id).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Move an entry to the most recently used position
    pub fn touch(&mut self, id: SurfaceId) {
        if self.contains(id) && self.head != id.index {
            self.unlink(id.index);
            self.link_front(id.index);
        }
    }

    /// Remove an entry, invalidating its id
    pub fn remove(&mut self, id: SurfaceId) -> Option<T> {
        self.slot(id)?;
        self.unlink(id.index);
        let slot = &mut self.slots[id.index as usize];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        value
    }

    /// Least recently used entry
    pub fn oldest(&self) -> Option<SurfaceId> {
        (self.tail != NIL).then(|| SurfaceId {
            index: self.tail,
            generation: self.slots[self.tail as usize].generation,
        })
    }

    /// Ids in MRU order (most recent first)
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Iterate entries in MRU order
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &T)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let slot = &self.slots[cursor as usize];
            let id = SurfaceId {
                index: cursor,
                generation: slot.generation,
            };
            cursor = slot.next;
            slot.value.as_ref().map(|value| (id, value))
        })
    }

    /// Mutably visit every entry in MRU order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(SurfaceId, &mut T)) {
        let mut cursor = self.head;
        while cursor != NIL {
            let slot = &mut self.slots[cursor as usize];
            let id = SurfaceId {
                index: cursor,
                generation: slot.generation,
            };
            let next = slot.next;
            if let Some(value) = slot.value.as_mut() {
                f(id, value);
            }
            cursor = next;
        }
    }

    /// First entry in MRU order matching `pred`
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<SurfaceId> {
        self.iter().find(|(_, value)| pred(value)).map(|(id, _)| id)
    }

    /// Remove every entry for which `pred` returns true
    pub fn extract_if(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let doomed: Vec<SurfaceId> = self
            .iter()
            .filter(|(_, value)| pred(value))
            .map(|(id, _)| id)
            .collect();
        doomed.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Remove everything, in MRU order
    pub fn drain(&mut self) -> Vec<T> {
        self.extract_if(|_| true)
    }

    fn link_front(&mut self, index: u32) {
        let old_head = self.head;
        {
            let slot = &mut self.slots[index as usize];
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head as usize].prev = index;
        } else {
            self.tail = index;
        }
        self.head = index;
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
        let slot = &mut self.slots[index as usize];
        slot.prev = NIL;
        slot.next = NIL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pool: &Pool<u32>) -> Vec<u32> {
        pool.iter().map(|(_, v)| *v).collect()
    }

    #[test]
    fn test_insert_front_is_mru() {
        let mut pool = Pool::new();
        pool.insert_front(1);
        pool.insert_front(2);
        pool.insert_front(3);
        assert_eq!(values(&pool), vec![3, 2, 1]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_touch_moves_to_front() {
        let mut pool = Pool::new();
        let a = pool.insert_front(1);
        pool.insert_front(2);
        let c = pool.insert_front(3);
        pool.touch(a);
        assert_eq!(values(&pool), vec![1, 3, 2]);
        assert_eq!(pool.get(pool.oldest().unwrap()), Some(&2));
        pool.touch(c);
        assert_eq!(values(&pool), vec![3, 1, 2]);
    }

    #[test]
    fn test_remove_invalidates_id() {
        let mut pool = Pool::new();
        let a = pool.insert_front(1);
        let b = pool.insert_front(2);
        assert_eq!(pool.remove(a), Some(1));
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.remove(a), None);

        // Slot reuse does not resurrect the stale id
        let c = pool.insert_front(3);
        assert_ne!(a, c);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(c), Some(&3));
        assert_eq!(values(&pool), vec![3, 2]);
        assert_eq!(pool.get(b), Some(&2));
    }

    #[test]
    fn test_remove_tail_and_head() {
        let mut pool = Pool::new();
        let a = pool.insert_front(1);
        pool.insert_front(2);
        let c = pool.insert_front(3);
        pool.remove(a);
        pool.remove(c);
        assert_eq!(values(&pool), vec![2]);
        pool.insert_front(4);
        assert_eq!(values(&pool), vec![4, 2]);
    }

    #[test]
    fn test_extract_if_and_drain() {
        let mut pool = Pool::new();
        for v in 0..6 {
            pool.insert_front(v);
        }
        let mut odd = pool.extract_if(|v| v % 2 == 1);
        odd.sort();
        assert_eq!(odd, vec![1, 3, 5]);
        assert_eq!(values(&pool), vec![4, 2, 0]);
        assert_eq!(pool.drain(), vec![4, 2, 0]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_for_each_mut() {
        let mut pool = Pool::new();
        pool.insert_front(1);
        pool.insert_front(2);
        pool.for_each_mut(|_, v| *v *= 10);
        assert_eq!(values(&pool), vec![20, 10]);
    }
}
