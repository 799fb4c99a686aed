//! Contains the slot map implementation.
use std::fmt;
use std::iter::{Enumerate, FromIterator, FusedIterator};
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cursor::{next_occupied, Cursor, CursorMut, Position};
use crate::error::Error;
use crate::slot::{Content, Slot};
use crate::util::debug_fmt_entries;
use crate::Handle;

/// Slot map, storage with stable unique handles.
///
/// See [crate documentation](index.html) for more details.
pub struct SlotMap<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    num_elems: u32,
    // Unique per map, ties detached positions to the map they came from.
    id: u64,
}

fn next_map_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl<T> SlotMap<T> {
    /// Construct a new, empty `SlotMap`.
    ///
    /// The slot map will not allocate until values are inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm: SlotMap<i32> = SlotMap::new();
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty `SlotMap` with the given capacity.
    ///
    /// The slot map will not reallocate until it holds at least `capacity`
    /// elements. If `capacity` is 0, the slot map will not allocate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm: SlotMap<i32> = SlotMap::with_capacity(10);
    /// ```
    pub fn with_capacity(capacity: usize) -> SlotMap<T> {
        SlotMap {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            num_elems: 0,
            id: next_map_id(),
        }
    }

    /// Returns the number of elements in the slot map.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::with_capacity(10);
    /// sm.insert("len() counts actual elements, not capacity");
    /// let handle = sm.insert("removed elements don't count either");
    /// sm.remove(handle).unwrap();
    /// assert_eq!(sm.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.num_elems as usize
    }

    /// Returns if the slot map is empty.
    pub fn is_empty(&self) -> bool {
        self.num_elems == 0
    }

    /// Returns the number of elements the `SlotMap` can hold without
    /// reallocating.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Reserves capacity for at least `additional` more elements to be inserted
    /// in the `SlotMap`. Vacant slots count towards the reservation.
    ///
    /// # Panics
    ///
    /// Panics if the new allocation size overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// sm.insert("foo");
    /// sm.reserve(32);
    /// assert!(sm.capacity() >= 33);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let needed = (self.len() + additional).saturating_sub(self.slots.len());
        self.slots.reserve(needed);
    }

    /// Returns `true` if the slot map contains a value for `handle`.
    ///
    /// Any handle may be passed, including stale, null or out of range ones.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(42);
    /// assert_eq!(sm.contains(handle), true);
    /// sm.remove(handle).unwrap();
    /// assert_eq!(sm.contains(handle), false);
    /// ```
    pub fn contains(&self, handle: Handle) -> bool {
        self.validate(handle).is_ok()
    }

    /// Inserts a value into the slot map. Returns a unique [`Handle`] that can
    /// be used to access this value.
    ///
    /// A vacant slot is reused if there is one, otherwise the backing store
    /// grows by one slot.
    ///
    /// # Panics
    ///
    /// Panics if the backing store would need more than 2<sup>32</sup> - 1
    /// slots.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(42);
    /// assert_eq!(sm[handle], 42);
    /// ```
    pub fn insert(&mut self, value: T) -> Handle {
        self.insert_with_handle(|_| value)
    }

    /// Inserts a value given by `f` into the slot map. The `Handle` where the
    /// value will be stored is passed into `f`. This is useful to store values
    /// that contain their own handle.
    ///
    /// # Panics
    ///
    /// Panics if the backing store would need more than 2<sup>32</sup> - 1
    /// slots.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert_with_handle(|h| (h, 20));
    /// assert_eq!(sm[handle], (handle, 20));
    /// ```
    pub fn insert_with_handle<F>(&mut self, f: F) -> Handle
    where
        F: FnOnce(Handle) -> T,
    {
        if let Some(idx) = self.free_head {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(!slot.occupied(), "occupied slot on the free list");
            let handle = Handle::new(slot.generation, idx);
            let next_free = slot.next_free();

            // In case f panics, the slot stays vacant and linked.
            slot.content = Content::Occupied(f(handle));
            self.free_head = next_free;
            self.num_elems += 1;
            return handle;
        }

        // The last index is reserved for the null handle.
        let idx = self.slots.len();
        if idx >= std::u32::MAX as usize {
            panic!("SlotMap index space exhausted");
        }

        if idx == self.slots.capacity() {
            log::trace!("SlotMap backing store full at {} slots, growing", idx);
        }

        let handle = Handle::new(0, idx as u32);
        self.slots.push(Slot::new(f(handle)));
        self.num_elems += 1;
        handle
    }

    // Classifies a handle against the current slot state.
    fn validate(&self, handle: Handle) -> Result<usize, Error> {
        let idx = handle.index() as usize;
        let slot = self.slots.get(idx).ok_or(Error::InvalidIndex)?;
        if slot.generation != handle.generation() {
            return Err(Error::StaleHandle);
        }
        if !slot.occupied() {
            return Err(Error::SlotAlreadyFree);
        }
        Ok(idx)
    }

    // Helper function to remove a value from a slot and push the slot onto the
    // free list. Returns `None` without changes if the slot is vacant.
    pub(crate) fn remove_from_slot(&mut self, idx: usize) -> Option<T> {
        let value = self.slots[idx].vacate(self.free_head)?;
        self.free_head = Some(idx as u32);
        self.num_elems -= 1;
        Some(value)
    }

    /// Removes the value for `handle` from the slot map and returns it.
    ///
    /// The handle, and every copy of it, becomes stale: the slot's generation
    /// is bumped so a later occupant of the same slot gets a different handle.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIndex`] if the handle's index is out of range,
    /// [`Error::StaleHandle`] if the value was already removed and
    /// [`Error::SlotAlreadyFree`] if the handle names a vacant slot's upcoming
    /// generation. Nothing is changed on error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(42);
    /// assert_eq!(sm.remove(handle), Ok(42));
    /// assert_eq!(sm.remove(handle), Err(Error::StaleHandle));
    /// ```
    pub fn remove(&mut self, handle: Handle) -> Result<T, Error> {
        let idx = self.validate(handle)?;
        self.remove_from_slot(idx).ok_or(Error::SlotAlreadyFree)
    }

    /// Removes the value for `handle` if it is present, returning it.
    ///
    /// Unlike [`remove`](SlotMap::remove) an invalid handle is not an error,
    /// `None` is returned and the slot map is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(42);
    /// assert_eq!(sm.try_remove(handle), Some(42));
    /// assert_eq!(sm.try_remove(handle), None);
    /// assert_eq!(sm.try_remove(Handle::null()), None);
    /// ```
    pub fn try_remove(&mut self, handle: Handle) -> Option<T> {
        let idx = self.validate(handle).ok()?;
        self.remove_from_slot(idx)
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// In other words, remove all handle-value pairs (h, v) such that
    /// `f(h, &mut v)` returns false. This method operates in place and
    /// invalidates any removed handles.
    ///
    /// This function must iterate over all slots, empty or not. In the face of
    /// many deleted elements it can be inefficient.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    ///
    /// let h1 = sm.insert(0);
    /// let h2 = sm.insert(1);
    /// let h3 = sm.insert(2);
    ///
    /// sm.retain(|handle, val| handle == h1 || *val == 1);
    ///
    /// assert!(sm.contains(h1));
    /// assert!(sm.contains(h2));
    /// assert!(!sm.contains(h3));
    ///
    /// assert_eq!(2, sm.len());
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(Handle, &mut T) -> bool,
    {
        for i in 0..self.slots.len() {
            let should_remove = {
                let slot = &mut self.slots[i];
                let handle = Handle::new(slot.generation, i as u32);
                match slot.value_mut() {
                    Some(value) => !f(handle, value),
                    None => false,
                }
            };

            if should_remove {
                self.remove_from_slot(i);
            }
        }
    }

    /// Clears the slot map. Keeps the allocated memory for reuse.
    ///
    /// Every handle issued so far becomes stale.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// for i in 0..10 {
    ///     sm.insert(i);
    /// }
    /// assert_eq!(sm.len(), 10);
    /// sm.clear();
    /// assert_eq!(sm.len(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.drain();
    }

    /// Clears the slot map, returning all handle-value pairs as an iterator.
    /// Keeps the allocated memory for reuse.
    ///
    /// When the iterator is dropped all elements in the slot map are removed,
    /// even if the iterator was not fully consumed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h = sm.insert(0);
    /// let v: Vec<_> = sm.drain().collect();
    /// assert_eq!(sm.len(), 0);
    /// assert_eq!(v, vec![(h, 0)]);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            cur: 0,
            num_left: self.len(),
            sm: self,
        }
    }

    /// Returns a reference to the value corresponding to the handle, or `None`
    /// if the handle is not valid for this slot map.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert("bar");
    /// assert_eq!(sm.get(handle), Some(&"bar"));
    /// sm.remove(handle).unwrap();
    /// assert_eq!(sm.get(handle), None);
    /// assert_eq!(sm.get(Handle::new(0, 1000)), None);
    /// ```
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(Slot::value)
    }

    /// Returns a mutable reference to the value corresponding to the handle.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(3.5);
    /// if let Some(x) = sm.get_mut(handle) {
    ///     *x += 3.0;
    /// }
    /// assert_eq!(sm[handle], 6.5);
    /// ```
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(Slot::value_mut)
    }

    /// Returns a reference to the value corresponding to the handle, reporting
    /// why the handle is not valid otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`remove`](SlotMap::remove).
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert("bar");
    /// assert_eq!(sm.at(handle), Ok(&"bar"));
    /// sm.remove(handle).unwrap();
    /// assert_eq!(sm.at(handle), Err(Error::StaleHandle));
    /// assert_eq!(sm.at(Handle::new(0, 9)), Err(Error::InvalidIndex));
    /// ```
    pub fn at(&self, handle: Handle) -> Result<&T, Error> {
        let idx = self.validate(handle)?;
        self.slots[idx].value().ok_or(Error::SlotAlreadyFree)
    }

    /// Mutable version of [`at`](SlotMap::at).
    pub fn at_mut(&mut self, handle: Handle) -> Result<&mut T, Error> {
        let idx = self.validate(handle)?;
        self.slots[idx].value_mut().ok_or(Error::SlotAlreadyFree)
    }

    /// Returns the current generation of the slot at `index`, or `None` if the
    /// index is out of range.
    ///
    /// For an occupied slot this is the generation of its handle, for a vacant
    /// one it is the generation the next occupant will get.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let handle = sm.insert(1);
    /// assert_eq!(sm.generation_of(0), Some(0));
    /// sm.remove(handle).unwrap();
    /// assert_eq!(sm.generation_of(0), Some(1));
    /// assert_eq!(sm.generation_of(1), None);
    /// ```
    pub fn generation_of(&self, index: u32) -> Option<u32> {
        self.slots.get(index as usize).map(|slot| slot.generation)
    }

    /// Returns a cursor at the first live value, or at the end if there is
    /// none.
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::new(self, 0)
    }

    /// Returns the cursor past the last slot.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::new(self, self.slots.len())
    }

    /// Returns a mutable cursor at the first live value, or at the end if
    /// there is none.
    pub fn begin_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::new(self, 0)
    }

    /// Returns a cursor at the value named by `handle`.
    ///
    /// # Errors
    ///
    /// Same as [`remove`](SlotMap::remove).
    pub fn cursor_at(&self, handle: Handle) -> Result<Cursor<'_, T>, Error> {
        let idx = self.validate(handle)?;
        Ok(Cursor::new(self, idx))
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    // Checks that a detached position can be resumed on this slot map.
    fn check_position(&self, pos: Position) -> Result<usize, Error> {
        if !pos.belongs_to(self) {
            return Err(Error::IteratorMismatch);
        }
        if pos.index() > self.slots.len() {
            return Err(Error::InvalidIndex);
        }
        Ok(pos.index())
    }

    /// Resumes a cursor at a detached position. If the slot at the position
    /// was vacated in the meantime the cursor moves on to the next live value.
    ///
    /// # Errors
    ///
    /// [`Error::IteratorMismatch`] if the position was taken from another slot
    /// map, [`Error::InvalidIndex`] if it is past the end.
    pub fn cursor(&self, pos: Position) -> Result<Cursor<'_, T>, Error> {
        let idx = self.check_position(pos)?;
        Ok(Cursor::new(self, idx))
    }

    /// Mutable version of [`cursor`](SlotMap::cursor).
    pub fn cursor_mut(&mut self, pos: Position) -> Result<CursorMut<'_, T>, Error> {
        let idx = self.check_position(pos)?;
        Ok(CursorMut::new(self, idx))
    }

    /// Removes the value at a detached position and returns the position of
    /// the next live value, or the end position.
    ///
    /// # Errors
    ///
    /// [`Error::IteratorMismatch`] if the position was taken from another slot
    /// map, [`Error::IteratorAtEnd`] at the end position,
    /// [`Error::InvalidIndex`] past the end and [`Error::SlotAlreadyFree`] if
    /// the slot was vacated in the meantime. Nothing is changed on error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let a = sm.insert('a');
    /// sm.insert('b');
    ///
    /// let pos = sm.begin().position();
    /// let next = sm.erase(pos).unwrap();
    /// assert!(!sm.contains(a));
    /// assert_eq!(sm.cursor(next).unwrap().get(), Ok(&'b'));
    /// ```
    pub fn erase(&mut self, pos: Position) -> Result<Position, Error> {
        let idx = self.check_position(pos)?;
        if idx == self.slots.len() {
            return Err(Error::IteratorAtEnd);
        }

        self.remove_from_slot(idx).ok_or(Error::SlotAlreadyFree)?;
        log::trace!("SlotMap erased slot {} through a cursor position", idx);
        Ok(Position::new(self, next_occupied(&self.slots, idx + 1)))
    }

    pub(crate) fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<T>] {
        &mut self.slots
    }

    /// An iterator visiting all handle-value pairs in index order. The
    /// iterator element type is `(Handle, &'a T)`.
    ///
    /// This function must iterate over all slots, empty or not. In the face of
    /// many deleted elements it can be inefficient.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h0 = sm.insert(0);
    /// let h1 = sm.insert(1);
    /// let h2 = sm.insert(2);
    ///
    /// let mut it = sm.iter();
    /// assert_eq!(it.next(), Some((h0, &0)));
    /// assert_eq!(it.len(), 2);
    /// assert_eq!(it.next(), Some((h1, &1)));
    /// assert_eq!(it.next(), Some((h2, &2)));
    /// assert_eq!(it.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.slots.iter().enumerate(),
            num_left: self.len(),
        }
    }

    /// An iterator visiting all handle-value pairs in index order, with
    /// mutable references to the values. The iterator element type is
    /// `(Handle, &'a mut T)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h0 = sm.insert(10);
    /// let h1 = sm.insert(20);
    /// let h2 = sm.insert(30);
    ///
    /// for (h, v) in sm.iter_mut() {
    ///     if h != h1 {
    ///         *v *= -1;
    ///     }
    /// }
    ///
    /// assert_eq!(sm.values().collect::<Vec<_>>(), vec![&-10, &20, &-30]);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            num_left: self.len(),
            slots: self.slots.iter_mut().enumerate(),
        }
    }

    /// An iterator visiting all handles in index order. The iterator element
    /// type is `Handle`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h0 = sm.insert(10);
    /// let h1 = sm.insert(20);
    /// let h2 = sm.insert(30);
    /// let v: Vec<_> = sm.handles().collect();
    /// assert_eq!(v, vec![h0, h1, h2]);
    /// ```
    pub fn handles(&self) -> Handles<'_, T> {
        Handles { inner: self.iter() }
    }

    /// An iterator visiting all values in index order. The iterator element
    /// type is `&'a T`.
    pub fn values(&self) -> Values<'_, T> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably in index order. The iterator
    /// element type is `&'a mut T`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// sm.insert(10);
    /// sm.insert(20);
    /// sm.insert(30);
    /// sm.values_mut().for_each(|n| { *n *= 3 });
    /// let v: Vec<_> = sm.into_iter().map(|(_h, v)| v).collect();
    /// assert_eq!(v, vec![30, 60, 90]);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, T> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        SlotMap::new()
    }
}

// A clone is a separate map, so positions taken from the original don't carry
// over.
impl<T: Clone> Clone for SlotMap<T> {
    fn clone(&self) -> Self {
        SlotMap {
            slots: self.slots.clone(),
            free_head: self.free_head,
            num_elems: self.num_elems,
            id: next_map_id(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_fmt_entries(self.iter(), f)
    }
}

impl<T> Index<Handle> for SlotMap<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        match self.at(handle) {
            Ok(r) => r,
            Err(err) => panic!("invalid SlotMap handle used: {}", err),
        }
    }
}

impl<T> IndexMut<Handle> for SlotMap<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        match self.at_mut(handle) {
            Ok(r) => r,
            Err(err) => panic!("invalid SlotMap handle used: {}", err),
        }
    }
}

impl<T> FromIterator<T> for SlotMap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut sm = SlotMap::with_capacity(iter.size_hint().0);
        for value in iter {
            sm.insert(value);
        }
        sm
    }
}

// Iterators.
/// A draining iterator for `SlotMap`.
#[derive(Debug)]
pub struct Drain<'a, T: 'a> {
    num_left: usize,
    sm: &'a mut SlotMap<T>,
    cur: usize,
}

/// An iterator that moves handle-value pairs out of a `SlotMap`.
#[derive(Debug)]
pub struct IntoIter<T> {
    num_left: usize,
    slots: Enumerate<std::vec::IntoIter<Slot<T>>>,
}

/// An iterator over the handle-value pairs in a `SlotMap`.
#[derive(Debug)]
pub struct Iter<'a, T: 'a> {
    num_left: usize,
    slots: Enumerate<std::slice::Iter<'a, Slot<T>>>,
}

/// A mutable iterator over the handle-value pairs in a `SlotMap`.
#[derive(Debug)]
pub struct IterMut<'a, T: 'a> {
    num_left: usize,
    slots: Enumerate<std::slice::IterMut<'a, Slot<T>>>,
}

/// An iterator over the handles in a `SlotMap`.
#[derive(Debug)]
pub struct Handles<'a, T: 'a> {
    inner: Iter<'a, T>,
}

/// An iterator over the values in a `SlotMap`.
#[derive(Debug)]
pub struct Values<'a, T: 'a> {
    inner: Iter<'a, T>,
}

/// A mutable iterator over the values in a `SlotMap`.
#[derive(Debug)]
pub struct ValuesMut<'a, T: 'a> {
    inner: IterMut<'a, T>,
}

impl<'a, T> Iterator for Drain<'a, T> {
    type Item = (Handle, T);

    fn next(&mut self) -> Option<(Handle, T)> {
        while self.cur < self.sm.slots.len() {
            let idx = self.cur;
            self.cur += 1;

            let generation = self.sm.slots[idx].generation;
            if let Some(value) = self.sm.remove_from_slot(idx) {
                self.num_left -= 1;
                return Some((Handle::new(generation, idx as u32), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.num_left, Some(self.num_left))
    }
}

impl<'a, T> Drop for Drain<'a, T> {
    fn drop(&mut self) {
        self.for_each(|_drop| {});
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = (Handle, T);

    fn next(&mut self) -> Option<(Handle, T)> {
        while let Some((idx, slot)) = self.slots.next() {
            if let Content::Occupied(value) = slot.content {
                self.num_left -= 1;
                return Some((Handle::new(slot.generation, idx as u32), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.num_left, Some(self.num_left))
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<(Handle, &'a T)> {
        while let Some((idx, slot)) = self.slots.next() {
            if let Content::Occupied(value) = &slot.content {
                self.num_left -= 1;
                return Some((Handle::new(slot.generation, idx as u32), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.num_left, Some(self.num_left))
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Handle, &'a mut T);

    fn next(&mut self) -> Option<(Handle, &'a mut T)> {
        while let Some((idx, slot)) = self.slots.next() {
            let generation = slot.generation;
            if let Content::Occupied(value) = &mut slot.content {
                self.num_left -= 1;
                return Some((Handle::new(generation, idx as u32), value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.num_left, Some(self.num_left))
    }
}

impl<'a, T> Iterator for Handles<'a, T> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        self.inner.next().map(|(handle, _)| handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> Iterator for Values<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> Iterator for ValuesMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> IntoIterator for &'a SlotMap<T> {
    type Item = (Handle, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SlotMap<T> {
    type Item = (Handle, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for SlotMap<T> {
    type Item = (Handle, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            num_left: self.len(),
            slots: self.slots.into_iter().enumerate(),
        }
    }
}

impl<'a, T> FusedIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for IterMut<'a, T> {}
impl<'a, T> FusedIterator for Handles<'a, T> {}
impl<'a, T> FusedIterator for Values<'a, T> {}
impl<'a, T> FusedIterator for ValuesMut<'a, T> {}
impl<'a, T> FusedIterator for Drain<'a, T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}
impl<'a, T> ExactSizeIterator for Handles<'a, T> {}
impl<'a, T> ExactSizeIterator for Values<'a, T> {}
impl<'a, T> ExactSizeIterator for ValuesMut<'a, T> {}
impl<'a, T> ExactSizeIterator for Drain<'a, T> {}
impl<T> ExactSizeIterator for IntoIter<T> {}

// Serialization with serde.
#[cfg(feature = "serde")]
mod serialize {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl<T: Serialize> Serialize for SlotMap<T> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            self.slots.serialize(serializer)
        }
    }

    impl<'de, T: Deserialize<'de>> Deserialize<'de> for SlotMap<T> {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let mut slots: Vec<Slot<T>> = Deserialize::deserialize(deserializer)?;
            if slots.len() >= std::u32::MAX as usize {
                return Err(de::Error::custom(&"too many slots"));
            }

            // We have our slots, rebuild freelist.
            let mut num_elems = 0;
            let mut free_head = None;
            for (i, slot) in slots.iter_mut().enumerate() {
                if slot.occupied() {
                    num_elems += 1;
                } else {
                    slot.content = Content::Vacant {
                        next_free: free_head,
                    };
                    free_head = Some(i as u32);
                }
            }

            log::debug!(
                "SlotMap deserialized with {} values in {} slots",
                num_elems,
                slots.len()
            );

            Ok(SlotMap {
                num_elems,
                slots,
                free_head,
                id: next_map_id(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Walks the free list and checks it against the live count.
    fn check_free_list<T>(sm: &SlotMap<T>) {
        let mut free = 0;
        let mut cur = sm.free_head;
        while let Some(idx) = cur {
            let slot = &sm.slots[idx as usize];
            assert!(!slot.occupied());
            free += 1;
            assert!(free <= sm.slots.len(), "cycle in free list");
            cur = slot.next_free();
        }
        assert_eq!(sm.len(), sm.slots.len() - free);
        assert_eq!(sm.len(), sm.slots.iter().filter(|s| s.occupied()).count());
    }

    #[test]
    fn check_drops() {
        let drops = std::cell::RefCell::new(0usize);
        #[derive(Clone)]
        struct CountDrop<'a>(&'a std::cell::RefCell<usize>);
        impl<'a> Drop for CountDrop<'a> {
            fn drop(&mut self) {
                *self.0.borrow_mut() += 1;
            }
        }

        {
            let mut clone = {
                // Insert 1000 items.
                let mut sm = SlotMap::new();
                let mut sm_handles = Vec::new();
                for _ in 0..1000 {
                    sm_handles.push(sm.insert(CountDrop(&drops)));
                }

                // Remove even handles.
                for i in (0..1000).filter(|i| i % 2 == 0) {
                    assert!(sm.remove(sm_handles[i]).is_ok());
                }

                // Should only have dropped 500 so far.
                assert_eq!(*drops.borrow(), 500);

                // Let's clone ourselves and then die.
                sm.clone()
            };

            // Now all original items should have been dropped exactly once.
            assert_eq!(*drops.borrow(), 1000);

            // Re-use some empty slots.
            for _ in 0..250 {
                clone.insert(CountDrop(&drops));
            }
        }

        // 1000 + 750 drops in total should have happened.
        assert_eq!(*drops.borrow(), 1750);
    }

    #[test]
    fn recycle_scenario() {
        let mut sm = SlotMap::new();
        let h0 = sm.insert('A');
        let h1 = sm.insert('B');
        let h2 = sm.insert('C');
        assert_eq!(h0, Handle::new(0, 0));
        assert_eq!(h1, Handle::new(0, 1));
        assert_eq!(h2, Handle::new(0, 2));

        assert_eq!(sm.remove(h1), Ok('B'));
        assert!(!sm.contains(h1));
        assert_eq!(sm.len(), 2);
        assert_eq!(sm.values().collect::<String>(), "AC");

        let h3 = sm.insert('D');
        assert_eq!(h3, Handle::new(1, 1));
        assert_ne!(h3, h1);
        assert!(!sm.contains(h1));
        assert!(sm.contains(h3));
        assert_eq!(sm.values().collect::<String>(), "ADC");
        assert_eq!(
            sm.handles().map(Handle::index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        check_free_list(&sm);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut sm = SlotMap::new();
        let handles: Vec<_> = (0..4).map(|i| sm.insert(i)).collect();
        sm.remove(handles[1]).unwrap();
        sm.remove(handles[3]).unwrap();
        check_free_list(&sm);

        assert_eq!(sm.insert(10).index(), 3);
        assert_eq!(sm.insert(11).index(), 1);
        assert_eq!(sm.insert(12).index(), 4);
        check_free_list(&sm);
    }

    #[test]
    fn remove_errors() {
        let mut sm = SlotMap::new();
        let h = sm.insert(1);

        assert_eq!(sm.remove(Handle::new(0, 5)), Err(Error::InvalidIndex));
        assert_eq!(sm.remove(Handle::null()), Err(Error::InvalidIndex));
        assert_eq!(sm.remove(Handle::new(3, 0)), Err(Error::StaleHandle));
        assert_eq!(sm.len(), 1);

        assert_eq!(sm.remove(h), Ok(1));
        assert_eq!(sm.remove(h), Err(Error::StaleHandle));

        // Slot 0 is vacant and waiting for generation 1.
        assert_eq!(sm.remove(Handle::new(1, 0)), Err(Error::SlotAlreadyFree));
        assert_eq!(sm.at(Handle::new(1, 0)), Err(Error::SlotAlreadyFree));
        assert_eq!(sm.get(Handle::new(1, 0)), None);
        assert!(!sm.contains(Handle::new(1, 0)));
        assert_eq!(sm.len(), 0);
        check_free_list(&sm);
    }

    #[test]
    fn try_remove_never_mutates_on_failure() {
        let mut sm = SlotMap::new();
        let h = sm.insert("x");
        sm.insert("y");

        assert_eq!(sm.try_remove(Handle::new(0, 7)), None);
        assert_eq!(sm.try_remove(Handle::new(9, 0)), None);
        assert_eq!(sm.len(), 2);
        assert_eq!(sm.generation_of(0), Some(0));

        assert_eq!(sm.try_remove(h), Some("x"));
        assert_eq!(sm.try_remove(h), None);
        assert_eq!(sm.len(), 1);
        check_free_list(&sm);
    }

    #[test]
    fn find_out_of_range_is_absent() {
        let mut sm = SlotMap::new();
        sm.insert(5u8);
        assert_eq!(sm.get(Handle::new(0, 1)), None);
        assert_eq!(sm.get(Handle::new(0, std::u32::MAX - 1)), None);
        assert_eq!(sm.get_mut(Handle::new(0, 1)), None);
        assert!(!sm.contains(Handle::new(0, 100)));
    }

    #[test]
    fn removed_handle_stays_stale() {
        let mut sm = SlotMap::new();
        let old = sm.insert(0);
        sm.remove(old).unwrap();

        for i in 1..20 {
            let h = sm.insert(i);
            assert_eq!(h.index(), old.index());
            assert_eq!(h.generation(), i as u32);
            assert!(!sm.contains(old));
            sm.remove(h).unwrap();
        }
        assert_eq!(sm.generation_of(0), Some(20));
    }

    #[test]
    #[should_panic(expected = "stale handle")]
    fn index_stale_handle_panics() {
        let mut sm = SlotMap::new();
        let h = sm.insert(1);
        sm.remove(h).unwrap();
        let _value: i32 = sm[h];
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn index_out_of_range_panics() {
        let mut sm = SlotMap::<i32>::new();
        sm[Handle::new(0, 3)] = 1;
    }

    #[test]
    fn retain_and_drain() {
        let mut sm: SlotMap<u32> = (0..10).collect();
        sm.retain(|_, v| {
            *v += 1;
            *v % 2 == 0
        });
        assert_eq!(sm.values().copied().collect::<Vec<_>>(), vec![2, 4, 6, 8, 10]);
        check_free_list(&sm);

        let handles: Vec<_> = sm.handles().collect();
        let drained: Vec<_> = sm.drain().collect();
        assert_eq!(drained.len(), 5);
        assert_eq!(drained.iter().map(|(h, _)| *h).collect::<Vec<_>>(), handles);
        assert!(sm.is_empty());
        assert!(handles.iter().all(|h| !sm.contains(*h)));
        check_free_list(&sm);
    }

    #[test]
    fn partial_drain_removes_everything() {
        let mut sm: SlotMap<u32> = (0..5).collect();
        {
            let mut drain = sm.drain();
            assert_eq!(drain.len(), 5);
            drain.next();
        }
        assert!(sm.is_empty());
        check_free_list(&sm);
    }

    #[test]
    fn iterators_skip_vacant_slots() {
        let mut sm = SlotMap::new();
        let handles: Vec<_> = (0..6).map(|i| sm.insert(i)).collect();
        for h in handles.iter().step_by(2) {
            sm.remove(*h).unwrap();
        }

        let it = sm.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(
            it.collect::<Vec<_>>(),
            vec![(handles[1], &1), (handles[3], &3), (handles[5], &5)]
        );

        for (_, v) in &mut sm {
            *v *= 2;
        }
        let owned: Vec<_> = sm.into_iter().collect();
        assert_eq!(
            owned,
            vec![(handles[1], 2), (handles[3], 6), (handles[5], 10)]
        );
    }

    #[test]
    fn debug_format() {
        let mut sm = SlotMap::new();
        let h = sm.insert("a");
        sm.insert("b");
        sm.remove(h).unwrap();
        assert_eq!(format!("{:?}", sm), r#"{1v0: "b"}"#);
    }

    quickcheck! {
        fn qc_slotmap_equiv_hashmap(operations: Vec<(u8, u32)>) -> bool {
            let mut hm = HashMap::new();
            let mut hm_keys = Vec::new();
            let mut unique_key = 0u32;
            let mut sm = SlotMap::new();
            let mut sm_handles = Vec::new();
            let mut inserts = 0usize;
            let mut removes = 0usize;

            #[cfg(not(feature = "serde"))]
            let num_ops = 4;
            #[cfg(feature = "serde")]
            let num_ops = 5;

            for (op, val) in operations {
                match op % num_ops {
                    // Insert.
                    0 => {
                        hm.insert(unique_key, val);
                        hm_keys.push(unique_key);
                        unique_key += 1;

                        sm_handles.push(sm.insert(val));
                        inserts += 1;
                    }

                    // Delete.
                    1 => {
                        if hm_keys.is_empty() { continue; }

                        let idx = val as usize % hm_keys.len();
                        let removed = sm.remove(sm_handles[idx]).ok();
                        if hm.remove(&hm_keys[idx]) != removed {
                            return false;
                        }
                        if removed.is_some() {
                            removes += 1;
                        }
                    }

                    // Non-failing delete.
                    2 => {
                        if hm_keys.is_empty() { continue; }

                        let idx = val as usize % hm_keys.len();
                        let removed = sm.try_remove(sm_handles[idx]);
                        if hm.remove(&hm_keys[idx]) != removed {
                            return false;
                        }
                        if removed.is_some() {
                            removes += 1;
                        }
                    }

                    // Access.
                    3 => {
                        if hm_keys.is_empty() { continue; }
                        let idx = val as usize % hm_keys.len();
                        let (hm_key, sm_handle) = (&hm_keys[idx], sm_handles[idx]);

                        if hm.contains_key(hm_key) != sm.contains(sm_handle) ||
                           hm.get(hm_key) != sm.get(sm_handle) {
                            return false;
                        }
                    }

                    // Serde round-trip.
                    #[cfg(feature = "serde")]
                    4 => {
                        let ser = serde_json::to_string(&sm).unwrap();
                        sm = serde_json::from_str(&ser).unwrap();
                    }

                    _ => unreachable!(),
                }
            }

            check_free_list(&sm);
            if sm.len() != inserts - removes {
                return false;
            }

            let mut smv: Vec<_> = sm.values().collect();
            let mut hmv: Vec<_> = hm.values().collect();
            smv.sort();
            hmv.sort();
            smv == hmv
        }

        fn qc_iteration_is_ascending(operations: Vec<(bool, u8)>) -> bool {
            let mut sm = SlotMap::new();
            let mut handles = Vec::new();
            for (insert, val) in operations {
                if insert || handles.is_empty() {
                    handles.push(sm.insert(val));
                } else {
                    let h = handles.swap_remove(val as usize % handles.len());
                    sm.remove(h).unwrap();
                }
            }

            let indices: Vec<_> = sm.handles().map(Handle::index).collect();
            let mut live: Vec<_> = handles.iter().map(|h| h.index()).collect();
            live.sort();
            indices.windows(2).all(|w| w[0] < w[1]) && indices == live
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn slotmap_serde() {
        let mut sm = SlotMap::new();
        // Self-referential structure.
        let first = sm.insert_with_handle(|h| (h, 23i32));
        let second = sm.insert((first, 42));

        // Make some empty slots.
        let empties = vec![sm.insert((first, 0)), sm.insert((first, 0))];
        empties.iter().for_each(|h| {
            sm.remove(*h).unwrap();
        });

        let third = sm.insert((second, 0));
        sm[first].0 = third;

        let ser = serde_json::to_string(&sm).unwrap();
        let de: SlotMap<(Handle, i32)> = serde_json::from_str(&ser).unwrap();
        assert_eq!(de.len(), sm.len());
        check_free_list(&de);

        let mut smkv: Vec<_> = sm.iter().collect();
        let mut dekv: Vec<_> = de.iter().collect();
        smkv.sort();
        dekv.sort();
        assert_eq!(smkv, dekv);
        assert!(!de.contains(empties[1]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn slotmap_serde_freelist() {
        let mut sm = SlotMap::new();
        let h = sm.insert(5i32);
        sm.remove(h).unwrap();

        let ser = serde_json::to_string(&sm).unwrap();
        let mut de: SlotMap<i32> = serde_json::from_str(&ser).unwrap();

        // The vacant slot keeps its generation.
        assert_eq!(de.insert(0), Handle::new(1, 0));
        de.insert(1);
        de.insert(2);
        assert_eq!(de.len(), 3);
        check_free_list(&de);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn slotmap_serde_fresh_identity() {
        let sm: SlotMap<i32> = (0..3).collect();
        let pos = sm.begin().position();

        let ser = serde_json::to_string(&sm).unwrap();
        let mut de: SlotMap<i32> = serde_json::from_str(&ser).unwrap();
        assert_eq!(de.erase(pos), Err(Error::IteratorMismatch));
        assert_eq!(de.len(), 3);
    }
}
