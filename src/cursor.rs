//! Positional cursors over a [`SlotMap`].
//!
//! A cursor sits either on an occupied slot or at the end position, which is
//! the length of the backing store. Moving forward skips vacant slots, so a
//! cursor never observes a slot between removal and reuse.
use std::fmt;
use std::ptr;

use crate::error::Error;
use crate::slot::Slot;
use crate::{Handle, SlotMap};

// First occupied slot at or after `from`, or `slots.len()`. Only looks at slot
// tags, never at values.
pub(crate) fn next_occupied<T>(slots: &[Slot<T>], from: usize) -> usize {
    slots
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, slot)| slot.occupied())
        .map_or(slots.len(), |(idx, _)| idx)
}

// Traversal state shared by `Cursor` and `CursorMut`. Always on an occupied
// slot or at `slots.len()`.
#[derive(Clone, Copy, PartialEq, Eq)]
struct At(usize);

impl At {
    fn start<T>(slots: &[Slot<T>], idx: usize) -> Self {
        At(next_occupied(slots, idx))
    }

    fn is_end<T>(self, slots: &[Slot<T>]) -> bool {
        self.0 >= slots.len()
    }

    fn advance<T>(&mut self, slots: &[Slot<T>]) {
        if !self.is_end(slots) {
            self.0 = next_occupied(slots, self.0 + 1);
        }
    }

    fn value<T>(self, slots: &[Slot<T>]) -> Result<&T, Error> {
        slots
            .get(self.0)
            .and_then(Slot::value)
            .ok_or(Error::IteratorAtEnd)
    }

    fn value_mut<T>(self, slots: &mut [Slot<T>]) -> Result<&mut T, Error> {
        slots
            .get_mut(self.0)
            .and_then(Slot::value_mut)
            .ok_or(Error::IteratorAtEnd)
    }

    fn handle<T>(self, slots: &[Slot<T>]) -> Result<Handle, Error> {
        match slots.get(self.0) {
            Some(slot) if slot.occupied() => Ok(Handle::new(slot.generation, self.0 as u32)),
            _ => Err(Error::IteratorAtEnd),
        }
    }
}

/// A cursor position detached from any borrow of the slot map.
///
/// Obtained from [`Cursor::position`] or [`CursorMut::position`] and consumed
/// by [`SlotMap::cursor`], [`SlotMap::cursor_mut`] and [`SlotMap::erase`]. A
/// position remembers the identity of the slot map it came from, so handing it
/// to another slot map (including a clone) is reported as
/// [`Error::IteratorMismatch`]. Moving the slot map or growing its backing
/// store keeps the position valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    origin: u64,
    index: usize,
}

impl Position {
    pub(crate) fn new<T>(sm: &SlotMap<T>, index: usize) -> Self {
        Position {
            origin: sm.id(),
            index,
        }
    }

    pub(crate) fn belongs_to<T>(self, sm: &SlotMap<T>) -> bool {
        self.origin == sm.id()
    }

    /// Index into the backing store. Equal to the number of slots for the end
    /// position.
    pub fn index(self) -> usize {
        self.index
    }
}

/// A read-only cursor over the live values of a [`SlotMap`], in index order.
///
/// Two cursors are equal if they point into the same slot map at the same
/// position.
///
/// # Examples
///
/// ```
/// # use genslot::*;
/// let mut sm = SlotMap::new();
/// sm.insert('a');
/// let b = sm.insert('b');
/// sm.insert('c');
/// sm.remove(b).unwrap();
///
/// let mut seen = Vec::new();
/// let mut cur = sm.begin();
/// while cur != sm.end() {
///     seen.push(*cur.get().unwrap());
///     cur.move_next();
/// }
/// assert_eq!(seen, vec!['a', 'c']);
/// ```
pub struct Cursor<'a, T> {
    sm: &'a SlotMap<T>,
    at: At,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(sm: &'a SlotMap<T>, idx: usize) -> Self {
        Cursor {
            at: At::start(sm.slots(), idx),
            sm,
        }
    }

    /// Index of the current slot, or the number of slots at the end.
    pub fn index(&self) -> usize {
        self.at.0
    }

    /// Returns `true` if the cursor is past the last live value.
    pub fn is_end(&self) -> bool {
        self.at.is_end(self.sm.slots())
    }

    /// Returns the value under the cursor.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    pub fn get(&self) -> Result<&'a T, Error> {
        let sm = self.sm;
        self.at.value(sm.slots())
    }

    /// Returns the handle of the value under the cursor.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h = sm.insert(1);
    /// assert_eq!(sm.begin().handle(), Ok(h));
    /// assert_eq!(sm.end().handle(), Err(Error::IteratorAtEnd));
    /// ```
    pub fn handle(&self) -> Result<Handle, Error> {
        self.at.handle(self.sm.slots())
    }

    /// Advances to the next live value, or to the end. Does nothing at the end.
    pub fn move_next(&mut self) {
        self.at.advance(self.sm.slots());
    }

    /// Detaches the current position from the borrow of the slot map.
    pub fn position(&self) -> Position {
        Position::new(self.sm, self.at.0)
    }
}

// Clone and Copy are implemented manually because the cursor is Copy even when
// T is not.
impl<'a, T> Copy for Cursor<'a, T> {}

impl<'a, T> Clone for Cursor<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> PartialEq for Cursor<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.sm, other.sm) && self.at == other.at
    }
}

impl<'a, T> Eq for Cursor<'a, T> {}

impl<'a, T> fmt::Debug for Cursor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").field("index", &self.at.0).finish()
    }
}

/// A cursor with exclusive access to a [`SlotMap`], able to modify and remove
/// the value under it.
///
/// # Examples
///
/// ```
/// # use genslot::*;
/// let mut sm: SlotMap<i32> = (0..6).collect();
///
/// let mut cur = sm.begin_mut();
/// while !cur.is_end() {
///     if *cur.get().unwrap() % 2 == 0 {
///         cur.remove_current().unwrap();  // Moves on to the next value.
///     } else {
///         *cur.get_mut().unwrap() *= 10;
///         cur.move_next();
///     }
/// }
///
/// assert_eq!(sm.len(), 3);
/// assert_eq!(sm.values().copied().collect::<Vec<_>>(), vec![10, 30, 50]);
/// ```
pub struct CursorMut<'a, T> {
    sm: &'a mut SlotMap<T>,
    at: At,
}

impl<'a, T> CursorMut<'a, T> {
    pub(crate) fn new(sm: &'a mut SlotMap<T>, idx: usize) -> Self {
        CursorMut {
            at: At::start(sm.slots(), idx),
            sm,
        }
    }

    /// Index of the current slot, or the number of slots at the end.
    pub fn index(&self) -> usize {
        self.at.0
    }

    /// Returns `true` if the cursor is past the last live value.
    pub fn is_end(&self) -> bool {
        self.at.is_end(self.sm.slots())
    }

    /// Returns the value under the cursor.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    pub fn get(&self) -> Result<&T, Error> {
        self.at.value(self.sm.slots())
    }

    /// Returns the value under the cursor mutably.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    pub fn get_mut(&mut self) -> Result<&mut T, Error> {
        self.at.value_mut(self.sm.slots_mut())
    }

    /// Returns the handle of the value under the cursor.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    pub fn handle(&self) -> Result<Handle, Error> {
        self.at.handle(self.sm.slots())
    }

    /// Advances to the next live value, or to the end. Does nothing at the end.
    pub fn move_next(&mut self) {
        self.at.advance(self.sm.slots());
    }

    /// Removes the value under the cursor and advances to the next live value,
    /// or to the end. The handle of the removed value becomes stale.
    ///
    /// Fails with [`Error::IteratorAtEnd`] at the end position.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let a = sm.insert("a");
    /// let b = sm.insert("b");
    ///
    /// let mut cur = sm.begin_mut();
    /// assert_eq!(cur.remove_current(), Ok("a"));
    /// assert_eq!(cur.handle(), Ok(b));
    /// assert_eq!(cur.remove_current(), Ok("b"));
    /// assert!(cur.is_end());
    /// assert_eq!(cur.remove_current(), Err(Error::IteratorAtEnd));
    ///
    /// assert!(!sm.contains(a));
    /// assert!(sm.is_empty());
    /// ```
    pub fn remove_current(&mut self) -> Result<T, Error> {
        if self.is_end() {
            return Err(Error::IteratorAtEnd);
        }

        let value = self
            .sm
            .remove_from_slot(self.at.0)
            .ok_or(Error::SlotAlreadyFree)?;
        self.at.advance(self.sm.slots());
        Ok(value)
    }

    /// Detaches the current position from the borrow of the slot map.
    pub fn position(&self) -> Position {
        Position::new(self.sm, self.at.0)
    }

    /// Reborrows this cursor as a read-only [`Cursor`] at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            sm: &*self.sm,
            at: self.at,
        }
    }
}

impl<'a, T> fmt::Debug for CursorMut<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut").field("index", &self.at.0).finish()
    }
}
