#![deny(missing_docs, missing_debug_implementations)]

//! # genslot
//!
//! This library provides a generational slot map, [`SlotMap`]. Upon insertion
//! a [`Handle`] is returned that can be used to later access or remove the
//! value. Insertion, deletion and access all take O(1) time with low overhead.
//! Handles stay valid for exactly as long as the value they name is stored,
//! which makes the slot map a good fit for objects that need stable, safe
//! references but have no clear ownership otherwise, such as game entities or
//! graph nodes.
//!
//! # Examples
//!
//! ```
//! # use genslot::*;
//! let mut sm = SlotMap::new();
//! let foo = sm.insert("foo");  // Handle generated on insert.
//! let bar = sm.insert("bar");
//! assert_eq!(sm[foo], "foo");
//! assert_eq!(sm[bar], "bar");
//!
//! sm.remove(bar).unwrap();
//! let reused = sm.insert("reuse");  // Space from bar reused.
//! assert_eq!(reused.index(), bar.index());
//! assert_eq!(sm.contains(bar), false);  // After deletion a handle stays invalid.
//! ```
//!
//! # Generations
//!
//! Behind the scenes each slot in the backing `Vec` is either occupied by a
//! value or vacant and linked into a free list, and in both states it carries
//! a generation. A handle is the pair `(generation, index)`, and it is only
//! valid while the slot at `index` is occupied under the same generation.
//! Every removal bumps the generation of the slot, so a recycled slot never
//! answers to a handle issued for its previous occupant. After 2<sup>32</sup>
//! removals from the same slot the generation wraps around and a spurious
//! match could potentially occur. It is incredibly unlikely however, and in
//! all circumstances the behavior is safe.
//!
//! A slot map never shrinks. It needs to remember the latest generation of
//! every slot so as not to hand out duplicate handles.
//!
//! # Checked and unchecked failure
//!
//! Probing with a possibly stale handle is expected, so [`SlotMap::contains`],
//! [`SlotMap::get`] and [`SlotMap::try_remove`] report failure through their
//! return value. [`SlotMap::remove`], [`SlotMap::at`], [`SlotMap::erase`] and
//! the cursor accessors are used where the caller believes the handle is valid,
//! and return an [`Error`] naming what went wrong. Indexing with `sm[handle]`
//! panics with that error.
//!
//! # Cursors
//!
//! Besides the usual iterators, [`SlotMap::begin`] and
//! [`SlotMap::begin_mut`] return positional cursors that visit live slots in
//! index order and can remove the element they point at while continuing the
//! traversal.
//!
//! # Serialization through [`serde`]
//!
//! With the `serde` feature enabled both [`Handle`] and [`SlotMap`] can be
//! (de)serialized. A handle remains valid for a slot map even after one or both
//! have been serialized and deserialized.
//!
//! [`serde`]: https://github.com/serde-rs/serde

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

use std::hash::{Hash, Hasher};

mod cursor;
mod error;
pub(crate) mod normal;
mod slot;
mod util;

pub use crate::cursor::{Cursor, CursorMut, Position};
pub use crate::error::Error;
pub use crate::normal::*;

/// Handle used to access stored values in a slot map.
///
/// A handle is a plain `(generation, index)` pair. It owns nothing and is only
/// meaningful relative to the slot map that issued it. Do not use a handle from
/// one slot map in another: the behavior is safe but non-sensical.
///
/// Handles implement `Ord` so they can be used in e.g.
/// [`BTreeMap`](std::collections::BTreeMap), but their order is arbitrary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle {
    generation: u32,
    index: u32,
}

impl Handle {
    /// Creates a handle from its raw parts.
    ///
    /// Normally handles come from [`SlotMap::insert`], building one by hand is
    /// mostly useful to restore a handle stored elsewhere.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let mut sm = SlotMap::new();
    /// let h = sm.insert('a');
    /// assert_eq!(Handle::new(h.generation(), h.index()), h);
    /// ```
    pub const fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }

    /// Creates a new handle that is always invalid and distinct from any
    /// handle returned by a slot map. Equivalent to `Handle::default()`.
    ///
    /// A null handle is always invalid, but an invalid handle (that is, a
    /// handle that has been removed from the slot map) does not become a null
    /// handle.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genslot::*;
    /// let sm = SlotMap::<i32>::new();
    /// let nh = Handle::null();
    /// assert!(nh.is_null());
    /// assert_eq!(sm.get(nh), None);
    /// ```
    pub const fn null() -> Self {
        Self::new(std::u32::MAX, std::u32::MAX)
    }

    /// Checks if a handle is null.
    pub fn is_null(self) -> bool {
        self == Self::null()
    }

    /// The generation of the slot occupant this handle names.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// The index of the slot this handle points at.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::null()
    }
}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(hash_combine(self.generation, self.index));
    }
}

// Boost-style hash_combine of the two fields, generation first.
fn hash_combine(generation: u32, index: u32) -> u64 {
    let seed = u64::from(generation);
    seed ^ u64::from(index)
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}
