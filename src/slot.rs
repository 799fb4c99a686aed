use std::fmt;
use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// What a slot holds. Vacant slots are threaded into the free list.
#[derive(Clone)]
pub(crate) enum Content<T> {
    Occupied(T),
    Vacant { next_free: Option<u32> },
}

// A slot, which represents storage for a value and a current generation.
// When vacant the generation is the one the next occupant will get.
#[derive(Clone)]
pub(crate) struct Slot<T> {
    pub content: Content<T>,
    pub generation: u32,
}

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Slot {
            content: Content::Occupied(value),
            generation: 0,
        }
    }

    #[inline(always)]
    pub fn occupied(&self) -> bool {
        match self.content {
            Content::Occupied(_) => true,
            Content::Vacant { .. } => false,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match &self.content {
            Content::Occupied(value) => Some(value),
            Content::Vacant { .. } => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match &mut self.content {
            Content::Occupied(value) => Some(value),
            Content::Vacant { .. } => None,
        }
    }

    // Free list link of a vacant slot.
    pub fn next_free(&self) -> Option<u32> {
        match self.content {
            Content::Vacant { next_free } => next_free,
            Content::Occupied(_) => None,
        }
    }

    // Moves the value out and links the slot to `next_free`, bumping the
    // generation. A vacant slot is left untouched.
    pub fn vacate(&mut self, next_free: Option<u32>) -> Option<T> {
        match mem::replace(&mut self.content, Content::Vacant { next_free }) {
            Content::Occupied(value) => {
                self.generation = self.generation.wrapping_add(1);
                Some(value)
            }
            vacant => {
                self.content = vacant;
                None
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = fmt.debug_struct("Slot");
        builder.field("generation", &self.generation);
        match &self.content {
            Content::Occupied(value) => builder.field("value", value).finish(),
            Content::Vacant { next_free } => builder.field("next_free", next_free).finish(),
        }
    }
}

// Serialized form of a slot. The free list is not part of it, the slot map
// rebuilds it after deserializing.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct SafeSlot<T> {
    value: Option<T>,
    generation: u32,
}

#[cfg(feature = "serde")]
impl<T> From<SafeSlot<T>> for Slot<T> {
    fn from(safe_slot: SafeSlot<T>) -> Self {
        Slot {
            content: match safe_slot.value {
                Some(value) => Content::Occupied(value),
                None => Content::Vacant { next_free: None },
            },
            generation: safe_slot.generation,
        }
    }
}

#[cfg(feature = "serde")]
impl<'a, T> From<&'a Slot<T>> for SafeSlot<&'a T> {
    fn from(slot: &'a Slot<T>) -> Self {
        SafeSlot {
            value: slot.value(),
            generation: slot.generation,
        }
    }
}

#[cfg(feature = "serde")]
impl<T> Serialize for Slot<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SafeSlot::from(self).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> Deserialize<'de> for Slot<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let safe_slot: SafeSlot<T> = Deserialize::deserialize(deserializer)?;
        Ok(Slot::from(safe_slot))
    }
}
