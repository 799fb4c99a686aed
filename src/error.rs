//! Error type for the privileged slot map operations.
use std::fmt;

/// The error type returned by [`SlotMap::remove`](crate::SlotMap::remove),
/// [`SlotMap::at`](crate::SlotMap::at), [`SlotMap::erase`](crate::SlotMap::erase)
/// and the cursor accessors.
///
/// Query operations such as [`SlotMap::contains`](crate::SlotMap::contains)
/// and [`SlotMap::get`](crate::SlotMap::get) never produce an `Error`, they
/// report an invalid handle through their return value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The index is outside the backing store of the slot map.
    InvalidIndex,

    /// The slot exists but its generation does not match the handle, the
    /// value it named has been removed.
    StaleHandle,

    /// The slot at this position is vacant.
    SlotAlreadyFree,

    /// The position was taken from a different slot map.
    IteratorMismatch,

    /// The cursor or position is at the end of the slot map.
    IteratorAtEnd,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidIndex => "invalid handle: index out of bounds",
            Error::StaleHandle => "stale handle: value was already removed",
            Error::SlotAlreadyFree => "slot is already free",
            Error::IteratorMismatch => "position belongs to a different slot map",
            Error::IteratorAtEnd => "cursor is at the end of the slot map",
        };
        fmt::Display::fmt(msg, f)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::StaleHandle.to_string(),
            "stale handle: value was already removed"
        );
        assert_eq!(
            Error::InvalidIndex.to_string(),
            "invalid handle: index out of bounds"
        );
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::IteratorAtEnd);
        assert_eq!(err.to_string(), "cursor is at the end of the slot map");
    }
}
