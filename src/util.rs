use std::fmt;

use crate::Handle;

/// Debug format a slot map as a map from handles to values. Handles are
/// formatted compactly as `{index}v{generation}`.
pub fn debug_fmt_entries<I, V>(entries: I, f: &mut fmt::Formatter<'_>) -> fmt::Result
where
    I: IntoIterator<Item = (Handle, V)>,
    V: fmt::Debug,
{
    let entries = entries
        .into_iter()
        .map(|(h, v)| (CompactHandle(h), v));
    f.debug_map().entries(entries).finish()
}

struct CompactHandle(Handle);

impl fmt::Debug for CompactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.0.index(), self.0.generation())
    }
}
