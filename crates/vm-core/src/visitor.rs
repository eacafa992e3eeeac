//! Root reporting interface between zones and the garbage collector.

use std::cell::Cell;

/// Untyped pointer to a collector-managed object.
pub type ObjectPtr = *mut ();

/// A root slot. The collector may rewrite it, e.g. after moving the object.
pub type RootSlot = Cell<ObjectPtr>;

/// Receives ranges of root slots during root enumeration.
///
/// Implemented by the collector. Zones call it once per contiguous range of
/// handles; null slots may be present and should be skipped.
pub trait ObjectPointerVisitor {
    /// Visit a contiguous range of root slots.
    fn visit_pointers(&mut self, slots: &[RootSlot]);
}

impl<F> ObjectPointerVisitor for F
where
    F: FnMut(&[RootSlot]),
{
    fn visit_pointers(&mut self, slots: &[RootSlot]) {
        self(slots);
    }
}
