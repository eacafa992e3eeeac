//! Integration tests for GC root reporting through zone handles.

use std::collections::HashMap;
use std::ptr;

use vm_core::zone::HANDLE_BLOCK_SIZE;
use vm_core::{ObjectPtr, RootSlot, Zone};

fn fake_object(n: usize) -> ObjectPtr {
    (n * 16) as ObjectPtr
}

/// Collects every visited slot value in visiting order.
#[derive(Default)]
struct RecordingVisitor {
    seen: Vec<ObjectPtr>,
    calls: usize,
}

impl vm_core::ObjectPointerVisitor for RecordingVisitor {
    fn visit_pointers(&mut self, slots: &[RootSlot]) {
        self.calls += 1;
        self.seen.extend(slots.iter().map(RootSlot::get));
    }
}

#[test]
fn test_nested_zones_report_innermost_first() {
    let z1 = Zone::new();
    let h1 = z1.new_handle(fake_object(1));
    {
        let z2 = Zone::nested(&z1);
        let h2 = z2.new_handle(fake_object(2));
        let h3 = z2.new_handle(fake_object(3));
        assert!(!h2.is_null() && !h3.is_null());

        let mut visitor = RecordingVisitor::default();
        z2.visit_object_pointers(&mut visitor);
        assert_eq!(
            visitor.seen,
            vec![fake_object(2), fake_object(3), fake_object(1)]
        );
        assert_eq!(z2.previous().map(Zone::id), Some(z1.id()));
    }

    // After the inner zone is gone only the outer root remains.
    let mut visitor = RecordingVisitor::default();
    z1.visit_object_pointers(&mut visitor);
    assert_eq!(visitor.seen, vec![fake_object(1)]);
    assert_eq!(h1.get(), fake_object(1));
}

#[test]
fn test_every_handle_visited_exactly_once() {
    let outer = Zone::new();
    let middle = Zone::nested(&outer);
    let inner = Zone::nested(&middle);

    let mut expected = Vec::new();
    for (zone, base) in [(&inner, 0), (&middle, 1000), (&outer, 2000)] {
        for i in 1..=(HANDLE_BLOCK_SIZE * 2 + 3) {
            zone.new_handle(fake_object(base + i));
            expected.push(fake_object(base + i));
        }
    }

    let mut visitor = RecordingVisitor::default();
    inner.visit_object_pointers(&mut visitor);
    assert_eq!(visitor.seen, expected);

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for p in &visitor.seen {
        *counts.entry(*p as usize).or_default() += 1;
    }
    assert!(counts.values().all(|&c| c == 1));
}

#[test]
fn test_visitor_updates_are_visible_through_handles() {
    let zone = Zone::new();
    let handle = zone.new_handle(fake_object(7));
    let empty = zone.new_handle(ptr::null_mut());

    // A moving collector rewrites each slot to the object's new address.
    let mut relocate = |slots: &[RootSlot]| {
        for slot in slots {
            let old = slot.get();
            if !old.is_null() {
                slot.set(fake_object(old as usize / 16 + 100));
            }
        }
    };
    zone.visit_object_pointers(&mut relocate);

    assert_eq!(handle.get(), fake_object(107));
    assert!(empty.is_null());
}

#[test]
fn test_handles_keep_stable_addresses() {
    let zone = Zone::new();
    let first = zone.new_handle(fake_object(1));
    let addr = first.slot_ptr();
    for i in 0..(HANDLE_BLOCK_SIZE * 4) {
        zone.new_handle(fake_object(i + 2));
    }
    assert_eq!(first.slot_ptr(), addr);
    assert_eq!(first.get(), fake_object(1));
    assert_eq!(zone.handles().len(), HANDLE_BLOCK_SIZE * 4 + 1);
}

#[test]
fn test_handles_do_not_consume_zone_bytes() {
    let zone = Zone::new();
    for i in 0..10 {
        zone.new_handle(fake_object(i));
    }
    assert_eq!(zone.size_in_bytes(), 0);
}

#[test]
fn test_destroy_all_drops_roots() {
    let outer = Zone::new();
    outer.new_handle(fake_object(1));
    let mut inner = Zone::nested(&outer);
    inner.new_handle(fake_object(2));
    inner.destroy_all();

    let mut visitor = RecordingVisitor::default();
    inner.visit_object_pointers(&mut visitor);
    assert!(visitor.seen.is_empty());
    assert!(inner.previous().is_none());
}
