//! Per-zone handle storage for GC root tracking.
//!
//! - `HandleBlock`: fixed-size array of root slots
//! - `ZoneHandles`: the block list owned by one zone
//! - `ZoneHandle`: a root slot borrowed from its zone

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::visitor::{ObjectPointerVisitor, ObjectPtr, RootSlot};

/// Root slots per handle block.
pub const HANDLE_BLOCK_SIZE: usize = 64;

pub(crate) struct HandleBlock {
    slots: [RootSlot; HANDLE_BLOCK_SIZE],
}

impl HandleBlock {
    fn new() -> Box<Self> {
        Box::new(Self {
            slots: std::array::from_fn(|_| Cell::new(ptr::null_mut())),
        })
    }
}

/// Handle table of a zone.
///
/// Blocks are leaked boxes so slot addresses stay fixed while the block list
/// grows; they are reclaimed in `reset` and on drop.
pub struct ZoneHandles {
    blocks: RefCell<Vec<NonNull<HandleBlock>>>,
    /// Slots used in the last block.
    top: Cell<usize>,
    _marker: PhantomData<HandleBlock>,
}

impl ZoneHandles {
    /// An empty table; the first block is allocated on demand.
    pub const fn new() -> Self {
        Self {
            blocks: RefCell::new(Vec::new()),
            top: Cell::new(0),
            _marker: PhantomData,
        }
    }

    /// Allocate a slot holding `object`.
    pub fn allocate(&self, object: ObjectPtr) -> &RootSlot {
        let mut blocks = self.blocks.borrow_mut();
        let block = match blocks.last() {
            Some(&block) if self.top.get() < HANDLE_BLOCK_SIZE => block,
            _ => {
                let block = NonNull::from(Box::leak(HandleBlock::new()));
                blocks.push(block);
                self.top.set(0);
                block
            }
        };
        drop(blocks);

        let index = self.top.get();
        self.top.set(index + 1);

        // SAFETY: the block lives until `reset` or drop, both of which need
        // `&mut self`, so it outlives the returned borrow.
        let block = unsafe { block.as_ref() };
        let slot = &block.slots[index];
        slot.set(object);
        slot
    }

    /// Number of slots handed out.
    pub fn len(&self) -> usize {
        match self.blocks.borrow().len() {
            0 => 0,
            n => (n - 1) * HANDLE_BLOCK_SIZE + self.top.get(),
        }
    }

    /// Returns `true` if no slot has been handed out.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand every used slot range to `visitor`, oldest block first.
    pub fn visit_object_pointers<V>(&self, visitor: &mut V)
    where
        V: ObjectPointerVisitor + ?Sized,
    {
        let count = self.blocks.borrow().len();
        for index in 0..count {
            let block = self.blocks.borrow()[index];
            let used = if index + 1 == count {
                self.top.get()
            } else {
                HANDLE_BLOCK_SIZE
            };
            // SAFETY: see `allocate`.
            let block = unsafe { block.as_ref() };
            visitor.visit_pointers(&block.slots[..used]);
        }
    }

    /// Release every block.
    pub fn reset(&mut self) {
        for block in self.blocks.get_mut().drain(..) {
            // SAFETY: each block came from `Box::leak` in `allocate`.
            drop(unsafe { Box::from_raw(block.as_ptr()) });
        }
        self.top.set(0);
    }
}

impl Default for ZoneHandles {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ZoneHandles {
    fn drop(&mut self) {
        self.reset();
    }
}

/// A GC root allocated from a zone.
///
/// Valid until the zone is destroyed; the collector sees it through
/// `Zone::visit_object_pointers`.
#[derive(Clone, Copy)]
pub struct ZoneHandle<'z> {
    slot: &'z RootSlot,
}

impl<'z> ZoneHandle<'z> {
    pub(crate) const fn new(slot: &'z RootSlot) -> Self {
        Self { slot }
    }

    /// The object currently held by the slot.
    #[inline]
    pub fn get(&self) -> ObjectPtr {
        self.slot.get()
    }

    /// Store `object` in the slot.
    #[inline]
    pub fn set(&self, object: ObjectPtr) {
        self.slot.set(object);
    }

    /// Returns `true` if the slot holds no object.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.slot.get().is_null()
    }

    /// Address of the underlying slot.
    #[inline]
    pub fn slot_ptr(&self) -> *const RootSlot {
        self.slot
    }
}

impl std::fmt::Debug for ZoneHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ZoneHandle").field(&self.get()).finish()
    }
}
