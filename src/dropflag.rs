//! This module is for testing only

use crate::{AllocError, Allocator, Heap};
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

/// Shared count of dropped `Tracked` values, clones included.
#[derive(Clone, Default)]
pub struct DropCounter {
    drops: Rc<Cell<usize>>,
}

impl DropCounter {
    pub fn new() -> DropCounter {
        DropCounter::default()
    }

    pub fn drops(&self) -> usize {
        self.drops.get()
    }
}

/// A value that reports its drop to a `DropCounter` and can be told to panic when cloned or
/// dropped. The drop is counted before the panic.
pub struct Tracked {
    pub value: i32,
    pub fail_clone: bool,
    pub fail_drop: bool,
    counter: DropCounter,
}

impl Tracked {
    pub fn new(value: i32, counter: &DropCounter) -> Tracked {
        Tracked {
            value,
            fail_clone: false,
            fail_drop: false,
            counter: counter.clone(),
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        if self.fail_clone {
            panic!("clone of {} failed", self.value);
        }
        Tracked::new(self.value, &self.counter)
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counter.drops.set(self.counter.drops.get() + 1);
        if self.fail_drop {
            panic!("drop of {} failed", self.value);
        }
    }
}

/// Heap allocator whose clones share one count of blocks not yet returned, so the count stays
/// readable after the array holding the allocator is gone.
#[derive(Clone, Default)]
pub struct BlockCounter {
    outstanding: Rc<Cell<usize>>,
}

impl BlockCounter {
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }
}

impl Allocator for BlockCounter {
    fn allocate<T>(&mut self, slots: usize) -> Result<NonNull<T>, AllocError> {
        let block = Heap.allocate::<T>(slots)?;
        self.outstanding.set(self.outstanding.get() + 1);
        Ok(block)
    }

    unsafe fn deallocate<T>(&mut self, block: Option<NonNull<T>>, slots: usize) {
        if block.is_some() {
            self.outstanding.set(self.outstanding.get() - 1);
        }
        Heap.deallocate(block, slots);
    }
}

#[test]
fn counts_drops_of_clones() {
    let counter = DropCounter::new();
    let tracked = Tracked::new(1, &counter);
    let copy = tracked.clone();
    assert_eq!(0, counter.drops());
    std::mem::drop(tracked);
    assert_eq!(1, counter.drops());
    std::mem::drop(copy);
    assert_eq!(2, counter.drops());
}

#[test]
fn block_counter_tracks_outstanding_blocks() {
    let mut counter = BlockCounter::default();
    let block = counter.allocate::<u64>(3).unwrap();
    let shared = counter.clone();
    assert_eq!(1, shared.outstanding());
    unsafe { counter.deallocate(Some(block), 3) };
    assert_eq!(0, shared.outstanding());
}
