use crate::{AllocError, Allocator};
use std::ptr::{self, NonNull};

/// Raw slots for values of `T`.
///
/// A block knows nothing about which of its slots are live: the owner tracks that and must
/// destroy or move out every value before calling `release`. `capacity == 0` always means no
/// allocation exists.
pub struct Block<T> {
    ptr: Option<NonNull<T>>,
    capacity: usize,
}

impl<T> Block<T> {
    #[inline(always)]
    pub const fn empty() -> Block<T> {
        Block {
            ptr: None,
            capacity: 0,
        }
    }

    pub fn allocate<A: Allocator>(allocator: &mut A, capacity: usize) -> Result<Block<T>, AllocError> {
        if capacity == 0 {
            return Ok(Block::empty());
        }
        let ptr = allocator.allocate::<T>(capacity)?;
        Ok(Block {
            ptr: Some(ptr),
            capacity,
        })
    }

    /// Returns the slots to `allocator` and leaves the block empty.
    ///
    /// No slot may hold a live value.
    pub unsafe fn release<A: Allocator>(&mut self, allocator: &mut A) {
        allocator.deallocate(self.ptr.take(), self.capacity);
        self.capacity = 0;
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.unwrap_or(NonNull::dangling()).as_ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.unwrap_or(NonNull::dangling()).as_ptr()
    }

    #[inline(always)]
    pub unsafe fn slot(&mut self, index: usize) -> *mut T {
        debug_assert!(index <= self.capacity, "slot {} past capacity {}", index, self.capacity);
        self.as_mut_ptr().add(index)
    }

    /// Constructs `value` in an empty slot.
    #[inline(always)]
    pub unsafe fn write(&mut self, index: usize, value: T) {
        ptr::write(self.slot(index), value);
    }

    /// Moves the value out of a live slot, leaving the slot empty.
    #[inline(always)]
    pub unsafe fn read(&mut self, index: usize) -> T {
        ptr::read(self.slot(index))
    }

    /// Destroys the value in a live slot, leaving the slot empty.
    #[inline(always)]
    pub unsafe fn destroy(&mut self, index: usize) {
        ptr::drop_in_place(self.slot(index));
    }

    /// Moves `count` live values starting at `from` so they start at `to`. Ranges may overlap.
    #[inline(always)]
    pub unsafe fn shift(&mut self, from: usize, to: usize, count: usize) {
        if count > 0 && from != to {
            let base = self.as_mut_ptr();
            ptr::copy(base.add(from), base.add(to), count);
        }
    }

    /// Destroys the values in slots `[0, count)`, in order.
    pub unsafe fn destroy_prefix(&mut self, count: usize) {
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), count));
    }

    /// Moves the values in slots `[0, count)` into the same slots of `target`.
    ///
    /// The slots of this block are empty afterwards. A bitwise move cannot fail, so the
    /// relocation is never left half done.
    pub unsafe fn relocate_into(&mut self, target: &mut Block<T>, count: usize) {
        debug_assert!(count <= target.capacity, "relocating {} values into {} slots", count, target.capacity);
        if count > 0 {
            ptr::copy_nonoverlapping(self.as_ptr(), target.as_mut_ptr(), count);
        }
    }

    pub unsafe fn live(&self, count: usize) -> &[T] {
        std::slice::from_raw_parts(self.as_ptr(), count)
    }

    pub unsafe fn live_mut(&mut self, count: usize) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.as_mut_ptr(), count)
    }
}

#[cfg(test)]
mod block_tests {
    use super::Block;
    use crate::Memory;

    #[test]
    fn zero_capacity_does_not_allocate() {
        let mut memory = Memory::new();
        let mut block = Block::<u32>::allocate(&mut memory, 0).unwrap();
        assert_eq!(0, block.capacity());
        unsafe { block.release(&mut memory) };
        assert_eq!(0, memory.stats().allocations);
        assert_eq!(0, memory.stats().deallocations);
    }

    #[test]
    fn values_survive_relocation() {
        let mut memory = Memory::new();
        let mut small = Block::<String>::allocate(&mut memory, 2).unwrap();
        let mut large = Block::<String>::allocate(&mut memory, 4).unwrap();
        unsafe {
            small.write(0, "a".to_string());
            small.write(1, "b".to_string());
            small.relocate_into(&mut large, 2);
            small.release(&mut memory);
            assert_eq!(&["a".to_string(), "b".to_string()], large.live(2));
            large.destroy_prefix(2);
            large.release(&mut memory);
        }
        assert_eq!(0, memory.stats().bytes_in_use);
        assert_eq!(2, memory.stats().deallocations);
    }

    #[test]
    fn shift_moves_overlapping_values() {
        let mut memory = Memory::new();
        let mut block = Block::<u8>::allocate(&mut memory, 4).unwrap();
        unsafe {
            for i in 0..4 {
                block.write(i, i as u8);
            }
            block.shift(1, 0, 3);
            assert_eq!(&[1, 2, 3], block.live(3));
            block.release(&mut memory);
        }
    }
}
