use crate::block::Block;
use crate::{AllocError, Allocator, Heap};
use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;
use std::mem;
use std::ops::{Index, IndexMut, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// Checked access at `index` when only `count` elements are live.
    OutOfRange { index: usize, count: usize },
    Alloc(AllocError),
}

impl Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayError::OutOfRange { index, count } => write!(f, "Index {} is out of range for array of {} elements", index, count),
            ArrayError::Alloc(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for ArrayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArrayError::Alloc(e) => Some(e),
            ArrayError::OutOfRange { .. } => None,
        }
    }
}

impl From<AllocError> for ArrayError {
    fn from(e: AllocError) -> Self {
        ArrayError::Alloc(e)
    }
}

/// Growable array of values stored contiguously in memory obtained from `A`.
///
/// Slots `[0, len)` hold live values, the rest of the capacity is uninitialized and never
/// observable. The array owns its values: cloning the array clones every value into a separate
/// block, moving it out with `take` leaves an empty array behind.
///
/// Any operation that changes the length or the capacity invalidates slices and pointers
/// previously obtained from the array; the borrow checker enforces this for references.
pub struct DynamicArray<T, A: Allocator = Heap> {
    _block: Block<T>,
    _len: usize,
    allocator: A,
    _owns: PhantomData<T>,
}

impl<T> DynamicArray<T, Heap> {
    /// Empty array on the global heap. Does not allocate.
    pub fn new() -> DynamicArray<T, Heap> {
        DynamicArray::new_in(Heap)
    }
}

impl<T, A: Allocator> DynamicArray<T, A> {
    /// Empty array that will obtain its storage from `allocator`. Does not allocate.
    pub fn new_in(allocator: A) -> DynamicArray<T, A> {
        DynamicArray {
            _block: Block::empty(),
            _len: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    /// Empty array with room for exactly `capacity` values.
    pub fn with_capacity_in(capacity: usize, mut allocator: A) -> Result<DynamicArray<T, A>, AllocError> {
        let block = Block::allocate(&mut allocator, capacity)?;
        Ok(DynamicArray {
            _block: block,
            _len: 0,
            allocator,
            _owns: PhantomData,
        })
    }

    #[inline(always)]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Number of live values.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self._len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self._len == 0
    }

    /// Number of allocated slots.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self._block.capacity()
    }

    /// Grows the storage to exactly `requested` slots. Never shrinks: a request at or below the
    /// current capacity does nothing.
    pub fn set_capacity(&mut self, requested: usize) -> Result<(), AllocError> {
        if requested <= self.capacity() {
            return Ok(());
        }
        self.resize(requested)
    }

    /// Reallocates the storage to exactly `len` slots. An empty array gives its block back.
    pub fn shrink_to_fit(&mut self) -> Result<(), AllocError> {
        if self.capacity() == self._len {
            return Ok(());
        }
        self.resize(self._len)
    }

    /// Moves every live value into a new block of `capacity` slots and frees the old block.
    ///
    /// The new block is acquired before anything is touched, so on failure the array is
    /// unchanged.
    fn resize(&mut self, capacity: usize) -> Result<(), AllocError> {
        debug_assert!(capacity >= self._len, "resize to {} below len {}", capacity, self._len);
        debug!("resize {} -> {} slots ({} live)", self.capacity(), capacity, self._len);

        let mut block = Block::allocate(&mut self.allocator, capacity)?;
        unsafe {
            self._block.relocate_into(&mut block, self._len);
            self._block.release(&mut self.allocator);
        }
        self._block = block;
        Ok(())
    }

    fn grow(&mut self) -> Result<(), AllocError> {
        let capacity = self.capacity();
        let doubled = capacity
            .checked_mul(2)
            .ok_or(AllocError::CapacityOverflow { slots: capacity })?;
        self.resize(doubled.max(1))
    }

    /// Appends `value`, doubling the capacity when the array is full.
    pub fn push(&mut self, value: T) -> Result<(), AllocError> {
        self.push_with(|| value)
    }

    /// Appends the value returned by `construct`, which runs only once the slot for it exists.
    pub fn push_with<F>(&mut self, construct: F) -> Result<(), AllocError>
        where F: FnOnce() -> T
    {
        if self._len == self.capacity() {
            self.grow()?;
        }
        unsafe { self._block.write(self._len, construct()) };
        self._len += 1;
        Ok(())
    }

    /// First value equal to `value`.
    pub fn find(&self, value: &T) -> Option<&T> where T: PartialEq {
        self.iter().find(|item| *item == value)
    }

    pub fn find_mut(&mut self, value: &T) -> Option<&mut T> where T: PartialEq {
        self.iter_mut().find(|item| **item == *value)
    }

    /// First value satisfying `predicate`.
    pub fn find_if<P>(&self, mut predicate: P) -> Option<&T>
        where P: FnMut(&T) -> bool
    {
        self.iter().find(|item| predicate(item))
    }

    pub fn find_if_mut<P>(&mut self, mut predicate: P) -> Option<&mut T>
        where P: FnMut(&T) -> bool
    {
        self.iter_mut().find(|item| predicate(item))
    }

    /// Position of the first value equal to `value`.
    pub fn index_of(&self, value: &T) -> Option<usize> where T: PartialEq {
        self.iter().position(|item| item == value)
    }

    pub fn contains(&self, value: &T) -> bool where T: PartialEq {
        self.index_of(value).is_some()
    }

    /// Bounds-checked access. Unlike indexing with `[]`, an index past the live values is
    /// reported as `ArrayError::OutOfRange`.
    pub fn get(&self, index: usize) -> Result<&T, ArrayError> {
        self.check_index(index)?;
        Ok(unsafe { self.get_unchecked(index) })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, ArrayError> {
        self.check_index(index)?;
        Ok(unsafe { self.get_unchecked_mut(index) })
    }

    /// # Safety
    ///
    /// `index` must be below `len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        &*self._block.as_ptr().add(index)
    }

    /// # Safety
    ///
    /// `index` must be below `len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        &mut *self._block.slot(index)
    }

    #[inline(always)]
    fn check_index(&self, index: usize) -> Result<(), ArrayError> {
        if index >= self._len {
            return Err(ArrayError::OutOfRange { index, count: self._len });
        }
        Ok(())
    }

    /// Removes the value at `index` and returns it, shifting every later value one slot left.
    pub fn remove_at(&mut self, index: usize) -> Result<T, ArrayError> {
        self.check_index(index)?;
        let removed = unsafe {
            let removed = self._block.read(index);
            self._block.shift(index + 1, index, self._len - index - 1);
            removed
        };
        self._len -= 1;
        Ok(removed)
    }

    /// Removes the first value equal to `value`. Returns whether anything was removed.
    pub fn remove(&mut self, value: &T) -> bool where T: PartialEq {
        let mut found = false;
        let removed = self.remove_if(|item| {
            if !found && item == value {
                found = true;
                return true;
            }
            false
        });
        removed == 1
    }

    /// Removes every value satisfying `predicate` in a single pass, keeping the order of the
    /// remaining values. Returns the number of removed values.
    ///
    /// `predicate` is called exactly once per value, front to back. If it panics, the values
    /// not yet visited are kept.
    pub fn remove_if<P>(&mut self, mut predicate: P) -> usize
        where P: FnMut(&T) -> bool
    {
        let first = match self.iter().position(|item| predicate(item)) {
            Some(first) => first,
            None => return 0,
        };

        let len = mem::replace(&mut self._len, 0);
        let mut compaction = Compaction {
            block: &mut self._block,
            len: &mut self._len,
            original_len: len,
            picker: first + 1,
            placer: first,
        };
        unsafe { compaction.block.destroy(first) };

        while compaction.picker < len {
            let picker = compaction.picker;
            let remove = predicate(unsafe { &*compaction.block.slot(picker) });
            compaction.picker += 1;
            if remove {
                if mem::needs_drop::<T>() {
                    unsafe { compaction.block.destroy(picker) };
                }
            } else {
                unsafe { compaction.block.shift(picker, compaction.placer, 1) };
                compaction.placer += 1;
            }
        }

        compaction.picker - compaction.placer
    }

    /// Destroys every value, front to back. The capacity is kept.
    pub fn clear(&mut self) {
        let len = mem::replace(&mut self._len, 0);
        unsafe { self._block.destroy_prefix(len) };
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { self._block.live(self._len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { self._block.live_mut(self._len) }
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline(always)]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Start and one-past-the-end pointers of the live values.
    pub fn as_ptr_range(&self) -> Range<*const T> {
        self.as_slice().as_ptr_range()
    }

    pub fn as_mut_ptr_range(&mut self) -> Range<*mut T> {
        self.as_mut_slice().as_mut_ptr_range()
    }

    /// Moves the values, storage and allocator out into a new array.
    ///
    /// `self` is left empty without storage, holding a fresh allocator of the same
    /// configuration, and stays usable.
    pub fn take(&mut self) -> DynamicArray<T, A> {
        let fresh = self.allocator.clone();
        DynamicArray {
            _block: mem::replace(&mut self._block, Block::empty()),
            _len: mem::replace(&mut self._len, 0),
            allocator: mem::replace(&mut self.allocator, fresh),
            _owns: PhantomData,
        }
    }

    /// Replaces the contents of `self` with the contents of `source`, leaving `source` empty.
    /// The previous contents of `self` are dropped and their storage released.
    pub fn move_from(&mut self, source: &mut DynamicArray<T, A>) {
        let mut previous = source.take();
        self.swap(&mut previous);
    }

    /// Exchanges values, storage and allocators.
    pub fn swap(&mut self, other: &mut DynamicArray<T, A>) {
        mem::swap(self, other);
    }
}

impl<T: Clone, A: Allocator> DynamicArray<T, A> {
    /// Deep copy with the same capacity and a fresh allocator of the same configuration.
    ///
    /// If cloning a value panics, the values cloned so far are dropped and the new block is
    /// released.
    pub fn try_clone(&self) -> Result<DynamicArray<T, A>, AllocError> {
        let mut copy = DynamicArray::with_capacity_in(self.capacity(), self.allocator.clone())?;
        copy.clone_values_from(self.as_slice());
        Ok(copy)
    }

    /// Replaces the contents with clones of the values in `source`, keeping this array's
    /// allocator. The capacity grows to at least `source.capacity()` and never shrinks.
    ///
    /// On allocation failure the array is left empty. If cloning a value panics, the array
    /// keeps the values cloned so far.
    pub fn try_clone_from<B: Allocator>(&mut self, source: &DynamicArray<T, B>) -> Result<(), AllocError> {
        self.clear();
        self.set_capacity(source.capacity())?;
        self.clone_values_from(source.as_slice());
        Ok(())
    }

    fn clone_values_from(&mut self, values: &[T]) {
        debug_assert!(self._len + values.len() <= self.capacity(), "no room for clones");
        for value in values {
            unsafe { self._block.write(self._len, value.clone()) };
            self._len += 1;
        }
    }
}

/// Restores a consistent array when `remove_if` finishes or unwinds: values not yet visited by
/// the picker are shifted down behind the kept ones.
struct Compaction<'a, T> {
    block: &'a mut Block<T>,
    len: &'a mut usize,
    original_len: usize,
    picker: usize,
    placer: usize,
}

impl<'a, T> Drop for Compaction<'a, T> {
    fn drop(&mut self) {
        let unvisited = self.original_len - self.picker;
        unsafe { self.block.shift(self.picker, self.placer, unvisited) };
        *self.len = self.placer + unvisited;
    }
}

/// Returns the block to its allocator when dropped, including while unwinding out of a
/// panicking element destructor.
struct Release<'a, T, A: Allocator> {
    block: &'a mut Block<T>,
    allocator: &'a mut A,
}

impl<'a, T, A: Allocator> Drop for Release<'a, T, A> {
    fn drop(&mut self) {
        unsafe { self.block.release(self.allocator) };
    }
}

impl<T, A: Allocator> Drop for DynamicArray<T, A> {
    fn drop(&mut self) {
        let len = mem::replace(&mut self._len, 0);
        let mut release = Release {
            block: &mut self._block,
            allocator: &mut self.allocator,
        };
        unsafe { release.block.destroy_prefix(len) };
    }
}

/// Empty array with a default-configured allocator.
impl<T, A: Allocator + Default> Default for DynamicArray<T, A> {
    fn default() -> Self {
        DynamicArray::new_in(A::default())
    }
}

impl<T: Clone, A: Allocator> Clone for DynamicArray<T, A> {
    /// # Panics
    ///
    /// Panics if the allocator cannot provide the storage; use `try_clone` to handle that.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(e) => panic!("{}", e),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if let Err(e) = self.try_clone_from(source) {
            panic!("{}", e);
        }
    }
}

/// Unchecked by contract: an index past the live values panics instead of returning
/// `ArrayError`. Use `get` for a recoverable check.
impl<T, A: Allocator> Index<usize> for DynamicArray<T, A> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T, A: Allocator> IndexMut<usize> for DynamicArray<T, A> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T, A: Allocator> AsRef<[T]> for DynamicArray<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for DynamicArray<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynamicArray<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut DynamicArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, U, A, B> PartialEq<DynamicArray<U, B>> for DynamicArray<T, A>
    where T: PartialEq<U>, A: Allocator, B: Allocator
{
    fn eq(&self, other: &DynamicArray<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for DynamicArray<T, A> {}

impl<T, U, A: Allocator> PartialEq<[U]> for DynamicArray<T, A> where T: PartialEq<U> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, A: Allocator, const N: usize> PartialEq<[U; N]> for DynamicArray<T, A> where T: PartialEq<U> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T, A: Allocator> Debug for DynamicArray<T, A> where T: Debug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Formats as `(a, b, c)`; an empty array is `()`.
impl<T, A: Allocator> Display for DynamicArray<T, A> where T: Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(item, f)?;
        }
        f.write_str(")")
    }
}
