use std::alloc::Layout;
use std::fmt::{self, Display};
use std::ptr::NonNull;

/// Failure to obtain backing slots from an `Allocator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The requested number of slots does not fit in the address space.
    CapacityOverflow { slots: usize },
    /// The platform allocator could not satisfy the request.
    OutOfMemory { bytes: usize },
    /// The request would take a `Memory` instance over its configured limit.
    LimitExceeded { bytes: usize, in_use: usize, limit: usize },
}

impl Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::CapacityOverflow { slots } => write!(f, "Capacity of {} slots overflows the address space", slots),
            AllocError::OutOfMemory { bytes } => write!(f, "Out of memory while allocating {} bytes", bytes),
            AllocError::LimitExceeded { bytes, in_use, limit } => write!(
                f,
                "Allocating {} bytes would exceed the memory limit of {} bytes ({} bytes in use)",
                bytes, limit, in_use
            ),
        }
    }
}

impl std::error::Error for AllocError {}

/// Source of raw, uninitialized slots for a container.
///
/// An allocator never constructs, zeroes or reads the memory it hands out. Cloning an allocator
/// must produce a fresh instance with the same configuration: a cloned array gets its own
/// allocator for its own, physically distinct, storage.
pub trait Allocator: Clone {
    /// Returns a block with room for `slots` values of `T`.
    fn allocate<T>(&mut self, slots: usize) -> Result<NonNull<T>, AllocError>;

    /// Releases a block previously returned by `allocate` with the same `slots`.
    ///
    /// Passing `None` with `slots == 0` is a no-op.
    ///
    /// # Safety
    ///
    /// `block` must come from `allocate::<T>(slots)` on this allocator (or an instance it was
    /// moved from) and must not be used afterwards.
    unsafe fn deallocate<T>(&mut self, block: Option<NonNull<T>>, slots: usize);
}

fn array_layout<T>(slots: usize) -> Result<Layout, AllocError> {
    Layout::array::<T>(slots).map_err(|_| AllocError::CapacityOverflow { slots })
}

/// The platform's global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

impl Allocator for Heap {
    fn allocate<T>(&mut self, slots: usize) -> Result<NonNull<T>, AllocError> {
        let layout = array_layout::<T>(slots)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        let ptr = unsafe { std::alloc::alloc(layout) } as *mut T;
        trace!("alloc {} bytes at {:?}", layout.size(), ptr);
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory { bytes: layout.size() })
    }

    unsafe fn deallocate<T>(&mut self, block: Option<NonNull<T>>, slots: usize) {
        let block = match block {
            Some(block) => block,
            None => return,
        };
        if let Ok(layout) = Layout::array::<T>(slots) {
            if layout.size() > 0 {
                trace!("free  {} bytes at {:?}", layout.size(), block);
                std::alloc::dealloc(block.as_ptr() as *mut u8, layout);
            }
        }
    }
}

/// Usage counters of a single `Memory` instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub allocations: usize,
    pub deallocations: usize,
    pub bytes_in_use: usize,
    pub peak_bytes: usize,
}

/// Heap allocator with an optional byte limit and usage counters.
///
/// Cloning yields an instance with the same limit and zeroed counters.
#[derive(Debug)]
pub struct Memory {
    limit: Option<usize>,
    stats: MemoryStats,
}

impl Memory {
    /// Unlimited memory.
    pub fn new() -> Memory {
        MemoryBuilder::new().build()
    }

    pub fn builder() -> MemoryBuilder {
        MemoryBuilder::new()
    }

    #[inline(always)]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[inline(always)]
    pub fn stats(&self) -> MemoryStats {
        self.stats
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl Clone for Memory {
    fn clone(&self) -> Self {
        Memory {
            limit: self.limit,
            stats: MemoryStats::default(),
        }
    }
}

impl Allocator for Memory {
    fn allocate<T>(&mut self, slots: usize) -> Result<NonNull<T>, AllocError> {
        let bytes = array_layout::<T>(slots)?.size();
        let in_use = self.stats.bytes_in_use;
        if let Some(limit) = self.limit {
            if in_use.checked_add(bytes).map_or(true, |total| total > limit) {
                debug!("refused {} bytes, {} of {} in use", bytes, in_use, limit);
                return Err(AllocError::LimitExceeded { bytes, in_use, limit });
            }
        }

        let block = Heap.allocate::<T>(slots)?;
        self.stats.allocations += 1;
        self.stats.bytes_in_use = in_use + bytes;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.bytes_in_use);
        Ok(block)
    }

    unsafe fn deallocate<T>(&mut self, block: Option<NonNull<T>>, slots: usize) {
        if block.is_none() {
            return;
        }
        let bytes = Layout::array::<T>(slots).map(|layout| layout.size()).unwrap_or(0);
        Heap.deallocate(block, slots);
        self.stats.deallocations += 1;
        self.stats.bytes_in_use = self.stats.bytes_in_use.saturating_sub(bytes);
    }
}

/// Configures a `Memory` allocator.
#[derive(Clone, Debug, Default)]
pub struct MemoryBuilder {
    limit: Option<usize>,
}

impl MemoryBuilder {
    pub fn new() -> MemoryBuilder {
        MemoryBuilder { limit: None }
    }

    /// Maximum number of bytes the allocator may hold at once.
    pub fn limit(mut self, bytes: usize) -> MemoryBuilder {
        self.limit = Some(bytes);
        self
    }

    pub fn build(self) -> Memory {
        Memory {
            limit: self.limit,
            stats: MemoryStats::default(),
        }
    }
}
