//! Growable contiguous array with value semantics and a pluggable allocator.
//!
//! `DynamicArray` owns a single block of slots obtained from an `Allocator`. The first `len`
//! slots hold live values, the rest are uninitialized. Every fallible operation returns a
//! `Result`: allocation failures surface as `AllocError`, checked lookups past the end as
//! `ArrayError::OutOfRange`.

mod logging;
mod memory;
mod block;
mod array;
mod traits;

pub use memory::{Allocator, AllocError, Heap, Memory, MemoryBuilder, MemoryStats};
pub use array::{ArrayError, DynamicArray};
pub use traits::ArrayIterator;

#[cfg(test)]
pub mod dropflag;
