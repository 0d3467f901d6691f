use crate::{AllocError, Allocator, DynamicArray, Heap};

/// Collects iterators into a `DynamicArray`, reporting allocation failure instead of panicking.
pub trait ArrayIterator: Iterator {
    fn collect_array(self) -> Result<DynamicArray<Self::Item>, AllocError>;

    fn collect_array_in<A: Allocator>(self, allocator: A) -> Result<DynamicArray<Self::Item, A>, AllocError>;

    /// Stops at the first `Err` item.
    fn collect_result_array<I, E>(self) -> Result<DynamicArray<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<AllocError>;
}

impl<Q: Iterator> ArrayIterator for Q {
    fn collect_array(self) -> Result<DynamicArray<Self::Item>, AllocError> {
        self.collect_array_in(Heap)
    }

    fn collect_array_in<A: Allocator>(self, allocator: A) -> Result<DynamicArray<Self::Item, A>, AllocError> {
        let (lower, _) = self.size_hint();
        let mut array = DynamicArray::with_capacity_in(lower, allocator)?;
        for item in self {
            array.push(item)?;
        }
        Ok(array)
    }

    fn collect_result_array<I, E>(self) -> Result<DynamicArray<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<AllocError>
    {
        let mut array = DynamicArray::new();
        for item in self {
            array.push(item?)?;
        }
        Ok(array)
    }
}

#[cfg(test)]
mod traits_tests {
    use crate::{AllocError, ArrayError, ArrayIterator, Memory};

    #[test]
    fn collects_in_order_with_exact_capacity() {
        let array = (0..12).map(|v| v as i16).collect_array().unwrap();
        assert_eq!(12, array.capacity());
        for (i, (item, expected)) in array.iter().zip((0..12).map(|v| v as i16)).enumerate() {
            assert_eq!(*item, expected, "at index {}", i);
        }
    }

    #[test]
    fn collects_into_configured_memory() {
        let array = "abc".chars().collect_array_in(Memory::new()).unwrap();
        assert_eq!(array, ['a', 'b', 'c']);
        assert!(array.allocator().stats().allocations >= 1);

        let refused = (0..100u64).collect_array_in(Memory::builder().limit(64).build());
        assert_eq!(Err(AllocError::LimitExceeded { bytes: 800, in_use: 0, limit: 64 }), refused.map(|_| ()));
    }

    #[test]
    fn collect_result_stops_at_first_error() {
        let items = vec![Ok(1), Ok(2), Err(ArrayError::OutOfRange { index: 9, count: 2 }), Ok(4)];
        let result = items.into_iter().collect_result_array::<i32, ArrayError>();
        assert_eq!(Err(ArrayError::OutOfRange { index: 9, count: 2 }), result.map(|_| ()));

        let ok = vec![Ok::<_, ArrayError>("x"), Ok("y")].into_iter().collect_result_array().unwrap();
        assert_eq!(ok, ["x", "y"]);
    }
}
