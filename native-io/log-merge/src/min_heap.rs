use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;

/// An array-backed binary min-heap ordered by a caller supplied key function.
///
/// Keys are compared with strict less-than, so elements whose keys are equal
/// keep no particular relative order. Callers that need a deterministic order
/// among equal keys should fold a tie-breaker into the key, as
/// [`crate::min_heap_combiner::MinHeapSlotCombiner`] does.
///
/// The key function runs on both operands of every comparison, so it should be
/// cheap: read a field that was extracted up front rather than derive the key
/// from the element each time. Keys that allocate when cloned pay that cost on
/// every comparison.
///
/// Elements live inline for small heaps (one slot per merged source is the
/// common case) and spill to the allocator beyond that.
pub struct MinHeap<T, K, F>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    storage: SmallVec<[T; 8]>,
    key: F,
}

impl<T, K, F> MinHeap<T, K, F>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    pub fn new(key: F) -> Self {
        MinHeap {
            storage: SmallVec::new(),
            key,
        }
    }

    pub fn with_capacity(capacity: usize, key: F) -> Self {
        MinHeap {
            storage: SmallVec::with_capacity(capacity),
            key,
        }
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The element with the smallest key, if any.
    pub fn peek(&self) -> Option<&T> {
        self.storage.first()
    }

    pub fn push(&mut self, item: T) {
        self.storage.push(item);
        self.bubble_up(self.storage.len() - 1);
    }

    /// Removes and returns the element with the smallest key, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.storage.pop()?;
        if self.storage.is_empty() {
            return Some(last);
        }
        let min = std::mem::replace(&mut self.storage[0], last);
        self.bubble_down(0);
        Some(min)
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.key)(&self.storage[a]) < (self.key)(&self.storage[b])
    }

    fn bubble_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.storage.swap(index, parent);
            index = parent;
        }
    }

    fn bubble_down(&mut self, mut index: usize) {
        let len = self.storage.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smaller = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(smaller, index) {
                break;
            }
            self.storage.swap(index, smaller);
            index = smaller;
        }
    }

    #[cfg(test)]
    fn holds_heap_property(&self) -> bool {
        (1..self.storage.len()).all(|i| !self.less(i, (i - 1) / 2))
    }
}

impl<T, K, F> Debug for MinHeap<T, K, F>
where
    T: Debug,
    F: Fn(&T) -> K,
    K: Ord,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinHeap")
            .field("len", &self.storage.len())
            .field("storage", &self.storage)
            .finish()
    }
}
