//! A binary min-heap that supports removing arbitrary elements.
//!
//! Pushing an element returns a [`Handle`] that stays valid until that
//! element leaves the queue, either by being popped or by being removed
//! through the handle. Slots are recycled, so every handle carries a
//! generation counter: using a handle after its element is gone is detected
//! and treated as a bug in the caller.

/// A reference to an element in a [`PriorityQueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    slot: usize,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    // Where in the heap this slot lives. Meaningless if `item` is `None`.
    position: usize,
    generation: u32,
}

/// A min-heap: [`PriorityQueue::pop`] returns the smallest element first.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    // Heap-ordered slot indices.
    heap: Vec<usize>,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        PriorityQueue {
            heap: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T: Ord> PriorityQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with room for `cap` elements.
    pub fn with_capacity(cap: usize) -> Self {
        PriorityQueue {
            heap: Vec::with_capacity(cap),
            slots: Vec::with_capacity(cap),
            free: Vec::new(),
        }
    }

    /// The number of elements in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Adds an element to the queue.
    pub fn push(&mut self, item: T) -> Handle {
        let position = self.heap.len();
        let slot = match self.free.pop() {
            Some(slot) => {
                let s = &mut self.slots[slot];
                debug_assert!(s.item.is_none());
                s.item = Some(item);
                s.position = position;
                slot
            }
            None => {
                self.slots.push(Slot {
                    item: Some(item),
                    position,
                    generation: 0,
                });
                self.slots.len() - 1
            }
        };
        self.heap.push(slot);
        self.sift_up(position);

        Handle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    /// The smallest element, if there is one.
    pub fn peek(&self) -> Option<&T> {
        self.heap
            .first()
            .and_then(|&slot| self.slots[slot].item.as_ref())
    }

    /// Removes and returns the smallest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Is the element referred to by `handle` still in the queue?
    pub fn contains(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.slot)
            .is_some_and(|s| s.generation == handle.generation && s.item.is_some())
    }

    /// Returns the element referred to by `handle`, if it is still in the queue.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if self.contains(handle) {
            self.slots[handle.slot].item.as_ref()
        } else {
            None
        }
    }

    /// Removes the element referred to by `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the element has already left the queue.
    pub fn remove(&mut self, handle: Handle) -> T {
        assert!(
            self.contains(handle),
            "removing an element that isn't in the queue: {handle:?}"
        );
        let position = self.slots[handle.slot].position;
        self.remove_at(position)
    }

    fn remove_at(&mut self, position: usize) -> T {
        let last = self.heap.len() - 1;
        self.swap(position, last);
        let slot = self.heap.pop().expect("heap can't be empty");
        if position < self.heap.len() {
            // The element moved into `position` came from the bottom of the
            // heap, but it could belong either above or below.
            let moved = self.heap[position];
            self.sift_up(position);
            if self.slots[moved].position == position {
                self.sift_down(position);
            }
        }

        let s = &mut self.slots[slot];
        s.generation = s.generation.wrapping_add(1);
        self.free.push(slot);
        s.item.take().expect("heap slots are occupied")
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let a = self.slots[self.heap[a]].item.as_ref();
        let b = self.slots[self.heap[b]].item.as_ref();
        a < b
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a]].position = a;
        self.slots[self.heap[b]].position = b;
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.less(position, parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut smallest = position;
            if left < self.heap.len() && self.less(left, smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == position {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }

    /// Checks the heap property and the slot bookkeeping.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(any(test, feature = "slow-asserts"))]
    pub fn check_invariants(&self) {
        for (position, &slot) in self.heap.iter().enumerate() {
            assert_eq!(self.slots[slot].position, position);
            assert!(self.slots[slot].item.is_some());
            if position > 0 {
                assert!(!self.less(position, (position - 1) / 2));
            }
        }
        let occupied = self.slots.iter().filter(|s| s.item.is_some()).count();
        assert_eq!(occupied, self.heap.len());
        assert_eq!(occupied + self.free.len(), self.slots.len());
    }

    /// Checks the heap property and the slot bookkeeping.
    ///
    /// This is slow, and only does anything if the `slow-asserts` feature is enabled (or in tests).
    #[cfg(not(any(test, feature = "slow-asserts")))]
    pub fn check_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn pops_in_order() {
        let mut q = PriorityQueue::new();
        for x in [5, 1, 4, 1, 3, 9, 2, 6] {
            q.push(x);
        }
        q.check_invariants();
        let mut out = Vec::new();
        while let Some(x) = q.pop() {
            out.push(x);
        }
        assert_eq!(out, vec![1, 1, 2, 3, 4, 5, 6, 9]);
        assert!(q.is_empty());
    }

    #[test]
    fn remove_from_the_middle() {
        let mut q = PriorityQueue::new();
        let handles: Vec<_> = (0..10).map(|x| q.push(x)).collect();
        assert_eq!(q.remove(handles[4]), 4);
        assert_eq!(q.remove(handles[0]), 0);
        q.check_invariants();
        assert!(!q.contains(handles[4]));
        assert!(q.contains(handles[5]));
        assert_eq!(q.get(handles[5]), Some(&5));
        assert_eq!(q.peek(), Some(&1));
        assert_eq!(q.len(), 8);
    }

    #[test]
    fn recycled_slots_get_new_handles() {
        let mut q = PriorityQueue::new();
        let a = q.push(1);
        assert_eq!(q.pop(), Some(1));
        let b = q.push(2);
        assert_ne!(a, b);
        assert!(!q.contains(a));
        assert!(q.get(a).is_none());
        assert_eq!(q.get(b), Some(&2));
    }

    #[test]
    #[should_panic]
    fn removing_twice() {
        let mut q = PriorityQueue::new();
        let a = q.push(1);
        q.push(2);
        q.remove(a);
        q.remove(a);
    }

    proptest! {
        #[test]
        fn removal_keeps_heap_order(
            items in prop::collection::vec(-1000i32..1000, 0..64),
            remove_mask in prop::collection::vec(any::<bool>(), 64),
        ) {
            let mut q = PriorityQueue::new();
            let handles: Vec<_> = items.iter().map(|&x| q.push(x)).collect();

            let mut expected = Vec::new();
            for (i, (&x, h)) in items.iter().zip(&handles).enumerate() {
                if remove_mask[i] {
                    prop_assert_eq!(q.remove(*h), x);
                    q.check_invariants();
                } else {
                    expected.push(x);
                }
            }
            expected.sort();

            let mut popped = Vec::new();
            while let Some(x) = q.pop() {
                popped.push(x);
            }
            prop_assert_eq!(popped, expected);
        }
    }
}
