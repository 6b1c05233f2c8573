//! Priority queue for outbound commands.
//!
//! The field bus is half-duplex and slow, so commands wait in a queue and
//! are written one per inbound bus event (the bus going quiet after a
//! report is the only safe send window). Retries re-enter the queue ahead
//! of fresh traffic by carrying a lower priority value.
//!
//! # Design
//!
//! A plain binary min-heap over a `Vec`: the entry with the lowest
//! priority value dequeues first. Entries with equal priority dequeue in
//! unspecified order. The heap never blocks and never bounds its size;
//! the caller decides when (and whether) to drain.

/// Min-heap of values ordered by an explicit priority.
///
/// Lower priority values dequeue first.
#[derive(Debug)]
pub struct CommandQueue<T> {
    heap: Vec<HeapEntry<T>>,
}

#[derive(Debug)]
struct HeapEntry<T> {
    value: T,
    priority: u32,
}

impl<T> CommandQueue<T> {
    pub fn new() -> Self {
        Self { heap: Vec::new() }
    }

    /// Insert a value at the given priority.
    pub fn enqueue(&mut self, value: T, priority: u32) {
        self.heap.push(HeapEntry { value, priority });
        self.bubble_up(self.heap.len() - 1);
    }

    /// Remove and return the lowest-priority entry.
    pub fn dequeue(&mut self) -> Option<(T, u32)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let entry = self.heap.pop()?;
        if !self.heap.is_empty() {
            self.sink_down(0);
        }
        Some((entry.value, entry.priority))
    }

    /// Priority of the entry [`dequeue`](Self::dequeue) would return next.
    pub fn peek_priority(&self) -> Option<u32> {
        self.heap.first().map(|entry| entry.priority)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every queued entry.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    fn bubble_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].priority >= self.heap[parent].priority {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sink_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.heap[left].priority < self.heap[smallest].priority {
                smallest = left;
            }
            if right < len && self.heap[right].priority < self.heap[smallest].priority {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
