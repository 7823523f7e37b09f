//! Thread-safe FIFO between connection threads and the host loop.
//!
//! Any number of connection threads push; only the host loop pops, and it
//! never waits: an empty queue is reported immediately so a tick is never
//! stalled by the bridge.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::wire::PendingItem;

/// Monitor-protected queue of pending items.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: Mutex<VecDeque<PendingItem>>,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item. Callable from any thread; never blocks on the host.
    pub fn enqueue(&self, item: PendingItem) {
        self.lock().push_back(item);
    }

    /// Pops the oldest item, or returns `None` without waiting.
    pub fn try_dequeue(&self) -> Option<PendingItem> {
        self.lock().pop_front()
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // No operation panics while the guard is held, so a poisoned guard still
    // protects a consistent deque.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_queue_returns_none() {
        let queue = PendingQueue::new();
        assert!(queue.try_dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let queue = PendingQueue::new();
        queue.enqueue(PendingItem::command("stop", ""));
        queue.enqueue(PendingItem::command("savegame", ""));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_dequeue().map(|item| item.verb().to_owned()), Some("stop".to_owned()));
        assert_eq!(
            queue.try_dequeue().map(|item| item.verb().to_owned()),
            Some("savegame".to_owned())
        );
        assert!(queue.try_dequeue().is_none());
    }

    #[rstest]
    #[case(2, 50)]
    #[case(8, 100)]
    fn per_producer_order_survives_concurrent_enqueue(
        #[case] producers: usize,
        #[case] per_producer: usize,
    ) {
        let queue = Arc::new(PendingQueue::new());
        let barrier = Arc::new(Barrier::new(producers));
        let handles: Vec<_> = (0..producers)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for sequence in 0..per_producer {
                        queue.enqueue(PendingItem::command(
                            format!("p{producer}"),
                            sequence.to_string(),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer thread");
        }

        assert_eq!(queue.len(), producers * per_producer);
        let mut last_seen: HashMap<String, usize> = HashMap::new();
        while let Some(item) = queue.try_dequeue() {
            let sequence: usize = item.payload().parse().expect("numeric payload");
            if let Some(previous) = last_seen.insert(item.verb().to_owned(), sequence) {
                assert!(previous < sequence, "{} reordered", item.verb());
            }
        }
        assert_eq!(last_seen.len(), producers);
    }
}
