//! # Callback Queue
//!
//! Faults awaiting callback delivery in the current block. The queue only
//! exists inside a [`BlockScope`]: `begin_block` creates it and the
//! dispatcher consumes it, so nothing queued in one block is visible in the
//! next.

use crate::domain::entities::FaultRecord;
use crate::domain::value_objects::{BlockHeight, ErrorId};

/// Pending deliveries, in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackQueue {
    entries: Vec<(ErrorId, FaultRecord)>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, error_id: ErrorId, record: FaultRecord) {
        self.entries.push((error_id, record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the queue, yielding each entry once.
    pub fn drain(self) -> impl Iterator<Item = (ErrorId, FaultRecord)> {
        self.entries.into_iter()
    }
}

/// State of the block being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockScope {
    pub height: BlockHeight,
    pub queue: CallbackQueue,
}

impl BlockScope {
    /// Open a block with an empty queue.
    pub fn open(height: BlockHeight) -> Self {
        Self {
            height,
            queue: CallbackQueue::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> FaultRecord {
        FaultRecord {
            module_name: "test".to_string(),
            error_message: message.to_string(),
            ..FaultRecord::default()
        }
    }

    #[test]
    fn test_drain_is_insertion_ordered() {
        let mut queue = CallbackQueue::new();
        queue.enqueue(7, record("a"));
        queue.enqueue(9, record("b"));
        queue.enqueue(8, record("c"));

        assert_eq!(queue.len(), 3);

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![7, 9, 8]);
        assert_eq!(drained[0], (7, record("a")));
        assert_eq!(drained[2], (8, record("c")));
    }

    #[test]
    fn test_block_scope_starts_empty() {
        let scope = BlockScope::open(42);
        assert_eq!(scope.height, 42);
        assert!(scope.queue.is_empty());
    }
}
