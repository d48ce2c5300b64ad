use crate::model::Transaction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// The single piece of shared mutable state between producer and consumer.
///
/// The producer is the sole writer (via [`push`](Self::push)) and the
/// joiner is the sole reader (via [`drain_up_to`](Self::drain_up_to)); the
/// mutex is held only for the duration of each call, never across I/O.
/// `producer_done` is written exactly once and only ever observed after,
/// so `Release`/`Acquire` ordering is sufficient — no compare-and-swap is
/// needed.
pub struct StreamBuffer {
    queue: Mutex<VecDeque<Transaction>>,
    producer_done: AtomicBool,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            producer_done: AtomicBool::new(false),
        }
    }

    /// Producer-side append. Never blocks on anything but the mutex.
    pub fn push(&self, transaction: Transaction) {
        self.queue.lock().unwrap().push_back(transaction);
    }

    /// Consumer-side drain, taking at most `max` entries in FIFO order.
    /// Returns an empty vec if the buffer currently has nothing to offer.
    pub fn drain_up_to(&self, max: usize) -> Vec<Transaction> {
        if max == 0 {
            return Vec::new();
        }
        let mut queue = self.queue.lock().unwrap();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn mark_producer_done(&self) {
        self.producer_done.store(true, Ordering::Release);
    }

    pub fn producer_done(&self) -> bool {
        self.producer_done.load(Ordering::Acquire)
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: &str) -> Transaction {
        Transaction {
            order_id: id.to_string(),
            customer_id: "C1".to_string(),
            product_id: "P1".to_string(),
            quantity: 1,
            date: "2017-01-01".to_string(),
        }
    }

    #[test]
    fn drain_respects_cap_and_fifo_order() {
        let buf = StreamBuffer::new();
        buf.push(txn("O1"));
        buf.push(txn("O2"));
        buf.push(txn("O3"));

        let first = buf.drain_up_to(2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].order_id, "O1");
        assert_eq!(first[1].order_id, "O2");

        let second = buf.drain_up_to(10);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].order_id, "O3");
    }

    #[test]
    fn producer_done_is_write_once_observe_many() {
        let buf = StreamBuffer::new();
        assert!(!buf.producer_done());
        buf.mark_producer_done();
        assert!(buf.producer_done());
        assert!(buf.producer_done());
    }
}
