//! Single-producer/single-consumer blocking queue with cooperative shutdown.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// An unbounded FIFO whose `pop` blocks until an item is available or the
/// queue is stopped, at which point every blocked and future `pop` returns
/// `None`.
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    cv: Condvar,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { items: VecDeque::new(), stopped: false }), cv: Condvar::new() }
    }

    pub fn push(&self, value: T) {
        {
            let mut inner = self.inner.lock().expect("queue mutex poisoned");
            inner.items.push_back(value);
        }
        self.cv.notify_one();
    }

    /// Blocks until an item is available or the queue stops. Drains
    /// whatever is already queued before reporting the stop.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.stopped {
                return None;
            }
            inner = self.cv.wait(inner).expect("queue mutex poisoned");
        }
    }

    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock().expect("queue mutex poisoned");
            inner.stopped = true;
        }
        self.cv.notify_all();
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pop_returns_pushed_items_in_order() {
        let queue: Queue<i32> = Queue::new();
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn stop_unblocks_a_waiting_consumer() {
        let queue = Arc::new(Queue::<i32>::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        queue.stop();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn pop_drains_remaining_items_before_reporting_stopped() {
        let queue: Queue<i32> = Queue::new();
        for i in 0..100 {
            queue.push(i);
        }
        queue.stop();

        let mut drained = Vec::new();
        while let Some(item) = queue.pop() {
            drained.push(item);
        }
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert_eq!(queue.pop(), None);
    }
}
