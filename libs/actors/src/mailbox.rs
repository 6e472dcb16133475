//! Node Mailbox
//!
//! Unbounded, thread-safe FIFO of [`Message`]s with a blocking receive.
//!
//! A single mutex guards the queue; it is held only for the O(1) push/pop
//! and released while a receiver waits on the condition variable. Every
//! `put` broadcasts, so if several receivers ever wait on one mailbox they
//! all re-check the queue and exactly one of them takes each message.
//!
//! ```text
//! producers ──put──┐
//! producers ──put──┼──► [ head ... tail ] ──get──► owning node
//! timers    ──put──┘
//! ```
//!
//! Handles are cheap to clone; the queue is freed when the last handle drops.
//! [`Mailbox::drain`] discards leftovers explicitly once the owning node has
//! been joined.

use crate::error::{ActorError, Result};
use crate::message::Message;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Inner {
    queue: Mutex<VecDeque<Message>>,
    /// Signalled on every put
    update: Condvar,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

/// Handle to a node's FIFO mailbox
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<Inner>,
}

/// Point-in-time mailbox counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxStats {
    /// Messages currently queued
    pub queued: usize,
    /// Messages ever enqueued
    pub enqueued: u64,
    /// Messages ever handed to a receiver
    pub dequeued: u64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                update: Condvar::new(),
                enqueued: AtomicU64::new(0),
                dequeued: AtomicU64::new(0),
            }),
        }
    }

    /// Append a message at the tail and wake every waiting receiver
    pub fn put(&self, message: Message) {
        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(message);
        }
        self.inner.enqueued.fetch_add(1, Ordering::Relaxed);
        self.inner.update.notify_all();
    }

    /// Remove the head message, blocking while the mailbox is empty
    pub fn get(&self) -> Message {
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(message) = queue.pop_front() {
                self.inner.dequeued.fetch_add(1, Ordering::Relaxed);
                return message;
            }
            self.inner.update.wait(&mut queue);
        }
    }

    /// Like [`get`](Self::get), but gives up after `timeout`
    pub fn get_timeout(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock();
        loop {
            if let Some(message) = queue.pop_front() {
                self.inner.dequeued.fetch_add(1, Ordering::Relaxed);
                return Some(message);
            }
            if self.inner.update.wait_until(&mut queue, deadline).timed_out() {
                return None;
            }
        }
    }

    /// Non-blocking probe; `ActorError::NoMessage` when empty
    pub(crate) fn try_get(&self) -> Result<Message> {
        let message = self.inner.queue.lock().pop_front().ok_or(ActorError::NoMessage)?;
        self.inner.dequeued.fetch_add(1, Ordering::Relaxed);
        Ok(message)
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            queued: self.len(),
            enqueued: self.inner.enqueued.load(Ordering::Relaxed),
            dequeued: self.inner.dequeued.load(Ordering::Relaxed),
        }
    }

    /// Drop every queued message, returning how many were discarded.
    ///
    /// Only meaningful once the owning node has stopped consuming.
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        while self.try_get().is_ok() {
            drained += 1;
        }
        drained
    }

    /// Whether two handles point at the same queue
    pub fn same_mailbox(&self, other: &Mailbox) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Address, Body, MessageKind, Sender};
    use proptest::prelude::*;
    use std::thread;

    fn numbered(sender: u16, n: usize) -> Message {
        Message::log(Address::new(sender), n.to_string())
    }

    fn number_of(message: &Message) -> usize {
        match message.body() {
            Body::Log(text) => text.parse().expect("numbered message"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_put_then_get() {
        let mailbox = Mailbox::new();
        mailbox.put(Message::ping(Sender::External));
        assert_eq!(mailbox.len(), 1);

        let message = mailbox.get();
        assert_eq!(message.kind(), MessageKind::Ping);
        assert_eq!(mailbox.len(), 0);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_mixed_payloads_keep_order() {
        let mailbox = Mailbox::new();
        mailbox.put(Message::ping(Sender::External));
        mailbox.put(Message::read(Address::new(0), &b"abcde"[..]));
        assert_eq!(mailbox.len(), 2);

        assert_eq!(mailbox.get().kind(), MessageKind::Ping);
        let read = mailbox.get();
        assert_eq!(read, Message::read(Address::new(0), &b"abcde"[..]));

        assert!(matches!(mailbox.try_get(), Err(ActorError::NoMessage)));
    }

    #[test]
    fn test_get_timeout_on_empty() {
        let mailbox = Mailbox::new();
        let start = Instant::now();
        assert!(mailbox.get_timeout(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_get_blocks_until_put() {
        let mailbox = Mailbox::new();
        let producer = mailbox.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.put(Message::query(Sender::External));
        });

        let start = Instant::now();
        let message = mailbox.get();
        assert_eq!(message.kind(), MessageKind::Query);
        assert!(start.elapsed() >= Duration::from_millis(40));
        handle.join().unwrap();
    }

    #[test]
    fn test_each_message_taken_once_by_competing_receivers() {
        let mailbox = Mailbox::new();
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let mailbox = mailbox.clone();
                thread::spawn(move || number_of(&mailbox.get()))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        for n in 0..3 {
            mailbox.put(numbered(1, n));
        }

        let mut seen: Vec<usize> = receivers.into_iter().map(|h| h.join().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_concurrent_producers_stress() {
        const PRODUCERS: u16 = 3;
        const PER_PRODUCER: usize = 500;

        let mailbox = Mailbox::new();
        let producers: Vec<_> = (1..=PRODUCERS)
            .map(|sender| {
                let mailbox = mailbox.clone();
                thread::spawn(move || {
                    for n in 0..PER_PRODUCER {
                        mailbox.put(numbered(sender, n));
                        thread::yield_now();
                    }
                })
            })
            .collect();

        let total = PRODUCERS as usize * PER_PRODUCER;
        let mut sum = 0;
        let mut last_per_sender = vec![None; PRODUCERS as usize + 1];
        for _ in 0..total {
            let message = mailbox.get();
            let n = number_of(&message);
            let sender = message.sender().address().unwrap().index();

            // per-sender order survives interleaving
            if let Some(prev) = last_per_sender[sender] {
                assert!(n > prev);
            }
            last_per_sender[sender] = Some(n);
            sum += n;
        }

        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(sum, PRODUCERS as usize * (PER_PRODUCER * (PER_PRODUCER - 1) / 2));
        assert_eq!(mailbox.len(), 0);
        let stats = mailbox.stats();
        assert_eq!(stats.enqueued, total as u64);
        assert_eq!(stats.dequeued, total as u64);
    }

    #[test]
    fn test_drain_discards_leftovers() {
        let mailbox = Mailbox::new();
        for n in 0..4 {
            mailbox.put(numbered(1, n));
        }
        assert_eq!(mailbox.drain(), 4);
        assert_eq!(mailbox.len(), 0);
        assert_eq!(mailbox.drain(), 0);
    }

    proptest! {
        #[test]
        fn prop_single_producer_fifo(values in proptest::collection::vec(0usize..10_000, 0..200)) {
            let mailbox = Mailbox::new();
            for v in &values {
                mailbox.put(numbered(1, *v));
            }
            prop_assert_eq!(mailbox.len(), values.len());

            let received: Vec<usize> = (0..values.len()).map(|_| number_of(&mailbox.get())).collect();
            prop_assert_eq!(received, values);
            prop_assert!(mailbox.is_empty());
        }
    }
}
