//! Notification delivery policy
//!
//! Listener callbacks either run right away on the thread that changed the
//! value ([`Delivery::Immediate`]) or are handed to a [`DispatchQueue`] that
//! the UI thread drains from its event loop ([`Delivery::Queued`]).
//!
//! # Example
//!
//! ```rust
//! use pocketconf::{Delivery, DispatchQueue};
//!
//! let queue = DispatchQueue::new(64);
//! let delivery = Delivery::Queued(queue.sender());
//! // ... build the store with `delivery`, then once per UI frame:
//! queue.run_pending();
//! # drop(delivery);
//! ```

use log::debug;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// A queued notification
pub type Job = Box<dyn FnOnce() + Send>;

/// How listener callbacks are run
#[derive(Debug, Clone, Default)]
pub enum Delivery {
    /// Run callbacks synchronously on the thread that changed the value
    #[default]
    Immediate,
    /// Post callbacks to a [`DispatchQueue`]
    Queued(DispatchSender),
}

impl Delivery {
    /// Run `job` according to this policy
    pub(crate) fn run(&self, job: Job) {
        match self {
            Self::Immediate => job(),
            Self::Queued(sender) => sender.post(job),
        }
    }
}

/// Bounded queue of notifications consumed by the thread that created it
pub struct DispatchQueue {
    sender: SyncSender<Job>,
    receiver: Receiver<Job>,
    owner: ThreadId,
}

impl DispatchQueue {
    /// Create a queue owned by the calling thread
    ///
    /// Posts from other threads block once `capacity` jobs are waiting.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        Self {
            sender,
            receiver,
            owner: thread::current().id(),
        }
    }

    pub fn sender(&self) -> DispatchSender {
        DispatchSender {
            sender: self.sender.clone(),
            owner: self.owner,
        }
    }

    /// Run every job already waiting, returning how many ran
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Run jobs as they arrive until `timeout` elapses
    pub fn run_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return ran,
            }
        }
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Posting side of a [`DispatchQueue`]
#[derive(Debug, Clone)]
pub struct DispatchSender {
    sender: SyncSender<Job>,
    owner: ThreadId,
}

impl DispatchSender {
    /// Queue `job`, or run it inline when called on the queue's own thread
    pub fn post(&self, job: Job) {
        if thread::current().id() == self.owner {
            job();
            return;
        }
        if self.sender.send(job).is_err() {
            debug!("Dispatch queue is gone, dropping notification");
        }
    }
}
