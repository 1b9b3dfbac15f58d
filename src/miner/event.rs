// src/miner/event.rs
//! Lifecycle notifications
//!
//! The poller, coordinator, workers and submitter talk through one typed
//! event enum fanned out over crossbeam channels. A listener stops
//! receiving by dropping its receiver; the bus prunes it on the next
//! publish.

use crate::miner::block::BlockCandidate;
use crate::miner::work::Work;
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Events exchanged between mining components
#[derive(Debug, Clone)]
pub enum Notification {
    /// Fresh work replaces whatever is being mined
    NewWork(Arc<Work>),
    /// The chain tip moved
    NewBlockDetected,
    /// The node confirmed long-poll support
    LongPollingEnabled,
    /// The node gave no long-poll id; falling back to plain polling
    LongPollingFailed,
    /// A worker found a cycle meeting the target
    SolutionFound(Arc<BlockCandidate>),
    /// The node accepted a submitted block
    PowTrue,
    /// The node rejected a submitted block
    PowFalse,
    /// The node could not be reached; retrying
    ConnectionError,
    /// The node answered with something unusable; retrying
    CommunicationError,
    /// Credentials or input were rejected; fatal
    AuthenticationError,
    /// The node refused the request; fatal
    PermissionError,
    /// Unexpected internal failure; fatal
    SystemError,
    /// The work source has stopped for good
    Terminated,
}

impl Notification {
    /// True for events after which no further jobs may start
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Notification::AuthenticationError
                | Notification::PermissionError
                | Notification::SystemError
                | Notification::Terminated
        )
    }
}

/// Fan-out channel for [`Notification`]s
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Sender<Notification>>>>,
}

impl EventBus {
    /// Creates a bus with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener that receives every event published from now on
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends an event to every live listener
    ///
    /// # Returns
    /// Number of listeners the event reached
    pub fn publish(&self, notification: Notification) -> usize {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(notification.clone()).is_ok());
        listeners.len()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
