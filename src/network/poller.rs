// src/network/poller.rs
//! Block template polling
//!
//! The poller keeps the miner supplied with work. It asks its source for a
//! template, passing back the long-poll id of the previous answer so the
//! node can hold the request until the tip moves. A template at a greater
//! height becomes new [`Work`] and is announced on the event bus.
//!
//! Connection and communication failures back off and retry. Rejected
//! credentials, refused permissions and undecodable templates stop the
//! poller for good.

use crate::miner::block::CoinbaseConfig;
use crate::miner::event::{EventBus, Notification};
use crate::miner::work::Work;
use crate::network::template::BlockTemplate;
use crate::utils::error::MinerError;
use arc_swap::ArcSwapOption;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Anything that can hand out block templates
pub trait TemplateSource: Send + Sync {
    /// Fetches the latest template
    ///
    /// # Arguments
    /// * `longpollid` - Id from the previous template, if any
    fn fetch_template(
        &self,
        longpollid: Option<String>,
    ) -> impl Future<Output = Result<BlockTemplate, MinerError>> + Send;
}

/// Lifecycle of a [`Poller`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Not started
    Idle,
    /// Waiting on the source
    Polling,
    /// Waiting out a retry pause after a recoverable error
    Backoff,
    /// Shut down or failed fatally; never restarts
    Stopped,
}

/// Maps a source error to the event announcing it
pub fn classify(error: &MinerError) -> Notification {
    match error {
        MinerError::AuthenticationError(_) | MinerError::InputError(_) => {
            Notification::AuthenticationError
        }
        MinerError::PermissionError(_) => Notification::PermissionError,
        MinerError::ConnectionError(_) | MinerError::IoError(_) => Notification::ConnectionError,
        MinerError::HttpError(e) if e.is_connect() || e.is_timeout() => {
            Notification::ConnectionError
        }
        _ => Notification::CommunicationError,
    }
}

/// Fetch loop turning templates into work
pub struct Poller<S> {
    source: S,
    bus: EventBus,
    coinbase: CoinbaseConfig,
    retry_pause: Duration,
    poll_interval: Duration,
    state: Mutex<PollerState>,
    wake: Notify,
    current_work: ArcSwapOption<Work>,
    current_height: AtomicU64,
}

impl<S: TemplateSource> Poller<S> {
    /// Creates an idle poller
    ///
    /// # Arguments
    /// * `source` - Where templates come from
    /// * `bus` - Where work and lifecycle events are published
    /// * `coinbase` - Payout used to build work from templates
    pub fn new(source: S, bus: EventBus, coinbase: CoinbaseConfig) -> Self {
        Poller {
            source,
            bus,
            coinbase,
            retry_pause: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            state: Mutex::new(PollerState::Idle),
            wake: Notify::new(),
            current_work: ArcSwapOption::empty(),
            current_height: AtomicU64::new(0),
        }
    }

    /// Sets the pause after a recoverable error
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    /// Sets the pause between polls when long-polling is unavailable
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pause applied after a recoverable error
    pub fn retry_pause(&self) -> Duration {
        self.retry_pause
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest work, cleared while the source is failing
    pub fn current_work(&self) -> Option<Arc<Work>> {
        self.current_work.load_full()
    }

    /// Height of the latest work announced
    pub fn current_height(&self) -> u64 {
        self.current_height.load(Ordering::SeqCst)
    }

    /// Ends [`Poller::run`] at its next wait
    ///
    /// Also holds before `run` starts: a stopped poller never polls.
    pub fn shutdown(&self) {
        self.set_state(PollerState::Stopped);
        self.wake.notify_one();
    }

    fn set_state(&self, state: PollerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Moves to `next` unless stopped; false once stopped
    fn enter(&self, next: PollerState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == PollerState::Stopped {
            return false;
        }
        *state = next;
        true
    }

    /// Polls until shut down or stopped by a fatal error
    ///
    /// # Returns
    /// * `Ok(())` - After [`Poller::shutdown`]
    /// * `Err(MinerError)` - The fatal error, already announced on the bus
    ///   followed by [`Notification::Terminated`]
    pub async fn run(&self) -> Result<(), MinerError> {
        log::debug!("Starting poller");
        let mut longpollid: Option<String> = None;
        let mut long_polling = false;

        while self.enter(PollerState::Polling) {
            let fetched = tokio::select! {
                fetched = self.source.fetch_template(longpollid.clone()) => fetched,
                _ = self.wake.notified() => continue,
            };

            let error = match fetched {
                Ok(template) => {
                    let next_id = template.longpollid.clone().filter(|id| !id.is_empty());
                    if next_id.is_some() && !long_polling {
                        log::info!("Long polling activated");
                        self.bus.publish(Notification::LongPollingEnabled);
                        long_polling = true;
                    }
                    match self.accept(template) {
                        Ok(()) => {
                            if next_id.is_none() {
                                self.bus.publish(Notification::LongPollingFailed);
                                self.pause(self.poll_interval).await;
                            }
                            longpollid = next_id;
                            continue;
                        }
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            longpollid = None;
            self.current_work.store(None);
            let notification = classify(&error);
            if notification.is_fatal() {
                log::error!("Poller stopping: {}", error);
                self.set_state(PollerState::Stopped);
                self.bus.publish(notification);
                self.bus.publish(Notification::Terminated);
                return Err(error);
            }

            log::warn!("{}; retrying in {}s", error, self.retry_pause.as_secs());
            self.bus.publish(notification);
            if self.enter(PollerState::Backoff) {
                self.pause(self.retry_pause).await;
            }
        }

        log::debug!("Poller stopped");
        Ok(())
    }

    /// Announces work for a template above the last seen height
    fn accept(&self, template: BlockTemplate) -> Result<(), MinerError> {
        let height = template.height;

        if height > self.current_height() {
            let work = Arc::new(Work::new(template, &self.coinbase)?);
            self.bus.publish(Notification::NewBlockDetected);
            log::info!("Current block is {}", height);

            self.current_work.store(Some(work.clone()));
            self.current_height.store(height, Ordering::SeqCst);
            self.bus.publish(Notification::NewWork(work));
        }
        Ok(())
    }

    /// Sleeps for `duration` unless shut down first
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.wake.notified() => {}
        }
    }
}
