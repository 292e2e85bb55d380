//! The polling loop: the orchestrator that queries every open session on a
//! fixed cadence, prints each reading, and appends it to the sample store.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Running -> (per tick: Querying -> Persisting) -> Running -> ...
//!      -> Stopping -> Stopped
//! ```
//!
//! The loop owns its sessions and the store exclusively for its whole
//! lifetime; nothing else writes to the store while it runs. Cancellation is
//! cooperative: the shutdown signal is observed at the interval wait and
//! between channels, so an in-flight query always finishes and the stream
//! never desynchronizes mid-exchange.
//!
//! ## Failure policy
//!
//! A per-channel failure (timeout, unparseable reply, failed append) is
//! logged and skipped; the remaining channels and devices still run in the
//! same tick, and the next tick proceeds normally. There is no retry beyond
//! "try again next tick" and no cumulative failure threshold.

use crate::core::Sample;
use crate::instrument::InstrumentSession;
use crate::store::SampleStore;
use chrono::Utc;
use log::{info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Lifecycle of the polling loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Querying,
    Persisting,
    Stopping,
    Stopped,
}

/// Options for a polling run, passed in explicitly so tests can use an
/// isolated temporary store and a short interval.
#[derive(Clone, Debug)]
pub struct PollOptions {
    /// Time between polling cycles.
    pub interval: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

pub struct PollingLoop {
    sessions: Vec<InstrumentSession>,
    store: SampleStore,
    options: PollOptions,
    state: LoopState,
}

impl PollingLoop {
    /// Build a loop over already-opened sessions. Session order is polling
    /// order; with a fixed selection the printed and persisted output order
    /// is reproducible.
    pub fn new(sessions: Vec<InstrumentSession>, store: SampleStore, options: PollOptions) -> Self {
        Self {
            sessions,
            store,
            options,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn sessions(&self) -> &[InstrumentSession] {
        &self.sessions
    }

    /// Query every configured channel of every session once, in session
    /// order then channel order. Returns the samples persisted this tick.
    ///
    /// Each successful reading is printed and appended before the next
    /// channel is queried. When `shutdown` flips mid-tick, the current
    /// channel finishes and the rest of the tick is abandoned.
    pub async fn tick_once(&mut self, shutdown: Option<&watch::Receiver<bool>>) -> Vec<Sample> {
        let mut persisted = Vec::new();

        'devices: for i in 0..self.sessions.len() {
            for channel in self.sessions[i].channels() {
                self.state = LoopState::Querying;
                match self.sessions[i].query_reading(channel).await {
                    Ok(value) => {
                        let sample = Sample {
                            timestamp: Utc::now(),
                            device: self.sessions[i].label().to_string(),
                            channel: channel.label.to_string(),
                            value,
                            unit: channel.unit.to_string(),
                        };
                        println!("{}", sample.display_line());

                        self.state = LoopState::Persisting;
                        match self.store.append(&sample) {
                            Ok(()) => persisted.push(sample),
                            Err(e) => warn!("{}", e),
                        }
                    }
                    Err(e) => warn!("{}", e),
                }

                if shutdown.map(|rx| *rx.borrow()).unwrap_or(false) {
                    break 'devices;
                }
            }
        }

        self.state = LoopState::Running;
        persisted
    }

    /// Run until the shutdown signal flips (or its sender goes away).
    ///
    /// The loop waits one interval before the first poll, then polls every
    /// interval. On shutdown it finishes the in-flight channel, closes all
    /// sessions and the store, and settles in [`LoopState::Stopped`].
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "logger started: {} device(s), every {:?}, store {}",
            self.sessions.len(),
            self.options.interval,
            self.store.path().display()
        );
        self.state = LoopState::Running;

        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a fresh interval completes immediately; consume
        // it so the first poll happens one interval after entering Running.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }

            self.tick_once(Some(&shutdown)).await;

            if *shutdown.borrow() {
                break;
            }
        }

        self.state = LoopState::Stopping;
        self.close_all().await;
        self.state = LoopState::Stopped;
        info!("logger stopped, resources released");
    }

    /// Close every session and the store.
    async fn close_all(&mut self) {
        for session in &mut self.sessions {
            session.close().await;
        }
        self.store.close();
    }
}
