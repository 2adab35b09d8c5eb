// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-channel scheduler façade.
//!
//! One [`Scheduler`] serves two kinds of caller with opposite latency
//! needs:
//!
//! - the protocol layer submits, cancels, and inspects cues; it can
//!   afford to wait for the lock;
//! - each channel's output loop calls [`Scheduler::schedule`] once per
//!   frame and must never stall, so that path takes the lock with a
//!   bounded budget and reports a skipped tick instead of blocking.
//!
//! A single mutex guards the whole channel set. That is what makes the
//! global token-uniqueness invariant atomic: a `set` removes the token
//! from every channel and inserts it on the target under one acquisition,
//! so no observer ever sees the token twice or not at all. Contention is
//! bounded (one tick per channel per frame plus sparse submissions), so
//! finer-grained locking buys nothing here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::channel::ChannelQueue;
use crate::command::GroupCommand;
use crate::timecode::Timecode;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Lock-acquisition budget for the hot-path [`Scheduler::schedule`]
    /// call. On expiry the tick is skipped and retried next frame.
    pub schedule_lock_timeout: Duration,
}

impl Default for SchedulerConfig {
    /// Default: 5 ms, well under one frame at every supported rate.
    fn default() -> Self {
        SchedulerConfig {
            schedule_lock_timeout: Duration::from_millis(5),
        }
    }
}

impl SchedulerConfig {
    /// Config with a lock budget of `ms` milliseconds.
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        SchedulerConfig {
            schedule_lock_timeout: Duration::from_millis(ms),
        }
    }
}

/// Scheduler statistics.
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Commands accepted by `set`.
    pub commands_set: u64,
    /// `set` calls that displaced an existing binding of the token.
    pub commands_replaced: u64,
    /// Commands cancelled via `remove`.
    pub commands_cancelled: u64,
    /// Commands released to output loops.
    pub commands_dispatched: u64,
    /// Dispatch groups released to output loops.
    pub groups_dispatched: u64,
    /// Successful `schedule` calls.
    pub ticks: u64,
    /// `schedule` calls that gave up on the lock budget.
    pub lock_timeouts: u64,
    /// Registered channels.
    pub channels: usize,
    /// Commands currently queued across all channels.
    pub queued_commands: usize,
}

/// Everything the mutex guards: the channel set and the counters that
/// are only touched under the lock.
#[derive(Debug)]
struct SchedulerState<C> {
    queues: Vec<ChannelQueue<C>>,
    stats: SchedulerStats,
}

/// Timecode-driven command scheduler for a set of playout channels.
///
/// Generic over the command type `C`; commands are opaque shared handles
/// (`Arc<C>`) that the scheduler groups and releases but never inspects.
///
/// # Example
///
/// ```
/// use aircue::{FrameRate, Scheduler, SchedulerConfig, Timecode};
/// use std::sync::Arc;
///
/// let scheduler: Scheduler<&str> = Scheduler::new(SchedulerConfig::default());
/// let channel = scheduler.add_channel();
///
/// let cue = Timecode::new(500, FrameRate::Fps25);
/// scheduler.set(channel, "opener", cue, Arc::new("PLAY 1-10"));
///
/// // the output loop, once per frame:
/// let groups = scheduler.schedule(channel, cue).expect("uncontended");
/// assert_eq!(groups.len(), 1);
/// ```
#[derive(Debug)]
pub struct Scheduler<C> {
    state: Mutex<SchedulerState<C>>,
    /// Incremented outside the lock; the timeout path never acquires it.
    lock_timeouts: AtomicU64,
    config: SchedulerConfig,
}

impl<C> Scheduler<C> {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Scheduler {
            state: Mutex::new(SchedulerState {
                queues: Vec::new(),
                stats: SchedulerStats::default(),
            }),
            lock_timeouts: AtomicU64::new(0),
            config,
        }
    }

    /// Register a new playout channel and return its index. Channels are
    /// append-only; indices stay stable for the process lifetime.
    pub fn add_channel(&self) -> usize {
        let mut state = self.state.lock();
        state.queues.push(ChannelQueue::new());
        let index = state.queues.len() - 1;
        log::debug!("[Scheduler::add_channel] channel {index} registered");
        index
    }

    /// Registered channel count.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// Queue `command` on `channel_index` under `token` at `timecode`.
    ///
    /// The token is first removed from every channel, then inserted on
    /// the target, all under one lock acquisition: a token is bound to at
    /// most one command scheduler-wide, and no concurrent observer sees
    /// an intermediate state. The removal step is unconditional; a call
    /// with an empty timecode still evicts the token everywhere and then
    /// queues nothing, and an empty token is a silent no-op end to end.
    ///
    /// # Panics
    /// Panics when `channel_index` is out of range; submitting to a
    /// channel that was never registered is a programmer error.
    pub fn set(&self, channel_index: usize, token: &str, timecode: Timecode, command: Arc<C>) {
        let mut state = self.state.lock();
        let state = &mut *state;
        assert!(
            channel_index < state.queues.len(),
            "channel index {channel_index} out of range ({} channels)",
            state.queues.len()
        );

        let mut replaced = false;
        for queue in &mut state.queues {
            if queue.remove(token) {
                replaced = true;
            }
        }

        if token.is_empty() || timecode.is_empty() {
            if replaced {
                state.stats.commands_cancelled += 1;
                log::debug!("[Scheduler::set] token '{token}' evicted, nothing queued");
            }
            return;
        }

        state.stats.commands_set += 1;
        if replaced {
            state.stats.commands_replaced += 1;
            log::debug!(
                "[Scheduler::set] token '{token}' re-bound to channel {channel_index} at {timecode}"
            );
        }

        state.queues[channel_index].set(token, timecode, command);
    }

    /// Cancel the command queued under `token` on whichever channel holds
    /// it. Returns whether anything was cancelled. An empty token returns
    /// `false` without touching the lock.
    pub fn remove(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let mut state = self.state.lock();
        let state = &mut *state;
        for queue in &mut state.queues {
            if queue.remove(token) {
                state.stats.commands_cancelled += 1;
                log::debug!("[Scheduler::remove] token '{token}' cancelled");
                return true;
            }
        }

        false
    }

    /// Drop every queued command on every channel. Channel clocks
    /// (`last_tick`) are preserved.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        for queue in &mut state.queues {
            queue.clear();
        }
        log::debug!("[Scheduler::clear] all channels cleared");
    }

    /// Enumerate queued entries across all channels as
    /// `(timecode, token)` pairs. An empty `filter` lists everything;
    /// otherwise only entries at exactly that timecode.
    #[must_use]
    pub fn list(&self, filter: Timecode) -> Vec<(Timecode, String)> {
        let state = self.state.lock();
        let mut entries = Vec::new();
        for queue in &state.queues {
            entries.extend(queue.list(filter));
        }
        entries
    }

    /// Look up the command queued under `token` across all channels.
    #[must_use]
    pub fn find(&self, token: &str) -> Option<(Timecode, Arc<C>)> {
        let state = self.state.lock();
        state.queues.iter().find_map(|queue| queue.find(token))
    }

    /// Advance `channel_index`'s clock to `now` and take the dispatch
    /// groups whose timecode fell inside the frame window just crossed.
    ///
    /// This is the real-time hot path. The lock is acquired with the
    /// configured budget (5 ms by default); on expiry the call returns
    /// `None` without touching any state, and the output loop simply
    /// retries next frame. `None` is distinct from `Some(vec![])`, which
    /// is a successful tick that released nothing.
    ///
    /// # Panics
    /// Panics when `channel_index` is out of range.
    pub fn schedule(&self, channel_index: usize, now: Timecode) -> Option<Vec<GroupCommand<C>>> {
        let mut state = match self.state.try_lock_for(self.config.schedule_lock_timeout) {
            Some(state) => state,
            None => {
                self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "[Scheduler::schedule] lock budget exhausted, tick skipped on channel {channel_index}"
                );
                return None;
            }
        };

        let state = &mut *state;
        assert!(
            channel_index < state.queues.len(),
            "channel index {channel_index} out of range ({} channels)",
            state.queues.len()
        );

        let groups = state.queues[channel_index].tick(now);
        state.stats.ticks += 1;
        state.stats.groups_dispatched += groups.len() as u64;
        state.stats.commands_dispatched += groups.iter().map(|g| g.len() as u64).sum::<u64>();
        Some(groups)
    }

    /// Snapshot of the scheduler counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.lock_timeouts = self.lock_timeouts.load(Ordering::Relaxed);
        stats.channels = state.queues.len();
        stats.queued_commands = state
            .queues
            .iter()
            .map(ChannelQueue::queued_commands)
            .sum();
        stats
    }

    /// Reset all counters.
    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.stats = SchedulerStats::default();
        self.lock_timeouts.store(0, Ordering::Relaxed);
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Scheduler::new(SchedulerConfig::default())
    }
}
