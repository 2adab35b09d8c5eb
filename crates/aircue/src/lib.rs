// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # aircue - frame-accurate command scheduling for broadcast playout
//!
//! A timecode-driven scheduler for multi-channel playout automation.
//! Operators queue commands against a target timecode on a channel; every
//! frame the channel's output loop asks the scheduler which commands fall
//! inside the frame window just crossed and executes them as one group.
//!
//! ## Quick Start
//!
//! ```rust
//! use aircue::{FrameRate, Scheduler, SchedulerConfig, Timecode};
//! use std::sync::Arc;
//!
//! let scheduler: Scheduler<String> = Scheduler::new(SchedulerConfig::default());
//! let channel = scheduler.add_channel();
//!
//! // Protocol layer: cue a command for 10:00:00:00 on channel 1
//! let cue = Timecode::parse("10:00:00:00", FrameRate::Fps50)?;
//! scheduler.set(channel, "opener", cue, Arc::new("PLAY 1-1".to_string()));
//!
//! // Channel output loop, once per frame:
//! if let Some(groups) = scheduler.schedule(channel, cue) {
//!     for group in groups {
//!         for command in group.iter() {
//!             // hand off to the executor
//!             let _ = command;
//!         }
//!     }
//! }
//! # Ok::<(), aircue::TimecodeParseError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Protocol Layer                          |
//! |        set / remove / clear / list / find  (blocking)        |
//! +--------------------------------------------------------------+
//! |                        Scheduler                             |
//! |   one timed mutex | global token uniqueness | N channels     |
//! +--------------------------------------------------------------+
//! |                      ChannelQueue (per channel)              |
//! |   slot sequence | last_tick | release window [lo, now + 1)   |
//! +--------------------------------------------------------------+
//! |                          Slot                                |
//! |     token -> command map, one timecode, token-sorted          |
//! +--------------------------------------------------------------+
//! |                  Channel Output Loops                        |
//! |       schedule(channel, now) with a 5 ms lock budget         |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Scheduler`] | Multi-channel façade; the only type most callers touch |
//! | [`ChannelQueue`] | Per-channel queue and release-window policy |
//! | [`GroupCommand`] | Ordered batch of commands released on one tick |
//! | [`Timecode`] | Frame-accurate instant with a discrete [`FrameRate`] |
//! | [`SchedulerConfig`] | Lock budget for the hot path |
//! | [`SchedulerStats`] | Plain-counter observability snapshot |
//!
//! ## Guarantees
//!
//! - A token is bound to at most one command across all channels, and a
//!   `set` moves it atomically.
//! - A tick releases exactly the slots inside the half-open window from
//!   the previous tick to the current frame, so skipped frames are
//!   caught up and nothing fires twice.
//! - Cues whose frame rate no longer matches the channel clock are
//!   quarantined, never misinterpreted.
//! - The output path never blocks past its lock budget; a missed tick is
//!   reported as `None` and retried next frame.

pub mod channel;
pub mod command;
pub mod scheduler;
pub mod timecode;

mod slot;

pub use channel::ChannelQueue;
pub use command::GroupCommand;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
pub use timecode::{FrameRate, Timecode, TimecodeParseError};
