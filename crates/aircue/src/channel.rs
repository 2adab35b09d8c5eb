// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-channel command queue and the release-window policy.
//!
//! A [`ChannelQueue`] holds the slots queued on one playout channel and
//! remembers the last tick it saw. On every tick it releases exactly the
//! slots whose timecode lies inside the half-open window `[lo, now + 1)`,
//! where `lo` is the previous tick when the channel clock is continuous
//! and `now` itself after a cold start or a frame-rate change:
//!
//! - a continuous clock catches up over skipped frames (a cue at frame
//!   100 still fires when the output loop jumps from 90 to 105);
//! - after a rate change there is no meaningful prior instant, so only
//!   the current frame fires, and cues still expressed in the old rate
//!   stay quarantined until an operator cancels or re-submits them.
//!
//! The slot sequence is kept in insertion order and scanned linearly;
//! queues hold tens of slots, not thousands, and the scan is what keeps
//! release order deterministic.

use std::mem;
use std::sync::Arc;

use crate::command::GroupCommand;
use crate::slot::Slot;
use crate::timecode::Timecode;

/// The scheduled commands of a single playout channel.
#[derive(Debug)]
pub struct ChannelQueue<C> {
    slots: Vec<Slot<C>>,
    /// Last tick observed on this channel; empty until the first tick.
    last_tick: Timecode,
}

impl<C> ChannelQueue<C> {
    #[must_use]
    pub fn new() -> Self {
        ChannelQueue {
            slots: Vec::new(),
            last_tick: Timecode::empty(),
        }
    }

    /// Queue `command` under `token` at `timecode`.
    ///
    /// Joins the existing slot for that timecode when one exists,
    /// otherwise appends a new slot. Silent no-op when the token is empty
    /// or the timecode is the sentinel; the protocol layer has already
    /// rejected those upstream.
    pub fn set(&mut self, token: &str, timecode: Timecode, command: Arc<C>) {
        if token.is_empty() || timecode.is_empty() {
            return;
        }

        for slot in &mut self.slots {
            if slot.timecode() == timecode {
                slot.add(token, command);
                return;
            }
        }

        self.slots.push(Slot::new(timecode, token, command));
    }

    /// Cancel the entry queued under `token`, reporting whether it
    /// existed. A slot emptied by the removal is deleted.
    pub fn remove(&mut self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let index = match self.slots.iter_mut().position(|slot| slot.remove(token)) {
            Some(index) => index,
            None => return false,
        };

        if self.slots[index].is_empty() {
            self.slots.remove(index);
        }

        true
    }

    /// Drop every queued slot. `last_tick` is untouched: the channel
    /// clock did not stop just because the rundown was wiped.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Enumerate queued entries as `(timecode, token)` pairs.
    ///
    /// An empty `filter` returns everything; otherwise only entries whose
    /// slot timecode equals the filter. Order is slot insertion order,
    /// tokens sorted within a slot.
    pub fn list(&self, filter: Timecode) -> Vec<(Timecode, String)> {
        let include_all = filter.is_empty();
        let mut entries = Vec::new();

        for slot in &self.slots {
            if include_all || slot.timecode() == filter {
                entries.extend(slot.tokens());
            }
        }

        entries
    }

    /// First entry queued under `token`, as `(timecode, command)`.
    pub fn find(&self, token: &str) -> Option<(Timecode, Arc<C>)> {
        self.slots
            .iter()
            .find_map(|slot| slot.find(token).map(|cmd| (slot.timecode(), cmd)))
    }

    /// The release window for a tick at `now`.
    ///
    /// When the stored last tick has a different rate than `now` (which
    /// includes the empty cold-start value, fps 0), the window collapses
    /// to the single frame `[now, now + 1)`.
    fn release_window(&self, now: Timecode) -> (Timecode, Timecode) {
        if self.last_tick.fps() != now.fps() {
            return (now, now + 1);
        }

        (self.last_tick, now + 1)
    }

    /// Advance the channel clock to `now` and release every slot whose
    /// timecode falls inside the window just crossed, in traversal order.
    ///
    /// Slots whose timecode rate does not match `now` are left queued;
    /// cross-rate comparison is undefined and never attempted.
    pub fn tick(&mut self, now: Timecode) -> Vec<GroupCommand<C>> {
        if self.slots.is_empty() {
            self.last_tick = now;
            return Vec::new();
        }

        let (lo, hi) = self.release_window(now);
        self.last_tick = now;

        let slots = mem::take(&mut self.slots);
        let mut released = Vec::new();

        for slot in slots {
            if slot.timecode().is_between(&lo, &hi) {
                released.push(slot.materialize());
            } else {
                self.slots.push(slot);
            }
        }

        if !released.is_empty() {
            log::trace!(
                "[ChannelQueue::tick] released {} group(s) in [{}, {})",
                released.len(),
                lo,
                hi
            );
        }

        released
    }

    /// Last tick observed on this channel; empty before the first tick.
    #[must_use]
    pub fn last_tick(&self) -> Timecode {
        self.last_tick
    }

    /// Total commands queued across all slots.
    #[must_use]
    pub fn queued_commands(&self) -> usize {
        self.slots.iter().map(Slot::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<C> Default for ChannelQueue<C> {
    fn default() -> Self {
        ChannelQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::FrameRate;

    fn tc(frames: u32) -> Timecode {
        Timecode::new(frames, FrameRate::Fps50)
    }

    fn tc60(frames: u32) -> Timecode {
        Timecode::new(frames, FrameRate::Fps60)
    }

    fn queue_with(entries: &[(&str, u32)]) -> ChannelQueue<u32> {
        let mut queue = ChannelQueue::new();
        for (index, (token, frames)) in entries.iter().enumerate() {
            queue.set(token, tc(*frames), Arc::new(index as u32));
        }
        queue
    }

    #[test]
    fn test_set_joins_existing_slot() {
        let queue = queue_with(&[("A", 100), ("B", 100), ("C", 200)]);
        assert_eq!(queue.queued_commands(), 3);
        assert_eq!(queue.slots.len(), 2);
    }

    #[test]
    fn test_set_ignores_invalid_input() {
        let mut queue: ChannelQueue<u32> = ChannelQueue::new();
        queue.set("", tc(100), Arc::new(0));
        queue.set("A", Timecode::empty(), Arc::new(0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_deletes_emptied_slot() {
        let mut queue = queue_with(&[("A", 100), ("B", 100)]);
        assert!(queue.remove("A"));
        assert_eq!(queue.slots.len(), 1);
        assert!(queue.remove("B"));
        assert!(queue.is_empty());
        assert!(!queue.remove("B"));
        assert!(!queue.remove(""));
    }

    #[test]
    fn test_list_with_and_without_filter() {
        let queue = queue_with(&[("B", 100), ("A", 100), ("C", 200)]);

        let all = queue.list(Timecode::empty());
        assert_eq!(
            all,
            vec![
                (tc(100), "A".to_string()),
                (tc(100), "B".to_string()),
                (tc(200), "C".to_string()),
            ]
        );

        let filtered = queue.list(tc(200));
        assert_eq!(filtered, vec![(tc(200), "C".to_string())]);
        assert!(queue.list(tc(300)).is_empty());
    }

    #[test]
    fn test_find() {
        let queue = queue_with(&[("A", 100), ("B", 200)]);
        let (timecode, command) = queue.find("B").unwrap();
        assert_eq!(timecode, tc(200));
        assert_eq!(*command, 1);
        assert!(queue.find("missing").is_none());
    }

    #[test]
    fn test_tick_empty_queue_still_advances_clock() {
        let mut queue: ChannelQueue<u32> = ChannelQueue::new();
        assert!(queue.tick(tc(50)).is_empty());
        assert_eq!(queue.last_tick(), tc(50));
    }

    #[test]
    fn test_tick_releases_exact_frame() {
        let mut queue = queue_with(&[("A", 100)]);

        assert!(queue.tick(tc(99)).is_empty());
        let groups = queue.tick(tc(100));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
        assert!(queue.is_empty());
        assert!(queue.tick(tc(101)).is_empty());
    }

    #[test]
    fn test_tick_catches_up_over_skipped_frames() {
        let mut queue = queue_with(&[("A", 100)]);

        assert!(queue.tick(tc(90)).is_empty());
        // Output loop jumped 90 -> 105; window [90, 106) catches frame 100
        let groups = queue.tick(tc(105));
        assert_eq!(groups.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cold_start_releases_current_frame_only() {
        let mut queue = queue_with(&[("A", 100), ("B", 102)]);

        // No prior tick: window collapses to [102, 103), frame 100 missed
        let groups = queue.tick(tc(102));
        assert_eq!(groups.len(), 1);
        assert_eq!(queue.list(Timecode::empty()).len(), 1);
        assert_eq!(queue.find("A").unwrap().0, tc(100));
    }

    #[test]
    fn test_tick_groups_by_timecode_in_traversal_order() {
        let mut queue = queue_with(&[("B", 102), ("A", 101), ("C", 102)]);

        queue.tick(tc(100));
        let groups = queue.tick(tc(103));
        // Slot for 102 was inserted first, so it releases first
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_rate_mismatch_quarantines_slot() {
        let mut queue = queue_with(&[("A", 100)]);

        // Channel clock now runs at 60 fps; the 50 fps cue must not fire
        assert!(queue.tick(tc60(100)).is_empty());
        assert_eq!(queue.queued_commands(), 1);
        assert_eq!(queue.last_tick(), tc60(100));

        // Clock back at 50 fps: rate change collapses the window to
        // [100, 101), which is exactly where the cue sits
        let groups = queue.tick(tc(100));
        assert_eq!(groups.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tick_across_midnight() {
        let last = FrameRate::Fps50.frames_per_day() - 1;
        let mut queue = queue_with(&[("A", last), ("B", 1)]);

        assert!(queue.tick(tc(last - 1)).is_empty());
        // Clock wrapped: window [last - 1, 2) spans midnight
        let groups = queue.tick(tc(1));
        assert_eq!(groups.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_preserves_last_tick() {
        let mut queue = queue_with(&[("A", 100)]);
        queue.tick(tc(50));
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.last_tick(), tc(50));
    }

    #[test]
    fn test_replaced_command_is_not_duplicated() {
        let mut queue: ChannelQueue<u32> = ChannelQueue::new();
        queue.set("A", tc(100), Arc::new(1));
        queue.set("A", tc(100), Arc::new(2));

        queue.tick(tc(99));
        let groups = queue.tick(tc(100));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(**groups[0].iter().next().unwrap(), 2);
    }
}
