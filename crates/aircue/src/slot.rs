// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A slot aggregates the commands queued against one timecode.
//!
//! Slots are owned by [`ChannelQueue`](crate::ChannelQueue) and are never
//! empty: the queue deletes a slot the moment its last token is removed,
//! and releases it whole when its timecode falls inside a tick window.
//! The token map is a `BTreeMap` so that materialized groups come out in
//! token sort order without any extra bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::command::GroupCommand;
use crate::timecode::Timecode;

/// Commands sharing one timecode on one channel, keyed by token.
#[derive(Debug)]
pub struct Slot<C> {
    timecode: Timecode,
    commands: BTreeMap<String, Arc<C>>,
}

impl<C> Slot<C> {
    /// Create a slot holding its first entry.
    pub fn new(timecode: Timecode, token: &str, command: Arc<C>) -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(token.to_string(), command);
        Slot { timecode, commands }
    }

    /// The timecode every entry in this slot shares.
    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    /// Insert an entry. A token already present in the slot is replaced
    /// (last submission wins).
    pub fn add(&mut self, token: &str, command: Arc<C>) {
        if self.commands.insert(token.to_string(), command).is_some() {
            log::debug!(
                "[Slot::add] token '{}' replaced at {}",
                token,
                self.timecode
            );
        }
    }

    /// Remove the entry for `token`, reporting whether it existed.
    pub fn remove(&mut self, token: &str) -> bool {
        self.commands.remove(token).is_some()
    }

    /// Look up the command queued under `token`.
    pub fn find(&self, token: &str) -> Option<Arc<C>> {
        self.commands.get(token).cloned()
    }

    /// Every entry as `(timecode, token)`, in token order.
    pub fn tokens(&self) -> Vec<(Timecode, String)> {
        self.commands
            .keys()
            .map(|token| (self.timecode, token.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Materialize the dispatch group: every command in the slot, in
    /// token sort order. The slot itself is untouched; the owning queue
    /// decides when to drop it.
    pub fn materialize(&self) -> GroupCommand<C> {
        GroupCommand::new(self.commands.values().cloned().collect())
    }
}
