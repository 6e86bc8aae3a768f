// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Snapshot-based undo/redo over the canonical items and their positions.
//!
//! Linear history: `past` holds pre-mutation snapshots, `future` holds
//! undone states, and any committed mutation after an undo clears `future`.
//! Snapshots are immutable once pushed.

use crate::datamodel::CanonicalItem;
use crate::positions::PositionMap;

#[derive(Clone, PartialEq, Debug)]
pub struct HistorySnapshot {
    pub items: Vec<CanonicalItem>,
    pub positions: PositionMap,
    pub label: String,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HistoryState {
    Clean,
    DirtyPendingCommit,
}

pub struct History {
    past: Vec<HistorySnapshot>,
    future: Vec<HistorySnapshot>,
    /// Pre-state captured at the first mutation of a dirty window, pushed
    /// to `past` on commit.
    pending: Option<HistorySnapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> History {
        History {
            past: Vec::new(),
            future: Vec::new(),
            pending: None,
            limit,
        }
    }

    pub fn state(&self) -> HistoryState {
        if self.pending.is_some() {
            HistoryState::DirtyPendingCommit
        } else {
            HistoryState::Clean
        }
    }

    pub fn can_undo(&self) -> bool {
        self.pending.is_some() || !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Mark the start of a dirty window. Only the first call in a window
    /// captures the pre-state; later mutations coalesce into it.
    pub fn begin(&mut self, pre_state: HistorySnapshot) {
        if self.pending.is_none() {
            self.pending = Some(pre_state);
        }
    }

    /// Commit the pending dirty window: push the captured pre-state onto
    /// `past` and clear `future`.
    pub fn commit(&mut self) {
        if let Some(snapshot) = self.pending.take() {
            self.push_past(snapshot);
            self.future.clear();
        }
    }

    /// Record a single committed mutation: begin + commit in one step.
    pub fn record(&mut self, pre_state: HistorySnapshot) {
        self.begin(pre_state);
        self.commit();
    }

    /// Pop the most recent past state, pushing `current` onto `future`.
    /// An uncommitted dirty window is committed first so it isn't lost.
    pub fn undo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        self.commit();
        let restored = self.past.pop()?;
        self.future.push(current);
        Some(restored)
    }

    pub fn redo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let restored = self.future.pop()?;
        self.past.push(current);
        Some(restored)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.pending = None;
    }

    fn push_past(&mut self, snapshot: HistorySnapshot) {
        if self.past.len() >= self.limit {
            self.past.remove(0);
        }
        self.past.push(snapshot);
    }
}
