// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Mutation-origin arbitration: the loop guard between the text surface
//! and the canvas.
//!
//! Every mutation carries an explicit origin, and the suppression policy is
//! a pure function of origin and echo status rather than a shared mutable
//! "internal update" flag. The arbiter also owns the text debounce window
//! and the position-store ready gate; both are driven by host-supplied
//! `Instant`s, so the engine never blocks and never owns a timer thread.

use std::time::{Duration, Instant};

use log::debug;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ChangeOrigin {
    Canvas,
    TextEditor,
    Import,
}

/// Coarse engine lifecycle, replacing implicit reactive cascades with an
/// explicit state machine.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EngineState {
    Idle,
    Importing,
    Editing,
    Saving,
}

/// What to do with an incoming change, per the policy table.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Disposition {
    /// Parse after the debounce window (text-editor keystrokes).
    ReparseDebounced,
    /// Parse right away (imports).
    ReparseNow,
    /// Model already mutated; serialize and push to the text surface.
    Serialize,
    /// Echo of our own last write; ignore entirely.
    Suppress,
}

/// The suppression policy. `is_echo` is only meaningful for text-editor
/// changes: it means the incoming text equals this session's own last push.
pub fn disposition(origin: ChangeOrigin, is_echo: bool) -> Disposition {
    match (origin, is_echo) {
        (ChangeOrigin::Canvas, _) => Disposition::Serialize,
        (ChangeOrigin::TextEditor, true) => Disposition::Suppress,
        (ChangeOrigin::TextEditor, false) => Disposition::ReparseDebounced,
        (ChangeOrigin::Import, _) => Disposition::ReparseNow,
    }
}

#[derive(Clone, Debug)]
struct PendingText {
    text: String,
    deadline: Instant,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum ReadyGate {
    Pending { deadline: Instant },
    Open,
}

pub struct Arbiter {
    state: EngineState,
    debounce: Duration,
    last_pushed_text: Option<String>,
    pending: Option<PendingText>,
    gate: ReadyGate,
}

impl Arbiter {
    pub fn new(debounce: Duration, ready_timeout: Duration, now: Instant) -> Arbiter {
        Arbiter {
            state: EngineState::Idle,
            debounce,
            last_pushed_text: None,
            pending: None,
            gate: ReadyGate::Pending {
                deadline: now + ready_timeout,
            },
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn set_state(&mut self, state: EngineState) {
        self.state = state;
    }

    /// Remember the exact text of our own last push (or import), so the
    /// text surface's change notification for it is recognized as an echo.
    pub fn note_push(&mut self, text: &str) {
        self.last_pushed_text = Some(text.to_string());
    }

    pub fn classify_text(&self, origin: ChangeOrigin, text: &str) -> Disposition {
        let is_echo = self.last_pushed_text.as_deref() == Some(text);
        disposition(origin, is_echo)
    }

    /// A keystroke within the window cancels the previous pending parse and
    /// restarts the timer with the newest text.
    pub fn schedule_text(&mut self, text: String, now: Instant) {
        if self.pending.is_some() {
            debug!("restarting debounce window");
        }
        self.pending = Some(PendingText {
            text,
            deadline: now + self.debounce,
        });
    }

    pub fn has_pending_text(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending text, if its debounce window has elapsed.
    pub fn due_text(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending.take().map(|pending| pending.text)
            }
            _ => None,
        }
    }

    /// Projection gating: open once the store reports ready, or once the
    /// timeout elapses so a slow store cannot hang the editor. Resolves at
    /// most once per session.
    pub fn gate_open(&mut self, store_ready: bool, now: Instant) -> bool {
        match self.gate {
            ReadyGate::Open => true,
            ReadyGate::Pending { deadline } => {
                if store_ready || now >= deadline {
                    if !store_ready {
                        debug!("position store not ready, falling back to default placement");
                    }
                    self.gate = ReadyGate::Open;
                    true
                } else {
                    false
                }
            }
        }
    }
}
