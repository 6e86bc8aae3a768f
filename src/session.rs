// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Per-project editing sessions and the host-facing engine API.
//!
//! A `Session` owns the single canonical-model instance for one open
//! project: the store, position resolver, history, and arbiter. Mutations
//! flow in from the canvas or the text surface, and the session emits
//! events (`ProjectionChanged`, `DocumentChanged`, `DocumentInvalid`) that
//! the host drains via [`Session::poll`]. Sessions live in an explicit
//! registry keyed by project id; there is no ambient global instance.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::arbiter::{Arbiter, ChangeOrigin, Disposition, EngineState};
use crate::common::Result;
use crate::datamodel::{CanonicalItem, DiagramKind};
use crate::diff::diff_items;
use crate::history::{History, HistorySnapshot};
use crate::json::{parse_document, serialize_document};
use crate::positions::{PlacementConfig, Point, PositionResolver, PositionStore, ResolvedPosition};
use crate::projection::{Projection, build_projection};
use crate::store::ModelStore;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Text-editor keystrokes are debounced by this much before a parse.
    pub debounce: Duration,
    /// How long to wait for the position store before falling back to
    /// default placement.
    pub ready_timeout: Duration,
    pub placement: PlacementConfig,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            ready_timeout: Duration::from_secs(2),
            placement: PlacementConfig::default(),
            history_limit: 64,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum EngineEvent {
    /// New node/edge data for the rendering layer.
    ProjectionChanged(Projection),
    /// Serialized document to push to the text surface.
    DocumentChanged(String),
    /// The text surface currently holds an unparseable document; the last
    /// valid canonical model is retained. Never fatal.
    DocumentInvalid { reason: String },
}

pub struct Session {
    project_id: String,
    store: ModelStore,
    resolver: PositionResolver,
    position_store: Box<dyn PositionStore>,
    history: History,
    arbiter: Arbiter,
    events: Vec<EngineEvent>,
    projection_pending: bool,
    positions_loaded: bool,
    /// Next fallback grid slot; monotone per session so concurrently added
    /// items never stack.
    fallback_counter: usize,
}

impl Session {
    pub fn open(
        project_id: &str,
        position_store: Box<dyn PositionStore>,
        config: EngineConfig,
        now: Instant,
    ) -> Session {
        Session {
            project_id: project_id.to_string(),
            store: ModelStore::new(),
            resolver: PositionResolver::new(project_id, config.placement.clone()),
            position_store,
            history: History::new(config.history_limit),
            arbiter: Arbiter::new(config.debounce, config.ready_timeout, now),
            events: Vec::new(),
            projection_pending: false,
            positions_loaded: false,
            fallback_counter: 0,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn items(&self) -> &[CanonicalItem] {
        self.store.items()
    }

    pub fn state(&self) -> EngineState {
        self.arbiter.state()
    }

    /// Load a document into a fresh or existing session. Unlike typing,
    /// import failures surface to the caller, and history is reset.
    pub fn import_document(&mut self, text: &str, now: Instant) -> Result<()> {
        self.arbiter.set_state(EngineState::Importing);
        // same policy table as the text surface; imports reparse
        // immediately, even when the text matches our own last push
        if self.arbiter.classify_text(ChangeOrigin::Import, text) != Disposition::ReparseNow {
            self.arbiter.set_state(EngineState::Idle);
            return Ok(());
        }
        let items = parse_document(text).inspect_err(|_| {
            self.arbiter.set_state(EngineState::Idle);
        })?;

        // the text surface already holds this text; its change
        // notification must not round-trip through a re-parse
        self.arbiter.note_push(text);
        self.store.replace(items);
        self.history.clear();
        self.emit_projection(now);
        self.arbiter.set_state(EngineState::Idle);
        Ok(())
    }

    pub fn add_item(&mut self, item: CanonicalItem, now: Instant) -> Result<()> {
        self.ensure_positions_loaded();
        let pre = self.snapshot("add item");
        self.store.add_item(item)?;
        self.commit_canvas_mutation(pre, now);
        Ok(())
    }

    pub fn update_item(&mut self, id: &str, item: CanonicalItem, now: Instant) -> Result<()> {
        self.ensure_positions_loaded();
        let pre = self.snapshot("update item");
        self.store.update_item(id, item)?;
        self.commit_canvas_mutation(pre, now);
        Ok(())
    }

    pub fn delete_item(&mut self, id: &str, now: Instant) {
        self.delete_items(&[id.to_string()], now);
    }

    /// Multi-select deletion as one atomic batch: one cascade, one history
    /// entry, one serialize, one projection event.
    pub fn delete_items(&mut self, ids: &[String], now: Instant) {
        self.ensure_positions_loaded();
        let pre = self.snapshot("delete items");

        let mut by_diagram: BTreeMap<DiagramKind, Vec<String>> = BTreeMap::new();
        for id in ids {
            if let Some(item) = self.store.get(id) {
                by_diagram
                    .entry(item.kind.diagram())
                    .or_default()
                    .push(id.clone());
            }
        }

        let removed = self.store.delete_items(ids);
        if removed.is_empty() {
            return;
        }
        for (diagram, ids) in by_diagram {
            self.resolver
                .remove(&mut *self.position_store, diagram, &ids);
        }
        self.commit_canvas_mutation(pre, now);
    }

    /// Rename: references are rewritten and the stored position transfers
    /// to the new id before the rename is considered committed.
    pub fn rename_item(&mut self, old_id: &str, new_id: &str, now: Instant) -> Result<()> {
        self.ensure_positions_loaded();
        let pre = self.snapshot("rename item");
        let Some(diagram) = self.store.get(old_id).map(|item| item.kind.diagram()) else {
            warn!("rename of unknown item {old_id} ignored");
            return Ok(());
        };
        self.store.rename_item(old_id, new_id)?;
        self.resolver
            .transfer(&mut *self.position_store, diagram, old_id, new_id);
        self.commit_canvas_mutation(pre, now);
        Ok(())
    }

    pub fn connect_items(
        &mut self,
        source_id: &str,
        target_id: &str,
        field: Option<&str>,
        now: Instant,
    ) -> Result<()> {
        self.ensure_positions_loaded();
        let pre = self.snapshot("connect items");
        self.store.connect_items(source_id, target_id, field)?;
        self.commit_canvas_mutation(pre, now);
        Ok(())
    }

    /// Canvas drag. Touches position state only: the document and the
    /// structural model are unchanged, and history coalesces a drag into a
    /// single dirty window committed by the next structural mutation or an
    /// explicit [`Session::commit_pending`].
    pub fn move_item(&mut self, id: &str, point: Point, now: Instant) {
        self.ensure_positions_loaded();
        let Some(diagram) = self.store.get(id).map(|item| item.kind.diagram()) else {
            warn!("move of unknown item {id} ignored");
            return;
        };
        let pre = self.snapshot("move item");
        self.history.begin(pre);
        self.resolver
            .set_position(&mut *self.position_store, diagram, id, point);
        self.emit_projection(now);
    }

    /// Commit any open dirty window (e.g. at drag end).
    pub fn commit_pending(&mut self) {
        self.history.commit();
    }

    /// Notification from the text surface. Echoes of our own pushes are
    /// suppressed; real edits are debounced and handled in [`Session::poll`].
    pub fn on_external_text_change(&mut self, text: &str, now: Instant) {
        match self.arbiter.classify_text(ChangeOrigin::TextEditor, text) {
            Disposition::Suppress => {
                debug!("suppressing echo of our own document push");
            }
            _ => self.arbiter.schedule_text(text.to_string(), now),
        }
    }

    /// Drive pending work: an elapsed debounce window triggers the parse
    /// path, and a newly-ready position store releases a gated projection.
    /// Returns the events emitted since the last poll.
    pub fn poll(&mut self, now: Instant) -> Vec<EngineEvent> {
        if let Some(text) = self.arbiter.due_text(now) {
            self.apply_external_text(&text, now);
        }
        if self.projection_pending {
            self.emit_projection(now);
        }
        mem::take(&mut self.events)
    }

    /// Serialize the canonical model. Positions never appear in the output.
    pub fn generate_document(&self) -> String {
        serialize_document(self.store.items())
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        let current = self.snapshot("undo");
        match self.history.undo(current) {
            Some(restored) => {
                self.apply_snapshot(restored, now);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        let current = self.snapshot("redo");
        match self.history.redo(current) {
            Some(restored) => {
                self.apply_snapshot(restored, now);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn snapshot(&self, label: &str) -> HistorySnapshot {
        HistorySnapshot {
            items: self.store.items().to_vec(),
            positions: self.resolver.positions().clone(),
            label: label.to_string(),
        }
    }

    /// Canvas-origin commit: record history, serialize synchronously so the
    /// published document reflects the canvas state at the instant of
    /// commit, and re-project.
    fn commit_canvas_mutation(&mut self, pre: HistorySnapshot, now: Instant) {
        self.history.record(pre);
        self.push_document();
        self.emit_projection(now);
    }

    fn push_document(&mut self) {
        let text = serialize_document(self.store.items());
        self.arbiter.note_push(&text);
        self.events.push(EngineEvent::DocumentChanged(text));
    }

    /// The debounced parse path for text-originated edits.
    fn apply_external_text(&mut self, text: &str, now: Instant) {
        self.arbiter.set_state(EngineState::Editing);

        let new_items = match parse_document(text) {
            Ok(items) => items,
            Err(err) => {
                // expected while the user is mid-edit; keep the last
                // valid model and tell the host the text is stale
                debug!("document does not parse yet: {err}");
                self.events.push(EngineEvent::DocumentInvalid {
                    reason: err.to_string(),
                });
                self.arbiter.set_state(EngineState::Idle);
                return;
            }
        };

        let diff = diff_items(self.store.items(), &new_items);
        if diff.is_empty() {
            // formatting-only edit: no history entry, no projection reset
            self.arbiter.set_state(EngineState::Idle);
            return;
        }

        self.ensure_positions_loaded();
        let pre = self.snapshot("text edit");

        let mut removed_by_diagram: BTreeMap<DiagramKind, Vec<String>> = BTreeMap::new();
        for id in &diff.removed {
            if let Some(item) = self.store.get(id) {
                removed_by_diagram
                    .entry(item.kind.diagram())
                    .or_default()
                    .push(id.clone());
            }
        }

        self.store.replace(new_items);
        for (diagram, ids) in removed_by_diagram {
            self.resolver
                .remove(&mut *self.position_store, diagram, &ids);
        }
        // newly-introduced items get their fallback slots in the projection
        // pass, in model order

        self.history.record(pre);
        self.emit_projection(now);
        self.arbiter.set_state(EngineState::Idle);
    }

    /// Stored positions must be in the resolver cache before the first
    /// resolve, snapshot, or write-through against them; otherwise a
    /// fallback write would overwrite a layout the store already holds.
    fn ensure_positions_loaded(&mut self) {
        if self.positions_loaded || !self.position_store.is_ready() {
            return;
        }
        self.resolver.load(&*self.position_store);
        self.positions_loaded = true;
    }

    fn assign_fallback(&mut self, diagram: DiagramKind, id: &str) {
        let resolved =
            self.resolver
                .assign(&mut *self.position_store, diagram, id, self.fallback_counter);
        if !resolved.explicit {
            self.fallback_counter += 1;
        }
    }

    /// Restore an undo/redo snapshot: model, then positions, then the two
    /// derived surfaces (document text and projection).
    fn apply_snapshot(&mut self, snapshot: HistorySnapshot, now: Instant) {
        let diagram_by_id: HashMap<String, DiagramKind> = snapshot
            .items
            .iter()
            .map(|item| (item.id.clone(), item.kind.diagram()))
            .chain(
                self.store
                    .items()
                    .iter()
                    .map(|item| (item.id.clone(), item.kind.diagram())),
            )
            .collect();

        self.store.replace(snapshot.items);
        self.resolver.restore(
            &mut *self.position_store,
            snapshot.positions,
            |id| diagram_by_id.get(id).copied(),
        );
        self.push_document();
        self.emit_projection(now);
    }

    /// Compute and queue a projection, unless the position store is not
    /// ready yet, in which case it is deferred until [`Session::poll`] sees
    /// the store become ready or the timeout lapse.
    fn emit_projection(&mut self, now: Instant) {
        let store_ready = self.position_store.is_ready();
        if !self.arbiter.gate_open(store_ready, now) {
            self.projection_pending = true;
            return;
        }
        if !self.positions_loaded {
            self.resolver.load(&*self.position_store);
            self.positions_loaded = true;
        }

        let pending: Vec<(DiagramKind, String)> = self
            .store
            .items()
            .iter()
            .map(|item| (item.kind.diagram(), item.id.clone()))
            .collect();
        let mut resolved: BTreeMap<String, ResolvedPosition> = BTreeMap::new();
        for (diagram, id) in pending {
            let position = self.resolver.resolve(&id, self.fallback_counter);
            if !position.explicit {
                self.assign_fallback(diagram, &id);
            }
            resolved.insert(id, position);
        }

        let projection = build_projection(self.store.items(), &resolved);
        self.events.push(EngineEvent::ProjectionChanged(projection));
        self.projection_pending = false;
    }
}

/// Explicit lifecycle for concurrently open projects. One session per
/// project id; disposing a session destroys its model and position cache.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        Default::default()
    }

    pub fn open(
        &mut self,
        project_id: &str,
        position_store: Box<dyn PositionStore>,
        config: EngineConfig,
        now: Instant,
    ) -> Result<&mut Session> {
        if self.sessions.contains_key(project_id) {
            return crate::model_err!(DuplicateItem, format!("session {project_id}"));
        }
        let session = Session::open(project_id, position_store, config, now);
        Ok(self
            .sessions
            .entry(project_id.to_string())
            .or_insert(session))
    }

    pub fn get(&self, project_id: &str) -> Option<&Session> {
        self.sessions.get(project_id)
    }

    pub fn get_mut(&mut self, project_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(project_id)
    }

    pub fn dispose(&mut self, project_id: &str) -> bool {
        self.sessions.remove(project_id).is_some()
    }
}
