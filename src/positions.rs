// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Position persistence and resolution.
//!
//! Positions live outside the document, keyed per project and per diagram.
//! The resolver is the single writer of position persistence: the store,
//! projection builder, and renderer never write coordinates. Absence of a
//! stored entry is a distinct state from `(0, 0)`, and the resolver reports
//! explicitly whether a coordinate came from the store rather than
//! inferring it from value equality.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::common::Result;
use crate::datamodel::DiagramKind;

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

pub type PositionMap = BTreeMap<String, Point>;

/// The injected persistence contract. Implementations may be backed by the
/// host's project storage; reads and writes are best-effort from the
/// engine's point of view.
pub trait PositionStore {
    fn get(&self, project_id: &str, diagram: DiagramKind) -> Result<PositionMap>;
    fn set(
        &mut self,
        project_id: &str,
        diagram: DiagramKind,
        id: &str,
        point: Point,
    ) -> Result<()>;
    fn remove(&mut self, project_id: &str, diagram: DiagramKind, ids: &[String]) -> Result<()>;
    fn is_ready(&self) -> bool;
}

/// A straightforward in-memory store, used in tests and as the terminal
/// degradation target when a real store keeps failing.
#[derive(Default)]
pub struct InMemoryPositionStore {
    maps: BTreeMap<(String, DiagramKind), PositionMap>,
    ready: bool,
}

impl InMemoryPositionStore {
    pub fn new() -> InMemoryPositionStore {
        InMemoryPositionStore {
            maps: BTreeMap::new(),
            ready: true,
        }
    }

    pub fn new_not_ready() -> InMemoryPositionStore {
        InMemoryPositionStore {
            maps: BTreeMap::new(),
            ready: false,
        }
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }
}

impl PositionStore for InMemoryPositionStore {
    fn get(&self, project_id: &str, diagram: DiagramKind) -> Result<PositionMap> {
        Ok(self
            .maps
            .get(&(project_id.to_string(), diagram))
            .cloned()
            .unwrap_or_default())
    }

    fn set(
        &mut self,
        project_id: &str,
        diagram: DiagramKind,
        id: &str,
        point: Point,
    ) -> Result<()> {
        self.maps
            .entry((project_id.to_string(), diagram))
            .or_default()
            .insert(id.to_string(), point);
        Ok(())
    }

    fn remove(&mut self, project_id: &str, diagram: DiagramKind, ids: &[String]) -> Result<()> {
        if let Some(map) = self.maps.get_mut(&(project_id.to_string(), diagram)) {
            for id in ids {
                map.remove(id);
            }
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Fallback placement geometry. All values are in canvas logical units.
#[derive(Clone, Debug)]
pub struct PlacementConfig {
    /// Viewport-centered base point for the first fallback slot.
    pub base_x: f64,
    pub base_y: f64,
    /// Grid cell size for successive fallback slots.
    pub column_width: f64,
    pub row_height: f64,
    /// Slots per row before wrapping to the next one.
    pub columns: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            base_x: 480.0,
            base_y: 270.0,
            column_width: 220.0,
            row_height: 140.0,
            columns: 4,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ResolvedPosition {
    pub point: Point,
    /// True when the coordinate came from the store, false for fallback
    /// placement. Never inferred by comparing coordinate values.
    pub explicit: bool,
}

/// Per-session position state: an authoritative in-memory map plus
/// best-effort write-through to the injected store.
pub struct PositionResolver {
    project_id: String,
    placement: PlacementConfig,
    cache: PositionMap,
    degraded: bool,
}

impl PositionResolver {
    pub fn new(project_id: &str, placement: PlacementConfig) -> PositionResolver {
        PositionResolver {
            project_id: project_id.to_string(),
            placement,
            cache: PositionMap::new(),
            degraded: false,
        }
    }

    /// Pull both diagrams' maps out of the store. Read failures leave the
    /// corresponding entries unset; editing proceeds with fallbacks.
    pub fn load(&mut self, store: &dyn PositionStore) {
        for diagram in [DiagramKind::Entities, DiagramKind::Steps] {
            match store.get(&self.project_id, diagram) {
                Ok(map) => self.cache.extend(map),
                Err(err) => {
                    warn!("position read failed for {}: {}", diagram.as_str(), err);
                }
            }
        }
    }

    pub fn positions(&self) -> &PositionMap {
        &self.cache
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Deterministic fallback slot for the nth concurrently-placed item:
    /// viewport-centered base plus a grid offset, so fresh items never
    /// stack on each other.
    pub fn fallback_point(&self, index: usize) -> Point {
        let col = (index % self.placement.columns) as f64;
        let row = (index / self.placement.columns) as f64;
        Point::new(
            self.placement.base_x + col * self.placement.column_width,
            self.placement.base_y + row * self.placement.row_height,
        )
    }

    pub fn resolve(&self, id: &str, fallback_index: usize) -> ResolvedPosition {
        match self.cache.get(id) {
            Some(&point) => ResolvedPosition {
                point,
                explicit: true,
            },
            None => ResolvedPosition {
                point: self.fallback_point(fallback_index),
                explicit: false,
            },
        }
    }

    /// Resolve, and if the item had no stored position persist the fallback
    /// so the same coordinates come back after a reload.
    pub fn assign(
        &mut self,
        store: &mut dyn PositionStore,
        diagram: DiagramKind,
        id: &str,
        fallback_index: usize,
    ) -> ResolvedPosition {
        let resolved = self.resolve(id, fallback_index);
        if !resolved.explicit {
            self.write(store, diagram, id, resolved.point);
        }
        resolved
    }

    /// Canvas drag: position only, never touches the document.
    pub fn set_position(
        &mut self,
        store: &mut dyn PositionStore,
        diagram: DiagramKind,
        id: &str,
        point: Point,
    ) {
        self.write(store, diagram, id, point);
    }

    /// On rename, carry the stored position over to the new id instead of
    /// discarding it and falling back.
    pub fn transfer(
        &mut self,
        store: &mut dyn PositionStore,
        diagram: DiagramKind,
        old_id: &str,
        new_id: &str,
    ) {
        if let Some(point) = self.cache.remove(old_id) {
            self.remove(store, diagram, &[old_id.to_string()]);
            self.write(store, diagram, new_id, point);
        }
    }

    pub fn remove(&mut self, store: &mut dyn PositionStore, diagram: DiagramKind, ids: &[String]) {
        for id in ids {
            self.cache.remove(id);
        }
        if self.degraded {
            return;
        }
        if let Err(err) = store.remove(&self.project_id, diagram, ids) {
            warn!("position remove failed, continuing in-memory: {err}");
            self.degraded = true;
        }
    }

    /// Wholesale replacement, used by undo/redo restore. Best-effort
    /// persistence of every surviving entry.
    pub fn restore(
        &mut self,
        store: &mut dyn PositionStore,
        map: PositionMap,
        diagram_of: impl Fn(&str) -> Option<DiagramKind>,
    ) {
        let stale: Vec<String> = self
            .cache
            .keys()
            .filter(|id| !map.contains_key(*id))
            .cloned()
            .collect();
        for id in &stale {
            if let Some(diagram) = diagram_of(id) {
                self.remove(store, diagram, std::slice::from_ref(id));
            } else {
                self.cache.remove(id);
            }
        }
        for (id, point) in map {
            if self.cache.get(&id) == Some(&point) {
                continue;
            }
            match diagram_of(&id) {
                Some(diagram) => self.write(store, diagram, &id, point),
                None => {
                    self.cache.insert(id, point);
                }
            }
        }
    }

    fn write(&mut self, store: &mut dyn PositionStore, diagram: DiagramKind, id: &str, point: Point) {
        self.cache.insert(id.to_string(), point);
        if self.degraded {
            return;
        }
        // one immediate retry, then give up on the store for this session
        if store.set(&self.project_id, diagram, id, point).is_ok() {
            return;
        }
        debug!("position write failed for {id}, retrying");
        if let Err(err) = store.set(&self.project_id, diagram, id, point) {
            warn!("position store unavailable, continuing in-memory: {err}");
            self.degraded = true;
        }
    }
}
