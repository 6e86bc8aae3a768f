// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Structural diffing of two canonical snapshots.
//!
//! The arbiter uses this to gate expensive work: a text edit that parses to
//! a structurally identical model (whitespace, key reordering, transition
//! reordering) must not reset layout, push history, or re-project.

use std::collections::BTreeMap;

use crate::datamodel::{CanonicalItem, structurally_equal};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuralDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl StructuralDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Compare two snapshots keyed by id, ignoring item order. Ids are reported
/// in sorted order so diff results are deterministic.
pub fn diff_items(old: &[CanonicalItem], new: &[CanonicalItem]) -> StructuralDiff {
    let old_by_id: BTreeMap<&str, &CanonicalItem> =
        old.iter().map(|item| (item.id.as_str(), item)).collect();
    let new_by_id: BTreeMap<&str, &CanonicalItem> =
        new.iter().map(|item| (item.id.as_str(), item)).collect();

    let mut diff = StructuralDiff::default();

    for (id, new_item) in new_by_id.iter() {
        match old_by_id.get(id) {
            None => diff.added.push(id.to_string()),
            Some(old_item) => {
                if !structurally_equal(old_item, new_item) {
                    diff.modified.push(id.to_string());
                }
            }
        }
    }

    for id in old_by_id.keys() {
        if !new_by_id.contains_key(id) {
            diff.removed.push(id.to_string());
        }
    }

    diff
}
