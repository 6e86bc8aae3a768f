// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The authoritative canonical model store, including the referential
//! integrity cascade on delete and rename.
//!
//! Every mutation leaves the model with no dangling references: deletes
//! strip only the reference field (surrounding attribute data survives),
//! renames rewrite all references before the rename commits. Batch deletes
//! are atomic; no intermediate state is observable to the diff detector or
//! the projection builder.

use log::warn;

use crate::common::Result;
use crate::datamodel::{CanonicalItem, ItemKind, Reference, get_item, get_item_mut};

#[derive(Clone, Default, PartialEq, Debug)]
pub struct ModelStore {
    items: Vec<CanonicalItem>,
}

impl ModelStore {
    pub fn new() -> ModelStore {
        Default::default()
    }

    pub fn items(&self) -> &[CanonicalItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalItem> {
        get_item(&self.items, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole model, e.g. after a text-originated parse. The
    /// caller is responsible for having diffed first.
    pub fn replace(&mut self, items: Vec<CanonicalItem>) {
        self.items = items;
    }

    pub fn add_item(&mut self, item: CanonicalItem) -> Result<()> {
        if self.contains(&item.id) {
            return crate::model_err!(DuplicateItem, item.id);
        }
        item.check_attribute_names()?;
        self.items.push(item);
        Ok(())
    }

    /// Replace an item's contents. The id is immutable here; renames go
    /// through [`ModelStore::rename_item`] so references and positions can
    /// follow.
    pub fn update_item(&mut self, id: &str, item: CanonicalItem) -> Result<()> {
        if item.id != id {
            return crate::model_err!(IdIsImmutable, format!("{} -> {}", id, item.id));
        }
        item.check_attribute_names()?;
        let Some(existing) = get_item_mut(&mut self.items, id) else {
            return crate::model_err!(DoesNotExist, id.to_string());
        };
        *existing = item;
        Ok(())
    }

    /// Delete a batch of items in one atomic step and cascade: any
    /// remaining attribute reference or step transition pointing at a
    /// deleted id is stripped. Returns the ids actually removed; unknown
    /// ids are warn-level no-ops.
    pub fn delete_items(&mut self, ids: &[String]) -> Vec<String> {
        let (known, unknown): (Vec<&String>, Vec<&String>) =
            ids.iter().partition(|id| self.contains(id));
        for id in unknown {
            warn!("delete of unknown item {id} ignored");
        }
        if known.is_empty() {
            return Vec::new();
        }

        let removed: Vec<String> = known.into_iter().cloned().collect();
        self.items.retain(|item| !removed.contains(&item.id));

        for item in self.items.iter_mut() {
            for attr in item.attributes.iter_mut() {
                if let Some(reference) = &attr.reference
                    && removed.contains(&reference.target_id)
                {
                    attr.reference = None;
                }
            }
            item.next_steps.retain(|next| !removed.contains(next));
        }

        removed
    }

    /// Rename an item, rewriting every reference to the old id before the
    /// rename is considered committed. Staged on a clone so a failed
    /// precondition leaves the store untouched.
    pub fn rename_item(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        if old_id == new_id {
            return Ok(());
        }
        if self.contains(new_id) {
            return crate::model_err!(DuplicateItem, new_id.to_string());
        }

        let mut staged = self.items.clone();
        let Some(item) = get_item_mut(&mut staged, old_id) else {
            warn!("rename of unknown item {old_id} ignored");
            return crate::model_err!(DoesNotExist, old_id.to_string());
        };
        item.id = new_id.to_string();

        for item in staged.iter_mut() {
            for attr in item.attributes.iter_mut() {
                if let Some(reference) = &mut attr.reference
                    && reference.target_id == old_id
                {
                    reference.target_id = new_id.to_string();
                }
            }
            for next in item.next_steps.iter_mut() {
                if next == old_id {
                    *next = new_id.to_string();
                }
            }
        }

        self.items = staged;
        Ok(())
    }

    /// Create a reference from source to target. With a field name this
    /// sets that attribute's reference (a foreign key toward the target's
    /// primary key); without one it appends a step transition.
    pub fn connect_items(
        &mut self,
        source_id: &str,
        target_id: &str,
        field: Option<&str>,
    ) -> Result<()> {
        let target_pk = match self.get(target_id) {
            Some(target) => target.primary_key().map(|attr| attr.name.clone()),
            None => return crate::model_err!(DoesNotExist, target_id.to_string()),
        };
        let Some(source) = get_item_mut(&mut self.items, source_id) else {
            return crate::model_err!(DoesNotExist, source_id.to_string());
        };
        match field {
            Some(field) => {
                let Some(attr) = source.get_attribute_mut(field) else {
                    return crate::model_err!(
                        BadReference,
                        format!("{source_id} has no attribute {field}")
                    );
                };
                attr.reference = Some(Reference {
                    target_id: target_id.to_string(),
                    target_attribute: target_pk,
                });
            }
            None => {
                if source.kind != ItemKind::Step {
                    return crate::model_err!(
                        BadItemKind,
                        format!("{source_id} is not a step")
                    );
                }
                if !source.next_steps.iter().any(|next| next == target_id) {
                    source.next_steps.push(target_id.to_string());
                }
            }
        }
        Ok(())
    }

    /// True when every reference and transition resolves; the cascade is
    /// meant to maintain this after every committed mutation.
    pub fn check_referential_integrity(&self) -> bool {
        self.items.iter().all(|item| {
            item.referenced_ids()
                .all(|target| self.contains(target))
        })
    }
}
