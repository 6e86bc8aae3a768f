// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Builder-based fixtures for constructing canonical models in tests.

use crate::datamodel::{
    Attribute, CanonicalItem, DataType, GeneratorSpec, ItemKind, Reference,
};
use crate::store::ModelStore;

pub struct TestModel {
    items: Vec<CanonicalItem>,
}

impl TestModel {
    pub fn new() -> TestModel {
        TestModel { items: Vec::new() }
    }

    /// Add an entity. An attribute named `id` becomes a uuid primary key;
    /// the rest are text columns.
    pub fn entity(mut self, id: &str, attrs: &[&str]) -> Self {
        let mut item = CanonicalItem::new(id, ItemKind::Entity);
        for name in attrs {
            item.attributes.push(plain_attribute(name));
        }
        self.items.push(item);
        self
    }

    /// Add an entity with one extra foreign-key attribute. `fk_target` is
    /// `"target.attribute"` or a bare `"target"`.
    pub fn entity_with_fk(
        mut self,
        id: &str,
        attrs: &[&str],
        fk_name: &str,
        fk_target: &str,
    ) -> Self {
        let mut item = CanonicalItem::new(id, ItemKind::Entity);
        for name in attrs {
            item.attributes.push(plain_attribute(name));
        }
        let mut fk = Attribute::new(fk_name, DataType::Uuid);
        fk.reference = Some(match fk_target.split_once('.') {
            Some((target, attr)) => Reference {
                target_id: target.to_string(),
                target_attribute: Some(attr.to_string()),
            },
            None => Reference::to_item(fk_target),
        });
        item.attributes.push(fk);
        self.items.push(item);
        self
    }

    pub fn step(mut self, id: &str, next_steps: &[&str]) -> Self {
        let mut item = CanonicalItem::new(id, ItemKind::Step);
        item.next_steps = next_steps.iter().map(|s| s.to_string()).collect();
        self.items.push(item);
        self
    }

    pub fn build(self) -> Vec<CanonicalItem> {
        self.items
    }

    pub fn build_store(self) -> ModelStore {
        let mut store = ModelStore::new();
        for item in self.items {
            store
                .add_item(item)
                .expect("test fixture items must be valid");
        }
        store
    }
}

fn plain_attribute(name: &str) -> Attribute {
    if name == "id" {
        let mut attr = Attribute::new(name, DataType::Uuid);
        attr.primary_key = true;
        attr.generator = Some(GeneratorSpec::Uuid);
        attr
    } else {
        Attribute::new(name, DataType::Text)
    }
}
