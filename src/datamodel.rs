// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The canonical, position-free representation of a configuration.
//!
//! Items are either entities (tables the generation backend will fill) or
//! process steps. Both carry ordered, typed attributes; steps additionally
//! carry transitions to other steps. Positions are never part of this
//! model: structural equality here is what the diff detector and the
//! history manager key off of.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque passthrough for document fields the engine does not interpret.
pub type ExtraFields = serde_json::Map<String, Value>;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ItemKind {
    Entity,
    Step,
}

/// Which diagram an item is rendered on. Position storage is keyed per
/// diagram, so entity and step layouts never collide.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum DiagramKind {
    Entities,
    Steps,
}

impl ItemKind {
    pub fn diagram(&self) -> DiagramKind {
        match self {
            ItemKind::Entity => DiagramKind::Entities,
            ItemKind::Step => DiagramKind::Steps,
        }
    }
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Entities => "entities",
            DiagramKind::Steps => "steps",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DataType {
    Uuid,
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    /// Backend-specific types the engine passes through untouched.
    Custom(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Uuid => "uuid",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Text => "text",
            DataType::Boolean => "boolean",
            DataType::Timestamp => "timestamp",
            DataType::Custom(name) => name.as_str(),
        }
    }

    pub fn from_tag(tag: &str) -> DataType {
        match tag {
            "uuid" => DataType::Uuid,
            "integer" => DataType::Integer,
            "float" => DataType::Float,
            "text" => DataType::Text,
            "boolean" => DataType::Boolean,
            "timestamp" => DataType::Timestamp,
            other => DataType::Custom(other.to_string()),
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionSpec {
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std_dev: f64 },
}

/// Value-generation strategy for an attribute, as a closed tagged union.
///
/// The document format keys these by an explicit `type` field; anything
/// unrecognized is rejected at the parse boundary rather than carried as an
/// open map downstream.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSpec {
    Uuid,
    Sequence { start: i64, step: i64 },
    Constant { value: Value },
    Pattern { pattern: String },
    Distribution { spec: DistributionSpec },
}

/// A typed pointer from an attribute to another item, e.g. a foreign key
/// `consultant_id -> Consultant.id`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Reference {
    pub target_id: String,
    pub target_attribute: Option<String>,
}

impl Reference {
    pub fn to_item(target_id: &str) -> Reference {
        Reference {
            target_id: target_id.to_string(),
            target_attribute: None,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub generator: Option<GeneratorSpec>,
    pub reference: Option<Reference>,
    pub extra: ExtraFields,
}

impl Attribute {
    pub fn new(name: &str, data_type: DataType) -> Attribute {
        Attribute {
            name: name.to_string(),
            data_type,
            primary_key: false,
            generator: None,
            reference: None,
            extra: ExtraFields::new(),
        }
    }
}

/// A single entity or step. `id` is stable: rename is an explicit operation
/// on the store, never a field mutation.
#[derive(Clone, PartialEq, Debug)]
pub struct CanonicalItem {
    pub id: String,
    pub kind: ItemKind,
    pub type_tag: String,
    pub attributes: Vec<Attribute>,
    /// Step transitions; always empty for entities.
    pub next_steps: Vec<String>,
    pub extra: ExtraFields,
}

impl CanonicalItem {
    pub fn new(id: &str, kind: ItemKind) -> CanonicalItem {
        CanonicalItem {
            id: id.to_string(),
            kind,
            type_tag: String::new(),
            attributes: Vec::new(),
            next_steps: Vec::new(),
            extra: ExtraFields::new(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn get_attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|attr| attr.name == name)
    }

    pub fn primary_key(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.primary_key)
    }

    /// All ids this item points at, through attribute references and
    /// step transitions.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter_map(|attr| attr.reference.as_ref().map(|r| r.target_id.as_str()))
            .chain(self.next_steps.iter().map(|s| s.as_str()))
    }

    /// Attribute names must be unique within an item; the parse boundary
    /// and the store both enforce this.
    pub fn check_attribute_names(&self) -> crate::common::Result<()> {
        for (i, attr) in self.attributes.iter().enumerate() {
            if self.attributes[..i].iter().any(|a| a.name == attr.name) {
                return crate::model_err!(
                    DuplicateAttribute,
                    format!("{}.{}", self.id, attr.name)
                );
            }
        }
        Ok(())
    }
}

pub fn get_item<'a>(items: &'a [CanonicalItem], id: &str) -> Option<&'a CanonicalItem> {
    items.iter().find(|item| item.id == id)
}

pub fn get_item_mut<'a>(items: &'a mut [CanonicalItem], id: &str) -> Option<&'a mut CanonicalItem> {
    items.iter_mut().find(|item| item.id == id)
}

/// Structural equality for diffing: id-keyed, position-free, and
/// insensitive to `next_steps` ordering (transition order carries no
/// meaning in the document).
pub fn structurally_equal(a: &CanonicalItem, b: &CanonicalItem) -> bool {
    if a.id != b.id
        || a.kind != b.kind
        || a.type_tag != b.type_tag
        || a.attributes != b.attributes
        || a.extra != b.extra
    {
        return false;
    }

    if a.next_steps.len() != b.next_steps.len() {
        return false;
    }
    let mut a_steps: Vec<&str> = a.next_steps.iter().map(|s| s.as_str()).collect();
    let mut b_steps: Vec<&str> = b.next_steps.iter().map(|s| s.as_str()).collect();
    a_steps.sort_unstable();
    b_steps.sort_unstable();
    a_steps == b_steps
}
