// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The textual configuration document format.
//!
//! A document is a UTF-8 JSON object with top-level `entities` and `steps`
//! collections. The engine interprets identity, type markers, generator
//! specs, and reference fields; everything else is carried opaquely through
//! the `extra` maps so a parse/serialize round trip preserves it exactly.
//!
//! Positions never appear here: documents serialize the canonical model
//! only, and layout lives in the position store.

use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::{
    Attribute, CanonicalItem, DataType, ExtraFields, GeneratorSpec, ItemKind, Reference,
};

fn is_false(val: &bool) -> bool {
    !*val
}

fn is_empty_string(val: &str) -> bool {
    val.is_empty()
}

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

fn is_empty_map(val: &ExtraFields) -> bool {
    val.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub primary_key: bool,
    /// `"Target.attribute"` or bare `"Target"`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub foreign_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generator: Option<GeneratorSpec>,
    #[serde(flatten, skip_serializing_if = "is_empty_map", default)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEntity {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "is_empty_string", default)]
    pub type_tag: String,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub attributes: Vec<JsonAttribute>,
    #[serde(flatten, skip_serializing_if = "is_empty_map", default)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonStep {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "is_empty_string", default)]
    pub type_tag: String,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub attributes: Vec<JsonAttribute>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub next_steps: Vec<String>,
    #[serde(flatten, skip_serializing_if = "is_empty_map", default)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JsonDocument {
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub entities: Vec<JsonEntity>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub steps: Vec<JsonStep>,
    #[serde(flatten, skip_serializing_if = "is_empty_map", default)]
    pub extra: ExtraFields,
}

fn parse_foreign_key(raw: &str) -> Result<Reference> {
    if raw.is_empty() {
        return crate::doc_err!(BadReference, "empty foreign_key".to_string());
    }
    match raw.split_once('.') {
        Some((target, attr)) if !target.is_empty() && !attr.is_empty() => Ok(Reference {
            target_id: target.to_string(),
            target_attribute: Some(attr.to_string()),
        }),
        Some(_) => crate::doc_err!(BadReference, raw.to_string()),
        None => Ok(Reference {
            target_id: raw.to_string(),
            target_attribute: None,
        }),
    }
}

fn format_foreign_key(reference: &Reference) -> String {
    match &reference.target_attribute {
        Some(attr) => format!("{}.{}", reference.target_id, attr),
        None => reference.target_id.clone(),
    }
}

impl TryFrom<JsonAttribute> for Attribute {
    type Error = Error;

    fn try_from(attr: JsonAttribute) -> Result<Attribute> {
        let reference = attr
            .foreign_key
            .as_deref()
            .map(parse_foreign_key)
            .transpose()?;
        Ok(Attribute {
            name: attr.name,
            data_type: DataType::from_tag(&attr.data_type),
            primary_key: attr.primary_key,
            generator: attr.generator,
            reference,
            extra: attr.extra,
        })
    }
}

impl From<Attribute> for JsonAttribute {
    fn from(attr: Attribute) -> JsonAttribute {
        JsonAttribute {
            name: attr.name,
            data_type: attr.data_type.as_str().to_string(),
            primary_key: attr.primary_key,
            foreign_key: attr.reference.as_ref().map(format_foreign_key),
            generator: attr.generator,
            extra: attr.extra,
        }
    }
}

impl TryFrom<JsonEntity> for CanonicalItem {
    type Error = Error;

    fn try_from(entity: JsonEntity) -> Result<CanonicalItem> {
        let attributes = entity
            .attributes
            .into_iter()
            .map(Attribute::try_from)
            .collect::<Result<Vec<_>>>()?;
        let item = CanonicalItem {
            id: entity.name,
            kind: ItemKind::Entity,
            type_tag: entity.type_tag,
            attributes,
            next_steps: Vec::new(),
            extra: entity.extra,
        };
        item.check_attribute_names()?;
        Ok(item)
    }
}

impl TryFrom<JsonStep> for CanonicalItem {
    type Error = Error;

    fn try_from(step: JsonStep) -> Result<CanonicalItem> {
        let attributes = step
            .attributes
            .into_iter()
            .map(Attribute::try_from)
            .collect::<Result<Vec<_>>>()?;
        let item = CanonicalItem {
            id: step.name,
            kind: ItemKind::Step,
            type_tag: step.type_tag,
            attributes,
            next_steps: step.next_steps,
            extra: step.extra,
        };
        item.check_attribute_names()?;
        Ok(item)
    }
}

impl From<CanonicalItem> for JsonEntity {
    fn from(item: CanonicalItem) -> JsonEntity {
        JsonEntity {
            name: item.id,
            type_tag: item.type_tag,
            attributes: item.attributes.into_iter().map(JsonAttribute::from).collect(),
            extra: item.extra,
        }
    }
}

impl From<CanonicalItem> for JsonStep {
    fn from(item: CanonicalItem) -> JsonStep {
        JsonStep {
            name: item.id,
            type_tag: item.type_tag,
            attributes: item.attributes.into_iter().map(JsonAttribute::from).collect(),
            next_steps: item.next_steps,
            extra: item.extra,
        }
    }
}

/// Parse a document into canonical items, enforcing the structural identity
/// invariants (unique item ids, unique attribute names per item).
///
/// This does *not* require references to resolve: a document may be
/// transiently inconsistent mid-edit, and dangling references are the
/// projection builder's and cascader's concern.
pub fn parse_document(text: &str) -> Result<Vec<CanonicalItem>> {
    let doc: JsonDocument = serde_json::from_str(text).map_err(|err| {
        Error::new(
            ErrorKind::Document,
            ErrorCode::JsonDeserialization,
            Some(err.to_string()),
        )
    })?;

    let mut items = Vec::with_capacity(doc.entities.len() + doc.steps.len());
    for entity in doc.entities {
        items.push(CanonicalItem::try_from(entity)?);
    }
    for step in doc.steps {
        items.push(CanonicalItem::try_from(step)?);
    }

    for (i, item) in items.iter().enumerate() {
        if items[..i].iter().any(|other| other.id == item.id) {
            return crate::doc_err!(DuplicateItem, item.id.clone());
        }
    }

    Ok(items)
}

/// Serialize canonical items to document text. Deterministic: items stay in
/// model order, maps preserve insertion order, and output is pretty-printed
/// with a trailing newline so successive serializations of an unchanged
/// model are byte-identical.
pub fn serialize_document(items: &[CanonicalItem]) -> String {
    let mut doc = JsonDocument::default();
    for item in items {
        match item.kind {
            ItemKind::Entity => doc.entities.push(JsonEntity::from(item.clone())),
            ItemKind::Step => doc.steps.push(JsonStep::from(item.clone())),
        }
    }

    // A Vec<JsonEntity>/Vec<JsonStep> document cannot fail to serialize.
    let mut text = serde_json::to_string_pretty(&doc).unwrap_or_default();
    text.push('\n');
    text
}
