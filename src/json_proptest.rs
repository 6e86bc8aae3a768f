// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the document format using proptest.
//!
//! These verify that any model the strategies can produce survives a
//! serialize -> parse round trip exactly, and that the parser never panics
//! on arbitrary input.

use proptest::prelude::*;

use serde_json::Value;

use crate::datamodel::{
    Attribute, CanonicalItem, DataType, DistributionSpec, ExtraFields, GeneratorSpec, ItemKind,
    Reference,
};
use crate::diff::diff_items;
use crate::json::{parse_document, serialize_document};

fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

fn finite_f64() -> impl Strategy<Value = f64> {
    // values that survive JSON f64 round trips bit-exactly
    prop_oneof![
        Just(0.0),
        Just(1.0),
        (-1000i32..1000).prop_map(|x| x as f64),
        (-100i32..100).prop_map(|x| x as f64 / 4.0),
    ]
}

fn data_type_strategy() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Uuid),
        Just(DataType::Integer),
        Just(DataType::Float),
        Just(DataType::Text),
        Just(DataType::Boolean),
        Just(DataType::Timestamp),
        // normalized through from_tag so a generated custom tag can never
        // shadow a builtin and break round-trip equality
        "[a-z][a-z_]{2,10}".prop_map(|tag| DataType::from_tag(&tag)),
    ]
}

fn generator_strategy() -> impl Strategy<Value = GeneratorSpec> {
    prop_oneof![
        Just(GeneratorSpec::Uuid),
        (0i64..1000, 1i64..10)
            .prop_map(|(start, step)| GeneratorSpec::Sequence { start, step }),
        (-1000i32..1000).prop_map(|n| GeneratorSpec::Constant {
            value: Value::from(n),
        }),
        "[a-z#?]{1,8}".prop_map(|pattern| GeneratorSpec::Pattern { pattern }),
        (finite_f64(), finite_f64()).prop_map(|(a, b)| GeneratorSpec::Distribution {
            spec: DistributionSpec::Uniform {
                min: a.min(b),
                max: a.max(b),
            },
        }),
        (finite_f64(), (1i32..100).prop_map(|x| x as f64)).prop_map(|(mean, std_dev)| {
            GeneratorSpec::Distribution {
                spec: DistributionSpec::Normal { mean, std_dev },
            }
        }),
    ]
}

fn reference_strategy() -> impl Strategy<Value = Reference> {
    prop_oneof![
        ident_strategy().prop_map(|target| Reference::to_item(&target)),
        (ident_strategy(), ident_strategy()).prop_map(|(target, attr)| Reference {
            target_id: target,
            target_attribute: Some(attr),
        }),
    ]
}

fn attributes_strategy() -> impl Strategy<Value = Vec<Attribute>> {
    // btree_map keys give us unique attribute names for free
    prop::collection::btree_map(
        ident_strategy(),
        (
            data_type_strategy(),
            any::<bool>(),
            prop::option::of(reference_strategy()),
            prop::option::of(generator_strategy()),
        ),
        0..5,
    )
    .prop_map(|attrs| {
        attrs
            .into_iter()
            .map(|(name, (data_type, primary_key, reference, generator))| Attribute {
                name,
                data_type,
                primary_key,
                generator,
                reference,
                extra: ExtraFields::new(),
            })
            .collect()
    })
}

fn entity_strategy() -> impl Strategy<Value = CanonicalItem> {
    (
        ident_strategy(),
        prop_oneof![Just(String::new()), ident_strategy()],
        attributes_strategy(),
    )
        .prop_map(|(id, type_tag, attributes)| CanonicalItem {
            id,
            kind: ItemKind::Entity,
            type_tag,
            attributes,
            next_steps: Vec::new(),
            extra: ExtraFields::new(),
        })
}

fn step_strategy() -> impl Strategy<Value = CanonicalItem> {
    (
        ident_strategy(),
        prop_oneof![Just(String::new()), ident_strategy()],
        attributes_strategy(),
        prop::collection::btree_set(ident_strategy(), 0..3),
    )
        .prop_map(|(id, type_tag, attributes, next_steps)| CanonicalItem {
            id,
            kind: ItemKind::Step,
            type_tag,
            attributes,
            next_steps: next_steps.into_iter().collect(),
            extra: ExtraFields::new(),
        })
}

/// A well-formed model: entities first (matching document section order),
/// then steps, with item ids unique across both.
fn document_strategy() -> impl Strategy<Value = Vec<CanonicalItem>> {
    (
        prop::collection::vec(entity_strategy(), 0..4),
        prop::collection::vec(step_strategy(), 0..3),
    )
        .prop_map(|(entities, steps)| {
            let mut items: Vec<CanonicalItem> = Vec::new();
            for item in entities.into_iter().chain(steps) {
                if !items.iter().any(|existing| existing.id == item.id) {
                    items.push(item);
                }
            }
            items
        })
}

proptest! {
    #[test]
    fn document_round_trips_exactly(items in document_strategy()) {
        let text = serialize_document(&items);
        let reparsed = parse_document(&text).expect("serialized documents must parse");
        prop_assert_eq!(&items, &reparsed);
    }

    #[test]
    fn round_trip_is_structurally_silent(items in document_strategy()) {
        let reparsed = parse_document(&serialize_document(&items))
            .expect("serialized documents must parse");
        prop_assert!(diff_items(&items, &reparsed).is_empty());
    }

    #[test]
    fn serialization_is_stable(items in document_strategy()) {
        prop_assert_eq!(serialize_document(&items), serialize_document(&items));
    }

    #[test]
    fn parser_never_panics(text in "\\PC*") {
        let _ = parse_document(&text);
    }
}
