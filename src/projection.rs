// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Pure projection of the canonical model into renderable nodes and edges.
//!
//! No hidden state: identical inputs always produce identical output, so
//! projections can be recomputed freely during undo/redo and compared in
//! tests. The builder never mutates the model or the position map.

use std::collections::BTreeMap;

use log::debug;

use crate::datamodel::{CanonicalItem, ItemKind, get_item};
use crate::positions::{Point, ResolvedPosition};

const NODE_WIDTH: f64 = 180.0;
const NODE_HEADER_HEIGHT: f64 = 36.0;
const NODE_ROW_HEIGHT: f64 = 22.0;

#[derive(Clone, PartialEq, Debug)]
pub struct Node {
    pub id: String,
    pub kind: ItemKind,
    pub label: String,
    pub position: Point,
    /// Whether the position came from the store; fallback-placed nodes can
    /// be restyled or re-laid-out by the host.
    pub explicit_position: bool,
    pub width: f64,
    pub height: f64,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    /// Attribute-level reference, e.g. a foreign key.
    Reference,
    /// Step transition from `next_steps`.
    Transition,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// The source attribute for reference edges.
    pub field: Option<String>,
    pub kind: EdgeKind,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Projection {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Build the node/edge graph for rendering. References whose target does
/// not currently exist are dropped, not errors: mid-edit documents are
/// allowed to be transiently inconsistent.
pub fn build_projection(
    items: &[CanonicalItem],
    positions: &BTreeMap<String, ResolvedPosition>,
) -> Projection {
    let mut projection = Projection::default();

    for item in items {
        let resolved = positions.get(&item.id).copied().unwrap_or(ResolvedPosition {
            point: Point::default(),
            explicit: false,
        });
        let rows = match item.kind {
            ItemKind::Entity => item.attributes.len(),
            ItemKind::Step => item.attributes.len().max(1),
        };
        projection.nodes.push(Node {
            id: item.id.clone(),
            kind: item.kind,
            label: item.id.clone(),
            position: resolved.point,
            explicit_position: resolved.explicit,
            width: NODE_WIDTH,
            height: NODE_HEADER_HEIGHT + rows as f64 * NODE_ROW_HEIGHT,
        });
    }

    for item in items {
        for attr in item.attributes.iter() {
            if let Some(reference) = &attr.reference {
                if get_item(items, &reference.target_id).is_none() {
                    debug!(
                        "dropping dangling reference {}.{} -> {}",
                        item.id, attr.name, reference.target_id
                    );
                    continue;
                }
                projection.edges.push(Edge {
                    id: format!("{}.{}->{}", item.id, attr.name, reference.target_id),
                    source_id: item.id.clone(),
                    target_id: reference.target_id.clone(),
                    field: Some(attr.name.clone()),
                    kind: EdgeKind::Reference,
                });
            }
        }
        for next in item.next_steps.iter() {
            if get_item(items, next).is_none() {
                debug!("dropping dangling transition {} -> {}", item.id, next);
                continue;
            }
            projection.edges.push(Edge {
                id: format!("{}->{}", item.id, next),
                source_id: item.id.clone(),
                target_id: next.clone(),
                field: None,
                kind: EdgeKind::Transition,
            });
        }
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::TestModel;

    fn resolved(items: &[CanonicalItem]) -> BTreeMap<String, ResolvedPosition> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                (
                    item.id.clone(),
                    ResolvedPosition {
                        point: Point::new(i as f64 * 100.0, 50.0),
                        explicit: i % 2 == 0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn one_node_per_item_one_edge_per_resolvable_reference() {
        let store = TestModel::new()
            .entity("consultant", &["id", "name"])
            .entity_with_fk("project", &["id"], "consultant_id", "consultant.id")
            .step("intake", &["review"])
            .step("review", &[])
            .build_store();
        let positions = resolved(store.items());

        let projection = build_projection(store.items(), &positions);
        assert_eq!(projection.nodes.len(), 4);
        assert_eq!(projection.edges.len(), 2);

        let fk_edge = &projection.edges[0];
        assert_eq!(fk_edge.kind, EdgeKind::Reference);
        assert_eq!(fk_edge.source_id, "project");
        assert_eq!(fk_edge.target_id, "consultant");
        assert_eq!(fk_edge.field.as_deref(), Some("consultant_id"));

        let transition = &projection.edges[1];
        assert_eq!(transition.kind, EdgeKind::Transition);
        assert_eq!(transition.source_id, "intake");
        assert_eq!(transition.target_id, "review");
    }

    #[test]
    fn dangling_references_dropped_silently() {
        let store = TestModel::new()
            .entity_with_fk("project", &["id"], "consultant_id", "ghost.id")
            .step("intake", &["vanished"])
            .build_store();
        let positions = resolved(store.items());

        let projection = build_projection(store.items(), &positions);
        assert_eq!(projection.nodes.len(), 2);
        assert!(projection.edges.is_empty());
    }

    #[test]
    fn node_height_scales_with_attribute_count() {
        let store = TestModel::new()
            .entity("small", &["id"])
            .entity("large", &["id", "a", "b", "c"])
            .build_store();
        let positions = resolved(store.items());

        let projection = build_projection(store.items(), &positions);
        let small = projection.nodes.iter().find(|n| n.id == "small").unwrap();
        let large = projection.nodes.iter().find(|n| n.id == "large").unwrap();
        assert!(large.height > small.height);
    }

    #[test]
    fn identical_inputs_identical_output() {
        let store = TestModel::new()
            .entity("a", &["id"])
            .entity_with_fk("b", &["id"], "a_id", "a.id")
            .build_store();
        let positions = resolved(store.items());

        let first = build_projection(store.items(), &positions);
        let second = build_projection(store.items(), &positions);
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_position_flag_carried_through() {
        let store = TestModel::new().entity("a", &["id"]).build_store();
        let mut positions = BTreeMap::new();
        positions.insert(
            "a".to_string(),
            ResolvedPosition {
                point: Point::new(5.0, 6.0),
                explicit: true,
            },
        );

        let projection = build_projection(store.items(), &positions);
        assert!(projection.nodes[0].explicit_position);
        assert_eq!(projection.nodes[0].position, Point::new(5.0, 6.0));
    }
}
