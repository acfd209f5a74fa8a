// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic traversal of the containment graph.
//!
//! The order starts at the root and is breadth-first, with child collections
//! queued before shapes. A node is emitted only after every collection holding
//! it, so in a graph where a shape is reachable as `root → A → B → shape` and
//! also directly from `root` and `A`, the order is still `root, A, B, shape`.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::collection::{CollectionId, Node};
use crate::scene::Scene;

/// Cached traversal order with a dirty flag.
#[derive(Debug, Default)]
pub(crate) struct TraversalCache {
    order: Vec<Node>,
    valid: bool,
}

impl TraversalCache {
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn store(&mut self, order: Vec<Node>) {
        self.order = order;
        self.valid = true;
    }

    pub(crate) fn order(&self) -> &[Node] {
        &self.order
    }
}

/// Every node reachable from the root, each after all of its parents.
pub(crate) fn topological_order(scene: &Scene) -> Vec<Node> {
    // Number of parents each node is still waiting on.
    let mut waiting: HashMap<Node, usize> = HashMap::new();
    for collection in scene.collections() {
        for member in collection.iter() {
            *waiting.entry(member).or_insert(0) += 1;
        }
    }

    let mut order = Vec::with_capacity(waiting.len() + 1);
    let mut queue = VecDeque::from([Node::Collection(CollectionId::ROOT)]);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        let Node::Collection(id) = node else {
            continue;
        };
        let Some(collection) = scene.collection(id) else {
            continue;
        };
        let children = collection
            .collections()
            .map(Node::Collection)
            .chain(collection.shapes().map(Node::Shape));
        for child in children {
            if let Some(remaining) = waiting.get_mut(&child) {
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(child);
                }
            }
        }
    }
    order
}

/// The part of `order` that an event on `target` reaches: the target and
/// every collection containing it, directly or through nested collections.
pub(crate) fn focused(order: &[Node], target: Node, ancestors: &HashSet<CollectionId>) -> Vec<Node> {
    order
        .iter()
        .copied()
        .filter(|node| match node {
            Node::Shape(_) => *node == target,
            Node::Collection(id) => ancestors.contains(id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeId;
    use understory_pixel_hit::{DrawState, IdentityColor, Operation};

    fn shape(scene: &mut Scene, n: u8) -> ShapeId {
        scene.create_shape(IdentityColor::new(0, 0, n), Operation::Fill, DrawState::default())
    }

    #[test]
    fn parents_precede_children_in_a_dag() {
        let mut scene = Scene::new();
        let s = shape(&mut scene, 0);
        scene.nest("A", "B").unwrap();
        scene.add_to_collection("B", s);
        scene.add_to_collection("A", s);
        let a = scene.collection_id("A").unwrap();
        let b = scene.collection_id("B").unwrap();

        let order = topological_order(&scene);
        assert_eq!(
            order,
            [
                Node::Collection(CollectionId::ROOT),
                Node::Collection(a),
                Node::Collection(b),
                Node::Shape(s),
            ]
        );
    }

    #[test]
    fn collections_before_shapes_at_each_level() {
        let mut scene = Scene::new();
        let s0 = shape(&mut scene, 0);
        let s1 = shape(&mut scene, 1);
        scene.add_to_collection("g", s1);
        let g = scene.collection_id("g").unwrap();
        let order = topological_order(&scene);
        // s1 waits for g; s0 only waits for the root.
        assert_eq!(
            order,
            [
                Node::Collection(CollectionId::ROOT),
                Node::Collection(g),
                Node::Shape(s0),
                Node::Shape(s1),
            ]
        );
    }

    #[test]
    fn focus_keeps_only_target_and_its_ancestors() {
        let mut scene = Scene::new();
        let s0 = shape(&mut scene, 0);
        let s1 = shape(&mut scene, 1);
        scene.add_to_collection("mine", s0);
        scene.add_to_collection("other", s1);
        let mine = scene.collection_id("mine").unwrap();
        let order = topological_order(&scene);
        let ancestors = scene.ancestors(s0);
        assert_eq!(
            focused(&order, Node::Shape(s0), &ancestors),
            [
                Node::Collection(CollectionId::ROOT),
                Node::Collection(mine),
                Node::Shape(s0),
            ]
        );
    }
}
