// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shapes, collections, and the containment graph between them.
//!
//! A [`Scene`] owns every shape and collection of one context. Shapes are
//! added to the root collection as they are created and to every collection
//! that is recording at that moment. Named collections come into existence
//! the first time they are referenced and are nested under the root.
//!
//! The containment graph may share members between collections but never
//! contains a cycle; [`Scene::nest`] refuses any edge that would close one.
//!
//! ```
//! use understory_canvas::Scene;
//! use understory_pixel_hit::{DrawState, IdentityColor, Operation};
//!
//! let mut scene = Scene::new();
//! scene.start_collect("g");
//! let a = scene.create_shape(IdentityColor::new(0, 0, 0), Operation::Fill, DrawState::default());
//! scene.create_shape(IdentityColor::new(0, 0, 1), Operation::Fill, DrawState::default());
//! scene.stop_collect("g");
//! scene.create_shape(IdentityColor::new(0, 0, 2), Operation::Fill, DrawState::default());
//!
//! assert_eq!(scene.query_all(Some("g")).unwrap().len(), 2);
//! assert_eq!(scene.query("g"), Some(a));
//! assert_eq!(scene.query_all(None).unwrap().shapes().count(), 3);
//! assert!(scene.query_all(Some("nope")).is_none());
//! ```

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Index;

use hashbrown::{HashMap, HashSet};
use understory_pixel_hit::{DrawState, IdentityColor, Operation};

use crate::collection::{Collection, CollectionId, Node, OrderedSet};
use crate::emitter::EventEmitter;
use crate::error::Error;
use crate::shape::{Shape, ShapeId};
use crate::traverse::{self, TraversalCache};

impl From<ShapeId> for Node {
    fn from(id: ShapeId) -> Self {
        Self::Shape(id)
    }
}

impl From<CollectionId> for Node {
    fn from(id: CollectionId) -> Self {
        Self::Collection(id)
    }
}

/// One or more collection names.
///
/// Lets recording calls accept `"g"`, `["a", "b"]`, or a `Vec` of names.
pub trait IntoNames {
    /// The names, in order.
    fn into_names(self) -> Vec<String>;
}

impl IntoNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl<const N: usize> IntoNames for [&str; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|name| (*name).to_string()).collect()
    }
}

impl IntoNames for &[&str] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|name| (*name).to_string()).collect()
    }
}

impl IntoNames for Vec<String> {
    fn into_names(self) -> Vec<String> {
        self
    }
}

/// Every shape and collection of one context.
#[derive(Debug)]
pub struct Scene {
    shapes: Vec<Shape>,
    by_identity: HashMap<IdentityColor, ShapeId>,
    collections: Vec<Collection>,
    by_name: HashMap<String, CollectionId>,
    active: OrderedSet<String>,
    traversal: TraversalCache,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene holding only the empty root collection.
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            by_identity: HashMap::new(),
            collections: vec![Collection::new(CollectionId::ROOT, None)],
            by_name: HashMap::new(),
            active: OrderedSet::new(),
            traversal: TraversalCache::default(),
        }
    }

    /// Register a freshly drawn shape.
    ///
    /// The shape joins the root and every recording collection.
    pub fn create_shape(
        &mut self,
        identity: IdentityColor,
        operation: Operation,
        style: DrawState,
    ) -> ShapeId {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Shape count is bounded by the identity space, which fits in u32."
        )]
        let id = ShapeId::new(self.shapes.len() as u32);
        self.shapes.push(Shape::new(id, identity, operation, style));
        self.by_identity.insert(identity, id);
        self.collections[CollectionId::ROOT.idx()].insert(Node::Shape(id));
        let recording: Vec<String> = self.active.iter().cloned().collect();
        for name in &recording {
            let collection = self.ensure_collection(name);
            self.add_shape_to(collection, id);
        }
        self.traversal.invalidate();
        tracing::trace!(shape = id.index(), %identity, op = operation.name(), "shape created");
        id
    }

    /// Number of shapes drawn so far.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Look up a shape.
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.idx())
    }

    pub(crate) fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id.idx())
    }

    /// Every shape, in draw order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.shapes.iter()
    }

    /// The shape painted with `identity`, if any.
    pub fn shape_by_identity(&self, identity: IdentityColor) -> Option<ShapeId> {
        self.by_identity.get(&identity).copied()
    }

    /// The root collection.
    pub fn root(&self) -> &Collection {
        &self.collections[CollectionId::ROOT.idx()]
    }

    /// Look up a collection.
    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(id.idx())
    }

    /// Every collection, root first, then in creation order.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> + '_ {
        self.collections.iter()
    }

    /// Identifier of the named collection, if it exists.
    pub fn collection_id(&self, name: &str) -> Option<CollectionId> {
        self.by_name.get(name).copied()
    }

    /// Identifier of the named collection, creating it under the root if needed.
    pub fn ensure_collection(&mut self, name: &str) -> CollectionId {
        if let Some(id) = self.collection_id(name) {
            return id;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Collection count stays far below u32::MAX."
        )]
        let id = CollectionId::new(self.collections.len() as u32);
        self.collections.push(Collection::new(id, Some(name.to_string())));
        self.by_name.insert(name.to_string(), id);
        self.link(CollectionId::ROOT, id);
        tracing::debug!(collection = name, "collection created");
        id
    }

    /// First shape, by insertion order, directly in the named collection.
    ///
    /// `None` for unknown names and for collections without shapes.
    pub fn query(&self, name: &str) -> Option<ShapeId> {
        self.query_all(Some(name))?.shapes().next()
    }

    /// The named collection, or the root for `None`.
    ///
    /// Unknown names yield `None`, the same as an absent result; use
    /// [`Scene::try_query_all`] to tell them apart.
    pub fn query_all(&self, name: Option<&str>) -> Option<&Collection> {
        match name {
            None => Some(self.root()),
            Some(name) => self.collection(self.collection_id(name)?),
        }
    }

    /// The named collection, or [`Error::UnknownCollection`].
    pub fn try_query_all(&self, name: &str) -> Result<&Collection, Error> {
        self.query_all(Some(name))
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))
    }

    /// Add a shape, or every shape reachable from a collection, to the named
    /// collection. Creates the collection if needed.
    ///
    /// Collections are flattened deeply: shapes held only by a nested
    /// sub-collection are added too. Adding a present shape does nothing.
    /// Returns how many shapes were newly added.
    pub fn add_to_collection(&mut self, name: &str, item: impl Into<Node>) -> usize {
        let shapes = match item.into() {
            Node::Shape(id) if self.shape(id).is_some() => vec![id],
            Node::Shape(_) => Vec::new(),
            Node::Collection(id) => self.reachable_shapes(id),
        };
        let target = self.ensure_collection(name);
        shapes
            .into_iter()
            .filter(|&shape| self.add_shape_to(target, shape))
            .count()
    }

    /// Nest collection `child` inside `parent`, creating either if needed.
    ///
    /// Nesting an already nested child does nothing. Fails with
    /// [`Error::CollectionCycle`] if `child` is `parent` or already contains it.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), Error> {
        let cycle = || Error::CollectionCycle {
            parent: parent.to_string(),
            child: child.to_string(),
        };
        if parent == child {
            return Err(cycle());
        }
        if let (Some(p), Some(c)) = (self.collection_id(parent), self.collection_id(child)) {
            if self.reaches(c, p) {
                return Err(cycle());
            }
        }
        let p = self.ensure_collection(parent);
        let c = self.ensure_collection(child);
        self.link(p, c);
        Ok(())
    }

    /// Start recording new shapes into each named collection.
    pub fn start_collect(&mut self, names: impl IntoNames) {
        for name in names.into_names() {
            self.ensure_collection(&name);
            tracing::debug!(collection = name.as_str(), "recording started");
            self.active.insert(name);
        }
    }

    /// Stop recording into each named collection; others keep recording.
    pub fn stop_collect(&mut self, names: impl IntoNames) {
        for name in names.into_names() {
            if self.active.remove(&name) {
                tracing::debug!(collection = name.as_str(), "recording stopped");
            }
        }
    }

    /// Stop recording into every collection.
    pub fn stop_collect_all(&mut self) {
        self.active.clear();
    }

    /// Whether new shapes are recorded into the named collection.
    pub fn is_collecting(&self, name: &str) -> bool {
        self.active.iter().any(|active| active == name)
    }

    /// Names currently recording, in the order recording started.
    pub fn active_collections(&self) -> impl Iterator<Item = &str> + '_ {
        self.active.iter().map(String::as_str)
    }

    /// Every shape reachable from `id`, each once, depth-first in member order.
    pub fn reachable_shapes(&self, id: CollectionId) -> Vec<ShapeId> {
        let mut shapes = Vec::new();
        let mut seen_shapes = HashSet::new();
        let mut seen_collections = HashSet::new();
        let mut stack = vec![id];
        // Push in reverse so members pop in insertion order.
        while let Some(current) = stack.pop() {
            if !seen_collections.insert(current) {
                continue;
            }
            let Some(collection) = self.collection(current) else {
                continue;
            };
            let mut nested = Vec::new();
            for node in collection.iter() {
                match node {
                    Node::Shape(shape) => {
                        if seen_shapes.insert(shape) {
                            shapes.push(shape);
                        }
                    }
                    Node::Collection(child) => nested.push(child),
                }
            }
            stack.extend(nested.into_iter().rev());
        }
        shapes
    }

    /// Every collection holding `shape`, directly or through nested collections.
    pub fn ancestors(&self, shape: ShapeId) -> HashSet<CollectionId> {
        let mut found = HashSet::new();
        let Some(shape) = self.shape(shape) else {
            return found;
        };
        let mut frontier: Vec<CollectionId> = core::iter::once(CollectionId::ROOT)
            .chain(shape.collection_keys().filter_map(|name| self.collection_id(name)))
            .collect();
        while let Some(id) = frontier.pop() {
            if !found.insert(id) {
                continue;
            }
            if let Some(collection) = self.collection(id) {
                frontier.extend(collection.parents.iter().copied());
            }
        }
        found
    }

    /// Cached traversal order over the whole graph, recomputed after changes.
    pub fn traversal_order(&mut self) -> &[Node] {
        if !self.traversal.is_valid() {
            let order = traverse::topological_order(self);
            tracing::trace!(nodes = order.len(), "traversal order rebuilt");
            self.traversal.store(order);
        }
        self.traversal.order()
    }

    /// Nodes reached by an event on `target`, in capture order.
    pub fn focused(&mut self, target: ShapeId) -> Vec<Node> {
        let ancestors = self.ancestors(target);
        let order = self.traversal_order();
        traverse::focused(order, Node::Shape(target), &ancestors)
    }

    pub(crate) fn emitter_mut(&mut self, node: Node) -> Option<&mut EventEmitter> {
        match node {
            Node::Shape(id) => self.shapes.get_mut(id.idx()).map(|s| &mut s.emitter),
            Node::Collection(id) => self.collections.get_mut(id.idx()).map(|c| &mut c.emitter),
        }
    }

    fn add_shape_to(&mut self, collection: CollectionId, shape: ShapeId) -> bool {
        let Some(target) = self.collections.get_mut(collection.idx()) else {
            return false;
        };
        if !target.insert(Node::Shape(shape)) {
            return false;
        }
        if let (Some(name), Some(s)) = (target.name(), self.shapes.get_mut(shape.idx())) {
            s.register_membership(name);
        }
        self.traversal.invalidate();
        true
    }

    fn link(&mut self, parent: CollectionId, child: CollectionId) {
        if self.collections[parent.idx()].insert(Node::Collection(child)) {
            self.collections[child.idx()].parents.insert(parent);
            self.traversal.invalidate();
        }
    }

    /// Whether `to` is `from` or reachable from it.
    fn reaches(&self, from: CollectionId, to: CollectionId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                if let Some(collection) = self.collection(id) {
                    stack.extend(collection.collections());
                }
            }
        }
        false
    }
}

/// Panics if `id` was not issued by this scene.
impl Index<ShapeId> for Scene {
    type Output = Shape;

    fn index(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.idx()]
    }
}

/// Panics if `id` was not issued by this scene.
impl Index<CollectionId> for Scene {
    type Output = Collection;

    fn index(&self, id: CollectionId) -> &Collection {
        &self.collections[id.idx()]
    }
}
