// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered, duplicate-free groupings of shapes and collections.

use alloc::string::String;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::emitter::EventEmitter;
use crate::shape::ShapeId;

/// Identifier for a collection within one context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub(crate) u32);

impl CollectionId {
    /// The root collection, which holds every shape.
    pub const ROOT: Self = Self(0);

    pub(crate) const fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A member of a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// A drawn shape.
    Shape(ShapeId),
    /// A nested collection.
    Collection(CollectionId),
}

/// Insertion-ordered set.
///
/// Iteration and indexing follow insertion order; membership is O(1).
/// Inserting a value already present does nothing.
///
/// ```
/// use understory_canvas::OrderedSet;
///
/// let mut set = OrderedSet::new();
/// assert!(set.insert("b"));
/// assert!(set.insert("a"));
/// assert!(!set.insert("b"));
/// assert_eq!(set.iter().copied().collect::<Vec<_>>(), ["b", "a"]);
/// assert_eq!(set.get(1), Some(&"a"));
/// ```
#[derive(Clone, Debug)]
pub struct OrderedSet<T> {
    items: Vec<T>,
    index: HashSet<T>,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::default(),
        }
    }
}

impl<T: Clone + Eq + Hash> OrderedSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` unless present; returns whether it was added.
    pub fn insert(&mut self, value: T) -> bool {
        if !self.index.insert(value.clone()) {
            return false;
        }
        self.items.push(value);
        true
    }

    /// Remove `value`, keeping the order of the rest; returns whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        if !self.index.remove(value) {
            return false;
        }
        self.items.retain(|item| item != value);
        true
    }

    /// Whether `value` is present.
    pub fn contains(&self, value: &T) -> bool {
        self.index.contains(value)
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl<T> OrderedSet<T> {
    /// Number of values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Value at insertion position `i`.
    pub fn get(&self, i: usize) -> Option<&T> {
        self.items.get(i)
    }

    /// Values in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Values in insertion order, as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A named group of shapes and nested collections.
///
/// The root collection has no name and holds every shape in creation order,
/// plus every named collection.
#[derive(Debug)]
pub struct Collection {
    id: CollectionId,
    name: Option<String>,
    members: OrderedSet<Node>,
    /// Collections that hold this one as a member.
    pub(crate) parents: OrderedSet<CollectionId>,
    pub(crate) emitter: EventEmitter,
}

impl Collection {
    pub(crate) fn new(id: CollectionId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            members: OrderedSet::new(),
            parents: OrderedSet::new(),
            emitter: EventEmitter::new(),
        }
    }

    /// This collection's identifier.
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Lookup name; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether this is the root collection.
    pub fn is_root(&self) -> bool {
        self.id == CollectionId::ROOT
    }

    /// Number of direct members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether there are no direct members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Direct member at insertion position `i`.
    pub fn get(&self, i: usize) -> Option<Node> {
        self.members.get(i).copied()
    }

    /// Direct members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Node> + '_ {
        self.members.iter().copied()
    }

    /// Direct shape members in insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.members.iter().filter_map(|node| match node {
            Node::Shape(id) => Some(*id),
            Node::Collection(_) => None,
        })
    }

    /// Direct collection members in insertion order.
    pub fn collections(&self) -> impl Iterator<Item = CollectionId> + '_ {
        self.members.iter().filter_map(|node| match node {
            Node::Collection(id) => Some(*id),
            Node::Shape(_) => None,
        })
    }

    /// Whether `node` is a direct member.
    pub fn contains(&self, node: Node) -> bool {
        self.members.contains(&node)
    }

    /// The emitter holding this collection's listeners.
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub(crate) fn insert(&mut self, node: Node) -> bool {
        self.members.insert(node)
    }
}
