// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One logical drawn object.

use alloc::string::String;

use understory_pixel_hit::{Color, DrawState, IdentityColor, Operation};

use crate::collection::OrderedSet;
use crate::emitter::EventEmitter;

/// Identifier for a shape within one context. Shapes are numbered in draw order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) u32);

impl ShapeId {
    pub(crate) const fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Position of this shape in draw order, starting at 0.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// The result of one draw-completing call.
#[derive(Debug)]
pub struct Shape {
    id: ShapeId,
    identity: IdentityColor,
    operation: Operation,
    style: DrawState,
    collection_keys: OrderedSet<String>,
    pub(crate) emitter: EventEmitter,
}

impl Shape {
    pub(crate) fn new(
        id: ShapeId,
        identity: IdentityColor,
        operation: Operation,
        style: DrawState,
    ) -> Self {
        Self {
            id,
            identity,
            operation,
            style,
            collection_keys: OrderedSet::new(),
            emitter: EventEmitter::new(),
        }
    }

    /// This shape's identifier.
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Colour painting this shape on the shadow surface.
    pub fn identity(&self) -> IdentityColor {
        self.identity
    }

    /// The operation that produced this shape.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Drawing state captured when the shape was drawn, plus later edits.
    pub fn style(&self) -> &DrawState {
        &self.style
    }

    pub(crate) fn style_mut(&mut self) -> &mut DrawState {
        &mut self.style
    }

    /// Colour used when re-rendering: the stroke style for stroke operations,
    /// the fill style otherwise.
    pub fn paint_color(&self) -> Color {
        match self.operation {
            Operation::Stroke | Operation::StrokeRect | Operation::StrokeText => {
                self.style.stroke_style
            }
            _ => self.style.fill_style,
        }
    }

    /// Names of the collections this shape belongs to, oldest first.
    ///
    /// The root collection is implied and not listed.
    pub fn collection_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.collection_keys.iter().map(String::as_str)
    }

    pub(crate) fn register_membership(&mut self, name: &str) {
        self.collection_keys.insert(String::from(name));
    }

    /// The emitter holding this shape's listeners.
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }
}
