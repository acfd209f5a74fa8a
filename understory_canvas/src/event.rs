// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer events and the payload handed to listeners.

use core::fmt;
use core::str::FromStr;

use kurbo::Point;

use crate::collection::Node;
use crate::shape::ShapeId;

/// Coordinate-bearing pointer events the engine can route.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerEventKind {
    /// `click`
    Click,
    /// `dblclick`
    DoubleClick,
    /// `pointerdown`
    PointerDown,
    /// `pointerup`
    PointerUp,
    /// `pointermove`
    PointerMove,
    /// `contextmenu`
    ContextMenu,
    /// `wheel`
    Wheel,
}

impl PointerEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Click,
        Self::DoubleClick,
        Self::PointerDown,
        Self::PointerUp,
        Self::PointerMove,
        Self::ContextMenu,
        Self::Wheel,
    ];

    /// Native event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::DoubleClick => "dblclick",
            Self::PointerDown => "pointerdown",
            Self::PointerUp => "pointerup",
            Self::PointerMove => "pointermove",
            Self::ContextMenu => "contextmenu",
            Self::Wheel => "wheel",
        }
    }
}

impl fmt::Display for PointerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a native event name is not a routable pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownEventKind;

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a coordinate-bearing pointer event")
    }
}

impl core::error::Error for UnknownEventKind {}

impl FromStr for PointerEventKind {
    type Err = UnknownEventKind;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or(UnknownEventKind)
    }
}

/// Propagation phase of a dispatch step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Outermost collection first, down to the shape.
    Capture,
    /// From the shape back out to the outermost collection.
    Bubble,
}

/// A native pointer event as delivered by the host.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerInput {
    /// Which event fired.
    pub kind: PointerEventKind,
    /// Position in client coordinates.
    pub client: Point,
}

impl PointerInput {
    /// Create an input from its kind and client position.
    pub const fn new(kind: PointerEventKind, client: Point) -> Self {
        Self { kind, client }
    }
}

/// Event payload passed to listeners during dispatch.
#[derive(Clone, Debug)]
pub struct CanvasEvent {
    kind: PointerEventKind,
    client: Point,
    local: Point,
    target: ShapeId,
    current: Node,
    phase: Phase,
    propagation_stopped: bool,
}

impl CanvasEvent {
    pub(crate) fn new(kind: PointerEventKind, client: Point, local: Point, target: ShapeId) -> Self {
        Self {
            kind,
            client,
            local,
            target,
            current: Node::Shape(target),
            phase: Phase::Capture,
            propagation_stopped: false,
        }
    }

    pub(crate) fn enter(&mut self, node: Node, phase: Phase) {
        self.current = node;
        self.phase = phase;
    }

    /// Which event fired.
    pub fn kind(&self) -> PointerEventKind {
        self.kind
    }

    /// Pointer position in client coordinates.
    pub fn client(&self) -> Point {
        self.client
    }

    /// Pointer position relative to the surface's top-left corner.
    pub fn local(&self) -> Point {
        self.local
    }

    /// The shape under the pointer.
    pub fn target(&self) -> ShapeId {
        self.target
    }

    /// The node whose listeners are running.
    pub fn current(&self) -> Node {
        self.current
    }

    /// Phase of the running listeners.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Skip every node after the current one. Listeners already registered on
    /// the current node still run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether [`CanvasEvent::stop_propagation`] was called.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_names_round_trip() {
        for kind in PointerEventKind::ALL {
            assert_eq!(kind.as_str().parse::<PointerEventKind>(), Ok(kind));
        }
        assert_eq!("keydown".parse::<PointerEventKind>(), Err(UnknownEventKind));
    }
}
