// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node listener storage shared by shapes and collections.
//!
//! Both [`Shape`](crate::Shape) and [`Collection`](crate::Collection) own an
//! [`EventEmitter`]. Handles expose registration through the [`Listen`] trait.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::event::{CanvasEvent, Phase, PointerEventKind};

/// A registered callback.
pub type Listener = Box<dyn FnMut(&mut CanvasEvent)>;

/// Capture and bubble listener lists, keyed by event kind.
///
/// Listeners run in registration order. Registering the same logic twice
/// runs it twice; closures have no identity to deduplicate on.
#[derive(Default)]
pub struct EventEmitter {
    capture: HashMap<PointerEventKind, Vec<Listener>>,
    bubble: HashMap<PointerEventKind, Vec<Listener>>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |map: &HashMap<PointerEventKind, Vec<Listener>>| {
            map.values().map(Vec::len).sum::<usize>()
        };
        f.debug_struct("EventEmitter")
            .field("capture", &count(&self.capture))
            .field("bubble", &count(&self.bubble))
            .finish()
    }
}

impl EventEmitter {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, phase: Phase) -> &HashMap<PointerEventKind, Vec<Listener>> {
        match phase {
            Phase::Capture => &self.capture,
            Phase::Bubble => &self.bubble,
        }
    }

    /// Append a listener for `kind` in the capture or bubble phase.
    pub fn on(&mut self, kind: PointerEventKind, listener: Listener, use_capture: bool) {
        let map = if use_capture {
            &mut self.capture
        } else {
            &mut self.bubble
        };
        map.entry(kind).or_default().push(listener);
    }

    /// Run every listener registered for `kind` in `phase`; returns how many ran.
    pub fn fire(&mut self, kind: PointerEventKind, event: &mut CanvasEvent, phase: Phase) -> usize {
        let map = match phase {
            Phase::Capture => &mut self.capture,
            Phase::Bubble => &mut self.bubble,
        };
        let Some(listeners) = map.get_mut(&kind) else {
            return 0;
        };
        for listener in listeners.iter_mut() {
            listener(event);
        }
        listeners.len()
    }

    /// Number of listeners for `kind` in `phase`.
    pub fn listener_count(&self, kind: PointerEventKind, phase: Phase) -> usize {
        self.map(phase).get(&kind).map_or(0, Vec::len)
    }

    /// Whether any listener for `kind` exists in either phase.
    pub fn listens_to(&self, kind: PointerEventKind) -> bool {
        self.listener_count(kind, Phase::Capture) + self.listener_count(kind, Phase::Bubble) > 0
    }
}

/// Listener registration, shared by shape and collection handles.
pub trait Listen {
    /// Register `callback` for `kind`; `use_capture` selects the capture phase.
    ///
    /// Also subscribes the host to `kind`, once per kind.
    fn on<F>(&mut self, kind: PointerEventKind, callback: F, use_capture: bool) -> &mut Self
    where
        F: FnMut(&mut CanvasEvent) + 'static;
}
