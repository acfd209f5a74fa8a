// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A headless host backed by [`PixmapSurface`].

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use understory_pixel_hit::PixmapSurface;

use crate::context::HostCanvas;
use crate::event::PointerEventKind;

/// In-memory canvas with a configurable client origin.
///
/// It keeps a count of native pointer listeners per event kind so callers
/// can observe subscription and teardown. A zero-sized canvas has no 2D
/// context.
///
/// ```
/// use understory_canvas::{HostCanvas, OffscreenCanvas, PointerEventKind};
///
/// let mut canvas = OffscreenCanvas::new(10, 10);
/// canvas.add_pointer_listener(PointerEventKind::Click);
/// assert_eq!(canvas.listener_count(PointerEventKind::Click), 1);
/// assert!(canvas.context_2d().is_some());
/// assert!(OffscreenCanvas::new(0, 10).context_2d().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct OffscreenCanvas {
    width: u32,
    height: u32,
    origin: Point,
    listeners: HashMap<PointerEventKind, usize>,
}

impl OffscreenCanvas {
    /// Create a canvas whose top-left corner sits at the client origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin: Point::ORIGIN,
            listeners: HashMap::new(),
        }
    }

    /// Place the canvas's top-left corner at `origin` in client coordinates.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Native listeners currently registered for `kind`.
    pub fn listener_count(&self, kind: PointerEventKind) -> usize {
        self.listeners.get(&kind).copied().unwrap_or(0)
    }

    /// Native listeners currently registered, over every kind.
    pub fn total_listeners(&self) -> usize {
        self.listeners.values().sum()
    }
}

impl HostCanvas for OffscreenCanvas {
    type Context2d = PixmapSurface;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn context_2d(&mut self) -> Option<PixmapSurface> {
        PixmapSurface::new(self.width, self.height)
    }

    fn bounding_client_rect(&self) -> Rect {
        Rect::from_origin_size(
            self.origin,
            Size::new(f64::from(self.width), f64::from(self.height)),
        )
    }

    fn add_pointer_listener(&mut self, kind: PointerEventKind) {
        *self.listeners.entry(kind).or_insert(0) += 1;
    }

    fn remove_pointer_listener(&mut self, kind: PointerEventKind) {
        if let Some(count) = self.listeners.get_mut(&kind) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.listeners.remove(&kind);
            }
        }
    }
}
