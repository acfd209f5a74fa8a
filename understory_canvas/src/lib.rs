// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Canvas: object identity and pointer events for immediate-mode 2D drawing.
//!
//! ## Overview
//!
//! An immediate-mode 2D surface keeps pixels, not objects. This crate wraps a
//! host surface so that every draw call becomes an addressable [`Shape`], groups
//! shapes into named [`Collection`]s, and routes pointer events to the shape
//! under the pointer and to every collection containing it.
//!
//! Hit testing is exact to the pixel. Each shape is drawn a second time on a
//! hidden [`ShadowSurface`](understory_pixel_hit::ShadowSurface) in a unique
//! opaque colour; a pointer event samples that surface and maps the colour
//! back to the shape. See `understory_pixel_hit` for that layer.
//!
//! ## Workflow
//!
//! 1) Focus a [`HostCanvas`] with [`focus`] or [`focus_with`]. This yields a
//!    [`Context`] that forwards every call to the host's real context.
//! 2) Draw through the context. Draw-completing calls such as
//!    [`Context::fill_rect`] return the [`ShapeId`] they created.
//! 3) Group shapes: everything drawn between [`Context::start_collect`] and
//!    [`Context::stop_collect`] joins the named collections. Collections can be
//!    nested with [`Context::nest`].
//! 4) Listen: [`Context::shape`] and [`Context::collection`] return handles that
//!    implement [`Listen`]. The first listener for an event kind subscribes the
//!    host to that kind.
//! 5) Forward native events to [`Context::handle_pointer_event`].
//!
//! ## Dispatch order
//!
//! Nodes reached by an event are ordered from the root outward: every
//! collection comes before the collections and shapes it contains. Capture
//! listeners run over that order, then bubble listeners run over it in
//! reverse. [`CanvasEvent::stop_propagation`] skips every later node.
//! The sequence itself is built by [`dispatcher::sequence`].
//!
//! ## Restyling
//!
//! Each shape keeps a copy of the drawing state it was drawn with. Edit it
//! through a handle and call `render_context_state` to repaint exactly the
//! shape's pixels with the new style.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use kurbo::Point;
//! use understory_canvas::{Listen, OffscreenCanvas, PointerEventKind, PointerInput, focus};
//! use understory_pixel_hit::{Color, StateValue};
//!
//! let mut ctx = focus(OffscreenCanvas::new(320, 240)).unwrap();
//!
//! ctx.start_collect("buttons");
//! ctx.fill_rect(10.0, 10.0, 80.0, 30.0).unwrap();
//! ctx.fill_rect(10.0, 50.0, 80.0, 30.0).unwrap();
//! ctx.stop_collect("buttons");
//! ctx.fill_rect(200.0, 10.0, 80.0, 30.0).unwrap();
//!
//! let clicked = Rc::new(Cell::new(false));
//! let flag = clicked.clone();
//! ctx.collection("buttons")
//!     .on(PointerEventKind::Click, move |_| flag.set(true), false);
//!
//! let summary = ctx.handle_pointer_event(PointerInput::new(
//!     PointerEventKind::Click,
//!     Point::new(20.0, 60.0),
//! ));
//! assert!(clicked.get());
//! assert_eq!(summary.listeners_fired, 1);
//!
//! if clicked.get() {
//!     ctx.collection("buttons")
//!         .set_context_state(StateValue::FillStyle(Color::GREEN))
//!         .render_context_state();
//! }
//! assert_eq!(ctx.rendering_context().pixel(20, 60), Some(Color::GREEN));
//! assert_eq!(ctx.rendering_context().pixel(210, 20), Some(Color::BLACK));
//! ```
//!
//! ## Features
//!
//! - `std` (default): standard-library float math in `kurbo` and `tiny-skia`.
//! - `libm`: float math for `no_std` targets.

#![no_std]

extern crate alloc;

pub mod dispatcher;

mod collection;
mod context;
mod emitter;
mod error;
mod event;
mod offscreen;
mod scene;
mod shape;
mod traverse;

pub use collection::{Collection, CollectionId, Node, OrderedSet};
pub use context::{
    CollectionHandle, Context, DispatchSummary, FocusOptions, HostCanvas, ShapeHandle, focus,
    focus_with,
};
pub use emitter::{EventEmitter, Listen, Listener};
pub use error::Error;
pub use event::{CanvasEvent, Phase, PointerEventKind, PointerInput, UnknownEventKind};
pub use offscreen::OffscreenCanvas;
pub use scene::{IntoNames, Scene};
pub use shape::{Shape, ShapeId};
