// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-identity hit testing for immediate-mode 2D drawing.
//!
//! An immediate-mode surface forgets what was drawn as soon as the pixels land.
//! This crate keeps enough to answer "which shape is under this point?" by
//! painting every shape a second time, on a hidden [`ShadowSurface`], in a colour
//! that identifies it. Sampling the shadow at a point returns that colour, and a
//! lookup turns it back into the shape.
//!
//! The pieces:
//!
//! - [`IdentityAllocator`] mints unique opaque [`IdentityColor`]s.
//! - [`RenderingContext2d`] is the host drawing interface, split into path
//!   construction ([`PathOp`]) and draw-completing calls ([`DrawOp`]), with the
//!   writable state in [`DrawState`].
//! - [`PixmapSurface`] implements that interface in software on `tiny-skia`.
//! - [`ShadowSurface`] mirrors calls onto a [`ShadowBackend`] with the identity
//!   override applied, and samples pixels back.
//!
//! Shape bookkeeping and event dispatch live in `understory_canvas`.
//!
//! ```
//! use understory_pixel_hit::{
//!     DrawOp, DrawState, IdentityAllocator, PathOp, ShadowSurface, rect_xywh,
//! };
//!
//! let mut ids = IdentityAllocator::default();
//! let mut shadow: ShadowSurface = ShadowSurface::new(200, 200).unwrap();
//! let state = DrawState::default();
//!
//! let square = ids.allocate().unwrap();
//! shadow.mirror_draw(&DrawOp::FillRect(rect_xywh(0.0, 0.0, 100.0, 100.0)), &state, square);
//!
//! let panel = ids.allocate().unwrap();
//! shadow.mirror_path(&PathOp::BeginPath);
//! shadow.mirror_path(&PathOp::Rect(rect_xywh(120.0, 120.0, 40.0, 40.0)));
//! shadow.mirror_draw(&DrawOp::Fill, &state, panel);
//!
//! assert_eq!(shadow.sample_color(50, 50), Some(square));
//! assert_eq!(shadow.sample_color(130, 130), Some(panel));
//! assert_eq!(shadow.sample_color(110, 110), None);
//! ```
//!
//! ## Features
//!
//! - `std` (default): standard-library float math in `kurbo` and `tiny-skia`.
//! - `libm`: float math for `no_std` targets.

#![no_std]

extern crate alloc;

mod context;
mod error;
mod identity;
mod image;
mod pixmap;
mod shadow;
mod state;

pub use context::{DrawOp, Hooks, Operation, PathOp, RenderingContext2d, rect_xywh};
pub use error::Error;
pub use identity::{
    IdentityAllocator, IdentityColor, IdentityStrategy, RANDOM_CAPACITY, SEQUENTIAL_CAPACITY,
};
pub use image::ImageData;
pub use pixmap::PixmapSurface;
pub use shadow::{ShadowBackend, ShadowSurface};
pub use state::{
    Color, DrawState, LineCap, LineJoin, StateKey, StateValue, TextAlign, TextBaseline,
};
