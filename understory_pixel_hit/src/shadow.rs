// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The hidden surface that maps pixels back to shapes.
//!
//! A [`ShadowSurface`] receives the same calls as the visible context, except
//! that every draw-completing call is painted in the shape's identity colour at
//! full opacity without anti-aliasing. Reading a pixel back therefore yields
//! exactly one identity, or nothing where no shape has painted.
//!
//! ```
//! use understory_pixel_hit::{
//!     DrawOp, DrawState, IdentityColor, ShadowSurface, rect_xywh,
//! };
//!
//! let mut shadow: ShadowSurface = ShadowSurface::new(100, 100).unwrap();
//! let id = IdentityColor::new(0, 0, 7);
//! shadow.mirror_draw(
//!     &DrawOp::FillRect(rect_xywh(10.0, 10.0, 20.0, 20.0)),
//!     &DrawState::default(),
//!     id,
//! );
//! assert_eq!(shadow.sample_color(15, 15), Some(id));
//! assert_eq!(shadow.sample_color(50, 50), None);
//! assert_eq!(shadow.sample_color(-1, 15), None);
//! ```

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::context::{DrawOp, PathOp, RenderingContext2d};
use crate::identity::IdentityColor;
use crate::pixmap::PixmapSurface;
use crate::state::{Color, DrawState};

/// A drawing context that can back a [`ShadowSurface`].
pub trait ShadowBackend: RenderingContext2d + Sized {
    /// Allocate a transparent surface; `None` if it cannot be created.
    ///
    /// Implementations must not blend edges, since a blended pixel would carry
    /// a colour that belongs to no shape.
    fn with_size(width: u32, height: u32) -> Option<Self>;

    /// `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    /// Straight colour at `(x, y)`, or `None` outside the surface.
    fn pixel(&self, x: u32, y: u32) -> Option<Color>;
}

/// Hidden mirror of a visible surface, painted in identity colours.
pub struct ShadowSurface<B = PixmapSurface> {
    backend: B,
}

impl<B: ShadowBackend> fmt::Debug for ShadowSurface<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.backend.size();
        f.debug_struct("ShadowSurface")
            .field("width", &width)
            .field("height", &height)
            .finish_non_exhaustive()
    }
}

impl<B: ShadowBackend> ShadowSurface<B> {
    /// Create a shadow of the given size.
    ///
    /// The size is fixed here; resizing the visible surface afterwards is not
    /// propagated.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            backend: B::with_size(width, height)?,
        })
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.backend.size()
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Copy every writable property of `state` onto the shadow.
    ///
    /// With an identity, fill and stroke colours become that identity and
    /// global alpha is forced to 1.
    pub fn copy_draw_state(&mut self, state: &DrawState, identity: Option<IdentityColor>) {
        let target = self.backend.state_mut();
        target.clone_from(state);
        if let Some(identity) = identity {
            let color = identity.to_color();
            target.fill_style = color;
            target.stroke_style = color;
            target.global_alpha = 1.0;
        }
    }

    /// Replay a path call unchanged.
    pub fn mirror_path(&mut self, op: &PathOp) {
        self.backend.apply_path(op);
    }

    /// Mirror `save()`, so a later `restore()` also drops shadow clipping.
    pub fn save(&mut self) {
        self.backend.save();
    }

    /// Mirror `restore()`.
    pub fn restore(&mut self) {
        self.backend.restore();
    }

    /// Replay a draw call in `identity`'s colour.
    ///
    /// The override lasts for this call only; afterwards the shadow carries
    /// `state` unmodified. Images are replaced by their identity-coloured
    /// silhouette.
    pub fn mirror_draw(&mut self, op: &DrawOp<'_>, state: &DrawState, identity: IdentityColor) {
        tracing::trace!(op = op.operation().name(), %identity, "mirror on shadow");
        self.copy_draw_state(state, Some(identity));
        let color = identity.to_color();
        match *op {
            DrawOp::DrawImage { image, at } => {
                let silhouette = image.silhouette(color);
                self.backend.apply_draw(&DrawOp::DrawImage {
                    image: &silhouette,
                    at,
                });
            }
            DrawOp::PutImageData { image, at } => {
                let silhouette = image.silhouette(color);
                self.backend.apply_draw(&DrawOp::PutImageData {
                    image: &silhouette,
                    at,
                });
            }
            _ => self.backend.apply_draw(op),
        }
        self.copy_draw_state(state, None);
    }

    /// Identity painted at `(x, y)`.
    ///
    /// `None` for transparent background and for positions outside the surface.
    pub fn sample_color(&self, x: i32, y: i32) -> Option<IdentityColor> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        IdentityColor::from_pixel(self.backend.pixel(x, y)?)
    }

    /// One-pixel-tall rectangles covering every pixel painted with `identity`.
    ///
    /// Runs are listed top to bottom, then left to right.
    pub fn runs_of(&self, identity: IdentityColor) -> Vec<Rect> {
        let (width, height) = self.backend.size();
        let target = identity.to_color();
        let mut runs = Vec::new();
        for y in 0..height {
            let mut start = None;
            for x in 0..=width {
                let hit = x < width && self.backend.pixel(x, y) == Some(target);
                match (hit, start) {
                    (true, None) => start = Some(x),
                    (false, Some(x0)) => {
                        runs.push(Rect::new(
                            f64::from(x0),
                            f64::from(y),
                            f64::from(x),
                            f64::from(y + 1),
                        ));
                        start = None;
                    }
                    _ => {}
                }
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::rect_xywh;
    use crate::image::ImageData;
    use crate::state::StateValue;
    use kurbo::Point;

    fn shadow() -> ShadowSurface {
        ShadowSurface::new(64, 64).unwrap()
    }

    #[test]
    fn override_ignores_translucency() {
        let mut s = shadow();
        let mut state = DrawState::default();
        state.set(StateValue::FillStyle(Color::rgba(255, 0, 0, 10)));
        state.set(StateValue::GlobalAlpha(0.2));
        let id = IdentityColor::new(3, 4, 5);
        s.mirror_draw(&DrawOp::FillRect(rect_xywh(0.0, 0.0, 8.0, 8.0)), &state, id);
        assert_eq!(s.sample_color(4, 4), Some(id));
        // The override does not outlive the call.
        assert_eq!(s.backend().state(), &state);
    }

    #[test]
    fn later_shapes_cover_earlier_ones() {
        let mut s = shadow();
        let state = DrawState::default();
        let a = IdentityColor::new(0, 0, 1);
        let b = IdentityColor::new(0, 0, 2);
        s.mirror_draw(&DrawOp::FillRect(rect_xywh(0.0, 0.0, 40.0, 40.0)), &state, a);
        s.mirror_draw(&DrawOp::FillRect(rect_xywh(20.0, 20.0, 40.0, 40.0)), &state, b);
        assert_eq!(s.sample_color(10, 10), Some(a));
        assert_eq!(s.sample_color(30, 30), Some(b));
    }

    #[test]
    fn path_then_fill_hits_inside_path() {
        let mut s = shadow();
        s.mirror_path(&PathOp::BeginPath);
        s.mirror_path(&PathOp::Rect(rect_xywh(10.0, 10.0, 10.0, 10.0)));
        let id = IdentityColor::new(9, 9, 9);
        s.mirror_draw(&DrawOp::Fill, &DrawState::default(), id);
        assert_eq!(s.sample_color(15, 15), Some(id));
        assert_eq!(s.sample_color(25, 25), None);
    }

    #[test]
    fn images_are_mirrored_as_silhouettes() {
        let mut s = shadow();
        let mut image = ImageData::new(4, 4);
        image.set_pixel(0, 0, Color::rgba(200, 10, 10, 30));
        let id = IdentityColor::new(1, 1, 1);
        s.mirror_draw(
            &DrawOp::DrawImage {
                image: &image,
                at: Point::new(5.0, 5.0),
            },
            &DrawState::default(),
            id,
        );
        assert_eq!(s.sample_color(5, 5), Some(id));
        assert_eq!(s.sample_color(6, 6), None);
    }

    #[test]
    fn out_of_bounds_is_no_match() {
        let s = shadow();
        assert_eq!(s.sample_color(64, 0), None);
        assert_eq!(s.sample_color(0, -3), None);
    }

    #[test]
    fn runs_cover_shape_pixels() {
        let mut s = shadow();
        let id = IdentityColor::new(0, 1, 0);
        s.mirror_draw(
            &DrawOp::FillRect(rect_xywh(2.0, 3.0, 4.0, 2.0)),
            &DrawState::default(),
            id,
        );
        let runs = s.runs_of(id);
        assert_eq!(
            runs,
            [Rect::new(2.0, 3.0, 6.0, 4.0), Rect::new(2.0, 4.0, 6.0, 5.0)]
        );
        assert!(s.runs_of(IdentityColor::new(7, 7, 7)).is_empty());
    }
}
