// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software 2D context on a [`tiny_skia::Pixmap`].
//!
//! [`PixmapSurface`] implements [`RenderingContext2d`] entirely in memory. It is
//! the default shadow backend and doubles as a headless visible surface.
//!
//! The current path is kept as a [`kurbo::BezPath`] and converted when a fill,
//! stroke, or clip needs it. Fills use the nonzero rule.
//!
//! ## Limitations
//!
//! - Text is approximated by its em box: each character advances `0.6 × font size`
//!   and the box is one font size tall, anchored by `textAlign` / `textBaseline`.
//! - Transforms are not modelled; coordinates are device pixels.

use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, PathEl, Point, Rect, Vec2};
use tiny_skia::{
    BlendMode, ColorU8, FillRule, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use crate::context::{DrawOp, PathOp, RenderingContext2d};
use crate::image::ImageData;
use crate::shadow::ShadowBackend;
use crate::state::{Color, DrawState, LineCap, LineJoin, TextAlign, TextBaseline};

/// Flattening tolerance for arcs, in pixels.
const ARC_TOLERANCE: f64 = 0.1;

/// Horizontal advance per character, as a fraction of the font size.
const CHAR_ADVANCE: f64 = 0.6;

/// An in-memory 2D context.
pub struct PixmapSurface {
    pixmap: Pixmap,
    state: DrawState,
    path: BezPath,
    /// Start of the current subpath.
    subpath_start: Option<Point>,
    /// Last point of the current path.
    current: Option<Point>,
    clip: Option<Mask>,
    saved: Vec<(DrawState, Option<Mask>)>,
    anti_alias: bool,
}

impl fmt::Debug for PixmapSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixmapSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("state", &self.state)
            .field("path_elements", &self.path.elements().len())
            .field("clipped", &self.clip.is_some())
            .field("saved", &self.saved.len())
            .field("anti_alias", &self.anti_alias)
            .finish_non_exhaustive()
    }
}

impl PixmapSurface {
    /// Create a transparent surface; `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            state: DrawState::default(),
            path: BezPath::new(),
            subpath_start: None,
            current: None,
            clip: None,
            saved: Vec::new(),
            anti_alias: true,
        })
    }

    /// Enable or disable edge anti-aliasing.
    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight colour of the pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(px.red(), px.green(), px.blue(), px.alpha()))
    }

    /// The backing pixmap.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Fill the whole surface with `color`, ignoring state and clip.
    pub fn clear(&mut self, color: Color) {
        self.pixmap
            .fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    fn paint(&self, color: Color) -> Paint<'static> {
        let mut c = tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a);
        c.apply_opacity(self.state.global_alpha);
        let mut paint = Paint::default();
        paint.set_color(c);
        paint.anti_alias = self.anti_alias;
        paint
    }

    fn stroke_style(&self) -> Stroke {
        Stroke {
            width: f32_of(self.state.line_width),
            miter_limit: f32_of(self.state.miter_limit),
            line_cap: match self.state.line_cap {
                LineCap::Butt => tiny_skia::LineCap::Butt,
                LineCap::Round => tiny_skia::LineCap::Round,
                LineCap::Square => tiny_skia::LineCap::Square,
            },
            line_join: match self.state.line_join {
                LineJoin::Miter => tiny_skia::LineJoin::Miter,
                LineJoin::Round => tiny_skia::LineJoin::Round,
                LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
            },
            ..Stroke::default()
        }
    }

    /// Em-box approximation of a text run.
    fn text_box(&self, text: &str, at: Point, max_width: Option<f64>) -> Rect {
        let size = self.state.font_px();
        let mut width = text.chars().count() as f64 * size * CHAR_ADVANCE;
        if let Some(max) = max_width {
            width = width.min(max.max(0.0));
        }
        let x0 = match self.state.text_align {
            TextAlign::Start | TextAlign::Left => at.x,
            TextAlign::End | TextAlign::Right => at.x - width,
            TextAlign::Center => at.x - width / 2.0,
        };
        let top = match self.state.text_baseline {
            TextBaseline::Top | TextBaseline::Hanging => at.y,
            TextBaseline::Middle => at.y - size / 2.0,
            TextBaseline::Bottom | TextBaseline::Ideographic => at.y - size,
            TextBaseline::Alphabetic => at.y - size * 0.8,
        };
        Rect::new(x0, top, x0 + width, top + size)
    }

    fn ensure_subpath(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_path_to(p);
        }
    }

    fn move_path_to(&mut self, p: Point) {
        self.path.move_to(p);
        self.subpath_start = Some(p);
        self.current = Some(p);
    }

    fn line_path_to(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_path_to(p);
        } else {
            self.path.line_to(p);
            self.current = Some(p);
        }
    }

    fn arc(&mut self, center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        if radius < 0.0 {
            return;
        }
        let tau = core::f64::consts::TAU;
        let sweep = if anticlockwise {
            let d = start - end;
            if d >= tau { -tau } else { -positive_mod(d, tau) }
        } else {
            let d = end - start;
            if d >= tau { tau } else { positive_mod(d, tau) }
        };
        let from = center + Vec2::from_angle(start) * radius;
        self.line_path_to(from);
        let arc = kurbo::Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle: start,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        self.path.extend(arc.append_iter(ARC_TOLERANCE));
        self.current = Some(center + Vec2::from_angle(start + sweep) * radius);
    }

    fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) {
        if radius < 0.0 {
            return;
        }
        let Some(p0) = self.current else {
            self.move_path_to(p1);
            return;
        };
        let v1 = p0 - p1;
        let v2 = p2 - p1;
        if p0 == p1 || p1 == p2 || radius == 0.0 || v1.cross(v2).abs() < 1e-9 {
            self.line_path_to(p1);
            return;
        }
        let (u1, u2) = (v1.normalize(), v2.normalize());
        let cos = u1.dot(u2).clamp(-1.0, 1.0);
        // Half-angle identities for the corner angle between the two tangents.
        let tan_half = ((1.0 - cos) / (1.0 + cos)).sqrt();
        let sin_half = ((1.0 - cos) / 2.0).sqrt();
        let along = radius / tan_half;
        let t1 = p1 + u1 * along;
        let t2 = p1 + u2 * along;
        let center = p1 + (u1 + u2).normalize() * (radius / sin_half);
        let a1 = (t1 - center).atan2();
        let a2 = (t2 - center).atan2();
        let mut sweep = a2 - a1;
        let pi = core::f64::consts::PI;
        if sweep > pi {
            sweep -= 2.0 * pi;
        } else if sweep < -pi {
            sweep += 2.0 * pi;
        }
        self.line_path_to(t1);
        let arc = kurbo::Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle: a1,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        self.path.extend(arc.append_iter(ARC_TOLERANCE));
        self.current = Some(t2);
    }

    fn clip_to_path(&mut self) {
        let Some(path) = skia_path(&self.path) else {
            return;
        };
        match &mut self.clip {
            Some(mask) => {
                mask.intersect_path(&path, FillRule::Winding, self.anti_alias, Transform::identity());
            }
            None => {
                if let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) {
                    mask.fill_path(&path, FillRule::Winding, self.anti_alias, Transform::identity());
                    self.clip = Some(mask);
                }
            }
        }
    }

    fn fill_rect_with(&mut self, rect: Rect, paint: &Paint<'_>) {
        if let Some(r) = skia_rect(rect) {
            self.pixmap
                .fill_rect(r, paint, Transform::identity(), self.clip.as_ref());
        }
    }

    fn stroke_rect_with(&mut self, rect: Rect, paint: &Paint<'_>) {
        if let Some(path) = skia_rect(rect).map(PathBuilder::from_rect) {
            let stroke = self.stroke_style();
            self.pixmap
                .stroke_path(&path, paint, &stroke, Transform::identity(), self.clip.as_ref());
        }
    }

    fn draw_image(&mut self, image: &ImageData, at: Point) {
        let Some(src) = premultiplied_pixmap(image) else {
            return;
        };
        let paint = PixmapPaint {
            opacity: self.state.global_alpha,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            i32_of(at.x),
            i32_of(at.y),
            src.as_ref(),
            &paint,
            Transform::identity(),
            self.clip.as_ref(),
        );
    }

    fn put_image(&mut self, image: &ImageData, at: Point) {
        let (dx, dy) = (i64::from(i32_of(at.x)), i64::from(i32_of(at.y)));
        let (w, h) = (i64::from(self.pixmap.width()), i64::from(self.pixmap.height()));
        let stride = self.pixmap.width() as usize;
        let pixels = self.pixmap.pixels_mut();
        for iy in 0..image.height() {
            let y = dy + i64::from(iy);
            if !(0..h).contains(&y) {
                continue;
            }
            for ix in 0..image.width() {
                let x = dx + i64::from(ix);
                if !(0..w).contains(&x) {
                    continue;
                }
                if let Some(c) = image.pixel(ix, iy) {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "x and y were bounds-checked against the u32 pixmap size."
                    )]
                    let idx = y as usize * stride + x as usize;
                    pixels[idx] = ColorU8::from_rgba(c.r, c.g, c.b, c.a).premultiply();
                }
            }
        }
    }
}

impl RenderingContext2d for PixmapSurface {
    fn state(&self) -> &DrawState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DrawState {
        &mut self.state
    }

    fn apply_path(&mut self, op: &PathOp) {
        match *op {
            PathOp::BeginPath => {
                self.path = BezPath::new();
                self.subpath_start = None;
                self.current = None;
            }
            PathOp::ClosePath => {
                if self.current.is_some() {
                    self.path.close_path();
                    self.current = self.subpath_start;
                }
            }
            PathOp::Clip => self.clip_to_path(),
            PathOp::MoveTo(p) => self.move_path_to(p),
            PathOp::LineTo(p) => self.line_path_to(p),
            PathOp::QuadraticCurveTo { ctrl, to } => {
                self.ensure_subpath(ctrl);
                self.path.quad_to(ctrl, to);
                self.current = Some(to);
            }
            PathOp::BezierCurveTo { ctrl1, ctrl2, to } => {
                self.ensure_subpath(ctrl1);
                self.path.curve_to(ctrl1, ctrl2, to);
                self.current = Some(to);
            }
            PathOp::ArcTo { p1, p2, radius } => self.arc_to(p1, p2, radius),
            PathOp::Rect(r) => {
                self.move_path_to(Point::new(r.x0, r.y0));
                self.path.line_to((r.x1, r.y0));
                self.path.line_to((r.x1, r.y1));
                self.path.line_to((r.x0, r.y1));
                self.path.close_path();
            }
            PathOp::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => self.arc(center, radius, start_angle, end_angle, anticlockwise),
        }
    }

    fn apply_draw(&mut self, op: &DrawOp<'_>) {
        match *op {
            DrawOp::Fill => {
                if let Some(path) = skia_path(&self.path) {
                    let paint = self.paint(self.state.fill_style);
                    self.pixmap.fill_path(
                        &path,
                        &paint,
                        FillRule::Winding,
                        Transform::identity(),
                        self.clip.as_ref(),
                    );
                }
            }
            DrawOp::Stroke => {
                if let Some(path) = skia_path(&self.path) {
                    let paint = self.paint(self.state.stroke_style);
                    let stroke = self.stroke_style();
                    self.pixmap.stroke_path(
                        &path,
                        &paint,
                        &stroke,
                        Transform::identity(),
                        self.clip.as_ref(),
                    );
                }
            }
            DrawOp::FillRect(rect) => {
                let paint = self.paint(self.state.fill_style);
                self.fill_rect_with(rect, &paint);
            }
            DrawOp::StrokeRect(rect) => {
                let paint = self.paint(self.state.stroke_style);
                self.stroke_rect_with(rect, &paint);
            }
            DrawOp::FillText { text, at, max_width } => {
                let rect = self.text_box(text, at, max_width);
                let paint = self.paint(self.state.fill_style);
                self.fill_rect_with(rect, &paint);
            }
            DrawOp::StrokeText { text, at, max_width } => {
                let rect = self.text_box(text, at, max_width);
                let paint = self.paint(self.state.stroke_style);
                self.stroke_rect_with(rect, &paint);
            }
            DrawOp::ClearRect(rect) => {
                let mut paint = Paint::default();
                paint.blend_mode = BlendMode::Clear;
                paint.anti_alias = self.anti_alias;
                self.fill_rect_with(rect, &paint);
            }
            DrawOp::DrawImage { image, at } => self.draw_image(image, at),
            DrawOp::PutImageData { image, at } => self.put_image(image, at),
        }
    }

    fn save(&mut self) {
        self.saved.push((self.state.clone(), self.clip.clone()));
    }

    fn restore(&mut self) {
        if let Some((state, clip)) = self.saved.pop() {
            self.state = state;
            self.clip = clip;
        }
    }
}

impl ShadowBackend for PixmapSurface {
    fn with_size(width: u32, height: u32) -> Option<Self> {
        // Edge blending would mix identity colours, so the shadow is always aliased.
        Some(Self::new(width, height)?.with_anti_alias(false))
    }

    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        Self::pixel(self, x, y)
    }
}

/// `x mod m` in `[0, m)`.
fn positive_mod(x: f64, m: f64) -> f64 {
    x - m * (x / m).floor()
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; sub-pixel precision loss is acceptable."
)]
fn f32_of(v: f64) -> f32 {
    v as f32
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Saturating float-to-int conversion of a device coordinate."
)]
fn i32_of(v: f64) -> i32 {
    v.floor() as i32
}

fn skia_rect(r: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(f32_of(r.x0), f32_of(r.y0), f32_of(r.x1), f32_of(r.y1))
}

fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(f32_of(p.x), f32_of(p.y)),
            PathEl::LineTo(p) => pb.line_to(f32_of(p.x), f32_of(p.y)),
            PathEl::QuadTo(c, p) => pb.quad_to(f32_of(c.x), f32_of(c.y), f32_of(p.x), f32_of(p.y)),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                f32_of(c1.x),
                f32_of(c1.y),
                f32_of(c2.x),
                f32_of(c2.y),
                f32_of(p.x),
                f32_of(p.y),
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn premultiplied_pixmap(image: &ImageData) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap
        .pixels_mut()
        .iter_mut()
        .zip(image.data().chunks_exact(4))
    {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::rect_xywh;
    use crate::state::StateValue;

    fn surface() -> PixmapSurface {
        PixmapSurface::new(64, 64).unwrap().with_anti_alias(false)
    }

    #[test]
    fn zero_size_has_no_surface() {
        assert!(PixmapSurface::new(0, 10).is_none());
    }

    #[test]
    fn fill_rect_paints_inside_only() {
        let mut s = surface();
        s.state_mut().set(StateValue::FillStyle(Color::RED));
        s.fill_rect(10.0, 10.0, 20.0, 20.0);
        assert_eq!(s.pixel(15, 15), Some(Color::RED));
        assert_eq!(s.pixel(5, 5), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(30, 30), Some(Color::TRANSPARENT));
    }

    #[test]
    fn fill_uses_current_path() {
        let mut s = surface();
        s.begin_path();
        s.apply_path(&PathOp::Arc {
            center: Point::new(32.0, 32.0),
            radius: 10.0,
            start_angle: 0.0,
            end_angle: core::f64::consts::TAU,
            anticlockwise: false,
        });
        s.fill();
        assert_eq!(s.pixel(32, 32), Some(Color::BLACK));
        assert_eq!(s.pixel(33, 24), Some(Color::BLACK));
        // Corner of the bounding box lies outside the disc.
        assert_eq!(s.pixel(23, 23), Some(Color::TRANSPARENT));
    }

    #[test]
    fn clear_rect_makes_pixels_transparent() {
        let mut s = surface();
        s.fill_rect(0.0, 0.0, 64.0, 64.0);
        s.clear_rect(0.0, 0.0, 8.0, 8.0);
        assert_eq!(s.pixel(4, 4), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(10, 10), Some(Color::BLACK));
    }

    #[test]
    fn clip_limits_later_fills() {
        let mut s = surface();
        s.begin_path();
        s.apply_path(&PathOp::Rect(rect_xywh(0.0, 0.0, 16.0, 16.0)));
        s.apply_path(&PathOp::Clip);
        s.fill_rect(0.0, 0.0, 64.0, 64.0);
        assert_eq!(s.pixel(8, 8), Some(Color::BLACK));
        assert_eq!(s.pixel(32, 32), Some(Color::TRANSPARENT));
    }

    #[test]
    fn restore_drops_clip_and_state() {
        let mut s = surface();
        s.save();
        s.state_mut().set(StateValue::FillStyle(Color::RED));
        s.begin_path();
        s.rect(0.0, 0.0, 8.0, 8.0);
        s.apply_path(&PathOp::Clip);
        s.restore();
        s.restore();
        s.fill_rect(0.0, 0.0, 64.0, 64.0);
        assert_eq!(s.pixel(32, 32), Some(Color::BLACK));
    }

    #[test]
    fn stroke_width_controls_coverage() {
        let mut s = surface();
        s.state_mut().set(StateValue::LineWidth(6.0));
        s.begin_path();
        s.move_to(10.0, 32.0);
        s.line_to(54.0, 32.0);
        s.stroke();
        assert_eq!(s.pixel(30, 30), Some(Color::BLACK));
        assert_eq!(s.pixel(30, 37), Some(Color::TRANSPARENT));
    }

    #[test]
    fn arc_to_rounds_a_corner() {
        let mut s = surface();
        s.begin_path();
        s.move_to(10.0, 10.0);
        s.apply_path(&PathOp::ArcTo {
            p1: Point::new(50.0, 10.0),
            p2: Point::new(50.0, 50.0),
            radius: 20.0,
        });
        s.line_to(50.0, 50.0);
        s.line_to(10.0, 50.0);
        s.close_path();
        s.fill();
        // The sharp corner is cut away by the arc.
        assert_eq!(s.pixel(49, 11), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(30, 30), Some(Color::BLACK));
    }

    #[test]
    fn put_image_data_replaces_pixels() {
        let mut s = surface();
        s.fill_rect(0.0, 0.0, 64.0, 64.0);
        let image = ImageData::filled(4, 4, Color::TRANSPARENT);
        s.apply_draw(&DrawOp::PutImageData {
            image: &image,
            at: Point::new(2.0, 2.0),
        });
        assert_eq!(s.pixel(3, 3), Some(Color::TRANSPARENT));
        assert_eq!(s.pixel(7, 7), Some(Color::BLACK));
    }

    #[test]
    fn draw_image_composites_over() {
        let mut s = surface();
        let mut image = ImageData::new(4, 4);
        image.set_pixel(1, 1, Color::BLUE);
        s.apply_draw(&DrawOp::DrawImage {
            image: &image,
            at: Point::new(10.0, 10.0),
        });
        assert_eq!(s.pixel(11, 11), Some(Color::BLUE));
        assert_eq!(s.pixel(10, 10), Some(Color::TRANSPARENT));
    }

    #[test]
    fn text_is_drawn_as_em_box() {
        let mut s = surface();
        s.state_mut().set(StateValue::Font("10px sans-serif".into()));
        s.apply_draw(&DrawOp::FillText {
            text: "abcd",
            at: Point::new(10.0, 30.0),
            max_width: None,
        });
        // Four characters at 6px each, from y = 22 to 32.
        assert_eq!(s.pixel(20, 25), Some(Color::BLACK));
        assert_eq!(s.pixel(40, 25), Some(Color::TRANSPARENT));
    }
}
