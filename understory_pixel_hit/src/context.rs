// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host drawing interface.
//!
//! A host 2D context is consumed through [`RenderingContext2d`]: a mutable
//! [`DrawState`] plus two entry points, [`RenderingContext2d::apply_path`] for
//! path construction and [`RenderingContext2d::apply_draw`] for operations that
//! put pixels on the surface. Every operation is also named by [`Operation`] and
//! selectable through the [`Hooks`] bitflags.

use alloc::borrow::ToOwned;
use core::str::FromStr;

use kurbo::{Point, Rect};

use crate::error::Error;
use crate::image::ImageData;
use crate::state::DrawState;

/// Every interceptable operation of a 2D context, by host name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `fill`
    Fill,
    /// `fillRect`
    FillRect,
    /// `fillText`
    FillText,
    /// `stroke`
    Stroke,
    /// `strokeRect`
    StrokeRect,
    /// `strokeText`
    StrokeText,
    /// `clearRect`
    ClearRect,
    /// `drawImage`
    DrawImage,
    /// `putImageData`
    PutImageData,
    /// `beginPath`
    BeginPath,
    /// `closePath`
    ClosePath,
    /// `clip`
    Clip,
    /// `moveTo`
    MoveTo,
    /// `lineTo`
    LineTo,
    /// `quadraticCurveTo`
    QuadraticCurveTo,
    /// `bezierCurveTo`
    BezierCurveTo,
    /// `arcTo`
    ArcTo,
    /// `rect`
    Rect,
    /// `arc`
    Arc,
}

impl Operation {
    /// Operations that complete a draw and create a shape.
    pub const DRAW: [Self; 9] = [
        Self::Fill,
        Self::FillRect,
        Self::FillText,
        Self::Stroke,
        Self::StrokeRect,
        Self::StrokeText,
        Self::ClearRect,
        Self::DrawImage,
        Self::PutImageData,
    ];

    /// Operations that only edit the current path.
    pub const PATH: [Self; 10] = [
        Self::BeginPath,
        Self::ClosePath,
        Self::Clip,
        Self::MoveTo,
        Self::LineTo,
        Self::QuadraticCurveTo,
        Self::BezierCurveTo,
        Self::ArcTo,
        Self::Rect,
        Self::Arc,
    ];

    /// Host method name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::FillRect => "fillRect",
            Self::FillText => "fillText",
            Self::Stroke => "stroke",
            Self::StrokeRect => "strokeRect",
            Self::StrokeText => "strokeText",
            Self::ClearRect => "clearRect",
            Self::DrawImage => "drawImage",
            Self::PutImageData => "putImageData",
            Self::BeginPath => "beginPath",
            Self::ClosePath => "closePath",
            Self::Clip => "clip",
            Self::MoveTo => "moveTo",
            Self::LineTo => "lineTo",
            Self::QuadraticCurveTo => "quadraticCurveTo",
            Self::BezierCurveTo => "bezierCurveTo",
            Self::ArcTo => "arcTo",
            Self::Rect => "rect",
            Self::Arc => "arc",
        }
    }

    /// Whether this operation completes a draw.
    pub const fn is_draw(self) -> bool {
        matches!(
            self,
            Self::Fill
                | Self::FillRect
                | Self::FillText
                | Self::Stroke
                | Self::StrokeRect
                | Self::StrokeText
                | Self::ClearRect
                | Self::DrawImage
                | Self::PutImageData
        )
    }

    /// The hook flag selecting this operation.
    pub const fn hook(self) -> Hooks {
        match self {
            Self::Fill => Hooks::FILL,
            Self::FillRect => Hooks::FILL_RECT,
            Self::FillText => Hooks::FILL_TEXT,
            Self::Stroke => Hooks::STROKE,
            Self::StrokeRect => Hooks::STROKE_RECT,
            Self::StrokeText => Hooks::STROKE_TEXT,
            Self::ClearRect => Hooks::CLEAR_RECT,
            Self::DrawImage => Hooks::DRAW_IMAGE,
            Self::PutImageData => Hooks::PUT_IMAGE_DATA,
            Self::BeginPath => Hooks::BEGIN_PATH,
            Self::ClosePath => Hooks::CLOSE_PATH,
            Self::Clip => Hooks::CLIP,
            Self::MoveTo => Hooks::MOVE_TO,
            Self::LineTo => Hooks::LINE_TO,
            Self::QuadraticCurveTo => Hooks::QUADRATIC_CURVE_TO,
            Self::BezierCurveTo => Hooks::BEZIER_CURVE_TO,
            Self::ArcTo => Hooks::ARC_TO,
            Self::Rect => Hooks::RECT,
            Self::Arc => Hooks::ARC,
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Resolve a host method name. Anything else, including state properties such
    /// as `fillStyle`, is not a hook target.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::DRAW
            .into_iter()
            .chain(Self::PATH)
            .find(|op| op.name() == name)
            .ok_or_else(|| Error::InvalidHookTarget(name.to_owned()))
    }
}

bitflags::bitflags! {
    /// Set of operations an interception layer observes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Hooks: u32 {
        /// `fill`
        const FILL               = 1 << 0;
        /// `fillRect`
        const FILL_RECT          = 1 << 1;
        /// `fillText`
        const FILL_TEXT          = 1 << 2;
        /// `stroke`
        const STROKE             = 1 << 3;
        /// `strokeRect`
        const STROKE_RECT        = 1 << 4;
        /// `strokeText`
        const STROKE_TEXT        = 1 << 5;
        /// `clearRect`
        const CLEAR_RECT         = 1 << 6;
        /// `drawImage`
        const DRAW_IMAGE         = 1 << 7;
        /// `putImageData`
        const PUT_IMAGE_DATA     = 1 << 8;
        /// `beginPath`
        const BEGIN_PATH         = 1 << 9;
        /// `closePath`
        const CLOSE_PATH         = 1 << 10;
        /// `clip`
        const CLIP               = 1 << 11;
        /// `moveTo`
        const MOVE_TO            = 1 << 12;
        /// `lineTo`
        const LINE_TO            = 1 << 13;
        /// `quadraticCurveTo`
        const QUADRATIC_CURVE_TO = 1 << 14;
        /// `bezierCurveTo`
        const BEZIER_CURVE_TO    = 1 << 15;
        /// `arcTo`
        const ARC_TO             = 1 << 16;
        /// `rect`
        const RECT               = 1 << 17;
        /// `arc`
        const ARC                = 1 << 18;

        /// Every draw-completing operation.
        const DRAW = Self::FILL.bits()
            | Self::FILL_RECT.bits()
            | Self::FILL_TEXT.bits()
            | Self::STROKE.bits()
            | Self::STROKE_RECT.bits()
            | Self::STROKE_TEXT.bits()
            | Self::CLEAR_RECT.bits()
            | Self::DRAW_IMAGE.bits()
            | Self::PUT_IMAGE_DATA.bits();
        /// Every path-construction operation.
        const PATH = Self::BEGIN_PATH.bits()
            | Self::CLOSE_PATH.bits()
            | Self::CLIP.bits()
            | Self::MOVE_TO.bits()
            | Self::LINE_TO.bits()
            | Self::QUADRATIC_CURVE_TO.bits()
            | Self::BEZIER_CURVE_TO.bits()
            | Self::ARC_TO.bits()
            | Self::RECT.bits()
            | Self::ARC.bits();
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::DRAW | Self::PATH
    }
}

impl Hooks {
    /// Build a hook set from host method names.
    ///
    /// ```
    /// use understory_pixel_hit::{Error, Hooks};
    ///
    /// let hooks = Hooks::from_names(["fillRect", "rect"]).unwrap();
    /// assert_eq!(hooks, Hooks::FILL_RECT | Hooks::RECT);
    /// assert!(matches!(
    ///     Hooks::from_names(["fillStyle"]),
    ///     Err(Error::InvalidHookTarget(_))
    /// ));
    /// ```
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        names.into_iter().try_fold(Self::empty(), |hooks, name| {
            Ok(hooks | name.parse::<Operation>()?.hook())
        })
    }

    /// Whether `op` is selected.
    pub fn hooks(self, op: Operation) -> bool {
        self.contains(op.hook())
    }

    /// Selected operations, draw operations first.
    pub fn operations(self) -> impl Iterator<Item = Operation> {
        Operation::DRAW
            .into_iter()
            .chain(Operation::PATH)
            .filter(move |op| self.hooks(*op))
    }
}

/// Path-construction call with its arguments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathOp {
    /// Start a new, empty path.
    BeginPath,
    /// Close the current subpath.
    ClosePath,
    /// Intersect the clip region with the current path.
    Clip,
    /// Start a subpath at a point.
    MoveTo(Point),
    /// Straight segment to a point.
    LineTo(Point),
    /// Quadratic Bézier segment.
    QuadraticCurveTo {
        /// Control point.
        ctrl: Point,
        /// End point.
        to: Point,
    },
    /// Cubic Bézier segment.
    BezierCurveTo {
        /// First control point.
        ctrl1: Point,
        /// Second control point.
        ctrl2: Point,
        /// End point.
        to: Point,
    },
    /// Arc tangent to the lines (current → `p1`) and (`p1` → `p2`).
    ArcTo {
        /// Corner point.
        p1: Point,
        /// Point fixing the second tangent.
        p2: Point,
        /// Arc radius.
        radius: f64,
    },
    /// Closed rectangular subpath.
    Rect(Rect),
    /// Circular arc, connected to the current point by a straight line.
    Arc {
        /// Circle centre.
        center: Point,
        /// Circle radius.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians.
        end_angle: f64,
        /// Sweep direction.
        anticlockwise: bool,
    },
}

impl PathOp {
    /// The operation this call belongs to.
    pub const fn operation(&self) -> Operation {
        match self {
            Self::BeginPath => Operation::BeginPath,
            Self::ClosePath => Operation::ClosePath,
            Self::Clip => Operation::Clip,
            Self::MoveTo(_) => Operation::MoveTo,
            Self::LineTo(_) => Operation::LineTo,
            Self::QuadraticCurveTo { .. } => Operation::QuadraticCurveTo,
            Self::BezierCurveTo { .. } => Operation::BezierCurveTo,
            Self::ArcTo { .. } => Operation::ArcTo,
            Self::Rect(_) => Operation::Rect,
            Self::Arc { .. } => Operation::Arc,
        }
    }
}

/// Draw-completing call with its arguments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawOp<'a> {
    /// Fill the current path.
    Fill,
    /// Fill a rectangle.
    FillRect(Rect),
    /// Fill text at a point.
    FillText {
        /// The text.
        text: &'a str,
        /// Anchor point.
        at: Point,
        /// Optional maximum advance.
        max_width: Option<f64>,
    },
    /// Stroke the current path.
    Stroke,
    /// Stroke a rectangle.
    StrokeRect(Rect),
    /// Stroke text at a point.
    StrokeText {
        /// The text.
        text: &'a str,
        /// Anchor point.
        at: Point,
        /// Optional maximum advance.
        max_width: Option<f64>,
    },
    /// Clear a rectangle to transparent.
    ClearRect(Rect),
    /// Composite an image with its top-left corner at `at`.
    DrawImage {
        /// Source pixels.
        image: &'a ImageData,
        /// Destination of the top-left corner.
        at: Point,
    },
    /// Replace pixels with an image, ignoring state and clip.
    PutImageData {
        /// Source pixels.
        image: &'a ImageData,
        /// Destination of the top-left corner.
        at: Point,
    },
}

impl DrawOp<'_> {
    /// The operation this call belongs to.
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Fill => Operation::Fill,
            Self::FillRect(_) => Operation::FillRect,
            Self::FillText { .. } => Operation::FillText,
            Self::Stroke => Operation::Stroke,
            Self::StrokeRect(_) => Operation::StrokeRect,
            Self::StrokeText { .. } => Operation::StrokeText,
            Self::ClearRect(_) => Operation::ClearRect,
            Self::DrawImage { .. } => Operation::DrawImage,
            Self::PutImageData { .. } => Operation::PutImageData,
        }
    }
}

/// Rectangle from the host's `(x, y, width, height)` convention.
///
/// Negative sizes extend left/up, as they do on a 2D canvas.
pub fn rect_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect::new(x, y, x + width, y + height).abs()
}

/// A host 2D drawing context.
///
/// Implementors provide the state and the two entry points; the named
/// methods are provided in terms of them.
pub trait RenderingContext2d {
    /// Current drawing state.
    fn state(&self) -> &DrawState;

    /// Mutable drawing state; edits apply to subsequent calls.
    fn state_mut(&mut self) -> &mut DrawState;

    /// Whether the host implements `op`. Defaults to every operation.
    fn supports(&self, op: Operation) -> bool {
        let _ = op;
        true
    }

    /// Apply a path-construction call.
    fn apply_path(&mut self, op: &PathOp);

    /// Apply a draw-completing call.
    fn apply_draw(&mut self, op: &DrawOp<'_>);

    /// `save()`: push the drawing state and clip region.
    fn save(&mut self);

    /// `restore()`: pop the most recently saved state; ignored when nothing is saved.
    fn restore(&mut self);

    /// Replace the whole drawing state.
    fn set_state(&mut self, state: &DrawState) {
        self.state_mut().clone_from(state);
    }

    /// `beginPath()`
    fn begin_path(&mut self) {
        self.apply_path(&PathOp::BeginPath);
    }

    /// `closePath()`
    fn close_path(&mut self) {
        self.apply_path(&PathOp::ClosePath);
    }

    /// `moveTo(x, y)`
    fn move_to(&mut self, x: f64, y: f64) {
        self.apply_path(&PathOp::MoveTo(Point::new(x, y)));
    }

    /// `lineTo(x, y)`
    fn line_to(&mut self, x: f64, y: f64) {
        self.apply_path(&PathOp::LineTo(Point::new(x, y)));
    }

    /// `rect(x, y, w, h)`
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.apply_path(&PathOp::Rect(rect_xywh(x, y, width, height)));
    }

    /// `fill()`
    fn fill(&mut self) {
        self.apply_draw(&DrawOp::Fill);
    }

    /// `stroke()`
    fn stroke(&mut self) {
        self.apply_draw(&DrawOp::Stroke);
    }

    /// `fillRect(x, y, w, h)`
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.apply_draw(&DrawOp::FillRect(rect_xywh(x, y, width, height)));
    }

    /// `clearRect(x, y, w, h)`
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.apply_draw(&DrawOp::ClearRect(rect_xywh(x, y, width, height)));
    }
}
