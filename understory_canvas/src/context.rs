// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interception layer: a proxy around a host 2D context.
//!
//! [`focus`] wraps a [`HostCanvas`] in a [`Context`]. Every drawing call made
//! through the context is mirrored onto a [`ShadowSurface`] before it reaches
//! the real context:
//!
//! - Draw-completing calls mint an identity, create a [`Shape`](crate::Shape),
//!   and paint it on the shadow in that identity's colour.
//! - Path calls are replayed on the shadow unchanged.
//!
//! Pointer events delivered to [`Context::handle_pointer_event`] are resolved
//! to a shape by sampling the shadow and dispatched through the collections
//! that contain it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};
use smallvec::SmallVec;
use understory_pixel_hit::{
    Color, DrawOp, DrawState, Hooks, IdentityAllocator, IdentityColor, IdentityStrategy,
    ImageData, PathOp, PixmapSurface, RenderingContext2d, ShadowBackend, ShadowSurface, StateKey,
    StateValue, rect_xywh,
};

use crate::collection::{Collection, CollectionId, Node};
use crate::dispatcher::{self, Dispatch, Outcome};
use crate::emitter::Listen;
use crate::error::Error;
use crate::event::{CanvasEvent, PointerEventKind, PointerInput};
use crate::scene::{IntoNames, Scene};
use crate::shape::{Shape, ShapeId};

/// A drawing surface that can be focused.
///
/// The host owns native pointer subscriptions; once subscribed to a kind it
/// is expected to forward those events to [`Context::handle_pointer_event`].
pub trait HostCanvas {
    /// The host's 2D context.
    type Context2d: RenderingContext2d;

    /// Width in device pixels.
    fn width(&self) -> u32;

    /// Height in device pixels.
    fn height(&self) -> u32;

    /// A 2D context, or `None` if the surface cannot provide one.
    fn context_2d(&mut self) -> Option<Self::Context2d>;

    /// The surface's bounds in client coordinates.
    fn bounding_client_rect(&self) -> Rect;

    /// Start delivering native events of `kind`.
    fn add_pointer_listener(&mut self, kind: PointerEventKind);

    /// Stop delivering native events of `kind`.
    fn remove_pointer_listener(&mut self, kind: PointerEventKind);
}

/// Setup options for [`focus_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusOptions {
    /// Operations to intercept. Defaults to every draw and path operation.
    pub hooks: Hooks,
    /// How identity colours are minted.
    pub identity: IdentityStrategy,
}

impl FocusOptions {
    /// Replace the intercepted operations.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the identity strategy.
    pub fn with_identity(mut self, identity: IdentityStrategy) -> Self {
        self.identity = identity;
        self
    }
}

/// Attach hit testing and event dispatch to `host` with default options.
///
/// ```
/// use understory_canvas::{Listen, OffscreenCanvas, PointerEventKind, PointerInput, focus};
/// use kurbo::Point;
///
/// let mut ctx = focus(OffscreenCanvas::new(200, 200)).unwrap();
/// let square = ctx.fill_rect(20.0, 20.0, 100.0, 100.0).unwrap().unwrap();
/// ctx.shape(square).unwrap().on(PointerEventKind::Click, |_| {}, false);
///
/// let hit = ctx.handle_pointer_event(PointerInput::new(
///     PointerEventKind::Click,
///     Point::new(50.0, 50.0),
/// ));
/// assert_eq!(hit.target, Some(square));
/// assert_eq!(hit.listeners_fired, 1);
///
/// let miss = ctx.handle_pointer_event(PointerInput::new(
///     PointerEventKind::Click,
///     Point::new(150.0, 150.0),
/// ));
/// assert_eq!(miss.target, None);
/// ```
pub fn focus<H: HostCanvas>(host: H) -> Result<Context<H>, Error> {
    Context::new(host, FocusOptions::default())
}

/// Attach hit testing and event dispatch to `host`.
pub fn focus_with<H: HostCanvas>(host: H, options: FocusOptions) -> Result<Context<H>, Error> {
    Context::new(host, options)
}

/// What happened while dispatching one pointer event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Shape under the pointer; `None` over background or outside the surface.
    pub target: Option<ShapeId>,
    /// Identity sampled from the shadow surface.
    pub identity: Option<IdentityColor>,
    /// Dispatch steps visited, capture and bubble combined.
    pub steps: usize,
    /// Listeners invoked.
    pub listeners_fired: usize,
    /// The step where a listener stopped propagation.
    pub stopped_at: Option<Dispatch<Node>>,
}

/// A focused drawing surface.
///
/// Drawing methods carry the host operation names. Each draw-completing
/// method returns the created shape, `None` when that operation is not
/// intercepted or the context was destroyed, or an error when no identity
/// could be minted. In the error case neither surface is drawn on.
pub struct Context<H: HostCanvas, B: ShadowBackend = PixmapSurface> {
    host: H,
    ctx: H::Context2d,
    shadow: ShadowSurface<B>,
    ids: IdentityAllocator,
    scene: Scene,
    hooks: Hooks,
    subscribed: SmallVec<[PointerEventKind; 4]>,
    destroyed: bool,
}

impl<H: HostCanvas, B: ShadowBackend> fmt::Debug for Context<H, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("shadow", &self.shadow)
            .field("ids", &self.ids)
            .field("shapes", &self.scene.shape_count())
            .field("hooks", &self.hooks)
            .field("subscribed", &self.subscribed)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<H: HostCanvas, B: ShadowBackend> Context<H, B> {
    /// Focus `host`, with the shadow surface on backend `B`.
    ///
    /// Fails with [`Error::NoRenderingContext`] if the host yields no 2D
    /// context or the shadow cannot be allocated, and with an
    /// [`InvalidHookTarget`](understory_pixel_hit::Error::InvalidHookTarget)
    /// error if the host does not implement a hooked operation.
    pub fn new(mut host: H, options: FocusOptions) -> Result<Self, Error> {
        let Some(ctx) = host.context_2d() else {
            tracing::debug!("focus failed: host has no 2D context");
            return Err(Error::NoRenderingContext);
        };
        if let Some(op) = options.hooks.operations().find(|op| !ctx.supports(*op)) {
            return Err(understory_pixel_hit::Error::InvalidHookTarget(String::from(op.name())).into());
        }
        let (width, height) = (host.width(), host.height());
        let shadow = ShadowSurface::new(width, height).ok_or(Error::NoRenderingContext)?;
        tracing::debug!(width, height, hooks = ?options.hooks, "surface focused");
        Ok(Self {
            host,
            ctx,
            shadow,
            ids: IdentityAllocator::new(options.identity),
            scene: Scene::new(),
            hooks: options.hooks,
            subscribed: SmallVec::new(),
            destroyed: false,
        })
    }

    fn intercepts(&self, op: understory_pixel_hit::Operation) -> bool {
        !self.destroyed && self.hooks.hooks(op)
    }

    /// Apply a draw-completing call.
    ///
    /// In order: mint an identity, register the shape, paint it on the
    /// shadow, then draw on the real context.
    pub fn draw(&mut self, op: &DrawOp<'_>) -> Result<Option<ShapeId>, Error> {
        let operation = op.operation();
        if !self.intercepts(operation) {
            self.ctx.apply_draw(op);
            return Ok(None);
        }
        let identity = match self.ids.allocate() {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(op = operation.name(), %err, "draw dropped: no identity available");
                return Err(err.into());
            }
        };
        let style = self.ctx.state().clone();
        self.shadow.mirror_draw(op, &style, identity);
        let shape = self.scene.create_shape(identity, operation, style);
        self.ctx.apply_draw(op);
        Ok(Some(shape))
    }

    /// Apply a path call to the shadow, then to the real context.
    pub fn path(&mut self, op: &PathOp) {
        if self.intercepts(op.operation()) {
            self.shadow.mirror_path(op);
        }
        self.ctx.apply_path(op);
    }

    /// `fill()`
    pub fn fill(&mut self) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::Fill)
    }

    /// `fillRect(x, y, w, h)`
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::FillRect(rect_xywh(x, y, w, h)))
    }

    /// `fillText(text, x, y, maxWidth?)`
    pub fn fill_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        max_width: Option<f64>,
    ) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::FillText {
            text,
            at: Point::new(x, y),
            max_width,
        })
    }

    /// `stroke()`
    pub fn stroke(&mut self) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::Stroke)
    }

    /// `strokeRect(x, y, w, h)`
    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::StrokeRect(rect_xywh(x, y, w, h)))
    }

    /// `strokeText(text, x, y, maxWidth?)`
    pub fn stroke_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        max_width: Option<f64>,
    ) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::StrokeText {
            text,
            at: Point::new(x, y),
            max_width,
        })
    }

    /// `clearRect(x, y, w, h)`
    ///
    /// The cleared area is painted transparent on the shadow too, so the
    /// resulting shape has no pickable pixels.
    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::ClearRect(rect_xywh(x, y, w, h)))
    }

    /// `drawImage(image, x, y)`
    pub fn draw_image(&mut self, image: &ImageData, x: f64, y: f64) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::DrawImage {
            image,
            at: Point::new(x, y),
        })
    }

    /// `putImageData(image, x, y)`
    pub fn put_image_data(
        &mut self,
        image: &ImageData,
        x: f64,
        y: f64,
    ) -> Result<Option<ShapeId>, Error> {
        self.draw(&DrawOp::PutImageData {
            image,
            at: Point::new(x, y),
        })
    }

    /// `beginPath()`
    pub fn begin_path(&mut self) {
        self.path(&PathOp::BeginPath);
    }

    /// `closePath()`
    pub fn close_path(&mut self) {
        self.path(&PathOp::ClosePath);
    }

    /// `clip()`
    pub fn clip(&mut self) {
        self.path(&PathOp::Clip);
    }

    /// `moveTo(x, y)`
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.path(&PathOp::MoveTo(Point::new(x, y)));
    }

    /// `lineTo(x, y)`
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.path(&PathOp::LineTo(Point::new(x, y)));
    }

    /// `quadraticCurveTo(cpx, cpy, x, y)`
    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.path(&PathOp::QuadraticCurveTo {
            ctrl: Point::new(cpx, cpy),
            to: Point::new(x, y),
        });
    }

    /// `bezierCurveTo(cp1x, cp1y, cp2x, cp2y, x, y)`
    pub fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.path(&PathOp::BezierCurveTo {
            ctrl1: Point::new(cp1x, cp1y),
            ctrl2: Point::new(cp2x, cp2y),
            to: Point::new(x, y),
        });
    }

    /// `arcTo(x1, y1, x2, y2, radius)`
    pub fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.path(&PathOp::ArcTo {
            p1: Point::new(x1, y1),
            p2: Point::new(x2, y2),
            radius,
        });
    }

    /// `rect(x, y, w, h)`
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path(&PathOp::Rect(rect_xywh(x, y, w, h)));
    }

    /// `arc(x, y, radius, startAngle, endAngle, anticlockwise)`
    pub fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        self.path(&PathOp::Arc {
            center: Point::new(x, y),
            radius,
            start_angle: start,
            end_angle: end,
            anticlockwise,
        });
    }

    /// `save()`
    pub fn save(&mut self) {
        if !self.destroyed {
            self.shadow.save();
        }
        self.ctx.save();
    }

    /// `restore()`
    pub fn restore(&mut self) {
        if !self.destroyed {
            self.shadow.restore();
        }
        self.ctx.restore();
    }

    /// The real context's drawing state.
    pub fn state(&self) -> &DrawState {
        self.ctx.state()
    }

    /// Set one drawing-state property on the real context.
    pub fn set(&mut self, value: StateValue) {
        self.ctx.state_mut().set(value);
    }

    /// Replace the real context's drawing state.
    pub fn set_state(&mut self, state: &DrawState) {
        self.ctx.set_state(state);
    }

    /// `fillStyle = color`
    pub fn set_fill_style(&mut self, color: Color) {
        self.set(StateValue::FillStyle(color));
    }

    /// `strokeStyle = color`
    pub fn set_stroke_style(&mut self, color: Color) {
        self.set(StateValue::StrokeStyle(color));
    }

    /// `globalAlpha = alpha`
    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.set(StateValue::GlobalAlpha(alpha));
    }

    /// `lineWidth = width`
    pub fn set_line_width(&mut self, width: f64) {
        self.set(StateValue::LineWidth(width));
    }

    /// `font = font`
    pub fn set_font(&mut self, font: impl Into<String>) {
        self.set(StateValue::Font(font.into()));
    }

    /// First shape directly in the named collection.
    pub fn query(&self, name: &str) -> Option<ShapeId> {
        self.scene.query(name)
    }

    /// The named collection, or the root for `None`.
    pub fn query_all(&self, name: Option<&str>) -> Option<&Collection> {
        self.scene.query_all(name)
    }

    /// The named collection, or [`Error::UnknownCollection`].
    pub fn try_query_all(&self, name: &str) -> Result<&Collection, Error> {
        self.scene.try_query_all(name)
    }

    /// Record shapes drawn from now on into each named collection.
    pub fn start_collect(&mut self, names: impl IntoNames) {
        self.scene.start_collect(names);
    }

    /// Stop recording into each named collection.
    pub fn stop_collect(&mut self, names: impl IntoNames) {
        self.scene.stop_collect(names);
    }

    /// Stop recording into every collection.
    pub fn stop_collect_all(&mut self) {
        self.scene.stop_collect_all();
    }

    /// Add a shape, or every shape reachable from a collection, to `name`.
    /// Returns how many shapes were newly added.
    pub fn add_to_collection(&mut self, name: &str, item: impl Into<Node>) -> usize {
        self.scene.add_to_collection(name, item)
    }

    /// Nest collection `child` inside `parent`.
    pub fn nest(&mut self, parent: &str, child: &str) -> Result<(), Error> {
        self.scene.nest(parent, child)
    }

    /// All shapes and collections.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Handle to a shape.
    ///
    /// `None` if no shape with this index exists, or once the context has been
    /// destroyed.
    pub fn shape(&mut self, id: ShapeId) -> Option<ShapeHandle<'_, H, B>> {
        if self.destroyed {
            return None;
        }
        self.scene.shape(id)?;
        Some(ShapeHandle { context: self, id })
    }

    /// Handle to the named collection, creating it if needed.
    ///
    /// After [`Context::destroy`] the handle no longer repaints anything.
    pub fn collection(&mut self, name: &str) -> CollectionHandle<'_, H, B> {
        let id = self.scene.ensure_collection(name);
        CollectionHandle { context: self, id }
    }

    /// Handle to the root collection.
    pub fn root(&mut self) -> CollectionHandle<'_, H, B> {
        CollectionHandle {
            context: self,
            id: CollectionId::ROOT,
        }
    }

    /// The host surface.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The real 2D context.
    pub fn rendering_context(&self) -> &H::Context2d {
        &self.ctx
    }

    /// The shadow surface.
    pub fn shadow(&self) -> &ShadowSurface<B> {
        &self.shadow
    }

    /// Intercepted operations.
    pub fn hooks(&self) -> Hooks {
        self.hooks
    }

    /// Event kinds with a native listener, in subscription order.
    pub fn subscribed(&self) -> &[PointerEventKind] {
        &self.subscribed
    }

    /// Whether [`Context::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn subscribe(&mut self, kind: PointerEventKind) {
        if self.destroyed || self.subscribed.contains(&kind) {
            return;
        }
        self.host.add_pointer_listener(kind);
        self.subscribed.push(kind);
        tracing::debug!(event = kind.as_str(), "native listener added");
    }

    /// Identity painted at a client-space point.
    pub fn sample(&self, client: Point) -> Option<IdentityColor> {
        let local = self.to_local(client);
        if !local.is_finite() {
            return None;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Saturating conversion; far-away points are simply out of bounds."
        )]
        let (x, y) = (local.x.floor() as i32, local.y.floor() as i32);
        self.shadow.sample_color(x, y)
    }

    fn to_local(&self, client: Point) -> Point {
        client - self.host.bounding_client_rect().origin().to_vec2()
    }

    /// Route a native pointer event.
    ///
    /// The pointer position is made relative to the surface, the shadow is
    /// sampled there, and the event is dispatched to the shape found and every
    /// collection containing it: capture from the outermost collection inward,
    /// then bubble back out. Background pixels produce an empty summary.
    pub fn handle_pointer_event(&mut self, input: PointerInput) -> DispatchSummary {
        if self.destroyed {
            return DispatchSummary::default();
        }
        let Some(identity) = self.sample(input.client) else {
            tracing::trace!(event = input.kind.as_str(), "no shape under pointer");
            return DispatchSummary::default();
        };
        let Some(target) = self.scene.shape_by_identity(identity) else {
            return DispatchSummary {
                identity: Some(identity),
                ..DispatchSummary::default()
            };
        };

        let seq = dispatcher::sequence(&self.scene.focused(target));
        let local = self.to_local(input.client);
        let mut event = CanvasEvent::new(input.kind, input.client, local, target);
        let scene = &mut self.scene;
        let mut steps = 0;
        let mut listeners_fired = 0;
        let stopped_at = dispatcher::run(&seq, &mut event, |d, event| {
            steps += 1;
            event.enter(d.node, d.phase);
            if let Some(emitter) = scene.emitter_mut(d.node) {
                listeners_fired += emitter.fire(input.kind, event, d.phase);
            }
            if event.is_propagation_stopped() {
                Outcome::Stop
            } else {
                Outcome::Continue
            }
        })
        .copied();
        tracing::trace!(
            event = input.kind.as_str(),
            shape = target.index(),
            steps,
            listeners_fired,
            "pointer event dispatched"
        );
        DispatchSummary {
            target: Some(target),
            identity: Some(identity),
            steps,
            listeners_fired,
            stopped_at,
        }
    }

    /// Repaint a shape's pixels on the real context with its stored style.
    ///
    /// Only pixels carrying the shape's identity on the shadow are touched.
    /// The real drawing state is saved and restored around the repaint, and
    /// the repaint itself is not intercepted. Does nothing once destroyed,
    /// since the shadow no longer tracks the real surface.
    fn render_shape(&mut self, id: ShapeId) {
        if self.destroyed {
            return;
        }
        let Some(shape) = self.scene.shape(id) else {
            return;
        };
        let mut style = shape.style().clone();
        style.fill_style = shape.paint_color();
        let runs = self.shadow.runs_of(shape.identity());
        self.ctx.save();
        self.ctx.set_state(&style);
        for run in runs {
            self.ctx.apply_draw(&DrawOp::FillRect(run));
        }
        self.ctx.restore();
        tracing::trace!(shape = id.index(), "shape re-rendered");
    }

    /// Remove interception and unsubscribe every native listener.
    ///
    /// Later calls go straight to the real context. Calling this again does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for kind in self.subscribed.drain(..) {
            self.host.remove_pointer_listener(kind);
        }
        tracing::debug!(shapes = self.scene.shape_count(), "context destroyed");
    }

    /// Tear down and return the host and its real context.
    pub fn into_parts(mut self) -> (H, H::Context2d) {
        self.destroy();
        (self.host, self.ctx)
    }
}

/// Borrowed handle to one shape.
pub struct ShapeHandle<'a, H: HostCanvas, B: ShadowBackend = PixmapSurface> {
    context: &'a mut Context<H, B>,
    id: ShapeId,
}

impl<H: HostCanvas, B: ShadowBackend> fmt::Debug for ShapeHandle<'_, H, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<H: HostCanvas, B: ShadowBackend> ShapeHandle<'_, H, B> {
    /// The shape's identifier.
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// The shape.
    pub fn shape(&self) -> &Shape {
        &self.context.scene[self.id]
    }

    /// Edit the shape's stored style. Nothing is drawn until
    /// [`ShapeHandle::render_context_state`].
    pub fn set_context_state(&mut self, value: StateValue) -> &mut Self {
        if let Some(shape) = self.context.scene.shape_mut(self.id) {
            shape.style_mut().set(value);
        }
        self
    }

    /// Read one property of the shape's stored style.
    pub fn get_context_state(&self, key: StateKey) -> StateValue {
        self.shape().style().get(key)
    }

    /// Repaint the shape's pixels with its stored style.
    pub fn render_context_state(&mut self) -> &mut Self {
        self.context.render_shape(self.id);
        self
    }

    /// Add this shape to the named collection.
    pub fn add_to_collection(&mut self, name: &str) -> &mut Self {
        self.context.scene.add_to_collection(name, self.id);
        self
    }
}

impl<H: HostCanvas, B: ShadowBackend> Listen for ShapeHandle<'_, H, B> {
    fn on<F>(&mut self, kind: PointerEventKind, callback: F, use_capture: bool) -> &mut Self
    where
        F: FnMut(&mut CanvasEvent) + 'static,
    {
        if let Some(emitter) = self.context.scene.emitter_mut(Node::Shape(self.id)) {
            emitter.on(kind, Box::new(callback), use_capture);
        }
        self.context.subscribe(kind);
        self
    }
}

/// Borrowed handle to one collection.
pub struct CollectionHandle<'a, H: HostCanvas, B: ShadowBackend = PixmapSurface> {
    context: &'a mut Context<H, B>,
    id: CollectionId,
}

impl<H: HostCanvas, B: ShadowBackend> fmt::Debug for CollectionHandle<'_, H, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<H: HostCanvas, B: ShadowBackend> CollectionHandle<'_, H, B> {
    /// The collection's identifier.
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// The collection.
    pub fn collection(&self) -> &Collection {
        &self.context.scene[self.id]
    }

    /// Every shape reachable from this collection.
    pub fn shapes(&self) -> Vec<ShapeId> {
        self.context.scene.reachable_shapes(self.id)
    }

    /// Edit the stored style of every reachable shape.
    pub fn set_context_state(&mut self, value: StateValue) -> &mut Self {
        for id in self.shapes() {
            if let Some(shape) = self.context.scene.shape_mut(id) {
                shape.style_mut().set(value.clone());
            }
        }
        self
    }

    /// Repaint every reachable shape with its stored style, in draw order.
    pub fn render_context_state(&mut self) -> &mut Self {
        let mut shapes = self.shapes();
        shapes.sort_unstable();
        for id in shapes {
            self.context.render_shape(id);
        }
        self
    }

    /// Add every shape reachable from this collection to `name`.
    pub fn add_to_collection(&mut self, name: &str) -> &mut Self {
        self.context.scene.add_to_collection(name, self.id);
        self
    }
}

impl<H: HostCanvas, B: ShadowBackend> Listen for CollectionHandle<'_, H, B> {
    fn on<F>(&mut self, kind: PointerEventKind, callback: F, use_capture: bool) -> &mut Self
    where
        F: FnMut(&mut CanvasEvent) + 'static,
    {
        if let Some(emitter) = self.context.scene.emitter_mut(Node::Collection(self.id)) {
            emitter.on(kind, Box::new(callback), use_capture);
        }
        self.context.subscribe(kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Phase;
    use crate::offscreen::OffscreenCanvas;
    use alloc::rc::Rc;
    use core::cell::RefCell;
    use hashbrown::HashSet;
    use understory_pixel_hit::{Operation, SEQUENTIAL_CAPACITY};

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn canvas() -> Context<OffscreenCanvas> {
        focus(OffscreenCanvas::new(640, 640)).unwrap()
    }

    fn click(x: f64, y: f64) -> PointerInput {
        PointerInput::new(PointerEventKind::Click, Point::new(x, y))
    }

    fn logger(log: &Log, tag: &'static str) -> impl FnMut(&mut CanvasEvent) + 'static {
        let log = log.clone();
        move |_: &mut CanvasEvent| log.borrow_mut().push(tag)
    }

    #[test]
    fn zero_sized_surface_has_no_context() {
        assert_eq!(
            focus(OffscreenCanvas::new(0, 0)).unwrap_err(),
            Error::NoRenderingContext
        );
    }

    struct TextlessSurface(PixmapSurface);

    impl RenderingContext2d for TextlessSurface {
        fn state(&self) -> &DrawState {
            self.0.state()
        }
        fn state_mut(&mut self) -> &mut DrawState {
            self.0.state_mut()
        }
        fn supports(&self, op: Operation) -> bool {
            op != Operation::FillText
        }
        fn apply_path(&mut self, op: &PathOp) {
            self.0.apply_path(op);
        }
        fn apply_draw(&mut self, op: &DrawOp<'_>) {
            self.0.apply_draw(op);
        }
        fn save(&mut self) {
            self.0.save();
        }
        fn restore(&mut self) {
            self.0.restore();
        }
    }

    struct TextlessHost(OffscreenCanvas);

    impl HostCanvas for TextlessHost {
        type Context2d = TextlessSurface;
        fn width(&self) -> u32 {
            self.0.width()
        }
        fn height(&self) -> u32 {
            self.0.height()
        }
        fn context_2d(&mut self) -> Option<TextlessSurface> {
            self.0.context_2d().map(TextlessSurface)
        }
        fn bounding_client_rect(&self) -> Rect {
            self.0.bounding_client_rect()
        }
        fn add_pointer_listener(&mut self, kind: PointerEventKind) {
            self.0.add_pointer_listener(kind);
        }
        fn remove_pointer_listener(&mut self, kind: PointerEventKind) {
            self.0.remove_pointer_listener(kind);
        }
    }

    #[test]
    fn unsupported_hook_aborts_focus() {
        let host = TextlessHost(OffscreenCanvas::new(10, 10));
        let err = focus(host).unwrap_err();
        assert_eq!(
            err,
            Error::Pixel(understory_pixel_hit::Error::InvalidHookTarget(
                "fillText".into()
            ))
        );
        // Without that hook the same host focuses fine.
        let host = TextlessHost(OffscreenCanvas::new(10, 10));
        let options = FocusOptions::default().with_hooks(Hooks::all() - Hooks::FILL_TEXT);
        assert!(focus_with(host, options).is_ok());
    }

    #[test]
    fn every_draw_gets_a_distinct_identity() {
        let mut ctx = canvas();
        let mut seen = HashSet::new();
        for i in 0..50 {
            let x = f64::from(i) * 10.0;
            let id = ctx.fill_rect(x, 0.0, 5.0, 5.0).unwrap().unwrap();
            assert!(seen.insert(ctx.scene()[id].identity()));
        }
        ctx.begin_path();
        ctx.move_to(0.0, 100.0);
        ctx.line_to(100.0, 100.0);
        // Path calls alone create nothing.
        assert_eq!(ctx.scene().shape_count(), 50);
        ctx.stroke().unwrap();
        assert_eq!(ctx.scene().shape_count(), 51);
    }

    #[test]
    fn round_trip_hit_test() {
        let mut ctx = canvas();
        let shape = ctx.fill_rect(20.0, 20.0, 100.0, 100.0).unwrap().unwrap();
        let identity = ctx.scene()[shape].identity();
        assert_eq!(ctx.sample(Point::new(50.0, 50.0)), Some(identity));
        assert_eq!(ctx.sample(Point::new(500.0, 500.0)), None);
        assert_eq!(ctx.handle_pointer_event(click(500.0, 500.0)), DispatchSummary::default());
    }

    #[test]
    fn paths_reach_the_shadow() {
        let mut ctx = canvas();
        ctx.begin_path();
        ctx.arc(100.0, 100.0, 30.0, 0.0, core::f64::consts::TAU, false);
        let disc = ctx.fill().unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(100.0, 100.0)).target, Some(disc));
        assert_eq!(ctx.handle_pointer_event(click(75.0, 75.0)).target, None);
    }

    #[test]
    fn capture_then_bubble_through_nested_collections() {
        let mut ctx = canvas();
        ctx.nest("A", "B").unwrap();
        ctx.start_collect("B");
        let shape = ctx.fill_rect(20.0, 20.0, 100.0, 100.0).unwrap().unwrap();
        ctx.stop_collect_all();

        let log: Log = Rc::default();
        ctx.collection("A").on(PointerEventKind::Click, logger(&log, "A(c)"), true);
        ctx.collection("A").on(PointerEventKind::Click, logger(&log, "A(b)"), false);
        ctx.collection("B").on(PointerEventKind::Click, logger(&log, "B(c)"), true);
        ctx.collection("B").on(PointerEventKind::Click, logger(&log, "B(b)"), false);
        ctx.shape(shape)
            .unwrap()
            .on(PointerEventKind::Click, logger(&log, "shape(c)"), true)
            .on(PointerEventKind::Click, logger(&log, "shape(b)"), false);

        let summary = ctx.handle_pointer_event(click(50.0, 50.0));
        assert_eq!(
            *log.borrow(),
            ["A(c)", "B(c)", "shape(c)", "shape(b)", "B(b)", "A(b)"]
        );
        assert_eq!(summary.target, Some(shape));
        assert_eq!(summary.listeners_fired, 6);
        // Root, A, B and the shape, once per phase.
        assert_eq!(summary.steps, 8);
        assert_eq!(summary.stopped_at, None);
    }

    #[test]
    fn unrelated_collections_are_not_notified() {
        let mut ctx = canvas();
        ctx.start_collect("left");
        ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap();
        ctx.stop_collect("left");
        ctx.start_collect("right");
        ctx.fill_rect(100.0, 0.0, 10.0, 10.0).unwrap();
        ctx.stop_collect("right");

        let log: Log = Rc::default();
        ctx.collection("left").on(PointerEventKind::Click, logger(&log, "left"), false);
        ctx.collection("right").on(PointerEventKind::Click, logger(&log, "right"), false);
        ctx.handle_pointer_event(click(105.0, 5.0));
        assert_eq!(*log.borrow(), ["right"]);
    }

    #[test]
    fn stop_propagation_skips_outer_nodes() {
        let mut ctx = canvas();
        ctx.start_collect("g");
        let shape = ctx.fill_rect(0.0, 0.0, 50.0, 50.0).unwrap().unwrap();
        ctx.stop_collect_all();

        let log: Log = Rc::default();
        ctx.collection("g").on(PointerEventKind::Click, logger(&log, "g"), false);
        let inner = log.clone();
        ctx.shape(shape).unwrap().on(
            PointerEventKind::Click,
            move |event| {
                inner.borrow_mut().push("shape");
                assert_eq!(event.phase(), Phase::Bubble);
                event.stop_propagation();
            },
            false,
        );
        let summary = ctx.handle_pointer_event(click(10.0, 10.0));
        assert_eq!(*log.borrow(), ["shape"]);
        assert_eq!(summary.stopped_at, Some(Dispatch::bubble(Node::Shape(shape))));
    }

    #[test]
    fn event_positions_are_relative_to_the_surface() {
        let host = OffscreenCanvas::new(200, 200).with_origin(Point::new(100.0, 50.0));
        let mut ctx = focus(host).unwrap();
        let shape = ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap().unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        ctx.shape(shape).unwrap().on(
            PointerEventKind::PointerDown,
            move |event| *sink.borrow_mut() = Some((event.client(), event.local())),
            false,
        );
        let down = PointerInput::new(PointerEventKind::PointerDown, Point::new(105.5, 55.5));
        assert_eq!(ctx.handle_pointer_event(down).target, Some(shape));
        assert_eq!(
            *seen.borrow(),
            Some((Point::new(105.5, 55.5), Point::new(5.5, 5.5)))
        );
        assert_eq!(ctx.handle_pointer_event(click(5.0, 5.0)).target, None);
    }

    #[test]
    fn recording_window_through_the_context() {
        let mut ctx = canvas();
        ctx.start_collect("g");
        ctx.fill_rect(0.0, 0.0, 5.0, 5.0).unwrap();
        ctx.fill_rect(10.0, 0.0, 5.0, 5.0).unwrap();
        ctx.stop_collect("g");
        ctx.fill_rect(20.0, 0.0, 5.0, 5.0).unwrap();
        assert_eq!(ctx.query_all(Some("g")).unwrap().len(), 2);
        assert_eq!(ctx.query_all(None).unwrap().len(), 4);
    }

    #[test]
    fn style_changes_repaint_only_their_shape() {
        let mut ctx = canvas();
        ctx.set_fill_style(Color::RED);
        let a = ctx.fill_rect(0.0, 0.0, 50.0, 50.0).unwrap().unwrap();
        ctx.set_fill_style(Color::BLUE);
        let b = ctx.fill_rect(100.0, 0.0, 50.0, 50.0).unwrap().unwrap();

        ctx.shape(a)
            .unwrap()
            .set_context_state(StateValue::FillStyle(Color::GREEN))
            .render_context_state();

        let surface = ctx.rendering_context();
        assert_eq!(surface.pixel(25, 25), Some(Color::GREEN));
        assert_eq!(surface.pixel(125, 25), Some(Color::BLUE));
        assert_eq!(ctx.state().fill_style, Color::BLUE);
        assert_eq!(
            ctx.shape(b).unwrap().get_context_state(StateKey::FillStyle),
            StateValue::FillStyle(Color::BLUE)
        );
    }

    #[test]
    fn collection_style_applies_to_every_member() {
        let mut ctx = canvas();
        ctx.start_collect("g");
        ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap();
        ctx.fill_rect(20.0, 0.0, 10.0, 10.0).unwrap();
        ctx.stop_collect_all();
        ctx.fill_rect(40.0, 0.0, 10.0, 10.0).unwrap();

        ctx.collection("g")
            .set_context_state(StateValue::FillStyle(Color::RED))
            .render_context_state();
        let surface = ctx.rendering_context();
        assert_eq!(surface.pixel(5, 5), Some(Color::RED));
        assert_eq!(surface.pixel(25, 5), Some(Color::RED));
        assert_eq!(surface.pixel(45, 5), Some(Color::BLACK));
    }

    #[test]
    fn one_native_listener_per_kind() {
        let mut ctx = canvas();
        let a = ctx.fill_rect(0.0, 0.0, 5.0, 5.0).unwrap().unwrap();
        let b = ctx.fill_rect(10.0, 0.0, 5.0, 5.0).unwrap().unwrap();
        ctx.shape(a).unwrap().on(PointerEventKind::Click, |_| {}, false);
        ctx.shape(b).unwrap().on(PointerEventKind::Click, |_| {}, true);
        ctx.root().on(PointerEventKind::PointerMove, |_| {}, false);
        assert_eq!(ctx.host().listener_count(PointerEventKind::Click), 1);
        assert_eq!(ctx.host().listener_count(PointerEventKind::PointerMove), 1);
        assert_eq!(
            ctx.subscribed(),
            [PointerEventKind::Click, PointerEventKind::PointerMove]
        );
    }

    #[test]
    fn destroy_is_idempotent_and_unsubscribes() {
        let mut ctx = canvas();
        let shape = ctx.fill_rect(0.0, 0.0, 5.0, 5.0).unwrap().unwrap();
        ctx.shape(shape).unwrap().on(PointerEventKind::Click, |_| {}, false);
        ctx.root().on(PointerEventKind::Wheel, |_| {}, false);
        assert_eq!(ctx.host().total_listeners(), 2);

        ctx.destroy();
        ctx.destroy();
        assert!(ctx.is_destroyed());
        assert_eq!(ctx.host().total_listeners(), 0);
        assert!(ctx.subscribed().is_empty());

        // Calls now pass straight through.
        assert_eq!(ctx.fill_rect(100.0, 100.0, 5.0, 5.0), Ok(None));
        assert_eq!(ctx.scene().shape_count(), 1);
        assert_eq!(ctx.rendering_context().pixel(102, 102), Some(Color::BLACK));
        assert_eq!(ctx.handle_pointer_event(click(2.0, 2.0)), DispatchSummary::default());

        let (host, _surface) = ctx.into_parts();
        assert_eq!(host.total_listeners(), 0);
    }

    #[test]
    fn destroyed_context_no_longer_restyles() {
        let mut ctx = canvas();
        ctx.set_fill_style(Color::RED);
        let a = ctx.fill_rect(0.0, 0.0, 50.0, 50.0).unwrap().unwrap();
        ctx.start_collect("g");
        ctx.fill_rect(100.0, 0.0, 50.0, 50.0).unwrap();
        ctx.stop_collect_all();
        ctx.destroy();

        // Drawn after teardown, so the shadow knows nothing about it.
        ctx.set_fill_style(Color::BLUE);
        ctx.fill_rect(0.0, 0.0, 200.0, 50.0).unwrap();

        assert!(ctx.shape(a).is_none());
        ctx.collection("g")
            .set_context_state(StateValue::FillStyle(Color::GREEN))
            .render_context_state();
        assert_eq!(ctx.rendering_context().pixel(25, 25), Some(Color::BLUE));
        assert_eq!(ctx.rendering_context().pixel(125, 25), Some(Color::BLUE));
    }

    #[test]
    fn non_finite_pointer_positions_hit_nothing() {
        let mut ctx = canvas();
        ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap();
        assert_eq!(ctx.sample(Point::new(f64::NAN, f64::NAN)), None);
        assert_eq!(ctx.sample(Point::new(f64::INFINITY, 5.0)), None);
        assert_eq!(
            ctx.handle_pointer_event(click(f64::NAN, 5.0)),
            DispatchSummary::default()
        );
        assert!(ctx.handle_pointer_event(click(5.0, 5.0)).target.is_some());
    }

    #[test]
    fn line_width_widens_the_stroke_hit_area() {
        let mut ctx = canvas();
        ctx.set_line_width(10.0);
        ctx.begin_path();
        ctx.move_to(20.0, 100.0);
        ctx.line_to(200.0, 100.0);
        let line = ctx.stroke().unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(100.0, 104.0)).target, Some(line));
        assert_eq!(ctx.handle_pointer_event(click(100.0, 96.0)).target, Some(line));
        assert_eq!(ctx.handle_pointer_event(click(100.0, 108.0)).target, None);
    }

    #[test]
    fn unhooked_operations_pass_through() {
        let options = FocusOptions::default().with_hooks(Hooks::PATH | Hooks::FILL);
        let mut ctx = focus_with(OffscreenCanvas::new(64, 64), options).unwrap();
        assert_eq!(ctx.fill_rect(0.0, 0.0, 10.0, 10.0), Ok(None));
        assert_eq!(ctx.rendering_context().pixel(5, 5), Some(Color::BLACK));
        assert_eq!(ctx.sample(Point::new(5.0, 5.0)), None);
        ctx.rect(20.0, 20.0, 10.0, 10.0);
        assert!(ctx.fill().unwrap().is_some());
    }

    #[test]
    fn identity_exhaustion_fails_only_that_draw() {
        let mut ctx = canvas();
        ctx.ids = IdentityAllocator::resume_sequential(SEQUENTIAL_CAPACITY);
        assert_eq!(
            ctx.fill_rect(0.0, 0.0, 10.0, 10.0),
            Err(Error::Pixel(
                understory_pixel_hit::Error::IdentitySpaceExhausted {
                    issued: SEQUENTIAL_CAPACITY
                }
            ))
        );
        assert_eq!(ctx.scene().shape_count(), 0);
        assert_eq!(ctx.rendering_context().pixel(5, 5), Some(Color::TRANSPARENT));
        assert_eq!(ctx.sample(Point::new(5.0, 5.0)), None);
        // State edits and path calls are unaffected.
        ctx.set_line_width(3.0);
        ctx.begin_path();
        assert_eq!(ctx.state().line_width, 3.0);
    }

    #[test]
    fn random_identities_still_round_trip() {
        let options = FocusOptions::default().with_identity(IdentityStrategy::random(11));
        let mut ctx = focus_with(OffscreenCanvas::new(64, 64), options).unwrap();
        let a = ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap().unwrap();
        let b = ctx.fill_rect(20.0, 0.0, 10.0, 10.0).unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(5.0, 5.0)).target, Some(a));
        assert_eq!(ctx.handle_pointer_event(click(25.0, 5.0)).target, Some(b));
    }

    #[test]
    fn translucent_styles_do_not_affect_hits() {
        let mut ctx = canvas();
        ctx.set_global_alpha(0.1);
        ctx.set_fill_style(Color::rgba(0, 0, 0, 20));
        let faint = ctx.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(5.0, 5.0)).target, Some(faint));
    }

    #[test]
    fn images_hit_only_where_opaque() {
        let mut ctx = canvas();
        let mut image = ImageData::new(4, 4);
        image.set_pixel(0, 0, Color::RED);
        let drawn = ctx.draw_image(&image, 10.0, 10.0).unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(10.0, 10.0)).target, Some(drawn));
        assert_eq!(ctx.handle_pointer_event(click(12.0, 12.0)).target, None);
        assert_eq!(ctx.scene()[drawn].operation(), Operation::DrawImage);
    }

    #[test]
    fn later_shapes_win_overlaps() {
        let mut ctx = canvas();
        let under = ctx.fill_rect(0.0, 0.0, 100.0, 100.0).unwrap().unwrap();
        let over = ctx.fill_rect(50.0, 50.0, 100.0, 100.0).unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(25.0, 25.0)).target, Some(under));
        assert_eq!(ctx.handle_pointer_event(click(75.0, 75.0)).target, Some(over));
    }

    #[test]
    fn save_restore_clears_shadow_clip() {
        let mut ctx = canvas();
        ctx.save();
        ctx.begin_path();
        ctx.rect(0.0, 0.0, 10.0, 10.0);
        ctx.clip();
        ctx.restore();
        let wide = ctx.fill_rect(0.0, 0.0, 100.0, 100.0).unwrap().unwrap();
        assert_eq!(ctx.handle_pointer_event(click(50.0, 50.0)).target, Some(wide));
    }
}
