//! Shape outlines and their triangulation.
//!
//! A [`ShapePath`] records the move/line/curve calls a shape author (or the
//! SVG interpreter) makes; [`tessellate_fill`] and [`tessellate_stroke`]
//! turn it into triangle meshes using lyon.

use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, Side, StrokeOptions,
    StrokeTessellator, StrokeVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::PathEvent;

use crate::coords::Vec2;

/// Segments shorter than this (Manhattan) are dropped.
const EPS: f32 = 0.0001;

/// Cubic control-point factor approximating a quarter ellipse.
const KAPPA: f32 = 0.552_284_8;

/// Curve flattening tolerance in shape units.
const TOLERANCE: f32 = 0.1;

/// One recorded outline command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { ctrl: Vec2, to: Vec2 },
    CubicTo { ctrl1: Vec2, ctrl2: Vec2, to: Vec2 },
    Close,
}

/// Recorded outline of one shape (possibly several subpaths).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePath {
    commands: Vec<PathCommand>,
    current: Vec2,
}

impl ShapePath {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.current = Vec2::zero();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        let p = Vec2::new(x, y);
        self.commands.push(PathCommand::MoveTo(p));
        self.current = p;
    }

    /// Adds a straight segment; zero-length segments are ignored.
    pub fn line_to(&mut self, x: f32, y: f32) {
        let p = Vec2::new(x, y);
        if (p - self.current).manhattan() <= EPS && !self.commands.is_empty() {
            return;
        }
        self.commands.push(PathCommand::LineTo(p));
        self.current = p;
    }

    pub fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let to = Vec2::new(x, y);
        self.commands.push(PathCommand::QuadTo { ctrl: Vec2::new(cx, cy), to });
        self.current = to;
    }

    pub fn bezier_curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        let to = Vec2::new(x, y);
        self.commands.push(PathCommand::CubicTo {
            ctrl1: Vec2::new(c1x, c1y),
            ctrl2: Vec2::new(c2x, c2y),
            to,
        });
        self.current = to;
    }

    pub fn close(&mut self) {
        if !self.commands.is_empty() {
            self.commands.push(PathCommand::Close);
        }
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.close();
    }

    /// Rectangle with quadratic corners; `radius` is clamped to half the
    /// shorter side.
    pub fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        let r = radius.max(0.0).min(w.abs() * 0.5).min(h.abs() * 0.5);
        if r <= EPS {
            self.rect(x, y, w, h);
            return;
        }
        self.move_to(x + r, y);
        self.line_to(x + w - r, y);
        self.quadratic_curve_to(x + w, y, x + w, y + r);
        self.line_to(x + w, y + h - r);
        self.quadratic_curve_to(x + w, y + h, x + w - r, y + h);
        self.line_to(x + r, y + h);
        self.quadratic_curve_to(x, y + h, x, y + h - r);
        self.line_to(x, y + r);
        self.quadratic_curve_to(x, y, x + r, y);
        self.close();
    }

    /// Axis-aligned ellipse centered at `(cx, cy)` as four cubic arcs.
    pub fn ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) {
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;
        self.move_to(cx + rx, cy);
        self.bezier_curve_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
        self.bezier_curve_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
        self.bezier_curve_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
        self.bezier_curve_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
        self.close();
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32) {
        self.ellipse(cx, cy, r, r);
    }

    /// Polyline through `points`, closed when `close` is set.
    pub fn polygon(&mut self, points: &[Vec2], close: bool) {
        let Some((first, rest)) = points.split_first() else { return };
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        if close {
            self.close();
        }
    }

    /// Converts the recorded commands into lyon path events.
    fn events(&self) -> Vec<PathEvent> {
        let mut events = Vec::with_capacity(self.commands.len() + 2);
        let mut first: Option<Vec2> = None;
        let mut current = Vec2::zero();

        // Lines and curves outside a subpath open one at the pen position.
        fn ensure_begin(events: &mut Vec<PathEvent>, first: &mut Option<Vec2>, at: Vec2) {
            if first.is_none() {
                events.push(PathEvent::Begin { at: point(at.x, at.y) });
                *first = Some(at);
            }
        }

        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    if let Some(f) = first {
                        events.push(PathEvent::End {
                            last: point(current.x, current.y),
                            first: point(f.x, f.y),
                            close: false,
                        });
                    }
                    events.push(PathEvent::Begin { at: point(p.x, p.y) });
                    first = Some(p);
                    current = p;
                }
                PathCommand::LineTo(p) => {
                    ensure_begin(&mut events, &mut first, current);
                    events.push(PathEvent::Line {
                        from: point(current.x, current.y),
                        to: point(p.x, p.y),
                    });
                    current = p;
                }
                PathCommand::QuadTo { ctrl, to } => {
                    ensure_begin(&mut events, &mut first, current);
                    events.push(PathEvent::Quadratic {
                        from: point(current.x, current.y),
                        ctrl: point(ctrl.x, ctrl.y),
                        to: point(to.x, to.y),
                    });
                    current = to;
                }
                PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                    ensure_begin(&mut events, &mut first, current);
                    events.push(PathEvent::Cubic {
                        from: point(current.x, current.y),
                        ctrl1: point(ctrl1.x, ctrl1.y),
                        ctrl2: point(ctrl2.x, ctrl2.y),
                        to: point(to.x, to.y),
                    });
                    current = to;
                }
                PathCommand::Close => {
                    if let Some(f) = first.take() {
                        events.push(PathEvent::End {
                            last: point(current.x, current.y),
                            first: point(f.x, f.y),
                            close: true,
                        });
                        current = f;
                    }
                }
            }
        }

        if let Some(f) = first {
            events.push(PathEvent::End {
                last: point(current.x, current.y),
                first: point(f.x, f.y),
                close: false,
            });
        }

        events
    }
}

/// Triangle mesh produced by tessellation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec2>,
    /// Stroke meshes only: `0.0` on one side of the outline, `1.0` on the other.
    pub across: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

/// Triangulates the interior of `path` with the even-odd rule.
pub fn tessellate_fill(path: &ShapePath) -> Mesh {
    let events = path.events();
    if events.is_empty() {
        return Mesh::default();
    }

    let mut geometry: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let options = FillOptions::default().with_tolerance(TOLERANCE);

    let result = tessellator.tessellate(
        events.iter().cloned(),
        &options,
        &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
            Vec2::from(vertex.position().to_array())
        }),
    );

    if let Err(err) = result {
        log::warn!("fill tessellation failed: {err:?}");
        return Mesh::default();
    }

    Mesh { positions: geometry.vertices, across: Vec::new(), indices: geometry.indices }
}

/// Triangulates the outline of `path` at `width`.
pub fn tessellate_stroke(path: &ShapePath, width: f32) -> Mesh {
    let events = path.events();
    if events.is_empty() || width <= 0.0 {
        return Mesh::default();
    }

    let mut geometry: VertexBuffers<(Vec2, f32), u32> = VertexBuffers::new();
    let mut tessellator = StrokeTessellator::new();
    let options = StrokeOptions::default()
        .with_line_width(width)
        .with_tolerance(TOLERANCE);

    let result = tessellator.tessellate(
        events.iter().cloned(),
        &options,
        &mut BuffersBuilder::new(&mut geometry, |vertex: StrokeVertex| {
            let across = match vertex.side() {
                Side::Positive => 0.0,
                Side::Negative => 1.0,
            };
            (Vec2::from(vertex.position().to_array()), across)
        }),
    );

    if let Err(err) = result {
        log::warn!("stroke tessellation failed: {err:?}");
        return Mesh::default();
    }

    let (positions, across) = geometry.vertices.into_iter().unzip();
    Mesh { positions, across, indices: geometry.indices }
}
