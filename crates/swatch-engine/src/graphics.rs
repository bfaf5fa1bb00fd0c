//! Per-shape drawing API backed by the style palette.
//!
//! [`PaletteGraphics`] is what shape authors (and the SVG interpreter) call
//! instead of handing colors to the renderer: `begin_fill` / `line_style`
//! write a style entry into the palette and every vertex of the shape
//! carries that entry's id.

use crate::batch::BatchElement;
use crate::coords::{Affine, Vec2};
use crate::geometry::{FilledGeometry, UvMode};
use crate::paint::{BlendMode, FillPatch, Rgb, StrokePatch, StylePatch};
use crate::palette::{AtlasView, Palette, PaletteConfig, SharedPalette, StyleId};
use crate::path::{tessellate_fill, tessellate_stroke, ShapePath};

#[derive(Debug, Clone)]
struct FillBinding {
    id: StyleId,
    view: AtlasView,
}

#[derive(Debug, Clone)]
struct StrokeBinding {
    id: StyleId,
    width: f32,
    view: AtlasView,
}

/// Shape builder that references palette styles instead of raw colors.
///
/// ```ignore
/// let mut g = PaletteGraphics::new();
/// g.begin_fill(0xff0000, 1.0).line_style(2.0, 0x00ff00, 0.5, 0.0);
/// g.draw_rect(0.0, 0.0, 100.0, 50.0);
/// g.end_fill();
/// ```
///
/// Fill and stroke of one shape share one palette entry: `line_style`
/// continues the entry opened by the preceding `begin_fill`. A `line_style`
/// without a fresh `begin_fill` opens a new entry.
///
/// Failed style writes (palette full) leave the matching binding empty and
/// the shape part is not emitted.
#[derive(Debug)]
pub struct PaletteGraphics {
    palette: SharedPalette,
    geometry: FilledGeometry,
    path: ShapePath,

    style_ids: Vec<Option<StyleId>>,
    current_style: Option<StyleId>,
    fill: Option<FillBinding>,
    stroke: Option<StrokeBinding>,

    transform: Affine,
    blend_mode: BlendMode,
}

impl Default for PaletteGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteGraphics {
    /// Facade with its own default-sized palette.
    pub fn new() -> Self {
        Self::with_palette(Palette::with_config(PaletteConfig::default()).shared(), false)
    }

    /// Facade writing into a shared palette. `use32` marks geometry that may
    /// exceed 16-bit indices.
    pub fn with_palette(palette: SharedPalette, use32: bool) -> Self {
        Self {
            palette,
            geometry: FilledGeometry::new(UvMode::Palette, use32),
            path: ShapePath::new(),
            style_ids: Vec::new(),
            current_style: None,
            fill: None,
            stroke: None,
            transform: Affine::identity(),
            blend_mode: BlendMode::Normal,
        }
    }

    #[inline]
    pub fn palette(&self) -> &SharedPalette {
        &self.palette
    }

    #[inline]
    pub fn geometry(&self) -> &FilledGeometry {
        &self.geometry
    }

    /// Ids requested by this shape, in call order. `None` marks a failed
    /// request.
    #[inline]
    pub fn style_ids(&self) -> &[Option<StyleId>] {
        &self.style_ids
    }

    /// Entry the next `line_style` continues.
    #[inline]
    pub fn current_style(&self) -> Option<StyleId> {
        self.current_style
    }

    /// Palette cell the pending fill is bound to.
    pub fn fill_view(&self) -> Option<&AtlasView> {
        self.fill.as_ref().map(|b| &b.view)
    }

    /// Palette cell the pending stroke is bound to.
    pub fn stroke_view(&self) -> Option<&AtlasView> {
        self.stroke.as_ref().map(|b| &b.view)
    }

    #[inline]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Affine) -> &mut Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) -> &mut Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Opens a new style entry with the given fill and binds the shape's fill
    /// to it. Finalizes any outline still pending from the previous fill.
    pub fn begin_fill(&mut self, color: u32, alpha: f32) -> &mut Self {
        self.finish_shape();

        let patch = StylePatch::fill(FillPatch::new(Rgb::new(color), alpha));
        let (id, fill) = {
            let mut palette = self.palette.borrow_mut();
            let id = palette.set_style(None, &patch, false);
            let fill = id.and_then(|id| {
                let view = palette.fill_texture(Some(id))?.clone();
                Some(FillBinding { id, view })
            });
            (id, fill)
        };

        self.fill = fill;
        if id.is_none() {
            log::debug!("begin_fill: no style entry; fill skipped");
        }

        self.current_style = id;
        self.style_ids.push(id);
        self
    }

    /// Sets the stroke of the current entry and binds the shape's stroke to it.
    ///
    /// `width` is in shape units; `alignment` is 0 for the outer edge through
    /// 1 for the inner edge.
    pub fn line_style(&mut self, width: f32, color: u32, alpha: f32, alignment: f32) -> &mut Self {
        let patch = StylePatch::stroke(StrokePatch::new(width, Rgb::new(color), alpha, alignment));
        let continues = self.current_style.is_some();

        let (id, stroke) = {
            let mut palette = self.palette.borrow_mut();
            let id = palette.set_style(self.current_style, &patch, false);
            let stroke = id.and_then(|id| {
                let view = palette.stroke_texture(Some(id))?.clone();
                Some(StrokeBinding { id, width, view })
            });
            (id, stroke)
        };

        self.stroke = stroke;
        if id.is_none() {
            log::debug!("line_style: no style entry; stroke skipped");
        }

        if !continues {
            self.style_ids.push(id);
        }
        self.current_style = None;
        self
    }

    /// Commits pending palette writes, emits the pending outline and clears
    /// the fill and stroke bindings.
    pub fn end_fill(&mut self) -> &mut Self {
        self.palette.borrow_mut().commit(false);
        self.finish_shape();
        self.fill = None;
        self.stroke = None;
        self.current_style = None;
        self
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.path.move_to(x, y);
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.path.line_to(x, y);
        self
    }

    pub fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        self.path.quadratic_curve_to(cx, cy, x, y);
        self
    }

    pub fn bezier_curve_to(
        &mut self,
        c1x: f32,
        c1y: f32,
        c2x: f32,
        c2y: f32,
        x: f32,
        y: f32,
    ) -> &mut Self {
        self.path.bezier_curve_to(c1x, c1y, c2x, c2y, x, y);
        self
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.path.close();
        self
    }

    pub fn draw_rect(&mut self, x: f32, y: f32, w: f32, h: f32) -> &mut Self {
        self.path.rect(x, y, w, h);
        self
    }

    pub fn draw_rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) -> &mut Self {
        self.path.rounded_rect(x, y, w, h, radius);
        self
    }

    pub fn draw_circle(&mut self, cx: f32, cy: f32, r: f32) -> &mut Self {
        self.path.circle(cx, cy, r);
        self
    }

    pub fn draw_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) -> &mut Self {
        self.path.ellipse(cx, cy, rx, ry);
        self
    }

    pub fn draw_polygon(&mut self, points: &[Vec2], close: bool) -> &mut Self {
        self.path.polygon(points, close);
        self
    }

    /// Drops all emitted geometry, the pending outline and bindings. Palette
    /// entries stay allocated.
    pub fn clear(&mut self) -> &mut Self {
        self.geometry.clear();
        self.path.clear();
        self.style_ids.clear();
        self.current_style = None;
        self.fill = None;
        self.stroke = None;
        self
    }

    /// The shape as a batch element sampling the palette texture, or `None`
    /// if nothing has been emitted.
    pub fn batch_element(&mut self) -> Option<BatchElement> {
        if self.geometry.is_empty() {
            return None;
        }
        if self.geometry.requires_32bit_indices() && !self.geometry.use32() {
            log::warn!(
                "shape has {} vertices but 32-bit indices were not requested",
                self.geometry.points().len()
            );
        }
        let texture = self.palette.borrow().texture().clone();
        let geometry = self.geometry.build(&self.transform);
        Some(BatchElement::new(texture, self.blend_mode, geometry))
    }

    fn finish_shape(&mut self) {
        if self.path.is_empty() {
            return;
        }

        if let Some(fill) = &self.fill {
            let mesh = tessellate_fill(&self.path);
            self.geometry.add_fill(&mesh, fill.id);
        }
        if let Some(stroke) = self.stroke.as_ref().filter(|s| s.width > 0.0) {
            let mesh = tessellate_stroke(&self.path, stroke.width);
            self.geometry.add_stroke(&mesh, stroke.id);
        }

        self.path.clear();
    }
}
