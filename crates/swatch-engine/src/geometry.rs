//! Per-shape geometry with palette-aware UVs (the filled-geometry producer).
//!
//! Vertices carry their style id in the vertex color rather than a real
//! color: `R` selects fill (0) or stroke (255) and `G`/`B` hold the high and
//! low byte of the id. The vertex stage decodes the id to find the entry's
//! atlas cell.

use std::rc::Rc;

use crate::coords::{Affine, Rect, Vec2};
use crate::palette::StyleId;
use crate::path::Mesh;

/// Fill/stroke selector stored in the red channel of the vertex color.
const STROKE_SELECTOR: u8 = 255;

/// How a shape's UVs are produced.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UvMode {
    /// Bounding-box normalized UVs into the bound texture view.
    Bounds,
    /// Palette-mode UVs. These never sample an image: `u` runs along the
    /// emitted run and `v` alternates between 0 and 1 across it, which is
    /// what the fragment stage measures the stroke ring against.
    #[default]
    Palette,
}

/// Vertex color that encodes `id` for the fill or stroke half of an entry.
#[inline]
pub fn style_color(id: StyleId, stroke: bool) -> [u8; 4] {
    let selector = if stroke { STROKE_SELECTOR } else { 0 };
    [selector, ((id.0 >> 8) & 0xff) as u8, (id.0 & 0xff) as u8, 255]
}

/// Inverse of [`style_color`]: `(id, is_stroke)`.
#[inline]
pub fn decode_style_color(color: [u8; 4]) -> (StyleId, bool) {
    (StyleId(((color[1] as u32) << 8) | color[2] as u32), color[0] == STROKE_SELECTOR)
}

/// Interleaving-ready snapshot of a shape's geometry in output space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGeometry {
    pub positions: Vec<[f32; 2]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 4]>,
    pub indices: Vec<u32>,
}

impl BatchGeometry {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Accumulated geometry of one shape.
#[derive(Debug, Clone, Default)]
pub struct FilledGeometry {
    uv_mode: UvMode,
    use32: bool,
    points: Vec<Vec2>,
    uvs: Vec<[f32; 2]>,
    colors: Vec<[u8; 4]>,
    indices: Vec<u32>,
    cached: Option<(Affine, Rc<BatchGeometry>)>,
}

impl FilledGeometry {
    pub fn new(uv_mode: UvMode, use32: bool) -> Self {
        Self { uv_mode, use32, ..Self::default() }
    }

    #[inline]
    pub fn uv_mode(&self) -> UvMode {
        self.uv_mode
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    #[inline]
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    #[inline]
    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether 32-bit indices were requested for this shape.
    #[inline]
    pub fn use32(&self) -> bool {
        self.use32
    }

    /// Whether indices exceed the 16-bit range.
    ///
    /// Such geometry still builds (batch buffers are 32-bit) but will not
    /// survive a 16-bit host unless `use32` was requested.
    pub fn requires_32bit_indices(&self) -> bool {
        self.points.len() > 0xffff
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
        self.cached = None;
    }

    /// Appends UVs for `verts[start..start + size]`.
    ///
    /// In [`UvMode::Bounds`] the run's bounding box maps to the unit square,
    /// or to `view` (normalized) when the run samples a sub-rectangle of its
    /// texture.
    pub fn add_uvs(&mut self, verts: &[Vec2], start: usize, size: usize, view: Option<Rect>) {
        let end = (start + size).min(verts.len());
        let run = &verts[start.min(end)..end];

        match self.uv_mode {
            UvMode::Palette => {
                let total = (start + run.len()).max(1) as f32;
                self.uvs.extend((0..run.len()).map(|i| {
                    let n = start + i;
                    [n as f32 / total, (n % 2) as f32]
                }));
            }
            UvMode::Bounds => {
                let Some(bounds) = Rect::bounding(run) else { return };
                let frame = view.unwrap_or(Rect::new(0.0, 0.0, 1.0, 1.0));
                self.uvs.extend(run.iter().map(|p| {
                    let [u, v] = bounds.normalize(*p);
                    [frame.origin.x + u * frame.size.x, frame.origin.y + v * frame.size.y]
                }));
            }
        }
    }

    /// Appends a mesh whose vertices all carry `color`.
    pub fn add_mesh(&mut self, mesh: &Mesh, color: [u8; 4], view: Option<Rect>) {
        if mesh.is_empty() {
            return;
        }

        let base = self.points.len() as u32;
        let start = self.points.len();
        self.points.extend_from_slice(&mesh.positions);

        let across_known = self.uv_mode == UvMode::Palette
            && mesh.across.len() == mesh.positions.len();
        if across_known {
            let total = mesh.positions.len().max(1) as f32;
            self.uvs.extend(
                mesh.across
                    .iter()
                    .enumerate()
                    .map(|(i, across)| [i as f32 / total, *across]),
            );
        } else {
            let points = std::mem::take(&mut self.points);
            self.add_uvs(&points, start, mesh.positions.len(), view);
            self.points = points;
        }

        self.colors.extend(std::iter::repeat_n(color, mesh.positions.len()));
        self.indices.extend(mesh.indices.iter().map(|i| base + i));
        self.cached = None;
    }

    /// Appends the fill mesh of style `id`.
    #[inline]
    pub fn add_fill(&mut self, mesh: &Mesh, id: StyleId) {
        self.add_mesh(mesh, style_color(id, false), None);
    }

    /// Appends the stroke mesh of style `id`.
    #[inline]
    pub fn add_stroke(&mut self, mesh: &Mesh, id: StyleId) {
        self.add_mesh(mesh, style_color(id, true), None);
    }

    /// Snapshot in output space, reused while geometry and transform are
    /// unchanged.
    pub fn build(&mut self, transform: &Affine) -> Rc<BatchGeometry> {
        if let Some((cached_transform, geometry)) = &self.cached {
            if cached_transform == transform {
                return Rc::clone(geometry);
            }
        }

        let geometry = Rc::new(BatchGeometry {
            positions: self.points.iter().map(|p| transform.apply(*p).to_array()).collect(),
            uvs: self.uvs.clone(),
            colors: self.colors.clone(),
            indices: self.indices.clone(),
        });
        self.cached = Some((*transform, Rc::clone(&geometry)));
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Mesh {
        Mesh {
            positions: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(10.0, 20.0),
                Vec2::new(0.0, 20.0),
            ],
            across: Vec::new(),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn style_color_round_trips() {
        for (id, stroke) in [(0, false), (5, true), (0x1234, false), (0xffff, true)] {
            let color = style_color(StyleId(id), stroke);
            assert_eq!(decode_style_color(color), (StyleId(id), stroke));
            assert_eq!(color[3], 255);
        }
    }

    #[test]
    fn palette_uvs_alternate_across_the_run() {
        let mut g = FilledGeometry::new(UvMode::Palette, false);
        g.add_fill(&square(), StyleId(1));
        let vs: Vec<f32> = g.uvs().iter().map(|uv| uv[1]).collect();
        assert_eq!(vs, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(g.uvs()[2][0], 0.5);
    }

    #[test]
    fn bounds_uvs_normalize_the_run() {
        let mut g = FilledGeometry::new(UvMode::Bounds, false);
        g.add_mesh(&square(), [255; 4], None);
        assert_eq!(g.uvs(), &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn bounds_uvs_map_into_sub_view() {
        let mut g = FilledGeometry::new(UvMode::Bounds, false);
        g.add_mesh(&square(), [255; 4], Some(Rect::new(0.5, 0.0, 0.5, 0.5)));
        assert_eq!(g.uvs()[2], [1.0, 0.5]);
        assert_eq!(g.uvs()[0], [0.5, 0.0]);
    }

    #[test]
    fn stroke_sides_become_v() {
        let mut g = FilledGeometry::new(UvMode::Palette, false);
        let mut mesh = square();
        mesh.across = vec![1.0, 1.0, 0.0, 0.0];
        g.add_stroke(&mesh, StyleId(2));
        let vs: Vec<f32> = g.uvs().iter().map(|uv| uv[1]).collect();
        assert_eq!(vs, vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(g.colors()[0][0], 255);
    }

    #[test]
    fn indices_are_offset_per_mesh() {
        let mut g = FilledGeometry::new(UvMode::Palette, false);
        g.add_fill(&square(), StyleId(0));
        g.add_stroke(&square(), StyleId(0));
        assert_eq!(&g.indices()[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(g.colors()[0], [0, 0, 0, 255]);
        assert_eq!(g.colors()[4], [255, 0, 0, 255]);
    }

    #[test]
    fn build_applies_transform_and_caches() {
        let mut g = FilledGeometry::new(UvMode::Palette, false);
        g.add_fill(&square(), StyleId(0));

        let shift = Affine::translate(5.0, 1.0);
        let a = g.build(&shift);
        assert_eq!(a.positions[1], [15.0, 1.0]);
        assert!(Rc::ptr_eq(&a, &g.build(&shift)));
        assert!(!Rc::ptr_eq(&a, &g.build(&Affine::identity())));
    }

    #[test]
    fn large_meshes_require_32bit_indices() {
        let mut g = FilledGeometry::new(UvMode::Palette, false);
        g.add_fill(&square(), StyleId(0));
        assert!(!g.requires_32bit_indices());

        let mesh = Mesh {
            positions: vec![Vec2::new(0.0, 0.0); 0x10000],
            across: Vec::new(),
            indices: vec![0, 1, 2],
        };
        g.add_fill(&mesh, StyleId(0));
        assert!(g.requires_32bit_indices());
        assert!(!g.use32());

        g.clear();
        assert!(!g.requires_32bit_indices());
    }

    #[test]
    fn uvs_track_points() {
        let mut g = FilledGeometry::new(UvMode::Bounds, false);
        g.add_mesh(&square(), [0; 4], None);
        g.add_mesh(&square(), [0; 4], None);
        assert_eq!(g.uvs().len(), g.points().len());
    }
}
