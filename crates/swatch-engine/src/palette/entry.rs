use std::fmt;
use std::rc::Rc;

use crate::coords::Rect;
use crate::paint::{FillStyle, StrokeStyle, Style};
use crate::texture::TextureHandle;

use super::encoding::PIXELS_PER_ENTRY;

/// Dense palette-local style identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(pub u32);

impl StyleId {
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sub-rectangle of the palette atlas addressing one pixel of an entry.
///
/// The frame is a 0.5 × 0.5 pixel window centered in the pixel so that any
/// sample inside it point-samples that pixel.
#[derive(Debug, Clone)]
pub struct AtlasView {
    texture: Rc<TextureHandle>,
    frame: Rect,
}

impl AtlasView {
    fn centered(texture: &Rc<TextureHandle>, px: u32, py: u32) -> Self {
        Self {
            texture: Rc::clone(texture),
            frame: Rect::new(px as f32 + 0.25, py as f32 + 0.25, 0.5, 0.5),
        }
    }

    #[inline]
    pub fn texture(&self) -> &Rc<TextureHandle> {
        &self.texture
    }

    /// Window in atlas pixels.
    #[inline]
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Window in normalized texture coordinates.
    pub fn uv_rect(&self) -> Rect {
        let w = self.texture.width().max(1) as f32;
        let h = self.texture.height().max(1) as f32;
        Rect::new(
            self.frame.origin.x / w,
            self.frame.origin.y / h,
            self.frame.size.x / w,
            self.frame.size.y / h,
        )
    }
}

/// One palette row: fill + stroke attributes and their atlas location.
#[derive(Debug, Clone)]
pub struct StyleEntry {
    pub(super) id: StyleId,
    pub(super) style: Style,
    pub(super) atlas_x: u32,
    pub(super) atlas_y: u32,
    pub(super) fill_view: AtlasView,
    pub(super) stroke_view: AtlasView,
    pub(super) dirty: bool,
}

impl StyleEntry {
    /// Creates an entry at the cell `id` maps to in an atlas `atlas_size` wide.
    ///
    /// Entries are laid out row-major in strides of four pixels.
    pub(super) fn new(id: StyleId, atlas_size: u32, texture: &Rc<TextureHandle>) -> Self {
        let (atlas_x, atlas_y) = cell_origin(id, atlas_size);
        Self {
            id,
            style: Style::default(),
            atlas_x,
            atlas_y,
            fill_view: AtlasView::centered(texture, atlas_x, atlas_y),
            stroke_view: AtlasView::centered(texture, atlas_x + 1, atlas_y),
            dirty: true,
        }
    }

    #[inline]
    pub fn id(&self) -> StyleId {
        self.id
    }

    #[inline]
    pub fn fill(&self) -> FillStyle {
        self.style.fill
    }

    #[inline]
    pub fn stroke(&self) -> StrokeStyle {
        self.style.stroke
    }

    #[inline]
    pub fn style(&self) -> Style {
        self.style
    }

    /// Top-left pixel of this entry's block.
    #[inline]
    pub fn atlas_origin(&self) -> (u32, u32) {
        (self.atlas_x, self.atlas_y)
    }

    #[inline]
    pub fn fill_view(&self) -> &AtlasView {
        &self.fill_view
    }

    #[inline]
    pub fn stroke_view(&self) -> &AtlasView {
        &self.stroke_view
    }

    /// True from creation or mutation until the next commit.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Top-left pixel of the block owned by `id`.
pub(super) fn cell_origin(id: StyleId, atlas_size: u32) -> (u32, u32) {
    let per_row = (atlas_size / PIXELS_PER_ENTRY).max(1);
    (PIXELS_PER_ENTRY * (id.0 % per_row), id.0 / per_row)
}
