use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::paint::{Style, StylePatch};
use crate::texture::TextureHandle;

use super::encoding::{encode_style, pixel_offset, BYTES_PER_PIXEL, PIXELS_PER_ENTRY};
use super::entry::{AtlasView, StyleEntry, StyleId};

/// Largest atlas side whose ids still fit the 16-bit vertex color encoding.
pub const MAX_ATLAS_SIZE: u32 = 512;

/// A palette shared between the shapes of one root drawable.
pub type SharedPalette = Rc<RefCell<Palette>>;

/// Palette construction parameters.
#[derive(Debug, Clone)]
pub struct PaletteConfig {
    /// Side of the square atlas in pixels.
    ///
    /// Rounded up to a multiple of four and clamped to [`MAX_ATLAS_SIZE`].
    pub size: u32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self { size: 64 }
    }
}

/// Style lookup atlas.
///
/// Assigns integer style ids, writes each style into a block of atlas pixels
/// and pushes the pixel buffer to its texture on [`commit`](Self::commit).
/// Reads reflect in-memory state immediately; the texture lags until commit.
///
/// Invariants:
/// - ids are below `size² / 4`
/// - entries are never removed; the palette only grows
/// - two entries never share atlas pixels
#[derive(Debug)]
pub struct Palette {
    size: u32,
    capacity: u32,
    entries: BTreeMap<StyleId, StyleEntry>,
    /// Mirror of the atlas, materialized on the first write.
    pixels: Option<Vec<u8>>,
    texture: Rc<TextureHandle>,
    warned_full: bool,
}

impl Palette {
    pub fn new(size: u32) -> Self {
        Self::with_config(PaletteConfig { size })
    }

    pub fn with_config(config: PaletteConfig) -> Self {
        let size = normalize_size(config.size);
        if size != config.size {
            log::warn!("palette size {} adjusted to {}", config.size, size);
        }

        let capacity = size * size / PIXELS_PER_ENTRY;
        log::debug!("palette created: {size}x{size} atlas, {capacity} styles");

        Self {
            size,
            capacity,
            entries: BTreeMap::new(),
            pixels: None,
            // Palette pixels hold straight alpha.
            texture: Rc::new(TextureHandle::new(size, size, false)),
            warned_full: false,
        }
    }

    /// Wraps the palette for sharing between several graphics facades.
    pub fn shared(self) -> SharedPalette {
        Rc::new(RefCell::new(self))
    }

    /// Atlas side in pixels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Maximum number of style entries.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn texture(&self) -> &Rc<TextureHandle> {
        &self.texture
    }

    /// Id the next allocating [`set_style`](Self::set_style) would use.
    ///
    /// Ids are dense and assigned in creation order. If an explicit id already
    /// occupies `len()`, allocation continues after the highest id instead of
    /// merging into that entry.
    pub fn next_id(&self) -> StyleId {
        let dense = StyleId(self.entries.len() as u32);
        if !self.entries.contains_key(&dense) {
            return dense;
        }
        self.entries
            .last_key_value()
            .map_or(dense, |(last, _)| StyleId(last.0 + 1))
    }

    /// Creates or updates a style entry and writes it into the atlas buffer.
    ///
    /// `id = None` allocates via [`next_id`](Self::next_id). Fields present in
    /// `patch` overwrite the entry's values; absent fields keep them.
    ///
    /// Returns `None` (and leaves the pixel buffer untouched) when `patch` is
    /// empty or the id is beyond capacity. With `immediate`, commits before
    /// returning.
    pub fn set_style(
        &mut self,
        id: Option<StyleId>,
        patch: &StylePatch,
        immediate: bool,
    ) -> Option<StyleId> {
        let id = id.unwrap_or_else(|| self.next_id());

        if patch.is_empty() {
            return None;
        }
        if id.0 >= self.capacity {
            if !self.warned_full {
                log::warn!(
                    "palette full: style {id} exceeds capacity {} of {}x{} atlas",
                    self.capacity,
                    self.size,
                    self.size
                );
                self.warned_full = true;
            }
            return None;
        }

        let size = self.size;
        let texture = &self.texture;
        let entry = self
            .entries
            .entry(id)
            .or_insert_with(|| StyleEntry::new(id, size, texture));

        if let Some(fill) = &patch.fill {
            fill.apply(&mut entry.style.fill);
        }
        if let Some(stroke) = &patch.stroke {
            stroke.apply(&mut entry.style.stroke);
        }
        entry.dirty = true;

        let pixels = self
            .pixels
            .get_or_insert_with(|| vec![0; size as usize * size as usize * BYTES_PER_PIXEL]);
        let start = pixel_offset(entry.atlas_x, entry.atlas_y, size);
        let end = start + PIXELS_PER_ENTRY as usize * BYTES_PER_PIXEL;
        encode_style(&entry.style, &mut pixels[start..end]);

        if immediate {
            self.commit(false);
        }

        Some(id)
    }

    /// Merged style for `id`, or `None` for unknown ids.
    pub fn get_style(&self, id: Option<StyleId>) -> Option<Style> {
        self.entries.get(&id?).map(StyleEntry::style)
    }

    #[inline]
    pub fn entry(&self, id: StyleId) -> Option<&StyleEntry> {
        self.entries.get(&id)
    }

    /// Entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &StyleEntry> {
        self.entries.values()
    }

    /// View of the fill pixel of `id`.
    pub fn fill_texture(&self, id: Option<StyleId>) -> Option<&AtlasView> {
        self.entries.get(&id?).map(StyleEntry::fill_view)
    }

    /// View of the stroke pixels of `id`.
    pub fn stroke_texture(&self, id: Option<StyleId>) -> Option<&AtlasView> {
        self.entries.get(&id?).map(StyleEntry::stroke_view)
    }

    /// Atlas buffer, or `None` if nothing was ever written.
    #[inline]
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// RGBA of atlas pixel `(x, y)` in the in-memory buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let pixels = self.pixels.as_ref()?;
        let at = pixel_offset(x, y, self.size);
        let mut out = [0u8; 4];
        out.copy_from_slice(&pixels[at..at + BYTES_PER_PIXEL]);
        Some(out)
    }

    /// True if any entry changed since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.entries.values().any(StyleEntry::is_dirty)
    }

    /// Pushes the whole atlas buffer to the texture if any entry is dirty
    /// (or `force` is set), then clears every dirty flag.
    ///
    /// No-op if the buffer was never written. Returns whether an upload
    /// happened.
    pub fn commit(&mut self, force: bool) -> bool {
        let Some(pixels) = self.pixels.as_deref() else {
            return false;
        };

        let mut needs_upload = force;
        for entry in self.entries.values_mut() {
            needs_upload |= entry.dirty;
            entry.dirty = false;
        }

        if !needs_upload {
            return false;
        }

        log::trace!("palette commit: {} styles, {} bytes", self.entries.len(), pixels.len());
        self.texture.update(pixels)
    }

    /// Releases the atlas texture and all entry views.
    ///
    /// Shapes still holding views of this palette observe a destroyed texture;
    /// keeping the palette alive as long as they render is the caller's job.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Palette {
    fn drop(&mut self) {
        log::debug!("palette destroyed: {} styles", self.entries.len());
        self.entries.clear();
        self.pixels = None;
        self.texture.destroy();
    }
}

fn normalize_size(size: u32) -> u32 {
    let size = size.clamp(PIXELS_PER_ENTRY, MAX_ATLAS_SIZE);
    size.div_ceil(PIXELS_PER_ENTRY) * PIXELS_PER_ENTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::{FillPatch, Rgb, StrokePatch};

    fn fill(color: u32, alpha: f32) -> StylePatch {
        StylePatch::fill(FillPatch::new(Rgb::new(color), alpha))
    }

    // ── ids ───────────────────────────────────────────────────────────────

    #[test]
    fn allocated_ids_are_dense_without_repeats() {
        let mut p = Palette::new(16);
        let ids: Vec<u32> = (0..10)
            .map(|_| p.set_style(None, &fill(0, 1.0), false).unwrap().0)
            .collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert_eq!(p.next_id(), StyleId(10));
    }

    #[test]
    fn allocation_skips_past_explicit_ids() {
        let mut p = Palette::new(16);
        p.set_style(Some(StyleId(1)), &fill(0, 1.0), false);
        // len() == 1 is taken, so allocation continues after the highest id.
        assert_eq!(p.next_id(), StyleId(2));
        assert_eq!(p.set_style(None, &fill(0, 1.0), false), Some(StyleId(2)));
    }

    #[test]
    fn identical_styles_are_not_deduplicated() {
        let mut p = Palette::new(16);
        let a = p.set_style(None, &fill(0x336699, 1.0), false).unwrap();
        let b = p.set_style(None, &fill(0x336699, 1.0), false).unwrap();
        assert_ne!(a, b);
        assert_ne!(p.entry(a).unwrap().atlas_origin(), p.entry(b).unwrap().atlas_origin());
    }

    // ── set_style / get_style ─────────────────────────────────────────────

    #[test]
    fn round_trip_within_channel_precision() {
        let mut p = Palette::new(16);
        for (i, alpha) in [0.0f32, 0.1, 0.333, 0.5, 0.9, 1.0].into_iter().enumerate() {
            let color = 0x10_20_30 * (i as u32 + 1) & 0xff_ffff;
            let id = p.set_style(None, &fill(color, alpha), false).unwrap();
            let style = p.get_style(Some(id)).unwrap();
            assert_eq!(style.fill.color, Rgb(color));

            let (x, y) = p.entry(id).unwrap().atlas_origin();
            let stored = p.pixel(x, y).unwrap();
            assert_eq!(Rgb::from_bytes(stored[0], stored[1], stored[2]), Rgb(color));
            assert!((stored[3] as f32 / 255.0 - alpha).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn empty_patch_fails() {
        let mut p = Palette::new(16);
        assert_eq!(p.set_style(None, &StylePatch::default(), false), None);
        assert!(p.pixels().is_none());
        assert!(p.is_empty());
    }

    #[test]
    fn beyond_capacity_fails_without_touching_pixels() {
        let mut p = Palette::new(8);
        assert_eq!(p.capacity(), 16);
        p.set_style(None, &fill(0xffffff, 1.0), false);
        let before = p.pixels().unwrap().to_vec();

        assert_eq!(p.set_style(Some(StyleId(16)), &fill(0xff0000, 1.0), false), None);
        assert_eq!(p.set_style(Some(StyleId(500)), &fill(0xff0000, 1.0), false), None);
        assert_eq!(p.pixels().unwrap(), before.as_slice());
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn filling_the_palette_then_failing() {
        let mut p = Palette::new(4);
        assert_eq!(p.capacity(), 4);
        for _ in 0..4 {
            assert!(p.set_style(None, &fill(0, 1.0), false).is_some());
        }
        assert_eq!(p.set_style(None, &fill(0, 1.0), false), None);
    }

    #[test]
    fn partial_updates_keep_existing_fields() {
        let mut p = Palette::new(16);
        let id = p.set_style(None, &fill(0xff0000, 0.5), false).unwrap();
        p.set_style(Some(id), &StylePatch::stroke(StrokePatch::new(2.0, Rgb(0x0000ff), 1.0, 0.0)), false);

        let style = p.get_style(Some(id)).unwrap();
        assert_eq!(style.fill.color, Rgb(0xff0000));
        assert_eq!(style.fill.alpha, 0.5);
        assert_eq!(style.stroke.color, Rgb(0x0000ff));
        assert_eq!(style.stroke.width, 2.0);
    }

    #[test]
    fn unknown_ids_return_none() {
        let p = Palette::new(16);
        assert!(p.get_style(None).is_none());
        assert!(p.get_style(Some(StyleId(3))).is_none());
        assert!(p.fill_texture(Some(StyleId(3))).is_none());
        assert!(p.stroke_texture(None).is_none());
    }

    #[test]
    fn params_pixel_is_opaque() {
        let mut p = Palette::new(16);
        let id = p.set_style(None, &fill(0, 0.0), false).unwrap();
        let (x, y) = p.entry(id).unwrap().atlas_origin();
        assert_eq!(p.pixel(x + 2, y).unwrap()[3], 255);
    }

    // ── commit ────────────────────────────────────────────────────────────

    #[test]
    fn commit_without_writes_is_a_no_op() {
        let mut p = Palette::new(16);
        assert!(!p.commit(true));
        assert_eq!(p.texture().version(), 0);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut p = Palette::new(16);
        p.set_style(None, &fill(0x00ff00, 1.0), false);
        assert!(p.is_dirty());

        assert!(p.commit(false));
        assert!(!p.commit(false));
        assert_eq!(p.texture().version(), 1);
        assert!(!p.is_dirty());
    }

    #[test]
    fn force_commit_uploads_clean_palette() {
        let mut p = Palette::new(16);
        p.set_style(None, &fill(0x00ff00, 1.0), false);
        p.commit(false);
        assert!(p.commit(true));
        assert_eq!(p.texture().version(), 2);
    }

    #[test]
    fn immediate_set_commits() {
        let mut p = Palette::new(16);
        p.set_style(None, &fill(0x00ff00, 1.0), true);
        assert_eq!(p.texture().version(), 1);
        assert_eq!(&p.texture().pixels()[0..4], &[0, 255, 0, 255]);
    }

    #[test]
    fn texture_lags_until_commit() {
        let mut p = Palette::new(16);
        let id = p.set_style(None, &fill(0x0000ff, 1.0), true).unwrap();
        p.set_style(Some(id), &fill(0xff0000, 1.0), false);

        assert_eq!(p.get_style(Some(id)).unwrap().fill.color, Rgb(0xff0000));
        assert_eq!(&p.texture().pixels()[0..4], &[0, 0, 255, 255]);
        p.commit(false);
        assert_eq!(&p.texture().pixels()[0..4], &[255, 0, 0, 255]);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn destroy_releases_texture() {
        let mut p = Palette::new(16);
        let id = p.set_style(None, &fill(0, 1.0), true).unwrap();
        let view = p.fill_texture(Some(id)).unwrap().clone();
        p.destroy();
        assert!(view.texture().is_destroyed());
    }

    #[test]
    fn palettes_do_not_share_textures() {
        let mut a = Palette::new(16);
        let b = Palette::new(16);
        a.set_style(None, &fill(0xffffff, 1.0), true);
        assert_ne!(a.texture().id(), b.texture().id());
        assert_eq!(b.texture().version(), 0);
    }

    #[test]
    fn size_is_normalized() {
        assert_eq!(Palette::new(10).size(), 12);
        assert_eq!(Palette::new(0).size(), 4);
        assert_eq!(Palette::new(4096).size(), MAX_ATLAS_SIZE);
    }
}
