//! CPU-side texture handles shared between texture owners and renderers.
//!
//! A [`TextureHandle`] is the engine-facing identity of a GPU texture. Owners
//! (the palette) push pixels with [`TextureHandle::update`], which bumps a
//! version counter; backends compare that version against what they last
//! uploaded and re-upload lazily at bind time.

use std::cell::{Cell, Ref, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// RGBA8 texture handle.
#[derive(Debug)]
pub struct TextureHandle {
    id: TextureId,
    width: u32,
    height: u32,
    premultiplied_alpha: bool,
    pixels: RefCell<Vec<u8>>,
    version: Cell<u64>,
    touched: Cell<u64>,
    destroyed: Cell<bool>,
}

impl TextureHandle {
    /// Creates an empty (never uploaded) texture of the given size.
    pub fn new(width: u32, height: u32, premultiplied_alpha: bool) -> Self {
        Self {
            id: TextureId::next(),
            width,
            height,
            premultiplied_alpha,
            pixels: RefCell::new(Vec::new()),
            version: Cell::new(0),
            touched: Cell::new(0),
            destroyed: Cell::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }

    /// Number of completed [`update`](Self::update) calls.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Frame number of the last flush that bound this texture.
    #[inline]
    pub fn touched(&self) -> u64 {
        self.touched.get()
    }

    #[inline]
    pub(crate) fn touch(&self, frame: u64) {
        self.touched.set(frame);
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Replaces the texture contents with `rgba` (tightly packed, row-major).
    ///
    /// Returns `false` without changing anything if the texture was destroyed
    /// or `rgba` does not cover exactly `width × height` pixels.
    pub fn update(&self, rgba: &[u8]) -> bool {
        if self.is_destroyed() {
            log::warn!("update on destroyed texture {:?} ignored", self.id);
            return false;
        }
        let expected = self.width as usize * self.height as usize * 4;
        if rgba.len() != expected {
            log::warn!(
                "texture {:?}: update with {} bytes, expected {}",
                self.id,
                rgba.len(),
                expected
            );
            return false;
        }

        let mut pixels = self.pixels.borrow_mut();
        pixels.clear();
        pixels.extend_from_slice(rgba);
        self.version.set(self.version.get() + 1);
        true
    }

    /// Current CPU-side contents. Empty until the first update.
    pub fn pixels(&self) -> Ref<'_, [u8]> {
        Ref::map(self.pixels.borrow(), |p| p.as_slice())
    }

    /// Releases the CPU copy and marks the handle dead. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.pixels.borrow_mut().clear();
        self.pixels.borrow_mut().shrink_to_fit();
    }
}
