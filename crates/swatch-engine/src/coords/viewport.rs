/// Viewport size in logical pixels.
///
/// The batch backend derives its projection from this size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Column-major 4×4 orthographic projection mapping logical pixels
    /// (top-left origin, +Y down) to NDC.
    pub fn projection(self) -> [f32; 16] {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        [
            2.0 / w, 0.0, 0.0, 0.0, //
            0.0, -2.0 / h, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            -1.0, 1.0, 0.0, 1.0,
        ]
    }
}
