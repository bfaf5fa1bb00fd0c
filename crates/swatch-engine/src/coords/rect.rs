use super::Vec2;

/// Axis-aligned rectangle (top-left origin).
///
/// Used for palette cell frames and for the bounding boxes that drive
/// bounds-normalized UVs.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y + self.size.y)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Smallest rectangle enclosing every point, or `None` for an empty slice.
    pub fn bounding(points: &[Vec2]) -> Option<Rect> {
        let (first, rest) = points.split_first()?;
        let (lo, hi) = rest
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Rect::new(lo.x, lo.y, hi.x - lo.x, hi.y - lo.y))
    }

    /// Maps `p` into this rectangle's unit square.
    ///
    /// A zero-extent axis maps to `0.0` instead of producing NaN.
    #[inline]
    pub fn normalize(self, p: Vec2) -> [f32; 2] {
        let u = if self.size.x > 0.0 { (p.x - self.origin.x) / self.size.x } else { 0.0 };
        let v = if self.size.y > 0.0 { (p.y - self.origin.y) / self.size.y } else { 0.0 };
        [u, v]
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < (self.origin.x + self.size.x)
            && p.y < (self.origin.y + self.size.y)
    }
}
