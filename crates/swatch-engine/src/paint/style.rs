use super::Rgb;

/// Fill attributes of one style entry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillStyle {
    pub color: Rgb,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self { color: Rgb::BLACK, alpha: 1.0 }
    }
}

/// Stroke attributes of one style entry.
///
/// `width` and `alignment` are stored as given; the atlas encoding
/// saturates them to one byte each.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub alpha: f32,
    pub width: f32,
    pub alignment: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self { color: Rgb::BLACK, alpha: 0.0, width: 0.0, alignment: 0.0 }
    }
}

/// Merged fill + stroke for one style id.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Style {
    pub fill: FillStyle,
    pub stroke: StrokeStyle,
}

/// Partial fill update. `None` fields keep the entry's current value.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FillPatch {
    pub color: Option<Rgb>,
    pub alpha: Option<f32>,
}

impl FillPatch {
    #[inline]
    pub fn new(color: Rgb, alpha: f32) -> Self {
        Self { color: Some(color), alpha: Some(alpha) }
    }

    pub(crate) fn apply(&self, fill: &mut FillStyle) {
        if let Some(color) = self.color {
            fill.color = color;
        }
        if let Some(alpha) = self.alpha {
            fill.alpha = alpha;
        }
    }
}

/// Partial stroke update. `None` fields keep the entry's current value.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct StrokePatch {
    pub color: Option<Rgb>,
    pub alpha: Option<f32>,
    pub width: Option<f32>,
    pub alignment: Option<f32>,
}

impl StrokePatch {
    #[inline]
    pub fn new(width: f32, color: Rgb, alpha: f32, alignment: f32) -> Self {
        Self {
            color: Some(color),
            alpha: Some(alpha),
            width: Some(width),
            alignment: Some(alignment),
        }
    }

    pub(crate) fn apply(&self, stroke: &mut StrokeStyle) {
        if let Some(color) = self.color {
            stroke.color = color;
        }
        if let Some(alpha) = self.alpha {
            stroke.alpha = alpha;
        }
        if let Some(width) = self.width {
            stroke.width = width;
        }
        if let Some(alignment) = self.alignment {
            stroke.alignment = alignment;
        }
    }
}

/// A `set_style` request: either half may be absent, but not both.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct StylePatch {
    pub fill: Option<FillPatch>,
    pub stroke: Option<StrokePatch>,
}

impl StylePatch {
    #[inline]
    pub fn fill(fill: FillPatch) -> Self {
        Self { fill: Some(fill), stroke: None }
    }

    #[inline]
    pub fn stroke(stroke: StrokePatch) -> Self {
        Self { fill: None, stroke: Some(stroke) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_fields_win_absent_fields_keep() {
        let mut fill = FillStyle { color: Rgb(0x112233), alpha: 0.25 };
        FillPatch { color: None, alpha: Some(0.75) }.apply(&mut fill);
        assert_eq!(fill, FillStyle { color: Rgb(0x112233), alpha: 0.75 });
    }

    #[test]
    fn stroke_patch_merges_each_field() {
        let mut stroke = StrokeStyle::default();
        StrokePatch { width: Some(3.0), ..Default::default() }.apply(&mut stroke);
        assert_eq!(stroke.width, 3.0);
        assert_eq!(stroke.alpha, 0.0);

        StrokePatch::new(1.0, Rgb(0xff0000), 0.5, 0.5).apply(&mut stroke);
        assert_eq!(
            stroke,
            StrokeStyle { color: Rgb(0xff0000), alpha: 0.5, width: 1.0, alignment: 0.5 }
        );
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(StylePatch::default().is_empty());
        assert!(!StylePatch::fill(FillPatch::default()).is_empty());
    }
}
