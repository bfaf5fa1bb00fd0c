/// 24-bit `0xRRGGBB` color as used by SVG fills and strokes.
///
/// Alpha travels separately (see [`FillStyle`](super::FillStyle)) so the same
/// color value can be reused with different opacities.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
    pub const WHITE: Rgb = Rgb(0xffffff);

    /// Builds a color from any integer, dropping bits above 24.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value & 0xff_ffff)
    }

    #[inline]
    pub const fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r(), self.g(), self.b()]
    }
}

impl From<u32> for Rgb {
    #[inline]
    fn from(value: u32) -> Self {
        Rgb::new(value)
    }
}

/// Quantizes a unit-range value to one 8-bit channel: `round(v * 255)`.
///
/// Values outside `[0, 1]` saturate; NaN maps to 0.
#[inline]
pub fn unit_to_byte(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_split_and_join() {
        let c = Rgb::new(0x12_34_56);
        assert_eq!(c.to_bytes(), [0x12, 0x34, 0x56]);
        assert_eq!(Rgb::from_bytes(0x12, 0x34, 0x56), c);
    }

    #[test]
    fn new_drops_high_bits() {
        assert_eq!(Rgb::new(0xff_00ff00), Rgb(0x00ff00));
    }

    #[test]
    fn unit_to_byte_rounds_half_up() {
        assert_eq!(unit_to_byte(0.5), 128);
        assert_eq!(unit_to_byte(1.0), 255);
        assert_eq!(unit_to_byte(0.0), 0);
    }

    #[test]
    fn unit_to_byte_saturates() {
        assert_eq!(unit_to_byte(2.0), 255);
        assert_eq!(unit_to_byte(-1.0), 0);
        assert_eq!(unit_to_byte(f32::NAN), 0);
    }
}
