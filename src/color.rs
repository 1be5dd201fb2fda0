//! RGBA color with the componentwise tint math used by the render context.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub const WHITE: Color = Color::from_hex(0xFFFFFF);
    pub const BLACK: Color = Color::from_hex(0x000000);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Componentwise product, used for tint inheritance down the tree.
    pub fn multiply(&self, other: Color) -> Color {
        Color::rgba(
            self.r * other.r,
            self.g * other.g,
            self.b * other.b,
            self.a * other.a,
        )
    }

    /// Clamp every channel to [0, 1].
    pub fn clamped(&self) -> Color {
        Color::rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Parent tint times local tint, clamped per channel. The effective tint
    /// never leaves [0, 1]^4 regardless of the inputs.
    pub fn tinted_by(&self, parent: Color) -> Color {
        parent.multiply(*self).clamped()
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tint_composition() {
        let parent = Color::rgba(0.5, 1.0, 0.25, 0.8);
        let local = Color::rgba(0.5, 0.5, 1.0, 1.0);
        let tint = local.tinted_by(parent);
        assert_eq!(tint, Color::rgba(0.25, 0.5, 0.25, 0.8));
    }

    #[test]
    fn test_tint_clamps_out_of_range_inputs() {
        let parent = Color::rgba(2.0, 1.0, 1.0, 1.0);
        let local = Color::rgba(3.0, 0.5, -1.0, 1.0);
        let tint = local.tinted_by(parent);
        assert_eq!(tint, Color::rgba(1.0, 0.5, 0.0, 1.0));
    }

    #[test]
    fn test_tint_in_unit_range_stays_unclamped() {
        // For inputs in [0,1]^4 the composed tint equals the raw product.
        let parent = Color::rgba(0.9, 0.7, 0.3, 1.0);
        let local = Color::rgba(0.5, 0.5, 0.5, 0.5);
        assert_eq!(local.tinted_by(parent), parent.multiply(local));
    }

    #[test]
    fn test_from_hex() {
        let c = Color::from_hex(0xFF8000);
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert!(c.b.abs() < 1e-6);
    }
}
