use std::fmt;

/// Straight-alpha RGBA color with channels in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    MissingHash,
    InvalidLength(usize),
    InvalidDigit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::MissingHash => write!(f, "hex color must start with '#'"),
            ColorParseError::InvalidLength(n) => {
                write!(f, "hex color must have 3, 4, 6 or 8 digits, found {n}")
            }
            ColorParseError::InvalidDigit(c) => write!(f, "invalid hex digit {c:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from a packed `0xRRGGBB` value.
    pub fn from_rgb_u32(rgb: u32) -> Self {
        let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0), 1.0)
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let digits = s.strip_prefix('#').ok_or(ColorParseError::MissingHash)?;
        let mut nibbles = Vec::with_capacity(digits.len());
        for c in digits.chars() {
            let v = c.to_digit(16).ok_or(ColorParseError::InvalidDigit(c))?;
            nibbles.push(v as u8);
        }

        let bytes: Vec<u8> = match nibbles.len() {
            3 | 4 => nibbles.iter().map(|n| n * 17).collect(),
            6 | 8 => nibbles.chunks(2).map(|p| p[0] * 16 + p[1]).collect(),
            n => return Err(ColorParseError::InvalidLength(n)),
        };

        let unit = |b: u8| b as f32 / 255.0;
        let a = bytes.get(3).copied().map(unit).unwrap_or(1.0);
        Ok(Self::new(unit(bytes[0]), unit(bytes[1]), unit(bytes[2]), a))
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Per-channel linear interpolation; exact at `t = 0` and `t = 1`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Perceived brightness, used to check ramp ordering.
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_hex(self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                byte(self.r),
                byte(self.g),
                byte(self.b),
                byte(self.a)
            )
        }
    }
}
