use std::fmt;

use serde::{Deserialize, Serialize};

/// One color sample, 8 bits per channel.
///
/// Ephemeral by design: samples are superseded by the next one and never
/// persisted. Channel values are clamped on construction, so an `Rgb` that
/// exists is always safe to forward to the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a sample from untrusted channel values, clamping each to
    /// `0..=255`. This is the single admission point for external input.
    pub fn from_unclamped(r: i32, g: i32, b: i32) -> Self {
        let clamp = |v: i32| u8::try_from(v.clamp(0, 255)).unwrap_or(0);
        Self {
            r: clamp(r),
            g: clamp(g),
            b: clamp(b),
        }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex triplet.
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_unclamped_clamps_each_channel() {
        assert_eq!(Rgb::from_unclamped(300, -5, 128), Rgb::new(255, 0, 128));
        assert_eq!(Rgb::from_unclamped(0, 255, 42), Rgb::new(0, 255, 42));
    }

    #[test]
    fn hex_round_trip() {
        let color = Rgb::new(0x1f, 0xa0, 0x07);
        assert_eq!(Rgb::parse_hex(&color.to_hex()).unwrap(), color);
        assert_eq!(Rgb::parse_hex("ff8000").unwrap(), Rgb::new(255, 128, 0));
    }

    #[test]
    fn parse_hex_rejects_malformed_input() {
        assert!(Rgb::parse_hex("#fff").is_none());
        assert!(Rgb::parse_hex("gggggg").is_none());
        assert!(Rgb::parse_hex("#ff80001").is_none());
    }
}
