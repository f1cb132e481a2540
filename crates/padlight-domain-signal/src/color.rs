use serde::{Deserialize, Serialize};
use std::fmt;

pub const CHANNEL_MAX: u8 = 63;

/// RGB value in the 0..=63 per-channel space used by the pad firmwares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: CHANNEL_MAX,
        g: CHANNEL_MAX,
        b: CHANNEL_MAX,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r.min(CHANNEL_MAX),
            g: g.min(CHANNEL_MAX),
            b: b.min(CHANNEL_MAX),
        }
    }

    pub fn gray(value: u8) -> Self {
        Self::new(value, value, value)
    }

    pub fn red(&self) -> u8 {
        self.r
    }

    pub fn green(&self) -> u8 {
        self.g
    }

    pub fn blue(&self) -> u8 {
        self.b
    }

    // Out-of-range writes keep the previous value.
    pub fn set_red(&mut self, r: u8) {
        if r <= CHANNEL_MAX {
            self.r = r;
        }
    }

    pub fn set_green(&mut self, g: u8) {
        if g <= CHANNEL_MAX {
            self.g = g;
        }
    }

    pub fn set_blue(&mut self, b: u8) {
        if b <= CHANNEL_MAX {
            self.b = b;
        }
    }

    pub fn is_lit(&self) -> bool {
        self.r != 0 || self.g != 0 || self.b != 0
    }

    /// Blend `other` into `self`. Multiply scales channel-wise by the other's
    /// fraction of max; otherwise screen blending
    /// `max - (max - self) * (max - other) / max`.
    pub fn mix(&self, other: &Color, multiply: bool) -> Color {
        let channel = |a: u8, b: u8| -> u8 {
            let (a, b, max) = (a as u16, b as u16, CHANNEL_MAX as u16);
            let value = if multiply {
                a * b / max
            } else {
                max - (max - a) * (max - b) / max
            };
            value as u8
        };

        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }

    pub fn to_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Channels scaled to the 0..=127 range some firmwares expect.
    pub fn scaled(&self, factor: u8) -> [u8; 3] {
        let scale = |c: u8| (c as u16 * factor as u16).min(127) as u8;
        [scale(self.r), scale(self.g), scale(self.b)]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}
