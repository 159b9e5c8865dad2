use serde::{Deserialize, Serialize};

/// A mark color, as stored in an SFD `Colour` record (`0xRRGGBB`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Color {
            r: ((packed >> 16) & 0xff) as u8,
            g: ((packed >> 8) & 0xff) as u8,
            b: (packed & 0xff) as u8,
            a: 0xff,
        }
    }
}
