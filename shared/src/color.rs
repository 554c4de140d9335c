use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed palette a tile can be painted with.
///
/// Discriminants are the stable wire ids front ends index by, so variants
/// must only ever be appended.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Gray = 1,
    Silver = 2,
    White = 3,
    Maroon = 4,
    Red = 5,
    Olive = 6,
    Yellow = 7,
    Green = 8,
    Lime = 9,
    Teal = 10,
    Aqua = 11,
    Navy = 12,
    Blue = 13,
    Purple = 14,
    Fuchsia = 15,
}

impl Color {
    /// Every palette entry in id order
    pub const ALL: [Color; 16] = [
        Color::Black,
        Color::Gray,
        Color::Silver,
        Color::White,
        Color::Maroon,
        Color::Red,
        Color::Olive,
        Color::Yellow,
        Color::Green,
        Color::Lime,
        Color::Teal,
        Color::Aqua,
        Color::Navy,
        Color::Blue,
        Color::Purple,
        Color::Fuchsia,
    ];

    /// Colour every cell of a freshly created board is filled with
    pub const DEFAULT: Color = Color::White;

    /// Looks up a palette entry by its wire id; `None` means not in the palette.
    pub fn from_id(id: u8) -> Option<Color> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::Gray => "gray",
            Color::Silver => "silver",
            Color::White => "white",
            Color::Maroon => "maroon",
            Color::Red => "red",
            Color::Olive => "olive",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Lime => "lime",
            Color::Teal => "teal",
            Color::Aqua => "aqua",
            Color::Navy => "navy",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Fuchsia => "fuchsia",
        }
    }

    /// Finds a palette entry by its lowercase name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Color> {
        Self::ALL
            .iter()
            .copied()
            .find(|color| color.name().eq_ignore_ascii_case(name))
    }

    /// RGB triple for front ends that draw the board
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Black => (0x00, 0x00, 0x00),
            Color::Gray => (0x80, 0x80, 0x80),
            Color::Silver => (0xC0, 0xC0, 0xC0),
            Color::White => (0xFF, 0xFF, 0xFF),
            Color::Maroon => (0x80, 0x00, 0x00),
            Color::Red => (0xFF, 0x00, 0x00),
            Color::Olive => (0x80, 0x80, 0x00),
            Color::Yellow => (0xFF, 0xFF, 0x00),
            Color::Green => (0x00, 0x80, 0x00),
            Color::Lime => (0x00, 0xFF, 0x00),
            Color::Teal => (0x00, 0x80, 0x80),
            Color::Aqua => (0x00, 0xFF, 0xFF),
            Color::Navy => (0x00, 0x00, 0x80),
            Color::Blue => (0x00, 0x00, 0xFF),
            Color::Purple => (0x80, 0x00, 0x80),
            Color::Fuchsia => (0xFF, 0x00, 0xFF),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_palette_order() {
        for (index, color) in Color::ALL.iter().enumerate() {
            assert_eq!(color.id() as usize, index);
            assert_eq!(Color::from_id(color.id()), Some(*color));
        }
    }

    #[test]
    fn test_unknown_id_is_not_in_palette() {
        assert_eq!(Color::from_id(16), None);
        assert_eq!(Color::from_id(u8::MAX), None);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Color::from_name("red"), Some(Color::Red));
        assert_eq!(Color::from_name("FUCHSIA"), Some(Color::Fuchsia));
        assert_eq!(Color::from_name("mauve"), None);
    }

    #[test]
    fn test_default_is_white() {
        assert_eq!(Color::default(), Color::White);
        assert_eq!(Color::White.rgb(), (0xFF, 0xFF, 0xFF));
    }
}
