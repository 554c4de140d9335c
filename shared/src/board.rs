//! The shared canvas: a fixed `dim x dim` grid of tiles.
//!
//! The server owns the authoritative copy and hands out snapshots; clients keep
//! a mirror that they patch with every `TileChanged` broadcast.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of the board as last written
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    pub color: Color,
    /// Identity of the last writer, empty for untouched cells
    pub owner: String,
    /// Server-assigned write time in milliseconds since the Unix epoch
    pub time: u64,
}

impl Tile {
    pub fn new(row: u32, col: u32, color: Color, owner: impl Into<String>, time: u64) -> Self {
        Self {
            row,
            col,
            color,
            owner: owner.into(),
            time,
        }
    }
}

/// A repaint request as sent by a client.
///
/// The colour travels as a raw palette id so an unknown colour is something
/// [`Board::validate`] rejects rather than a decode failure. Ownership and time
/// are never taken from the client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub row: u32,
    pub col: u32,
    pub color: u8,
}

impl TileRequest {
    pub fn new(row: u32, col: u32, color: Color) -> Self {
        Self {
            row,
            col,
            color: color.id(),
        }
    }

    /// Turns the request into a tile stamped with `owner` and `time`.
    ///
    /// Returns `None` when the colour id is outside the palette.
    pub fn into_tile(self, owner: &str, time: u64) -> Option<Tile> {
        let color = Color::from_id(self.color)?;
        Some(Tile::new(self.row, self.col, color, owner, time))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Board {
    dim: u32,
    /// Row-major, always exactly `dim * dim` entries
    tiles: Vec<Tile>,
}

impl Board {
    /// Creates a board filled with [`Color::DEFAULT`], every cell stamped with `time`.
    pub fn new(dim: u32, time: u64) -> Self {
        let mut tiles = Vec::with_capacity((dim as usize) * (dim as usize));
        for row in 0..dim {
            for col in 0..dim {
                tiles.push(Tile::new(row, col, Color::DEFAULT, String::new(), time));
            }
        }

        Self { dim, tiles }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        if row < self.dim && col < self.dim {
            Some(row as usize * self.dim as usize + col as usize)
        } else {
            None
        }
    }

    fn in_bounds(&self, row: u32, col: u32) -> bool {
        self.index(row, col).is_some()
    }

    /// True iff the coordinates are on the board and the colour is in the palette.
    ///
    /// Ownership and ordering are deliberately not checked: anyone may repaint
    /// any cell.
    pub fn validate(&self, request: &TileRequest) -> bool {
        self.in_bounds(request.row, request.col) && Color::from_id(request.color).is_some()
    }

    /// Overwrites the target cell with `tile`.
    ///
    /// Callers validate first; a tile outside the board is ignored and `false`
    /// is returned so the grid is never left half-written.
    pub fn apply(&mut self, tile: Tile) -> bool {
        match self.index(tile.row, tile.col) {
            Some(index) => {
                self.tiles[index] = tile;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Tile> {
        self.index(row, col).map(|index| &self.tiles[index])
    }

    /// Independent copy of the whole grid.
    ///
    /// Atomicity comes from the caller: the copy is as consistent as the lock
    /// held while taking it.
    pub fn snapshot(&self) -> Board {
        self.clone()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        // chunks() rejects a zero size; an empty board simply has no rows
        self.tiles.chunks(self.dim.max(1) as usize)
    }

    /// Checks a board received from the network before it is trusted.
    pub fn is_well_formed(&self) -> bool {
        let expected = (self.dim as usize) * (self.dim as usize);
        self.tiles.len() == expected
            && self.tiles.iter().enumerate().all(|(index, tile)| {
                self.index(tile.row, tile.col) == Some(index)
            })
    }
}

/// Renders one hex colour id per cell, one line per row.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for tile in row {
                write!(f, "{:X}", tile.color.id())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_fully_populated() {
        let board = Board::new(4, 1000);
        assert_eq!(board.dim(), 4);
        assert_eq!(board.tiles().count(), 16);
        assert!(board.is_well_formed());

        for tile in board.tiles() {
            assert_eq!(tile.color, Color::DEFAULT);
            assert_eq!(tile.time, 1000);
            assert!(tile.owner.is_empty());
        }
    }

    #[test]
    fn test_validate_accepts_every_in_bounds_palette_request() {
        let board = Board::new(3, 0);
        for row in 0..3 {
            for col in 0..3 {
                for color in Color::ALL {
                    assert!(board.validate(&TileRequest::new(row, col, color)));
                }
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let board = Board::new(3, 0);
        assert!(!board.validate(&TileRequest::new(3, 0, Color::Red)));
        assert!(!board.validate(&TileRequest::new(0, 3, Color::Red)));
        assert!(!board.validate(&TileRequest::new(5, 5, Color::Red)));
        assert!(!board.validate(&TileRequest::new(u32::MAX, 0, Color::Red)));
    }

    #[test]
    fn test_validate_rejects_unknown_color() {
        let board = Board::new(3, 0);
        let request = TileRequest {
            row: 1,
            col: 1,
            color: 42,
        };
        assert!(!board.validate(&request));
        assert!(request.into_tile("alice", 5).is_none());
    }

    #[test]
    fn test_apply_changes_only_target_cell() {
        let mut board = Board::new(3, 0);
        let before = board.snapshot();

        assert!(board.apply(Tile::new(1, 1, Color::Red, "alice", 77)));

        let after = board.snapshot();
        for (old, new) in before.tiles().zip(after.tiles()) {
            if old.row == 1 && old.col == 1 {
                assert_eq!(new, &Tile::new(1, 1, Color::Red, "alice", 77));
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn test_apply_out_of_bounds_is_ignored() {
        let mut board = Board::new(2, 0);
        let before = board.snapshot();
        assert!(!board.apply(Tile::new(2, 0, Color::Red, "alice", 1)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut board = Board::new(2, 0);
        let snapshot = board.snapshot();
        board.apply(Tile::new(0, 0, Color::Blue, "bob", 9));

        assert_eq!(snapshot.get(0, 0).map(|t| t.color), Some(Color::White));
        assert_eq!(board.get(0, 0).map(|t| t.color), Some(Color::Blue));
    }

    #[test]
    fn test_malformed_board_detected() {
        let mut board = Board::new(2, 0);
        board.tiles.pop();
        assert!(!board.is_well_formed());

        let mut swapped = Board::new(2, 0);
        swapped.tiles.swap(0, 3);
        assert!(!swapped.is_well_formed());
    }

    #[test]
    fn test_display_renders_hex_ids() {
        let mut board = Board::new(2, 0);
        board.apply(Tile::new(0, 1, Color::Fuchsia, "carol", 3));
        assert_eq!(board.to_string(), "3F\n33\n");
    }
}
