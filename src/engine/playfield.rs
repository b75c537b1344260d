//! Playfield grid, tile classification and the fixed scan order.

use std::fmt;
use std::iter::FusedIterator;

use crate::memory::map::{PLAYFIELD_CELLS, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};

// ─────────────────────────────────────────────────────────────────────────────
//  Tile codes
// ─────────────────────────────────────────────────────────────────────────────

pub const TILE_EMPTY: u8 = 0xFF;
/// First virus code; the low bits carry the colour.
pub const TILE_VIRUS: u8 = 0xD0;
pub const COLORS: u8 = 3;

const CAPSULE_FIRST: u8 = 0x40;
const CAPSULE_LAST: u8 = 0x72;
const CAPSULE_RED: u8 = 0x5C;
const CAPSULE_BLUE: u8 = 0x68;
const PELLET_FIRST: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Yellow = 0,
    Red = 1,
    Blue = 2,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Yellow, Color::Red, Color::Blue];

    /// Colour as stored in the falling-piece descriptor.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Color::Yellow),
            1 => Some(Color::Red),
            2 => Some(Color::Blue),
            _ => None,
        }
    }

    pub fn virus_tile(self) -> u8 {
        TILE_VIRUS + self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Virus(Color),
    Piece(Color),
    Other(u8),
}

impl Tile {
    pub fn classify(code: u8) -> Self {
        match code {
            TILE_EMPTY => Tile::Empty,
            c if c.wrapping_sub(TILE_VIRUS) < COLORS => {
                Color::from_code(c - TILE_VIRUS).map_or(Tile::Other(c), Tile::Virus)
            }
            CAPSULE_FIRST..=CAPSULE_LAST => Tile::Piece(if code < CAPSULE_RED {
                Color::Yellow
            } else if code < CAPSULE_BLUE {
                Color::Red
            } else {
                Color::Blue
            }),
            c if c.wrapping_sub(PELLET_FIRST) < COLORS => {
                Color::from_code(c - PELLET_FIRST).map_or(Tile::Other(c), Tile::Piece)
            }
            other => Tile::Other(other),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Grid
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: u8,
    pub column: u8,
    pub tile: Tile,
}

/// One player's bottle, row-major, row 0 at the top.
#[derive(Clone, PartialEq, Eq)]
pub struct Playfield {
    cells: [u8; PLAYFIELD_CELLS],
}

impl Playfield {
    pub fn empty() -> Self {
        Self {
            cells: [TILE_EMPTY; PLAYFIELD_CELLS],
        }
    }

    pub fn from_bytes(cells: [u8; PLAYFIELD_CELLS]) -> Self {
        Self { cells }
    }

    fn index(row: u8, column: u8) -> usize {
        row as usize * PLAYFIELD_WIDTH + column as usize
    }

    /// Raw tile code. Panics outside the grid.
    pub fn code(&self, row: u8, column: u8) -> u8 {
        self.cells[Self::index(row, column)]
    }

    pub fn tile(&self, row: u8, column: u8) -> Tile {
        Tile::classify(self.code(row, column))
    }

    pub fn set(&mut self, row: u8, column: u8, code: u8) -> &mut Self {
        self.cells[Self::index(row, column)] = code;
        self
    }

    /// Whether the top cell of `column` is free.
    pub fn column_open(&self, column: u8) -> bool {
        self.tile(0, column).is_empty()
    }

    /// Left-to-right, top-to-bottom traversal. Restartable: every call
    /// starts again at (0, 0).
    pub fn scan(&self) -> Scan<'_> {
        Scan {
            field: self,
            index: 0,
        }
    }

    pub fn virus_count(&self) -> usize {
        self.scan()
            .filter(|c| matches!(c.tile, Tile::Virus(_)))
            .count()
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Playfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for row in 0..PLAYFIELD_HEIGHT as u8 {
            for column in 0..PLAYFIELD_WIDTH as u8 {
                let ch = match self.tile(row, column) {
                    Tile::Empty => '.',
                    Tile::Virus(Color::Yellow) => 'y',
                    Tile::Virus(Color::Red) => 'r',
                    Tile::Virus(Color::Blue) => 'b',
                    Tile::Piece(Color::Yellow) => 'Y',
                    Tile::Piece(Color::Red) => 'R',
                    Tile::Piece(Color::Blue) => 'B',
                    Tile::Other(_) => '#',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct Scan<'a> {
    field: &'a Playfield,
    index: usize,
}

impl Iterator for Scan<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        let code = *self.field.cells.get(self.index)?;
        let cell = Cell {
            row: (self.index / PLAYFIELD_WIDTH) as u8,
            column: (self.index % PLAYFIELD_WIDTH) as u8,
            tile: Tile::classify(code),
        };
        self.index += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = PLAYFIELD_CELLS.saturating_sub(self.index);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Scan<'_> {}
impl FusedIterator for Scan<'_> {}

// ─────────────────────────────────────────────────────────────────────────────
//  Falling piece
// ─────────────────────────────────────────────────────────────────────────────

/// The capsule under control. Colours are raw descriptor bytes (0..=2 for
/// a real capsule); `x` is the column of the left half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallingPiece {
    pub left_color: u8,
    pub right_color: u8,
    pub x: u8,
    pub y: u8,
    pub orientation: u8,
}

impl FallingPiece {
    pub fn new(left: Color, right: Color, x: u8) -> Self {
        Self {
            left_color: left.code(),
            right_color: right.code(),
            x,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_tile_codes() {
        assert_eq!(Tile::classify(0xFF), Tile::Empty);
        assert_eq!(Tile::classify(0xD0), Tile::Virus(Color::Yellow));
        assert_eq!(Tile::classify(0xD1), Tile::Virus(Color::Red));
        assert_eq!(Tile::classify(0xD2), Tile::Virus(Color::Blue));
        assert_eq!(Tile::classify(0xD3), Tile::Other(0xD3));
        assert_eq!(Tile::classify(0x4C), Tile::Piece(Color::Yellow));
        assert_eq!(Tile::classify(0x5C), Tile::Piece(Color::Red));
        assert_eq!(Tile::classify(0x72), Tile::Piece(Color::Blue));
        assert_eq!(Tile::classify(0x81), Tile::Piece(Color::Red));
        assert_eq!(Tile::classify(0x00), Tile::Other(0x00));
    }

    #[test]
    fn scan_is_row_major_and_restartable() {
        let mut field = Playfield::empty();
        field.set(0, 7, 0xD0).set(1, 0, 0xD2);

        let cells: Vec<Cell> = field.scan().collect();
        assert_eq!(cells.len(), PLAYFIELD_CELLS);
        assert_eq!((cells[7].row, cells[7].column), (0, 7));
        assert_eq!(cells[7].tile, Tile::Virus(Color::Yellow));
        assert_eq!((cells[8].row, cells[8].column), (1, 0));
        assert_eq!(cells[8].tile, Tile::Virus(Color::Blue));

        let again: Vec<Cell> = field.scan().collect();
        assert_eq!(cells, again);
        assert_eq!(field.virus_count(), 2);
    }

    #[test]
    fn scan_reports_exact_length() {
        let field = Playfield::empty();
        let mut scan = field.scan();
        scan.next();
        assert_eq!(scan.len(), PLAYFIELD_CELLS - 1);
        assert_eq!(scan.by_ref().count(), PLAYFIELD_CELLS - 1);
        assert!(scan.next().is_none());
    }
}
