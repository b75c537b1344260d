//! One-ply greedy target selection over the machine player's bottle.

use super::playfield::{Cell, FallingPiece, Playfield, Tile};

/// The heuristic's entire persistent working memory: two bytes of RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiState {
    pub target_column: Option<u8>,
    pub best_score: u8,
}

impl AiState {
    /// Stored target byte meaning "no target". Any value with bit 7 set
    /// decodes as no target.
    pub const NO_TARGET: u8 = 0xFF;
    /// Best score before any candidate has been seen.
    pub const NO_SCORE: u8 = 0xFF;

    pub fn decode(target: u8, best_score: u8) -> Self {
        Self {
            target_column: (target & 0x80 == 0).then_some(target),
            best_score,
        }
    }

    pub fn target_byte(&self) -> u8 {
        self.target_column.unwrap_or(Self::NO_TARGET)
    }

    pub fn clear_target(&mut self) {
        self.target_column = None;
    }
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            target_column: None,
            best_score: Self::NO_SCORE,
        }
    }
}

/// Column the piece must occupy for one of its halves to land on the
/// virus in `cell`. The left half lands on the virus's own column, the
/// right half one column to the left of it.
pub fn candidate_column(cell: Cell, piece: &FallingPiece) -> Option<u8> {
    let Tile::Virus(color) = cell.tile else {
        return None;
    };
    if color.code() == piece.left_color {
        Some(cell.column)
    } else if color.code() == piece.right_color {
        cell.column.checked_sub(1)
    } else {
        None
    }
}

/// A candidate scores its virus's row; lower is better, so the top-most
/// reachable virus wins.
pub fn score(row: u8) -> u8 {
    row
}

/// Run one evaluation pass and return the column to steer towards.
///
/// `best_score` restarts at the sentinel every pass. The target is only
/// replaced by a surviving candidate, so a pass with no candidates keeps
/// the previous target, and with no previous target falls back to
/// `default_column`. Ties keep the first candidate in scan order, and
/// since the scan is row-major the first surviving candidate is also the
/// best one.
pub fn select(
    grid: &Playfield,
    piece: &FallingPiece,
    state: &mut AiState,
    default_column: u8,
) -> u8 {
    state.best_score = AiState::NO_SCORE;

    for cell in grid.scan() {
        let Some(column) = candidate_column(cell, piece) else {
            continue;
        };
        if !grid.column_open(column) {
            continue;
        }
        let score = score(cell.row);
        if score < state.best_score {
            state.best_score = score;
            state.target_column = Some(column);
        }
    }

    *state.target_column.get_or_insert(default_column)
}
