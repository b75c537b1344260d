//! Movement actuator: one button per throttled step.

use super::playfield::FallingPiece;
use crate::config::ButtonMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Right,
    Left,
    Rotate,
    Drop,
}

impl Action {
    pub fn mask(self, buttons: &ButtonMap) -> u8 {
        match self {
            Action::Right => buttons.right,
            Action::Left => buttons.left,
            Action::Rotate => buttons.rotate,
            Action::Drop => buttons.drop,
        }
    }
}

/// Steer the piece's left half towards `target_column`. Once there, a
/// single-colour capsule still lying flat (orientation 0) is stood up
/// first so both halves land in the target column; anything else drops.
pub fn act(piece: &FallingPiece, target_column: u8) -> Action {
    use std::cmp::Ordering;

    match piece.x.cmp(&target_column) {
        Ordering::Less => Action::Right,
        Ordering::Greater => Action::Left,
        Ordering::Equal if piece.left_color == piece.right_color && piece.orientation == 0 => {
            Action::Rotate
        }
        Ordering::Equal => Action::Drop,
    }
}
