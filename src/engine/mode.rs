//! Mode flag, game phase and the throttle that paces evaluations.

use crate::memory::{LiveState, Memory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlag {
    Baseline,
    Assisted,
}

impl ModeFlag {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            ModeFlag::Baseline
        } else {
            ModeFlag::Assisted
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ModeFlag::Baseline => 0,
            ModeFlag::Assisted => 1,
        }
    }
}

/// Coarse classification of the host's game-phase counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Gameplay,
}

impl Phase {
    pub fn classify(counter: u8, threshold: u8) -> Self {
        if counter >= threshold {
            Phase::Gameplay
        } else {
            Phase::Setup
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Baseline,
    AssistedSetup,
    AssistedGameplay,
}

impl Mode {
    pub fn resolve(flag: ModeFlag, phase: Phase) -> Self {
        match (flag, phase) {
            (ModeFlag::Baseline, _) => Mode::Baseline,
            (ModeFlag::Assisted, Phase::Setup) => Mode::AssistedSetup,
            (ModeFlag::Assisted, Phase::Gameplay) => Mode::AssistedGameplay,
        }
    }
}

/// One press of the menu's mode-select button. Replaces the host's
/// 1P/2P flip with a three-way cycle:
///
/// ```text
/// 1P  ->  2P  ->  2P + assisted  ->  1P
/// ```
///
/// Entering assisted clears the AI target so the first evaluation starts
/// from scratch. Returns the flag after the press.
pub fn toggle<M: Memory>(live: &mut LiveState<'_, M>) -> ModeFlag {
    let count = live.player_count();
    if count == 1 {
        live.set_player_count(count.wrapping_add(1));
    } else if live.mode_flag() == ModeFlag::Assisted {
        live.set_mode_flag(ModeFlag::Baseline);
        live.set_player_count(count.wrapping_sub(1));
    } else {
        live.set_mode_flag(ModeFlag::Assisted);
        live.clear_ai_target();
    }
    live.mode_flag()
}

/// Gates the heuristic to one frame in every `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    mask: u8,
}

impl Throttle {
    /// `interval` must be a power of two (checked by `Config::validate`).
    pub fn new(interval: u8) -> Self {
        Self {
            mask: interval.wrapping_sub(1),
        }
    }

    pub fn fires(&self, frame: u8) -> bool {
        frame & self.mask == 0
    }
}
