//! Typed accessors over the live-state addresses.
//!
//! Only the fields the injected routines own have setters: the mode flag,
//! the AI state, the machine player's input register and the player count
//! (rewritten by the mode-select hook in place of the host's own store).

use super::map::{MemoryMap, MACHINE, PLAYFIELD_CELLS};
use super::Memory;
use crate::engine::mode::ModeFlag;
use crate::engine::playfield::{FallingPiece, Playfield};
use crate::engine::select::AiState;

pub struct LiveState<'a, M: Memory> {
    mem: &'a mut M,
    map: &'a MemoryMap,
}

impl<'a, M: Memory> LiveState<'a, M> {
    pub fn new(mem: &'a mut M, map: &'a MemoryMap) -> Self {
        Self { mem, map }
    }

    // ── host-owned, read only ──────────────────────────────────

    pub fn frame_counter(&self) -> u8 {
        self.mem.peek(self.map.frame_counter)
    }

    pub fn game_phase(&self) -> u8 {
        self.mem.peek(self.map.game_phase)
    }

    pub fn player_count(&self) -> u8 {
        self.mem.peek(self.map.player_count)
    }

    pub fn input(&self, player: usize) -> u8 {
        self.mem.peek(self.map.inputs[player])
    }

    pub fn falling_piece(&self, player: usize) -> FallingPiece {
        let p = &self.map.pieces[player];
        FallingPiece {
            left_color: self.mem.peek(p.left_color),
            right_color: self.mem.peek(p.right_color),
            x: self.mem.peek(p.x),
            y: self.mem.peek(p.y),
            orientation: self.mem.peek(p.orientation),
        }
    }

    pub fn virus_count(&self, player: usize) -> u8 {
        self.mem.peek(self.map.virus_counts[player])
    }

    pub fn playfield(&self, player: usize) -> Playfield {
        let mut cells = [0u8; PLAYFIELD_CELLS];
        self.mem.peek_into(self.map.playfields[player], &mut cells);
        Playfield::from_bytes(cells)
    }

    // ── owned by the injected routines ─────────────────────────

    pub fn mode_flag(&self) -> ModeFlag {
        ModeFlag::from_byte(self.mem.peek(self.map.mode_flag))
    }

    pub fn set_mode_flag(&mut self, flag: ModeFlag) {
        self.mem.poke(self.map.mode_flag, flag.to_byte());
    }

    pub fn ai_state(&self) -> AiState {
        AiState::decode(
            self.mem.peek(self.map.ai_target),
            self.mem.peek(self.map.ai_best),
        )
    }

    pub fn set_ai_state(&mut self, state: &AiState) {
        self.mem.poke(self.map.ai_target, state.target_byte());
        self.mem.poke(self.map.ai_best, state.best_score);
    }

    /// Reset only the target byte, leaving the best score as it is.
    pub fn clear_ai_target(&mut self) {
        self.mem.poke(self.map.ai_target, AiState::NO_TARGET);
    }

    pub fn set_machine_input(&mut self, value: u8) {
        self.mem.poke(self.map.inputs[MACHINE], value);
    }

    pub fn set_player_count(&mut self, count: u8) {
        self.mem.poke(self.map.player_count, count);
    }
}
