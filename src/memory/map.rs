//! Per-version address tables for the supported target image.
//!
//! Everything here is an external contract with the host game: the live
//! state addresses are read and written by the injected routines, and the
//! hook sites carry the exact bytes the patcher expects to find.

// ─────────────────────────────────────────────────────────────────────────────
//  Playfield geometry
// ─────────────────────────────────────────────────────────────────────────────

pub const PLAYFIELD_WIDTH: usize = 8;
pub const PLAYFIELD_HEIGHT: usize = 16;
pub const PLAYFIELD_CELLS: usize = PLAYFIELD_WIDTH * PLAYFIELD_HEIGHT;

/// Player index of the human side.
pub const HUMAN: usize = 0;
/// Player index of the machine-controlled side.
pub const MACHINE: usize = 1;

// ─────────────────────────────────────────────────────────────────────────────
//  Live state
// ─────────────────────────────────────────────────────────────────────────────

/// Addresses of one player's falling-piece descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceMap {
    pub left_color: u16,
    pub right_color: u16,
    pub x: u16,
    pub y: u16,
    pub orientation: u16,
}

/// Named live-state addresses. Indexed arrays are `[HUMAN, MACHINE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    /// AIState.target_column (sentinel when bit 7 is set).
    pub ai_target: u16,
    /// AIState.best_score.
    pub ai_best: u16,
    /// ModeFlag: zero is baseline, anything else is assisted.
    pub mode_flag: u16,
    pub frame_counter: u16,
    pub game_phase: u16,
    pub player_count: u16,
    pub inputs: [u16; 2],
    pub pieces: [PieceMap; 2],
    pub virus_counts: [u16; 2],
    /// Row-major playfield bases, one tile code per cell.
    pub playfields: [u16; 2],
}

impl MemoryMap {
    /// Addresses written by the injected routines. Everything else in the
    /// live state belongs to the host game.
    pub fn owned(&self) -> [u16; 5] {
        [
            self.ai_target,
            self.ai_best,
            self.mode_flag,
            self.inputs[MACHINE],
            self.player_count,
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Image layout
// ─────────────────────────────────────────────────────────────────────────────

/// A location in the image whose instruction bytes get redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookSite {
    /// iNES file offset.
    pub offset: usize,
    /// Bytes the host game has there before patching.
    pub original: &'static [u8],
}

impl HookSite {
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

/// Everything the installer needs to know about one target image version.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub name: &'static str,
    pub memory: MemoryMap,
    /// `STA $F6; RTS` at the end of the controller-read routine.
    pub input_site: HookSite,
    /// `LDA $0727; EOR #$03; STA $0727` in the menu's player-count handler.
    pub mode_select_site: HookSite,
    /// Unused bytes at the top of the fixed PRG bank, as file offsets.
    pub free_region: (usize, usize),
    /// What the free region holds in an unpatched image.
    pub free_fill: u8,
}

pub static DR_MARIO_US: Profile = Profile {
    name: "dr-mario-us",
    memory: MemoryMap {
        ai_target: 0x0000,
        ai_best: 0x0001,
        mode_flag: 0x0004,
        frame_counter: 0x0043,
        game_phase: 0x0046,
        player_count: 0x0727,
        inputs: [0x00F5, 0x00F6],
        pieces: [
            PieceMap {
                left_color: 0x0301,
                right_color: 0x0302,
                x: 0x0305,
                y: 0x0306,
                orientation: 0x00A5,
            },
            PieceMap {
                left_color: 0x0381,
                right_color: 0x0382,
                x: 0x0385,
                y: 0x0386,
                orientation: 0x03A5,
            },
        ],
        virus_counts: [0x0324, 0x03A4],
        playfields: [0x0400, 0x0500],
    },
    input_site: HookSite {
        offset: 0x37CF,
        original: &[0x85, 0xF6, 0x60],
    },
    mode_select_site: HookSite {
        offset: 0x18E5,
        original: &[0xAD, 0x27, 0x07, 0x49, 0x03, 0x8D, 0x27, 0x07],
    },
    free_region: (0x7F50, 0x7FE0),
    free_fill: 0xFF,
};

/// Look up a built-in profile by name.
pub fn profile(name: &str) -> Option<&'static Profile> {
    [&DR_MARIO_US].into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_playfield_is_one_page_above_human() {
        let m = &DR_MARIO_US.memory;
        assert_eq!(m.playfields[MACHINE] - m.playfields[HUMAN], 0x100);
        assert_eq!(PLAYFIELD_CELLS, 0x80);
    }

    #[test]
    fn hook_sites_and_free_region_do_not_overlap() {
        let p = &DR_MARIO_US;
        let (start, end) = p.free_region;
        for site in [p.input_site, p.mode_select_site] {
            assert!(site.offset + site.len() <= start || site.offset >= end);
        }
        assert_eq!(end - start, 144);
    }

    #[test]
    fn profile_lookup_by_name() {
        assert!(profile("dr-mario-us").is_some());
        assert!(profile("tetris").is_none());
    }
}
