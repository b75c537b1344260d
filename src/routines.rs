//! The injected 6502 routines and the stubs written over the host's
//! call sites.
//!
//! All three routines live in the free region in the order
//! `toggle, dispatch, decide`; `dispatch` falls into `decide` with a
//! relative branch, so the two must stay adjacent.

use crate::asm::{mem, Asm, BuildError, Mnemonic::*, Operand::*, Routine};
use crate::config::Config;
use crate::engine::playfield::{COLORS, TILE_EMPTY, TILE_VIRUS};
use crate::engine::select::AiState;
use crate::memory::map::{HookSite, MemoryMap, HUMAN, MACHINE, PLAYFIELD_CELLS, PLAYFIELD_WIDTH};

pub const TOGGLE: &str = "toggle";
pub const DISPATCH: &str = "dispatch";
pub const DECIDE: &str = "decide";
pub const INPUT_SITE: &str = "input-site";
pub const MODE_SELECT_SITE: &str = "mode-select-site";

/// Byte and cycle budgets, in placement order.
pub const BUDGETS: [(&str, usize, u32); 3] = [
    (TOGGLE, 25, 80),
    (DISPATCH, 17, 48),
    (DECIDE, 102, 11_000),
];

// The scan loop walks X from 0 until it goes negative, and derives the
// row from X with three shifts.
const _: () = assert!(PLAYFIELD_CELLS == 0x80);
const _: () = assert!(PLAYFIELD_WIDTH == 8);

fn budget(name: &str) -> (usize, u32) {
    BUDGETS
        .iter()
        .find(|(n, ..)| *n == name)
        .map_or((0, 0), |&(_, bytes, cycles)| (bytes, cycles))
}

/// Mode-select hook: the 1P -> 2P -> 2P+assisted -> 1P cycle. With two
/// players `count >> 1` is 1, so `EOR` flips the flag; the flag only ever
/// holds 0 or 1 because this is its sole writer.
pub fn toggle(map: &MemoryMap) -> Result<Routine, BuildError> {
    let mut asm = Asm::new(TOGGLE);
    asm.op(Lda, mem(map.player_count))
        .op(Lsr, Accumulator)
        .branch(Bcs, "to_2p")
        .op(Eor, mem(map.mode_flag))
        .op(Sta, mem(map.mode_flag))
        .branch(Beq, "to_1p")
        .op(Lda, Immediate(AiState::NO_TARGET))
        .op(Sta, mem(map.ai_target))
        .op(Rts, Implied)
        .label("to_1p")
        .op(Dec, mem(map.player_count))
        .op(Rts, Implied)
        .label("to_2p")
        .op(Inc, mem(map.player_count))
        .op(Rts, Implied);

    let (bytes, cycles) = budget(TOGGLE);
    asm.finish(bytes, cycles)
}

/// Input hook. Entered by `JMP` with the host's input byte in A; performs
/// the host's own store first, then mirrors in setup or falls into
/// `decide` in gameplay.
pub fn dispatch(map: &MemoryMap, config: &Config) -> Result<Routine, BuildError> {
    let mut asm = Asm::new(DISPATCH);
    asm.op(Sta, mem(map.inputs[MACHINE]))
        .op(Lda, mem(map.mode_flag))
        .branch(Beq, "exit")
        .op(Lda, mem(map.game_phase))
        .op(Cmp, Immediate(config.gameplay_threshold))
        .branch(Bcs, DECIDE)
        .op(Lda, mem(map.inputs[HUMAN]))
        .op(Sta, mem(map.inputs[MACHINE]))
        .label("exit")
        .op(Rts, Implied);

    let (bytes, cycles) = budget(DISPATCH);
    asm.finish(bytes, cycles)
}

/// Throttle, scan and select, fall back, then press one button.
///
/// The scan is row-major and a candidate scores its row, so the first
/// candidate that survives the filters is the best one and ends the scan.
pub fn decide(map: &MemoryMap, config: &Config) -> Result<Routine, BuildError> {
    let grid = map.playfields[MACHINE];
    let piece = &map.pieces[MACHINE];
    let buttons = &config.buttons;

    let mut asm = Asm::new(DECIDE);
    asm.op(Lda, mem(map.frame_counter))
        .op(And, Immediate(config.throttle_mask()))
        .branch(Bne, "done")
        .op(Tax, Implied)
        .op(Lda, Immediate(AiState::NO_SCORE))
        .op(Sta, mem(map.ai_best));

    // X = cell index, Y = candidate column.
    asm.repeat(PLAYFIELD_CELLS as u32, |asm| {
        asm.label("scan")
            .op(Txa, Implied)
            .op(And, Immediate(PLAYFIELD_WIDTH as u8 - 1))
            .op(Tay, Implied)
            .op(Lda, AbsoluteX(grid))
            .op(Eor, Immediate(TILE_VIRUS))
            .op(Cmp, Immediate(COLORS))
            .branch(Bcs, "next")
            .op(Cmp, mem(piece.left_color))
            .branch(Beq, "check")
            .op(Cmp, mem(piece.right_color))
            .branch(Bne, "next")
            .op(Dey, Implied)
            .branch(Bmi, "next")
            .label("check")
            .op(Lda, AbsoluteY(grid))
            .op(Cmp, Immediate(TILE_EMPTY))
            .branch(Bne, "next")
            .op(Txa, Implied)
            .op(Lsr, Accumulator)
            .op(Lsr, Accumulator)
            .op(Lsr, Accumulator)
            .op(Sta, mem(map.ai_best))
            .op(Sty, mem(map.ai_target))
            // N is clear after the shifts.
            .branch(Bpl, "resolve")
            .label("next")
            .op(Inx, Implied)
            .branch(Bpl, "scan");
    });

    // A = target from here to the comparison with x.
    asm.label("resolve")
        .op(Lda, mem(map.ai_target))
        .branch(Bpl, "act")
        .op(Lda, Immediate(config.default_column))
        .op(Sta, mem(map.ai_target))
        .label("act")
        .op(Cmp, mem(piece.x))
        .branch(Beq, "arrive")
        .op(Lda, Immediate(buttons.right))
        .branch(Bcs, "store")
        .op(Lda, Immediate(buttons.left))
        .branch(Bne, "store")
        .label("arrive")
        .op(Lda, mem(piece.left_color))
        .op(Eor, mem(piece.right_color))
        .op(Ora, mem(piece.orientation))
        .branch(Bne, "drop")
        .op(Lda, Immediate(buttons.rotate))
        .branch(Bne, "store")
        .label("drop")
        .op(Lda, Immediate(AiState::NO_TARGET))
        .op(Sta, mem(map.ai_target))
        .op(Lda, Immediate(buttons.drop))
        .label("store")
        .op(Sta, mem(map.inputs[MACHINE]))
        .label("done")
        .op(Rts, Implied);

    let (bytes, cycles) = budget(DECIDE);
    asm.finish(bytes, cycles)
}

/// All injected routines in placement order.
pub fn all(map: &MemoryMap, config: &Config) -> Result<Vec<Routine>, BuildError> {
    Ok(vec![toggle(map)?, dispatch(map, config)?, decide(map, config)?])
}

/// `JMP dispatch` over the host's input store. The host's `RTS` is
/// replaced too; `dispatch` returns on its behalf.
pub fn input_site(site: &HookSite) -> Result<Routine, BuildError> {
    let mut asm = Asm::new(INPUT_SITE);
    asm.jump(Jmp, DISPATCH).pad_to(site.len());
    asm.finish(site.len(), 16)
}

/// `JSR toggle` over the host's player-count flip, padded with `NOP`s.
pub fn mode_select_site(site: &HookSite) -> Result<Routine, BuildError> {
    let mut asm = Asm::new(MODE_SELECT_SITE);
    asm.jump(Jsr, TOGGLE).pad_to(site.len());
    asm.finish(site.len(), 32)
}
