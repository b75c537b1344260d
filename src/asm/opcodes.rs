//! NMOS 6502 encodings for the instructions the injected routines use,
//! plus base cycle counts for every opcode.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bmi,
    Bne,
    Bpl,
    Clc,
    Cmp,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Rts,
    Sbc,
    Sec,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Txa,
    Tya,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Relative,
}

/// Opcode byte for `mnemonic` in `mode`, if the 6502 has one.
pub fn opcode(mnemonic: Mnemonic, mode: AddrMode) -> Option<u8> {
    use AddrMode::*;
    use Mnemonic::*;

    let op = match (mnemonic, mode) {
        (Lda, Immediate) => 0xA9,
        (Lda, ZeroPage) => 0xA5,
        (Lda, Absolute) => 0xAD,
        (Lda, AbsoluteX) => 0xBD,
        (Lda, AbsoluteY) => 0xB9,
        (Ldx, Immediate) => 0xA2,
        (Ldx, ZeroPage) => 0xA6,
        (Ldx, Absolute) => 0xAE,
        (Ldy, Immediate) => 0xA0,
        (Ldy, ZeroPage) => 0xA4,
        (Ldy, Absolute) => 0xAC,

        (Sta, ZeroPage) => 0x85,
        (Sta, Absolute) => 0x8D,
        (Sta, AbsoluteX) => 0x9D,
        (Sta, AbsoluteY) => 0x99,
        (Stx, ZeroPage) => 0x86,
        (Stx, Absolute) => 0x8E,
        (Sty, ZeroPage) => 0x84,
        (Sty, Absolute) => 0x8C,

        (Adc, Immediate) => 0x69,
        (Adc, ZeroPage) => 0x65,
        (Adc, Absolute) => 0x6D,
        (Sbc, Immediate) => 0xE9,
        (Sbc, ZeroPage) => 0xE5,
        (Sbc, Absolute) => 0xED,
        (And, Immediate) => 0x29,
        (And, ZeroPage) => 0x25,
        (And, Absolute) => 0x2D,
        (Ora, Immediate) => 0x09,
        (Ora, ZeroPage) => 0x05,
        (Ora, Absolute) => 0x0D,
        (Eor, Immediate) => 0x49,
        (Eor, ZeroPage) => 0x45,
        (Eor, Absolute) => 0x4D,
        (Cmp, Immediate) => 0xC9,
        (Cmp, ZeroPage) => 0xC5,
        (Cmp, Absolute) => 0xCD,
        (Cmp, AbsoluteX) => 0xDD,
        (Cmp, AbsoluteY) => 0xD9,

        (Inc, ZeroPage) => 0xE6,
        (Inc, Absolute) => 0xEE,
        (Dec, ZeroPage) => 0xC6,
        (Dec, Absolute) => 0xCE,
        (Asl, Accumulator) => 0x0A,
        (Lsr, Accumulator) => 0x4A,

        (Inx, Implied) => 0xE8,
        (Iny, Implied) => 0xC8,
        (Dex, Implied) => 0xCA,
        (Dey, Implied) => 0x88,
        (Tax, Implied) => 0xAA,
        (Txa, Implied) => 0x8A,
        (Tay, Implied) => 0xA8,
        (Tya, Implied) => 0x98,
        (Sec, Implied) => 0x38,
        (Clc, Implied) => 0x18,
        (Nop, Implied) => 0xEA,
        (Rts, Implied) => 0x60,

        (Jmp, Absolute) => 0x4C,
        (Jsr, Absolute) => 0x20,

        (Bpl, Relative) => 0x10,
        (Bmi, Relative) => 0x30,
        (Bcc, Relative) => 0x90,
        (Bcs, Relative) => 0xB0,
        (Bne, Relative) => 0xD0,
        (Beq, Relative) => 0xF0,

        _ => return None,
    };
    Some(op)
}

/// Worst-case cycles for one execution of `op` in `mode`: a taken branch
/// that crosses a page costs two more than its base, an indexed read that
/// crosses a page costs one more.
pub fn max_cycles(op: u8, mode: AddrMode) -> u32 {
    let base = opcode_cycles(op);
    match mode {
        AddrMode::Relative => base + 2,
        AddrMode::AbsoluteX | AddrMode::AbsoluteY if !is_store(op) => base + 1,
        _ => base,
    }
}

fn is_store(op: u8) -> bool {
    matches!(op, 0x9D | 0x99)
}

// ─────────────────────────────────────────────────────────────────────────────
//  Approximate 6502 cycle counts per opcode
// ─────────────────────────────────────────────────────────────────────────────

static OPCODE_CYCLES: [u8; 256] = [
    //0  1  2  3  4  5  6  7  8  9  A  B  C  D  E  F
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 0x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 1x
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 2x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 3x
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 4x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 5x
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 6x
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 7x
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 8x
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 9x
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // Ax
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // Bx
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // Cx
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // Dx
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // Ex
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // Fx
];

/// Base cycle count of an opcode byte (untaken branch, no page cross).
pub fn opcode_cycles(op: u8) -> u32 {
    OPCODE_CYCLES[op as usize] as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_routines_instruction_set() {
        assert_eq!(opcode(Mnemonic::Sta, AddrMode::ZeroPage), Some(0x85));
        assert_eq!(opcode(Mnemonic::Lda, AddrMode::AbsoluteX), Some(0xBD));
        assert_eq!(opcode(Mnemonic::Jsr, AddrMode::Absolute), Some(0x20));
        assert_eq!(opcode(Mnemonic::Bcs, AddrMode::Relative), Some(0xB0));
        assert_eq!(opcode(Mnemonic::Sta, AddrMode::Immediate), None);
        assert_eq!(opcode(Mnemonic::Inc, AddrMode::AbsoluteY), None);
    }

    #[test]
    fn worst_case_cycles() {
        assert_eq!(max_cycles(0xA9, AddrMode::Immediate), 2);
        assert_eq!(max_cycles(0xBD, AddrMode::AbsoluteX), 5);
        assert_eq!(max_cycles(0x9D, AddrMode::AbsoluteX), 5);
        assert_eq!(max_cycles(0xD0, AddrMode::Relative), 4);
        assert_eq!(max_cycles(0x60, AddrMode::Implied), 6);
        assert_eq!(max_cycles(0xEE, AddrMode::Absolute), 6);
    }

    #[test]
    fn mnemonic_displays_upper_case() {
        assert_eq!(Mnemonic::Lda.to_string(), "LDA");
    }
}
