//! A tiny 6502 assembler with byte and cycle accounting.
//!
//! Each routine is built with an [`Asm`] and closed with
//! [`Asm::finish`], which resolves branches to its own labels and checks
//! the routine against its declared byte and cycle budgets. Anything that
//! names another routine (a `JMP`/`JSR`, or a branch into a neighbour) is
//! kept as a [`Fixup`] and resolved by `crate::layout` once addresses are
//! known.
//!
//! The cycle figure is a static upper bound: every instruction counts at
//! its worst case, and code inside [`Asm::repeat`] counts once per
//! iteration.

pub mod opcodes;

use std::fmt;

pub use opcodes::{AddrMode, Mnemonic};

// ─────────────────────────────────────────────────────────────────────────────
//  Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Build-time failures: code generation, budgets, placement and linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    UnsupportedOperand {
        routine: &'static str,
        mnemonic: Mnemonic,
        mode: AddrMode,
    },
    DuplicateLabel {
        routine: &'static str,
        label: &'static str,
    },
    ByteBudgetExceeded {
        routine: &'static str,
        size: usize,
        budget: usize,
    },
    CycleBudgetExceeded {
        routine: &'static str,
        bound: u32,
        budget: u32,
    },
    UnreachableBranch {
        routine: &'static str,
        at: usize,
        target: &'static str,
        distance: isize,
    },
    UnknownLabel {
        routine: &'static str,
        label: &'static str,
    },
    OutOfSpace {
        needed: usize,
        available: usize,
    },
    RegionNotMapped {
        start: usize,
        end: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnsupportedOperand {
                routine,
                mnemonic,
                mode,
            } => write!(f, "{routine}: {mnemonic} has no {mode:?} form"),
            BuildError::DuplicateLabel { routine, label } => {
                write!(f, "{routine}: label `{label}` defined twice")
            }
            BuildError::ByteBudgetExceeded {
                routine,
                size,
                budget,
            } => write!(f, "{routine}: {size} bytes exceeds budget of {budget}"),
            BuildError::CycleBudgetExceeded {
                routine,
                bound,
                budget,
            } => write!(f, "{routine}: worst case {bound} cycles exceeds budget of {budget}"),
            BuildError::UnreachableBranch {
                routine,
                at,
                target,
                distance,
            } => write!(
                f,
                "{routine}+{at:#04X}: branch to `{target}` is {distance} bytes away (limit -128..=127)"
            ),
            BuildError::UnknownLabel { routine, label } => {
                write!(f, "{routine}: unknown label or routine `{label}`")
            }
            BuildError::OutOfSpace { needed, available } => write!(
                f,
                "routines need {needed} bytes but the free region holds {available}"
            ),
            BuildError::RegionNotMapped { start, end } => write!(
                f,
                "free region [{start:#06X}, {end:#06X}) is not in the CPU-visible PRG"
            ),
        }
    }
}

impl std::error::Error for BuildError {}

// ─────────────────────────────────────────────────────────────────────────────
//  Operands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    ZeroPage(u8),
    Absolute(u16),
    AbsoluteX(u16),
    AbsoluteY(u16),
}

impl Operand {
    fn mode(self) -> AddrMode {
        match self {
            Operand::Implied => AddrMode::Implied,
            Operand::Accumulator => AddrMode::Accumulator,
            Operand::Immediate(_) => AddrMode::Immediate,
            Operand::ZeroPage(_) => AddrMode::ZeroPage,
            Operand::Absolute(_) => AddrMode::Absolute,
            Operand::AbsoluteX(_) => AddrMode::AbsoluteX,
            Operand::AbsoluteY(_) => AddrMode::AbsoluteY,
        }
    }

    fn encode(self, out: &mut Vec<u8>) {
        match self {
            Operand::Implied | Operand::Accumulator => {}
            Operand::Immediate(v) | Operand::ZeroPage(v) => out.push(v),
            Operand::Absolute(a) | Operand::AbsoluteX(a) | Operand::AbsoluteY(a) => {
                out.extend_from_slice(&a.to_le_bytes())
            }
        }
    }
}

/// Direct memory operand, zero-page when the address allows it.
pub fn mem(address: u16) -> Operand {
    match u8::try_from(address) {
        Ok(zp) => Operand::ZeroPage(zp),
        Err(_) => Operand::Absolute(address),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Routines
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupKind {
    /// One signed byte, relative to the following instruction.
    Relative,
    /// Two bytes, little endian.
    Absolute,
}

/// A reference to another routine's entry point, patched at link time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Offset of the operand within the routine.
    pub at: usize,
    pub kind: FixupKind,
    pub target: &'static str,
}

/// A finished block of position-independent code, still missing the
/// addresses of the routines it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    pub name: &'static str,
    pub byte_budget: usize,
    pub cycle_budget: u32,
    /// Static worst case for one invocation, excluding callees.
    pub cycle_bound: u32,
    code: Vec<u8>,
    links: Vec<Fixup>,
}

impl Routine {
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn links(&self) -> &[Fixup] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Builder
// ─────────────────────────────────────────────────────────────────────────────

pub struct Asm {
    name: &'static str,
    code: Vec<u8>,
    labels: Vec<(&'static str, usize)>,
    fixups: Vec<Fixup>,
    cycles: u32,
    repeat: u32,
    error: Option<BuildError>,
}

impl Asm {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            cycles: 0,
            repeat: 1,
            error: None,
        }
    }

    /// Current offset from the start of the routine.
    pub fn here(&self) -> usize {
        self.code.len()
    }

    fn fail(&mut self, error: BuildError) {
        self.error.get_or_insert(error);
    }

    fn emit_opcode(&mut self, mnemonic: Mnemonic, mode: AddrMode) -> bool {
        match opcodes::opcode(mnemonic, mode) {
            Some(op) => {
                self.code.push(op);
                self.cycles += opcodes::max_cycles(op, mode) * self.repeat;
                true
            }
            None => {
                self.fail(BuildError::UnsupportedOperand {
                    routine: self.name,
                    mnemonic,
                    mode,
                });
                false
            }
        }
    }

    pub fn label(&mut self, name: &'static str) -> &mut Self {
        if self.labels.iter().any(|(l, _)| *l == name) {
            self.fail(BuildError::DuplicateLabel {
                routine: self.name,
                label: name,
            });
        } else {
            self.labels.push((name, self.code.len()));
        }
        self
    }

    pub fn op(&mut self, mnemonic: Mnemonic, operand: Operand) -> &mut Self {
        if self.emit_opcode(mnemonic, operand.mode()) {
            operand.encode(&mut self.code);
        }
        self
    }

    /// Conditional branch to a local label, or to another routine's entry.
    pub fn branch(&mut self, mnemonic: Mnemonic, target: &'static str) -> &mut Self {
        if self.emit_opcode(mnemonic, AddrMode::Relative) {
            self.fixups.push(Fixup {
                at: self.code.len(),
                kind: FixupKind::Relative,
                target,
            });
            self.code.push(0);
        }
        self
    }

    /// `JMP`/`JSR` to another routine's entry.
    pub fn jump(&mut self, mnemonic: Mnemonic, routine: &'static str) -> &mut Self {
        if self.emit_opcode(mnemonic, AddrMode::Absolute) {
            self.fixups.push(Fixup {
                at: self.code.len(),
                kind: FixupKind::Absolute,
                target: routine,
            });
            self.code.extend_from_slice(&[0, 0]);
        }
        self
    }

    /// Pad with `NOP` up to `len` bytes.
    pub fn pad_to(&mut self, len: usize) -> &mut Self {
        while self.code.len() < len {
            self.op(Mnemonic::Nop, Operand::Implied);
        }
        self
    }

    /// Emit a loop body that runs `times` times per invocation. Only the
    /// cycle bound cares; the bytes are emitted once.
    pub fn repeat(&mut self, times: u32, body: impl FnOnce(&mut Self)) -> &mut Self {
        let outer = self.repeat;
        self.repeat = outer.saturating_mul(times);
        body(self);
        self.repeat = outer;
        self
    }

    pub fn finish(self, byte_budget: usize, cycle_budget: u32) -> Result<Routine, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut code = self.code;
        let mut links = Vec::new();
        for fixup in self.fixups {
            let local = self
                .labels
                .iter()
                .find(|(l, _)| *l == fixup.target)
                .map(|&(_, offset)| offset);
            match (fixup.kind, local) {
                (FixupKind::Relative, Some(dest)) => {
                    let distance = dest as isize - (fixup.at as isize + 1);
                    let rel = i8::try_from(distance).map_err(|_| BuildError::UnreachableBranch {
                        routine: self.name,
                        at: fixup.at - 1,
                        target: fixup.target,
                        distance,
                    })?;
                    code[fixup.at] = rel as u8;
                }
                _ => links.push(fixup),
            }
        }

        if code.len() > byte_budget {
            return Err(BuildError::ByteBudgetExceeded {
                routine: self.name,
                size: code.len(),
                budget: byte_budget,
            });
        }
        if self.cycles > cycle_budget {
            return Err(BuildError::CycleBudgetExceeded {
                routine: self.name,
                bound: self.cycles,
                budget: cycle_budget,
            });
        }

        Ok(Routine {
            name: self.name,
            byte_budget,
            cycle_budget,
            cycle_bound: self.cycles,
            code,
            links,
        })
    }
}
