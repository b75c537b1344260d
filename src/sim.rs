//! A 6502 harness for patched images.
//!
//! Wires a `mos6502` CPU to a NES-shaped bus: 2 KiB of RAM mirrored up to
//! $1FFF, 8 KiB of cartridge work RAM at $6000 and the fixed PRG window
//! mirrored across $8000-$FFFF.
//! No PPU, APU or interrupts; the harness drives the two hooked entry
//! points directly, one frame at a time.

use mos6502::cpu::CPU;
use mos6502::instruction::Nmos6502;
use mos6502::memory::Bus;
use mos6502::registers::{StackPointer, Status};
use std::fmt;

use crate::asm::opcodes::opcode_cycles;
use crate::image::Image;
use crate::memory::{Memory, MemoryMap, Profile};

/// `JSR target; JMP *` lives here, in work RAM.
pub const TRAMPOLINE: u16 = 0x6000;
const TRAMPOLINE_HALT: u16 = TRAMPOLINE + 3;
const MAX_STEPS: u32 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    SiteNotMapped(usize),
    /// The CPU did not reach its halt address within the step limit.
    Runaway { pc: u16 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::SiteNotMapped(offset) => {
                write!(f, "hook site {offset:#06X} is not in the CPU-visible PRG")
            }
            SimError::Runaway { pc } => {
                write!(f, "CPU did not return within {MAX_STEPS} steps (pc={pc:#06X})")
            }
        }
    }
}

impl std::error::Error for SimError {}

// ─────────────────────────────────────────────────────────────────────────────
//  Bus
// ─────────────────────────────────────────────────────────────────────────────

pub struct NesBus {
    ram: [u8; 0x800],
    wram: [u8; 0x2000],
    prg: Vec<u8>,
}

impl NesBus {
    fn new(image: &Image) -> Self {
        let (prg, _) = image.prg_window();
        Self {
            ram: [0; 0x800],
            wram: [0; 0x2000],
            prg: prg.to_vec(),
        }
    }

    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x7FF) as usize],
            0x6000..=0x7FFF => self.wram[(addr - 0x6000) as usize],
            // A 16 KiB window repeats at $8000 and $C000.
            0x8000..=0xFFFF => self.prg[(addr as usize - 0x8000) % self.prg.len()],
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x7FF) as usize] = val,
            0x6000..=0x7FFF => self.wram[(addr - 0x6000) as usize] = val,
            // PRG is ROM; mapper register writes are ignored.
            _ => {}
        }
    }

    fn install_trampoline(&mut self, target: u16) {
        let [lo, hi] = target.to_le_bytes();
        let [halt_lo, halt_hi] = TRAMPOLINE_HALT.to_le_bytes();
        let at = (TRAMPOLINE - 0x6000) as usize;
        self.wram[at..at + 6].copy_from_slice(&[0x20, lo, hi, 0x4C, halt_lo, halt_hi]);
    }

    /// The 2 KiB of console RAM.
    pub fn ram(&self) -> &[u8; 0x800] {
        &self.ram
    }
}

impl Bus for NesBus {
    fn get_byte(&mut self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn set_byte(&mut self, addr: u16, val: u8) {
        self.write(addr, val)
    }
}

impl Memory for NesBus {
    fn peek(&self, address: u16) -> u8 {
        self.read(address)
    }

    fn poke(&mut self, address: u16, value: u8) {
        self.write(address, value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Console
// ─────────────────────────────────────────────────────────────────────────────

pub struct Console {
    cpu: CPU<NesBus, Nmos6502>,
    map: MemoryMap,
    input_site: u16,
    mode_select_site: u16,
    mode_select_len: u16,
}

impl Console {
    pub fn new(image: &Image, profile: &Profile) -> Result<Self, SimError> {
        let site = |offset: usize| image.cpu_address(offset).ok_or(SimError::SiteNotMapped(offset));
        let input_site = site(profile.input_site.offset)?;
        let mode_select_site = site(profile.mode_select_site.offset)?;

        Ok(Self {
            cpu: CPU::new(NesBus::new(image), Nmos6502),
            map: profile.memory,
            input_site,
            mode_select_site,
            mode_select_len: profile.mode_select_site.len() as u16,
        })
    }

    pub fn memory(&self) -> &NesBus {
        &self.cpu.memory
    }

    pub fn memory_mut(&mut self) -> &mut NesBus {
        &mut self.cpu.memory
    }

    fn call(&mut self, entry: u16, halt: u16) -> Result<u32, SimError> {
        self.cpu.registers.program_counter = entry;
        self.cpu.registers.stack_pointer = StackPointer(0xFD);
        self.cpu.registers.status.remove(Status::PS_DECIMAL_MODE);
        run_until(&mut self.cpu, halt, MAX_STEPS)
    }

    /// Enter the host's input store with `raw_input` in A, as the
    /// controller-read routine does once per frame. Returns cycles spent.
    pub fn run_input_hook(&mut self, raw_input: u8) -> Result<u32, SimError> {
        self.cpu.memory.install_trampoline(self.input_site);
        self.cpu.registers.accumulator = raw_input;
        self.call(TRAMPOLINE, TRAMPOLINE_HALT)
    }

    /// One frame: run the input hook, then advance the frame counter the
    /// way the host's NMI handler would.
    pub fn step_frame(&mut self, raw_input: u8) -> Result<u32, SimError> {
        let cycles = self.run_input_hook(raw_input)?;
        let frame = self.map.frame_counter;
        let next = self.cpu.memory.peek(frame).wrapping_add(1);
        self.cpu.memory.poke(frame, next);
        Ok(cycles)
    }

    /// Execute the menu's mode-select site once.
    pub fn press_mode_select(&mut self) -> Result<u32, SimError> {
        let site = self.mode_select_site;
        self.call(site, site + self.mode_select_len)
    }
}

/// Run CPU until it hits `halt` address or exceeds `max_steps`.
/// Returns base cycles spent, the same count the host's timing sees
/// without branch or page-cross penalties.
fn run_until(cpu: &mut CPU<NesBus, Nmos6502>, halt: u16, max_steps: u32) -> Result<u32, SimError> {
    let mut cycles = 0;
    for _ in 0..max_steps {
        let pc = cpu.registers.program_counter;
        if pc == halt {
            return Ok(cycles);
        }
        cycles += opcode_cycles(cpu.memory.read(pc));
        cpu.single_step();
    }
    Err(SimError::Runaway {
        pc: cpu.registers.program_counter,
    })
}
