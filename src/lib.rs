//! vscpu: turns the two-player mode of an NES puzzle ROM into human vs.
//! machine by injecting a small 6502 opponent into the image.
//!
//! Layout:
//! - `memory`   live-state memory map and typed accessors
//! - `engine`   reference model of the injected routines
//! - `asm`      tiny 6502 assembler with byte and cycle accounting
//! - `routines` the three injected routines and their call-site stubs
//! - `layout`   free-region allocation and link-time fixups
//! - `patch`    hook descriptors and atomic application
//! - `install`  glue: image + profile + config -> patched image
//! - `sim`      6502 harness that runs a patched image frame by frame

pub mod asm;
pub mod config;
pub mod engine;
pub mod image;
pub mod install;
pub mod layout;
pub mod memory;
pub mod patch;
pub mod routines;
pub mod sim;

#[cfg(test)]
pub(crate) mod testing;
