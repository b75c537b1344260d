//! Fixtures shared by the unit tests.

use rand::Rng;

use crate::engine::playfield::{Color, TILE_EMPTY};
use crate::image::{Image, HEADER_LEN};
use crate::memory::map::{DR_MARIO_US, MACHINE, PLAYFIELD_CELLS, PLAYFIELD_WIDTH};
use crate::memory::{Memory, Ram};

/// An MMC1 image shaped like the supported build: 32 KiB PRG, 32 KiB CHR,
/// free region filled, both hook sites holding their original bytes.
pub(crate) fn synthetic_image() -> Image {
    let profile = &DR_MARIO_US;
    let prg = 0x8000;
    let chr = 0x8000;
    let mut data = vec![0xEA; HEADER_LEN + prg + chr];
    data[..HEADER_LEN].fill(0);
    data[..4].copy_from_slice(b"NES\x1A");
    data[4] = 2;
    data[5] = 4;
    data[6] = 0x10;

    let (start, end) = profile.free_region;
    data[start..end].fill(profile.free_fill);
    for site in [profile.input_site, profile.mode_select_site] {
        data[site.offset..site.offset + site.len()].copy_from_slice(site.original);
    }

    match Image::from_bytes(data) {
        Ok(image) => image,
        Err(e) => panic!("synthetic image: {e}"),
    }
}

pub(crate) fn clear_playfield<M: Memory>(mem: &mut M) {
    let base = DR_MARIO_US.memory.playfields[MACHINE];
    for i in 0..PLAYFIELD_CELLS as u16 {
        mem.poke(base + i, TILE_EMPTY);
    }
}

/// Assisted, in gameplay, on an evaluation frame, with an empty machine
/// bottle and no AI target.
pub(crate) fn assisted_gameplay_ram() -> Ram {
    let map = &DR_MARIO_US.memory;
    let mut ram = Ram::new();
    ram.poke(map.player_count, 2);
    ram.poke(map.mode_flag, 1);
    ram.poke(map.game_phase, 4);
    ram.poke(map.frame_counter, 0);
    ram.poke(map.ai_target, 0xFF);
    ram.poke(map.ai_best, 0xFF);
    clear_playfield(&mut ram);
    ram
}

pub(crate) fn put_virus<M: Memory>(mem: &mut M, row: u8, column: u8, color: Color) {
    let base = DR_MARIO_US.memory.playfields[MACHINE];
    let index = row as u16 * PLAYFIELD_WIDTH as u16 + column as u16;
    mem.poke(base + index, color.virus_tile());
}

pub(crate) fn put_piece<M: Memory>(mem: &mut M, left: Color, right: Color, x: u8) {
    let piece = &DR_MARIO_US.memory.pieces[MACHINE];
    mem.poke(piece.left_color, left.code());
    mem.poke(piece.right_color, right.code());
    mem.poke(piece.x, x);
}

/// Scatter viruses and settled capsule halves over the machine bottle,
/// and pick a random falling piece in a random orientation.
pub(crate) fn random_board<M: Memory, R: Rng>(mem: &mut M, rng: &mut R) {
    let base = DR_MARIO_US.memory.playfields[MACHINE];
    for i in 0..PLAYFIELD_CELLS as u16 {
        let code = match rng.gen_range(0..10) {
            0 | 1 => 0xD0 + rng.gen_range(0..3),
            2 => rng.gen_range(0x40..=0x72),
            _ => TILE_EMPTY,
        };
        mem.poke(base + i, code);
    }
    let left = Color::ALL[rng.gen_range(0..3)];
    let right = Color::ALL[rng.gen_range(0..3)];
    put_piece(mem, left, right, rng.gen_range(0..PLAYFIELD_WIDTH as u8));
    mem.poke(DR_MARIO_US.memory.pieces[MACHINE].orientation, rng.gen_range(0..4));
}
