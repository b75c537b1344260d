//! Reference model of the injected routines.
//!
//! `Engine::invoke` is the behaviour of the input hook, `Engine::toggle`
//! the behaviour of the mode-select hook. The generated 6502 code in
//! `crate::routines` makes the same decisions byte for byte; the
//! differential tests in `crate::sim` hold the two together.

pub mod actuate;
pub mod mode;
pub mod playfield;
pub mod select;

use crate::config::{ButtonMap, Config};
use crate::memory::map::{HUMAN, MACHINE};
use crate::memory::{LiveState, Memory, MemoryMap, Profile};

use actuate::{act, Action};
use mode::{Mode, ModeFlag, Phase, Throttle};
use select::select;

/// What one invocation of the input hook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Baseline mode: only the host's own store happened.
    Passthrough,
    /// Assisted setup: the human input was copied to the machine side.
    Mirrored(u8),
    /// Assisted gameplay on a frame the throttle skips.
    Throttled,
    /// Assisted gameplay evaluation: a button was pressed for the machine.
    Actuated { target: u8, action: Action },
}

/// Setup-phase input mirror: the machine side sees exactly what the human
/// pressed.
pub fn mirror(human_input: u8) -> u8 {
    human_input
}

pub struct Engine {
    map: MemoryMap,
    gameplay_threshold: u8,
    throttle: Throttle,
    default_column: u8,
    buttons: ButtonMap,
}

impl Engine {
    pub fn new(profile: &Profile, config: &Config) -> Self {
        Self {
            map: profile.memory,
            gameplay_threshold: config.gameplay_threshold,
            throttle: Throttle::new(config.throttle_interval),
            default_column: config.default_column,
            buttons: config.buttons,
        }
    }

    /// The single per-frame dispatch. `raw_input` is the value the host
    /// was about to store into the machine player's input register; that
    /// store always happens first.
    pub fn invoke<M: Memory>(&self, mem: &mut M, raw_input: u8) -> Dispatch {
        let mut live = LiveState::new(mem, &self.map);
        live.set_machine_input(raw_input);

        let phase = Phase::classify(live.game_phase(), self.gameplay_threshold);
        match Mode::resolve(live.mode_flag(), phase) {
            Mode::Baseline => Dispatch::Passthrough,
            Mode::AssistedSetup => {
                let human = live.input(HUMAN);
                live.set_machine_input(mirror(human));
                Dispatch::Mirrored(human)
            }
            Mode::AssistedGameplay => self.decide(&mut live),
        }
    }

    fn decide<M: Memory>(&self, live: &mut LiveState<'_, M>) -> Dispatch {
        let frame = live.frame_counter();
        if !self.throttle.fires(frame) {
            return Dispatch::Throttled;
        }

        let grid = live.playfield(MACHINE);
        let piece = live.falling_piece(MACHINE);
        let mut state = live.ai_state();

        let target = select(&grid, &piece, &mut state, self.default_column);
        let action = act(&piece, target);
        if action == Action::Drop {
            state.clear_target();
        }

        live.set_ai_state(&state);
        live.set_machine_input(action.mask(&self.buttons));
        log::debug!(
            "frame {frame:#04X}: x={} target={target} score={} -> {action:?}",
            piece.x,
            state.best_score
        );
        Dispatch::Actuated { target, action }
    }

    /// The mode-select hook.
    pub fn toggle<M: Memory>(&self, mem: &mut M) -> ModeFlag {
        let mut live = LiveState::new(mem, &self.map);
        let flag = mode::toggle(&mut live);
        log::debug!("mode select: {flag:?}, {} player(s)", live.player_count());
        flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::playfield::Color;
    use crate::memory::map::DR_MARIO_US;
    use crate::memory::Ram;
    use crate::testing::{assisted_gameplay_ram, put_piece, put_virus};

    fn engine() -> Engine {
        Engine::new(&DR_MARIO_US, &Config::default())
    }

    #[test]
    fn baseline_only_stores_raw_input() {
        let map = &DR_MARIO_US.memory;
        let mut ram = Ram::new();
        ram.poke(map.inputs[HUMAN], 0x40);
        ram.poke(map.game_phase, 9);

        assert_eq!(engine().invoke(&mut ram, 0x08), Dispatch::Passthrough);
        assert_eq!(ram.peek(map.inputs[MACHINE]), 0x08);
    }

    #[test]
    fn assisted_setup_mirrors_human_input() {
        let map = &DR_MARIO_US.memory;
        let mut ram = Ram::new();
        ram.poke(map.mode_flag, 1);
        ram.poke(map.game_phase, 2);
        ram.poke(map.inputs[HUMAN], 0x40);

        assert_eq!(engine().invoke(&mut ram, 0x00), Dispatch::Mirrored(0x40));
        assert_eq!(ram.peek(map.inputs[MACHINE]), ram.peek(map.inputs[HUMAN]));
    }

    #[test]
    fn gameplay_between_throttle_frames_leaves_state_alone() {
        let map = &DR_MARIO_US.memory;
        let mut ram = assisted_gameplay_ram();
        ram.poke(map.frame_counter, 0x05);
        ram.poke(map.ai_target, 2);

        assert_eq!(engine().invoke(&mut ram, 0x80), Dispatch::Throttled);
        assert_eq!(ram.peek(map.inputs[MACHINE]), 0x80);
        assert_eq!(ram.peek(map.ai_target), 2);
    }

    #[test]
    fn yellow_virus_scenario_moves_right_then_drops() {
        let map = &DR_MARIO_US.memory;
        let mut ram = assisted_gameplay_ram();
        put_virus(&mut ram, 10, 4, Color::Yellow);
        put_piece(&mut ram, Color::Yellow, Color::Red, 2);

        let engine = engine();
        assert_eq!(
            engine.invoke(&mut ram, 0),
            Dispatch::Actuated {
                target: 4,
                action: Action::Right
            }
        );
        assert_eq!(ram.peek(map.inputs[MACHINE]), 0x01);
        assert_eq!(ram.peek(map.ai_target), 4);

        ram.poke(map.pieces[MACHINE].x, 4);
        ram.poke(map.frame_counter, 0x10);
        assert_eq!(
            engine.invoke(&mut ram, 0),
            Dispatch::Actuated {
                target: 4,
                action: Action::Drop
            }
        );
        assert_eq!(ram.peek(map.inputs[MACHINE]), 0x04);
        assert_eq!(ram.peek(map.ai_target), 0xFF);
    }

    #[test]
    fn single_colour_capsule_rotates_at_target_then_drops() {
        let map = &DR_MARIO_US.memory;
        let mut ram = assisted_gameplay_ram();
        put_piece(&mut ram, Color::Red, Color::Red, 3);

        let engine = engine();
        assert_eq!(
            engine.invoke(&mut ram, 0),
            Dispatch::Actuated {
                target: 3,
                action: Action::Rotate
            }
        );
        assert_eq!(ram.peek(map.inputs[MACHINE]), 0x40);
        assert_eq!(ram.peek(map.ai_target), 3);

        ram.poke(map.pieces[MACHINE].orientation, 1);
        ram.poke(map.frame_counter, 0x10);
        assert_eq!(
            engine.invoke(&mut ram, 0),
            Dispatch::Actuated {
                target: 3,
                action: Action::Drop
            }
        );
        assert_eq!(ram.peek(map.ai_target), 0xFF);
    }

    #[test]
    fn targets_top_most_matching_virus() {
        let map = &DR_MARIO_US.memory;
        let mut ram = assisted_gameplay_ram();
        put_virus(&mut ram, 10, 5, Color::Red);
        put_virus(&mut ram, 3, 2, Color::Red);
        put_piece(&mut ram, Color::Red, Color::Yellow, 0);

        assert_eq!(
            engine().invoke(&mut ram, 0),
            Dispatch::Actuated {
                target: 2,
                action: Action::Right
            }
        );
        assert_eq!(ram.peek(map.ai_target), 2);
        assert_eq!(ram.peek(map.ai_best), 3);
    }

    #[test]
    fn writes_only_owned_fields() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let map = &DR_MARIO_US.memory;
        let owned = map.owned();
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let mut ram = assisted_gameplay_ram();
            crate::testing::random_board(&mut ram, &mut rng);
            ram.poke(map.mode_flag, rng.gen_range(0..2));
            ram.poke(map.game_phase, rng.gen_range(0..8));
            ram.poke(map.inputs[HUMAN], rng.gen());
            let before: Vec<u8> = (0..0x800u16).map(|a| ram.peek(a)).collect();

            engine.invoke(&mut ram, rng.gen());
            for addr in 0..0x800u16 {
                if ram.peek(addr) != before[addr as usize] {
                    assert!(owned.contains(&addr), "wrote ${addr:04X}");
                }
            }
        }
    }

    #[test]
    fn toggle_enters_assisted_from_two_player() {
        let map = &DR_MARIO_US.memory;
        let mut ram = Ram::new();
        ram.poke(map.player_count, 2);

        assert_eq!(engine().toggle(&mut ram), ModeFlag::Assisted);
        assert_eq!(ram.peek(map.mode_flag), 1);
        assert_eq!(ram.peek(map.ai_target), 0xFF);
    }
}
