use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use walkdir::WalkDir;

use vscpu::config::Config;
use vscpu::engine::playfield::Color;
use vscpu::image::Image;
use vscpu::install;
use vscpu::memory::map::{self, MACHINE, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};
use vscpu::memory::{LiveState, Memory, Profile};
use vscpu::patch::{self, HookTable};
use vscpu::sim::Console;

type CliResult = Result<(), Box<dyn Error>>;

const USAGE: &str = "\
usage: vscpu <command> [options]

commands:
  patch <in.nes> <out.nes> [--table <hooks.json>]   install the machine opponent
  check <file-or-dir>                               dry-run verification of .nes images
  table <in.nes> [--out <hooks.json>]               build the hook table for an image
  sim <patched.nes> [--frames N] [--seed S]         watch the opponent on a random board
  config                                            print the effective config

options:
  --config <config.json>   use this config instead of the per-user one";

// ─────────────────────────────────────────────────────────────────────────────
//  CLI argument helpers
// ─────────────────────────────────────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither `--flags` nor their values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_number(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("$")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn number_flag(args: &[String], name: &str, default: u64) -> Result<u64, Box<dyn Error>> {
    match flag_value(args, name) {
        Some(v) => parse_number(v).ok_or_else(|| format!("{name}: not a number: {v}").into()),
        None => Ok(default),
    }
}

fn nth<'a>(pos: &[&'a str], i: usize, what: &str) -> Result<&'a str, Box<dyn Error>> {
    pos.get(i)
        .copied()
        .ok_or_else(|| format!("missing {what}\n\n{USAGE}").into())
}

fn load_profile(config: &Config) -> Result<&'static Profile, Box<dyn Error>> {
    map::profile(&config.profile).ok_or_else(|| format!("unknown profile `{}`", config.profile).into())
}

// ─────────────────────────────────────────────────────────────────────────────
//  Commands
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_patch(args: &[String], config: &Config) -> CliResult {
    let pos = positional(args);
    let input = Path::new(nth(&pos, 1, "input image")?);
    let output = Path::new(nth(&pos, 2, "output image")?);
    let profile = load_profile(config)?;

    let mut image = Image::load(input)?;
    log::info!("Loaded {} ({})", input.display(), image.md5());

    let applied = match flag_value(args, "--table") {
        Some(table) => install::apply_table(&mut image, &HookTable::load(Path::new(table))?)?,
        None => install::install(&mut image, profile, config)?,
    };
    image.save(output)?;

    println!(
        "{} -> {}: {} hooks, {} bytes ({} -> {})",
        input.display(),
        output.display(),
        applied.hooks.len(),
        applied.bytes_written(),
        applied.md5_before,
        applied.md5_after
    );
    Ok(())
}

fn cmd_check(args: &[String], config: &Config) -> CliResult {
    let pos = positional(args);
    let root = nth(&pos, 1, "file or directory")?;
    let profile = load_profile(config)?;

    let mut total = 0;
    let mut failed = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let is_nes = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("nes"));
        if !entry.file_type().is_file() || !is_nes {
            continue;
        }
        total += 1;

        let verdict = Image::load(path)
            .map_err(|e| e.to_string())
            .and_then(|image| {
                let table = install::build_table(&image, profile, config).map_err(|e| e.to_string())?;
                patch::verify(&image, &table.hooks).map_err(|e| e.to_string())?;
                Ok(image.md5())
            });
        match verdict {
            Ok(md5) => println!("OK    {md5}  {}", path.display()),
            Err(e) => {
                failed += 1;
                println!("FAIL  {}: {e}", path.display());
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {total} images are not compatible").into());
    }
    println!("{total} compatible image(s)");
    Ok(())
}

fn cmd_table(args: &[String], config: &Config) -> CliResult {
    let pos = positional(args);
    let input = Path::new(nth(&pos, 1, "input image")?);
    let profile = load_profile(config)?;

    let image = Image::load(input)?;
    let table = install::build_table(&image, profile, config)?;
    match flag_value(args, "--out") {
        Some(out) => {
            table.save(Path::new(out))?;
            println!("{} hooks written to {out}", table.hooks.len());
        }
        None => println!("{}", table.to_json()?),
    }
    Ok(())
}

/// Random board in the lower part of the machine bottle, with the host's
/// virus counter set to match.
fn seed_board<M: Memory>(mem: &mut M, profile: &Profile, rng: &mut StdRng, viruses: usize) {
    let base = profile.memory.playfields[MACHINE];
    for i in 0..(PLAYFIELD_WIDTH * PLAYFIELD_HEIGHT) as u16 {
        mem.poke(base + i, 0xFF);
    }
    for _ in 0..viruses {
        let row = rng.gen_range(6..PLAYFIELD_HEIGHT) as u16;
        let col = rng.gen_range(0..PLAYFIELD_WIDTH) as u16;
        let color = Color::ALL[rng.gen_range(0..3)];
        mem.poke(base + row * PLAYFIELD_WIDTH as u16 + col, color.virus_tile());
    }
    let placed = LiveState::new(mem, &profile.memory).playfield(MACHINE).virus_count();
    mem.poke(profile.memory.virus_counts[MACHINE], placed as u8);
}

fn spawn_piece<M: Memory>(mem: &mut M, profile: &Profile, rng: &mut StdRng) -> (Color, Color) {
    let piece = &profile.memory.pieces[MACHINE];
    let left = Color::ALL[rng.gen_range(0..3)];
    let right = Color::ALL[rng.gen_range(0..3)];
    mem.poke(piece.left_color, left.code());
    mem.poke(piece.right_color, right.code());
    mem.poke(piece.x, 3);
    mem.poke(piece.orientation, 0);
    (left, right)
}

fn cmd_sim(args: &[String], config: &Config) -> CliResult {
    let pos = positional(args);
    let input = Path::new(nth(&pos, 1, "patched image")?);
    let frames = number_flag(args, "--frames", 240)?;
    let seed = number_flag(args, "--seed", 1)?;
    let profile = load_profile(config)?;
    let map = &profile.memory;
    let buttons = config.buttons;

    let image = Image::load(input)?;
    let mut console = Console::new(&image, profile)?;
    let mut rng = StdRng::seed_from_u64(seed);

    // 1P -> 2P -> 2P + machine, through the hooked menu routine
    console.memory_mut().poke(map.player_count, 1);
    console.press_mode_select()?;
    console.press_mode_select()?;
    if console.memory().peek(map.mode_flag) == 0 {
        return Err("image does not enter machine mode; is it patched?".into());
    }

    console.memory_mut().poke(map.game_phase, config.gameplay_threshold);
    seed_board(console.memory_mut(), profile, &mut rng, 12);
    let (l, r) = spawn_piece(console.memory_mut(), profile, &mut rng);
    {
        let live = LiveState::new(console.memory_mut(), map);
        println!(
            "machine bottle (seed {seed}, {} viruses):{:?}",
            live.virus_count(MACHINE),
            live.playfield(MACHINE)
        );
    }
    println!("piece {l:?}/{r:?}");

    let mut worst = 0;
    for frame in 0..frames {
        let cycles = console.step_frame(0)?;
        worst = worst.max(cycles);

        let mem = console.memory_mut();
        let pressed = mem.peek(map.inputs[MACHINE]);
        let x = mem.peek(map.pieces[MACHINE].x);
        let target = mem.peek(map.ai_target);
        if pressed == buttons.right {
            println!("frame {frame:4}: x={x} target={target} RIGHT");
            mem.poke(map.pieces[MACHINE].x, x.saturating_add(1).min(PLAYFIELD_WIDTH as u8 - 2));
        } else if pressed == buttons.left {
            println!("frame {frame:4}: x={x} target={target} LEFT");
            mem.poke(map.pieces[MACHINE].x, x.saturating_sub(1));
        } else if pressed == buttons.rotate {
            println!("frame {frame:4}: x={x} ROTATE");
            mem.poke(map.pieces[MACHINE].orientation, 1);
        } else if pressed == buttons.drop {
            println!("frame {frame:4}: x={x} DROP");
            let (l, r) = spawn_piece(mem, profile, &mut rng);
            println!("            next piece {l:?}/{r:?}");
        }
    }
    println!("worst frame: {worst} cycles");
    Ok(())
}

fn run(args: &[String]) -> CliResult {
    let config = Config::load(flag_value(args, "--config").map(Path::new))?;

    match positional(args).first().copied() {
        Some("patch") => cmd_patch(args, &config),
        Some("check") => cmd_check(args, &config),
        Some("table") => cmd_table(args, &config),
        Some("sim") => cmd_sim(args, &config),
        Some("config") => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        _ => {
            println!("vscpu v{}\n\n{USAGE}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
