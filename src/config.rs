use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::memory::map::PLAYFIELD_WIDTH;

// ─────────────────────────────────────────────────────────────────────────────
//  Button map
// ─────────────────────────────────────────────────────────────────────────────

/// Bit masks the host game's input register uses for the buttons the
/// actuator presses. `drop` has no confirmed value on the target build,
/// so all four are configurable rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMap {
    pub right: u8,
    pub left: u8,
    pub drop: u8,
    pub rotate: u8,
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self {
            right: 0x01,
            left: 0x02,
            drop: 0x04,
            rotate: 0x40,
        }
    }
}

/// File-offset range `[start, end)` overriding the profile's free region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegion {
    pub start: usize,
    pub end: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
//  Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target profile name (see `memory::map::profile`).
    pub profile: String,
    /// Frames between heuristic evaluations. Must be a power of two.
    pub throttle_interval: u8,
    /// Column used when no candidate and no previous target exist.
    pub default_column: u8,
    /// Game-phase values at or above this are gameplay.
    pub gameplay_threshold: u8,
    pub buttons: ButtonMap,
    pub free_region: Option<FreeRegion>,
    /// Expected content of the free region in an unpatched image.
    pub free_fill: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "dr-mario-us".to_string(),
            throttle_interval: 16,
            default_column: 3,
            gameplay_threshold: 4,
            buttons: ButtonMap::default(),
            free_region: None,
            free_fill: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    ThrottleInterval(u8),
    DefaultColumn(u8),
    ZeroButton(&'static str),
    DuplicateButtons,
    EmptyFreeRegion(FreeRegion),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read {}: {e}", path.display()),
            ConfigError::Parse(path, e) => write!(f, "invalid config {}: {e}", path.display()),
            ConfigError::ThrottleInterval(n) => {
                write!(f, "throttle_interval {n} is not a power of two")
            }
            ConfigError::DefaultColumn(c) => write!(
                f,
                "default_column {c} is outside the playfield (0..{PLAYFIELD_WIDTH})"
            ),
            ConfigError::ZeroButton(name) => write!(f, "button mask `{name}` is zero"),
            ConfigError::DuplicateButtons => write!(f, "button masks must be distinct"),
            ConfigError::EmptyFreeRegion(r) => {
                write!(f, "free region [{:#06X}, {:#06X}) is empty", r.start, r.end)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    fn default_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("config.json"))
    }

    /// Load from `path`, or from the per-user config file when `None`.
    /// A missing default file yields the defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to the per-user config file.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::Io(
                PathBuf::from("config.json"),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory"),
            )
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(parent.to_path_buf(), e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(path.clone(), e))?;
        std::fs::write(&path, json).map_err(|e| ConfigError::Io(path.clone(), e))?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.throttle_interval.is_power_of_two() {
            return Err(ConfigError::ThrottleInterval(self.throttle_interval));
        }
        if self.default_column as usize >= PLAYFIELD_WIDTH {
            return Err(ConfigError::DefaultColumn(self.default_column));
        }
        let b = &self.buttons;
        let masks = [
            ("right", b.right),
            ("left", b.left),
            ("drop", b.drop),
            ("rotate", b.rotate),
        ];
        for (i, &(name, mask)) in masks.iter().enumerate() {
            if mask == 0 {
                return Err(ConfigError::ZeroButton(name));
            }
            if masks[..i].iter().any(|&(_, other)| other == mask) {
                return Err(ConfigError::DuplicateButtons);
            }
        }
        if let Some(region) = self.free_region {
            if region.end <= region.start {
                return Err(ConfigError::EmptyFreeRegion(region));
            }
        }
        Ok(())
    }

    /// `frame & mask == 0` on evaluation frames.
    pub fn throttle_mask(&self) -> u8 {
        self.throttle_interval.wrapping_sub(1)
    }
}

/// Get the application config directory.
fn config_dir() -> Option<PathBuf> {
    // macOS:   ~/Library/Application Support/vscpu/
    // Linux:   ~/.config/vscpu/
    // Windows: %APPDATA%/vscpu/

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("vscpu"),
        )
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").ok()?;
        Some(PathBuf::from(appdata).join("vscpu"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config").join("vscpu"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.throttle_mask(), 0x0F);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "throttle_interval": 8, "buttons": { "drop": 8 } }"#)
                .unwrap();
        assert_eq!(config.throttle_interval, 8);
        assert_eq!(config.buttons.drop, 0x08);
        assert_eq!(config.buttons.right, 0x01);
        assert_eq!(config.buttons.rotate, 0x40);
        assert_eq!(config.default_column, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_knobs() {
        let mut config = Config {
            throttle_interval: 12,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ThrottleInterval(12))));

        config.throttle_interval = 1;
        config.default_column = 8;
        assert!(matches!(config.validate(), Err(ConfigError::DefaultColumn(8))));

        config.default_column = 0;
        config.buttons.left = config.buttons.right;
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateButtons)));

        config.buttons = ButtonMap { drop: 0, ..ButtonMap::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroButton("drop"))));

        config.buttons = ButtonMap { rotate: 0x04, ..ButtonMap::default() };
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateButtons)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/vscpu.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
