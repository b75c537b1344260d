//! The persisted hook table: the binary diff for one supported image.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::HookDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookTable {
    pub profile: String,
    /// MD5 of the unpatched image the table was built against.
    pub image_md5: String,
    pub hooks: Vec<HookDescriptor>,
}

impl HookTable {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json + "\n")
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(std::io::Error::other)
    }
}

/// Byte strings as space-separated hex, e.g. `"85 F6 60"`.
pub(crate) mod hex {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::super::hex_bytes(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        text.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).map_err(D::Error::custom))
            .collect()
    }
}
