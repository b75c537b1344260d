//! Hook descriptors and their all-or-nothing application to an image.
//!
//! `apply` is a pure check-then-write transformation: every precondition
//! for every hook is established before the first byte changes, so a
//! rejected hook set leaves the image exactly as it was.

pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::image::Image;

pub use table::HookTable;

/// One rewrite: at `address` (file offset), expect `original_bytes`,
/// write `replacement_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDescriptor {
    pub address: usize,
    #[serde(with = "table::hex")]
    pub original_bytes: Vec<u8>,
    #[serde(with = "table::hex")]
    pub replacement_bytes: Vec<u8>,
    pub routine_ref: String,
}

impl HookDescriptor {
    pub fn range(&self) -> Range<usize> {
        self.address..self.address.saturating_add(self.original_bytes.len())
    }

    fn check_shape(&self) -> Result<(), PatchError> {
        if self.original_bytes.len() != self.replacement_bytes.len() {
            return Err(PatchError::LengthMismatch {
                routine_ref: self.routine_ref.clone(),
                original: self.original_bytes.len(),
                replacement: self.replacement_bytes.len(),
            });
        }
        if self.original_bytes.is_empty() || self.original_bytes == self.replacement_bytes {
            return Err(PatchError::InertHook {
                routine_ref: self.routine_ref.clone(),
                address: self.address,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    AddressOutOfRange {
        routine_ref: String,
        address: usize,
        len: usize,
        image_len: usize,
    },
    RangeOverlap {
        first: String,
        second: String,
        address: usize,
    },
    VerificationMismatch {
        routine_ref: String,
        address: usize,
        expected: Vec<u8>,
        found: Vec<u8>,
    },
    LengthMismatch {
        routine_ref: String,
        original: usize,
        replacement: usize,
    },
    /// A hook that would write nothing, or nothing new.
    InertHook { routine_ref: String, address: usize },
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::AddressOutOfRange {
                routine_ref,
                address,
                len,
                image_len,
            } => write!(
                f,
                "{routine_ref}: {len} bytes at {address:#06X} run past the end of the image ({image_len} bytes)"
            ),
            PatchError::RangeOverlap {
                first,
                second,
                address,
            } => write!(f, "{first} and {second} overlap at {address:#06X}"),
            PatchError::VerificationMismatch {
                routine_ref,
                address,
                expected,
                found,
            } => write!(
                f,
                "verification mismatch for {routine_ref} at {address:#06X}: expected [{}], found [{}] \
                 (unsupported or already patched image)",
                hex_bytes(expected),
                hex_bytes(found)
            ),
            PatchError::LengthMismatch {
                routine_ref,
                original,
                replacement,
            } => write!(
                f,
                "{routine_ref}: original is {original} bytes but replacement is {replacement}"
            ),
            PatchError::InertHook {
                routine_ref,
                address,
            } => write!(f, "{routine_ref} at {address:#06X} changes nothing"),
        }
    }
}

impl std::error::Error for PatchError {}

/// One hook as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedHook {
    pub routine_ref: String,
    pub address: usize,
    pub len: usize,
}

/// Record of a successful `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSet {
    pub hooks: Vec<AppliedHook>,
    pub md5_before: String,
    pub md5_after: String,
}

impl AppliedSet {
    pub fn bytes_written(&self) -> usize {
        self.hooks.iter().map(|h| h.len).sum()
    }
}

/// Check every precondition of `hooks` against `image` without writing.
pub fn verify(image: &Image, hooks: &[HookDescriptor]) -> Result<(), PatchError> {
    for hook in hooks {
        hook.check_shape()?;
        let len = hook.original_bytes.len();
        if hook.address.checked_add(len).map_or(true, |end| end > image.len()) {
            return Err(PatchError::AddressOutOfRange {
                routine_ref: hook.routine_ref.clone(),
                address: hook.address,
                len,
                image_len: image.len(),
            });
        }
    }

    let mut ordered: Vec<&HookDescriptor> = hooks.iter().collect();
    ordered.sort_by_key(|h| h.address);
    for pair in ordered.windows(2) {
        if pair[1].address < pair[0].range().end {
            return Err(PatchError::RangeOverlap {
                first: pair[0].routine_ref.clone(),
                second: pair[1].routine_ref.clone(),
                address: pair[1].address,
            });
        }
    }

    for hook in hooks {
        let found = image
            .read(hook.address, hook.original_bytes.len())
            .unwrap_or_default();
        if found != hook.original_bytes.as_slice() {
            return Err(PatchError::VerificationMismatch {
                routine_ref: hook.routine_ref.clone(),
                address: hook.address,
                expected: hook.original_bytes.clone(),
                found: found.to_vec(),
            });
        }
    }
    Ok(())
}

/// Apply every hook or none of them.
pub fn apply(image: &mut Image, hooks: &[HookDescriptor]) -> Result<AppliedSet, PatchError> {
    verify(image, hooks)?;

    let md5_before = image.md5();
    let mut applied = Vec::with_capacity(hooks.len());
    for hook in hooks {
        image.write(hook.address, &hook.replacement_bytes);
        log::info!(
            "Hooked {} at {:#06X} ({} bytes)",
            hook.routine_ref,
            hook.address,
            hook.replacement_bytes.len()
        );
        applied.push(AppliedHook {
            routine_ref: hook.routine_ref.clone(),
            address: hook.address,
            len: hook.replacement_bytes.len(),
        });
    }

    Ok(AppliedSet {
        hooks: applied,
        md5_before,
        md5_after: image.md5(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_image;

    fn hook(address: usize, original: &[u8], replacement: &[u8], name: &str) -> HookDescriptor {
        HookDescriptor {
            address,
            original_bytes: original.to_vec(),
            replacement_bytes: replacement.to_vec(),
            routine_ref: name.to_string(),
        }
    }

    fn good_hooks() -> Vec<HookDescriptor> {
        vec![
            hook(0x37CF, &[0x85, 0xF6, 0x60], &[0x4C, 0x5E, 0xFF], "input-site"),
            hook(0x7F50, &[0xFF, 0xFF], &[0xEA, 0x60], "body"),
        ]
    }

    #[test]
    fn apply_changes_only_hook_ranges() {
        let before = synthetic_image();
        let mut image = before.clone();
        let hooks = good_hooks();

        let set = apply(&mut image, &hooks).unwrap();
        assert_eq!(set.hooks.len(), 2);
        assert_eq!(set.bytes_written(), 5);
        assert_ne!(set.md5_before, set.md5_after);
        assert_eq!(set.md5_after, image.md5());

        for (i, (a, b)) in before.bytes().iter().zip(image.bytes()).enumerate() {
            if a != b {
                assert!(hooks.iter().any(|h| h.range().contains(&i)), "{i:#X}");
            }
        }
        assert_eq!(image.read(0x37CF, 3), Some(&[0x4C, 0x5E, 0xFF][..]));
    }

    #[test]
    fn mismatch_leaves_image_untouched() {
        let before = synthetic_image();
        let mut image = before.clone();
        let mut hooks = good_hooks();
        hooks[1].original_bytes = vec![0x00, 0x00];

        let err = apply(&mut image, &hooks).unwrap_err();
        assert!(matches!(err, PatchError::VerificationMismatch { ref routine_ref, .. } if routine_ref == "body"));
        assert_eq!(image, before);
        assert!(err.to_string().contains("FF FF"));
    }

    #[test]
    fn second_apply_is_rejected() {
        let mut image = synthetic_image();
        let hooks = good_hooks();
        apply(&mut image, &hooks).unwrap();
        let patched = image.clone();

        assert!(matches!(
            apply(&mut image, &hooks),
            Err(PatchError::VerificationMismatch { .. })
        ));
        assert_eq!(image, patched);
    }

    #[test]
    fn out_of_range_and_overlap() {
        let mut image = synthetic_image();
        let len = image.len();

        let past_end = vec![hook(len - 1, &[0, 0], &[1, 1], "tail")];
        assert!(matches!(
            apply(&mut image, &past_end),
            Err(PatchError::AddressOutOfRange { .. })
        ));

        let overlapping = vec![
            hook(0x7F52, &[0xFF, 0xFF], &[0x60, 0x60], "b"),
            hook(0x7F50, &[0xFF, 0xFF, 0xFF], &[0xEA, 0xEA, 0x60], "a"),
        ];
        assert_eq!(
            apply(&mut image, &overlapping),
            Err(PatchError::RangeOverlap {
                first: "a".into(),
                second: "b".into(),
                address: 0x7F52
            })
        );
    }

    #[test]
    fn malformed_descriptors() {
        let mut image = synthetic_image();
        assert!(matches!(
            apply(&mut image, &[hook(0x7F50, &[0xFF], &[0xEA, 0x60], "x")]),
            Err(PatchError::LengthMismatch { original: 1, replacement: 2, .. })
        ));
        assert!(matches!(
            apply(&mut image, &[hook(0x7F50, &[0xFF], &[0xFF], "x")]),
            Err(PatchError::InertHook { .. })
        ));
        assert!(matches!(
            apply(&mut image, &[hook(0x7F50, &[], &[], "x")]),
            Err(PatchError::InertHook { .. })
        ));
    }
}
