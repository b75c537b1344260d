//! Free-region allocation and link-time fixups.
//!
//! Routines are placed back to back in the order given, each at the
//! start of a slot as large as its declared byte budget, so a routine
//! growing inside its budget never moves its neighbours. Cross-routine
//! references are patched once every entry point has an address.

use crate::asm::{BuildError, FixupKind, Routine};
use crate::image::Image;

/// A contiguous run of unused PRG bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// File offset of the first byte.
    pub start: usize,
    /// File offset one past the last byte.
    pub end: usize,
    /// CPU address of `start`.
    pub base: u16,
}

impl Region {
    /// `[start, end)` of `image`, which must be CPU-visible throughout.
    pub fn new(image: &Image, start: usize, end: usize) -> Result<Self, BuildError> {
        let unmapped = BuildError::RegionNotMapped { start, end };
        if end <= start {
            return Err(unmapped);
        }
        match (image.cpu_address(start), image.cpu_address(end - 1)) {
            (Some(base), Some(_)) => Ok(Self { start, end, base }),
            _ => Err(unmapped),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub name: &'static str,
    pub offset: usize,
    pub address: u16,
    /// Slot size, the routine's byte budget.
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    region: Region,
    placements: Vec<Placement>,
}

impl Layout {
    pub fn allocate(region: Region, routines: &[Routine]) -> Result<Self, BuildError> {
        let needed: usize = routines.iter().map(|r| r.byte_budget).sum();
        if needed > region.len() {
            return Err(BuildError::OutOfSpace {
                needed,
                available: region.len(),
            });
        }

        let mut cursor = 0;
        let placements = routines
            .iter()
            .map(|r| {
                let p = Placement {
                    name: r.name,
                    offset: region.start + cursor,
                    address: region.base + cursor as u16,
                    slot: r.byte_budget,
                };
                cursor += r.byte_budget;
                p
            })
            .collect();

        Ok(Self { region, placements })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.placements
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.address)
    }

    /// Final bytes of `routine` when it runs from `origin`.
    pub fn link(&self, routine: &Routine, origin: u16) -> Result<Vec<u8>, BuildError> {
        let mut code = routine.code().to_vec();
        for fixup in routine.links() {
            let target = self
                .address_of(fixup.target)
                .ok_or(BuildError::UnknownLabel {
                    routine: routine.name,
                    label: fixup.target,
                })?;
            match fixup.kind {
                FixupKind::Absolute => {
                    code[fixup.at..fixup.at + 2].copy_from_slice(&target.to_le_bytes());
                }
                FixupKind::Relative => {
                    let next = origin as isize + fixup.at as isize + 1;
                    let distance = target as isize - next;
                    let rel =
                        i8::try_from(distance).map_err(|_| BuildError::UnreachableBranch {
                            routine: routine.name,
                            at: fixup.at - 1,
                            target: fixup.target,
                            distance,
                        })?;
                    code[fixup.at] = rel as u8;
                }
            }
        }
        Ok(code)
    }

    /// Link every placed routine at its own slot. `routines` must be the
    /// list the layout was allocated from.
    pub fn link_placed(&self, routines: &[Routine]) -> Result<Vec<(Placement, Vec<u8>)>, BuildError> {
        self.placements
            .iter()
            .zip(routines)
            .map(|(p, r)| Ok((*p, self.link(r, p.address)?)))
            .collect()
    }
}
