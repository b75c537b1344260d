//! iNES image: header parsing, file offset <-> CPU address mapping, MD5.

use std::fmt;
use std::path::{Path, PathBuf};

pub const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
const PRG_UNIT: usize = 0x4000;
const CHR_UNIT: usize = 0x2000;
/// The CPU sees at most 32 KiB of PRG at $8000-$FFFF.
const PRG_WINDOW: usize = 0x8000;

#[derive(Debug)]
pub enum ImageError {
    Io(PathBuf, std::io::Error),
    BadMagic,
    Truncated { expected: usize, actual: usize },
    NoPrg,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Io(path, e) => write!(f, "{}: {e}", path.display()),
            ImageError::BadMagic => write!(f, "not an iNES image (bad magic)"),
            ImageError::Truncated { expected, actual } => {
                write!(f, "image truncated: header says {expected} bytes, file has {actual}")
            }
            ImageError::NoPrg => write!(f, "image has no PRG ROM"),
        }
    }
}

impl std::error::Error for ImageError {}

/// A loaded cartridge image. Owns its bytes exclusively; the only writer
/// is `patch::apply`.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    prg_start: usize,
    prg_len: usize,
    chr_len: usize,
    mapper: u8,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("len", &self.data.len())
            .field("prg_len", &self.prg_len)
            .field("chr_len", &self.chr_len)
            .field("mapper", &self.mapper)
            .finish()
    }
}

impl Image {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ImageError> {
        if data.len() < HEADER_LEN || &data[0..4] != b"NES\x1A" {
            return Err(ImageError::BadMagic);
        }
        let prg_len = data[4] as usize * PRG_UNIT;
        let chr_len = data[5] as usize * CHR_UNIT;
        let trainer = if data[6] & 0x04 != 0 { TRAINER_LEN } else { 0 };
        let mapper = (data[7] & 0xF0) | (data[6] >> 4);

        if prg_len == 0 {
            return Err(ImageError::NoPrg);
        }
        let prg_start = HEADER_LEN + trainer;
        let expected = prg_start + prg_len + chr_len;
        if data.len() < expected {
            return Err(ImageError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            prg_start,
            prg_len,
            chr_len,
            mapper,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ImageError> {
        let data = std::fs::read(path).map_err(|e| ImageError::Io(path.to_path_buf(), e))?;
        Self::from_bytes(data)
    }

    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        std::fs::write(path, &self.data).map_err(|e| ImageError::Io(path.to_path_buf(), e))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mapper(&self) -> u8 {
        self.mapper
    }

    /// `len` bytes at `offset`, or `None` if that runs past the end.
    pub fn read(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.data.get(offset..offset.checked_add(len)?)
    }

    pub(crate) fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    // ── CPU mapping ────────────────────────────────────────────

    /// File offset and CPU base of the PRG bytes visible at power-on.
    /// With 32 KiB or less that is the whole PRG; larger boards keep
    /// their last 32 KiB fixed at $8000.
    fn window(&self) -> (usize, u16) {
        let len = self.prg_len.min(PRG_WINDOW);
        let start = self.prg_start + self.prg_len - len;
        (start, (0x10000 - len) as u16)
    }

    /// The PRG bytes the CPU sees, and the address of the first one.
    pub fn prg_window(&self) -> (&[u8], u16) {
        let (start, base) = self.window();
        (&self.data[start..self.prg_start + self.prg_len], base)
    }

    pub fn cpu_address(&self, offset: usize) -> Option<u16> {
        let (start, base) = self.window();
        let end = self.prg_start + self.prg_len;
        (start..end)
            .contains(&offset)
            .then(|| base + (offset - start) as u16)
    }

    pub fn file_offset(&self, address: u16) -> Option<usize> {
        let (start, base) = self.window();
        (address >= base).then(|| start + (address - base) as usize)
    }

    pub fn md5(&self) -> String {
        format!("{:x}", md5::compute(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_image;

    #[test]
    fn maps_known_offsets_to_cpu_addresses() {
        let image = synthetic_image();
        assert_eq!(image.mapper(), 1);
        assert_eq!(image.cpu_address(0x37CF), Some(0xB7BF));
        assert_eq!(image.cpu_address(0x18E5), Some(0x98D5));
        assert_eq!(image.cpu_address(0x7F50), Some(0xFF40));
        assert_eq!(image.cpu_address(0x0005), None);
        assert_eq!(image.file_offset(0xB7BF), Some(0x37CF));
        assert_eq!(image.file_offset(0x6000), None);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            Image::from_bytes(b"NOPE".to_vec()),
            Err(ImageError::BadMagic)
        ));

        let mut header = vec![0u8; HEADER_LEN];
        header[..4].copy_from_slice(b"NES\x1A");
        header[4] = 2;
        assert!(matches!(
            Image::from_bytes(header.clone()),
            Err(ImageError::Truncated { .. })
        ));

        header[4] = 0;
        assert!(matches!(Image::from_bytes(header), Err(ImageError::NoPrg)));
    }

    #[test]
    fn md5_changes_with_content() {
        let mut image = synthetic_image();
        let before = image.md5();
        assert_eq!(before.len(), 32);
        image.write(0x7F50, &[0x60]);
        assert_ne!(image.md5(), before);
    }

    #[test]
    fn read_past_end_is_none() {
        let image = synthetic_image();
        assert!(image.read(image.len() - 1, 2).is_none());
        assert!(image.read(usize::MAX, 2).is_none());
        assert_eq!(image.read(0, 4), Some(&b"NES\x1A"[..]));
    }
}
