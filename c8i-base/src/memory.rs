use std::fmt::{self, Debug};

use static_assertions::const_assert_eq;
use thiserror::Error;

use crate::{
    font::{FONT, FONT_LEN},
    nibble_ints::U12,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(
        "a program with a length of {program_len:#X} bytes does not fit into the {:#X} bytes of program memory",
        Memory::MAX_PROGRAM_LEN
    )]
    ProgramTooLarge { program_len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a two byte read at {address:#05X} exceeds the end of memory")]
pub struct OutOfBoundsRead {
    pub address: u16,
}

/// The 4KiB of CHIP-8 memory.
///
/// The font occupies the first [`FONT_LEN`] bytes, programs start at [`Memory::PROGRAM_START`].
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: [u8; Self::LEN],
}

const_assert_eq!(Memory::LEN, U12::MAX.into_u16() as usize + 1);

impl Memory {
    /// Number of addressable bytes.
    pub const LEN: usize = 0x1000;
    /// Address the program image is loaded to.
    pub const PROGRAM_START: u16 = 0x200;
    /// Largest program image that fits.
    pub const MAX_PROGRAM_LEN: usize = Self::LEN - Self::PROGRAM_START as usize;

    /// Zeroed memory with the font in place.
    pub fn new() -> Self {
        let mut bytes = [0; Self::LEN];
        bytes[..FONT_LEN].copy_from_slice(&FONT);
        Self { bytes }
    }

    pub fn read(&self, address: U12) -> u8 {
        self.bytes[usize::from(address)]
    }

    pub fn write(&mut self, address: U12, value: u8) {
        self.bytes[usize::from(address)] = value;
    }

    /// Read the big-endian word at `address` and `address + 1`.
    ///
    /// Takes a raw address since the program counter is not masked;
    /// both bytes must lie within memory.
    pub fn read_u16(&self, address: u16) -> Result<u16, OutOfBoundsRead> {
        let start = address as usize;
        match self.bytes.get(start..start + 2) {
            Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
            _ => Err(OutOfBoundsRead { address }),
        }
    }

    /// Copy `program` into memory starting at [`Memory::PROGRAM_START`].
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > Self::MAX_PROGRAM_LEN {
            return Err(LoadError::ProgramTooLarge {
                program_len: program.len(),
            });
        }

        let start = Self::PROGRAM_START as usize;
        self.bytes[start..start + program.len()].copy_from_slice(program);

        Ok(())
    }

    /// Up to `len` bytes beginning at `start`, cut short at the end of memory.
    pub fn slice(&self, start: U12, len: usize) -> &[u8] {
        let start = usize::from(start);
        let end = start.saturating_add(len).min(Self::LEN);
        &self.bytes[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.bytes.iter().filter(|byte| **byte != 0).count();
        f.debug_struct("Memory")
            .field("len", &Self::LEN)
            .field("non_zero_bytes", &used)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn addr(val: u16) -> U12 {
        U12::try_from(val).unwrap()
    }

    #[test]
    fn font_is_preloaded() {
        let memory = Memory::new();
        assert_eq!(memory.slice(U12::MIN, FONT_LEN), &FONT[..]);
        assert_eq!(memory.read(addr(FONT_LEN as u16)), 0);
    }

    #[test]
    fn program_lands_at_0x200() {
        let mut memory = Memory::new();
        memory.load_program(&[0x60, 0x05, 0x12, 0x00]).unwrap();

        assert_eq!(memory.read_u16(0x200), Ok(0x6005));
        assert_eq!(memory.read_u16(0x202), Ok(0x1200));
        assert_eq!(memory.read(addr(0x1FF)), 0);
    }

    #[test]
    fn program_too_large() {
        let mut memory = Memory::new();
        let program = vec![0xAA; Memory::MAX_PROGRAM_LEN + 1];

        assert_eq!(
            memory.load_program(&program),
            Err(LoadError::ProgramTooLarge {
                program_len: Memory::MAX_PROGRAM_LEN + 1
            })
        );
        assert!(memory.load_program(&program[1..]).is_ok());
        assert_eq!(memory.read(U12::MAX), 0xAA);
    }

    #[test]
    fn read_u16_at_end() {
        let mut memory = Memory::new();
        memory.write(addr(0xFFE), 0x12);
        memory.write(addr(0xFFF), 0x34);

        assert_eq!(memory.read_u16(0xFFE), Ok(0x1234));
        assert_eq!(
            memory.read_u16(0xFFF),
            Err(OutOfBoundsRead { address: 0xFFF })
        );
        assert_eq!(
            memory.read_u16(0x1200),
            Err(OutOfBoundsRead { address: 0x1200 })
        );
    }

    #[test]
    fn slice_is_clamped() {
        let memory = Memory::new();
        assert_eq!(memory.slice(addr(0xFF0), 128).len(), 0x10);
    }
}
