use std::fmt;

use thiserror::Error;

use crate::{
    nibble_ints::{U12, U4},
    processor::DataRegister,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown instruction `{0:04X}`")]
pub struct UnknownInstructionError(pub u16);

/// A CHIP-8 instruction.
///
/// References used are
/// <https://github.com/mattmikolay/chip-8/wiki/CHIP%E2%80%908-Instruction-Set> (CC-BY-SA 4.0, Matthew Mikolay)
/// and <http://devernay.free.fr/hacks/chip8/C8TECH10.HTM> (Thomas P. Greene).
///
/// Variant fields are named after the instruction word fields:
/// `x` and `y` are the register nibbles, `value` the low byte, `address` the low 12 bits.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    /// `00E0`: clear the display.
    ClearScreen,
    /// `00EE`: return from a subroutine.
    Return,
    /// `1nnn`: jump to `address`.
    Jump { address: U12 },
    /// `2nnn`: call the subroutine at `address`.
    Call { address: U12 },
    /// `3xkk`: skip the next instruction if `x` equals `value`.
    SkipEqConst { x: DataRegister, value: u8 },
    /// `4xkk`: skip the next instruction if `x` does not equal `value`.
    SkipNeqConst { x: DataRegister, value: u8 },
    /// `5xy0`: skip the next instruction if `x` equals `y`.
    SkipEq { x: DataRegister, y: DataRegister },
    /// `6xkk`: assign `value` to `x`.
    AssignConst { x: DataRegister, value: u8 },
    /// `7xkk`: add `value` to `x`, wrapping around.
    ///
    /// [`DataRegister::VF`] is not altered.
    AddAssignConst { x: DataRegister, value: u8 },
    /// `8xy0`: assign `y` to `x`.
    Assign { x: DataRegister, y: DataRegister },
    /// `8xy1`: `x |= y`.
    OrAssign { x: DataRegister, y: DataRegister },
    /// `8xy2`: `x &= y`.
    AndAssign { x: DataRegister, y: DataRegister },
    /// `8xy3`: `x ^= y`.
    XorAssign { x: DataRegister, y: DataRegister },
    /// `8xy4`: add `y` to `x`.
    ///
    /// [`DataRegister::VF`] is set to `1` on carry, to `0` otherwise.
    AddAssign { x: DataRegister, y: DataRegister },
    /// `8xy5`: subtract `y` from `x`.
    ///
    /// [`DataRegister::VF`] is set to `0` on borrow, to `1` otherwise.
    SubAssign { x: DataRegister, y: DataRegister },
    /// `8xy6`: shift one bit to the right into `x`.
    ///
    /// [`DataRegister::VF`] is set to the bit shifted out.
    ShrAssign { x: DataRegister, y: DataRegister },
    /// `8xy7`: assign `y - x` to `x`.
    ///
    /// [`DataRegister::VF`] is set to `0` on borrow, to `1` otherwise.
    RevSubAssign { x: DataRegister, y: DataRegister },
    /// `8xyE`: shift one bit to the left into `x`.
    ///
    /// [`DataRegister::VF`] is set to the bit shifted out.
    ShlAssign { x: DataRegister, y: DataRegister },
    /// `9xy0`: skip the next instruction if `x` does not equal `y`.
    SkipNeq { x: DataRegister, y: DataRegister },
    /// `Annn`: assign `address` to the address register `I`.
    AssignAddrToI { address: U12 },
    /// `Bnnn`: jump to `address` plus [`DataRegister::V0`].
    JumpOffset { address: U12 },
    /// `Cxkk`: assign random bits, masked with `mask`, to `x`.
    AssignRandomMasked { x: DataRegister, mask: u8 },
    /// `Dxyn`: draw the `rows` bytes tall sprite at address `I` at the position in `x` and `y`.
    DrawSprite {
        x: DataRegister,
        y: DataRegister,
        rows: U4,
    },
    /// `Ex9E`: skip the next instruction if the key in `x` is down.
    SkipIfKeyPressed { x: DataRegister },
    /// `ExA1`: skip the next instruction if the key in `x` is not down.
    SkipIfKeyNotPressed { x: DataRegister },
    /// `Fx07`: assign the delay timer to `x`.
    AssignDelayTimerVal { x: DataRegister },
    /// `Fx0A`: wait until a key is down and assign it to `x`.
    WaitForKeyPress { x: DataRegister },
    /// `Fx15`: set the delay timer to `x`.
    SetDelayTimer { x: DataRegister },
    /// `Fx18`: set the sound timer to `x`.
    SetSoundTimer { x: DataRegister },
    /// `Fx1E`: add `x` to `I`.
    ///
    /// [`DataRegister::VF`] is not altered.
    AddAssignI { x: DataRegister },
    /// `Fx29`: point `I` at the built-in glyph of the digit in `x`.
    AssignGlyphAddrToI { x: DataRegister },
    /// `Fx33`: store the decimal digits of `x` at `I`, `I + 1` and `I + 2`, hundreds first.
    StoreBcd { x: DataRegister },
    /// `Fx55`: store `V0` through `last` at `I` onwards.
    StoreRegisterValues { last: DataRegister },
    /// `Fx65`: load `V0` through `last` from `I` onwards.
    LoadRegisterValues { last: DataRegister },
}

/// Register in the `x` nibble of `word`.
fn x_of(word: u16) -> DataRegister {
    DataRegister::from(U4::from_masked((word >> 8) as u8))
}

/// Register in the `y` nibble of `word`.
fn y_of(word: u16) -> DataRegister {
    DataRegister::from(U4::from_masked((word >> 4) as u8))
}

fn value_of(word: u16) -> u8 {
    word as u8
}

fn address_of(word: u16) -> U12 {
    U12::from_masked(word)
}

impl Instruction {
    /// Decode an instruction word.
    ///
    /// Dispatch goes by the leading nibble first.
    /// Groups whose members share that nibble are then told apart by the full mask of the group.
    pub fn decode(word: u16) -> Result<Self, UnknownInstructionError> {
        let (x, y, value, address) = (x_of(word), y_of(word), value_of(word), address_of(word));
        let unknown = Err(UnknownInstructionError(word));

        let instruction = match word & 0xF000 {
            0x0000 => match word {
                0x00E0 => Self::ClearScreen,
                0x00EE => Self::Return,
                _ => return unknown,
            },
            0x1000 => Self::Jump { address },
            0x2000 => Self::Call { address },
            0x3000 => Self::SkipEqConst { x, value },
            0x4000 => Self::SkipNeqConst { x, value },
            0x5000 => match word & 0xF00F {
                0x5000 => Self::SkipEq { x, y },
                _ => return unknown,
            },
            0x6000 => Self::AssignConst { x, value },
            0x7000 => Self::AddAssignConst { x, value },
            0x8000 => match word & 0xF00F {
                0x8000 => Self::Assign { x, y },
                0x8001 => Self::OrAssign { x, y },
                0x8002 => Self::AndAssign { x, y },
                0x8003 => Self::XorAssign { x, y },
                0x8004 => Self::AddAssign { x, y },
                0x8005 => Self::SubAssign { x, y },
                0x8006 => Self::ShrAssign { x, y },
                0x8007 => Self::RevSubAssign { x, y },
                0x800E => Self::ShlAssign { x, y },
                _ => return unknown,
            },
            0x9000 => match word & 0xF00F {
                0x9000 => Self::SkipNeq { x, y },
                _ => return unknown,
            },
            0xA000 => Self::AssignAddrToI { address },
            0xB000 => Self::JumpOffset { address },
            0xC000 => Self::AssignRandomMasked { x, mask: value },
            0xD000 => Self::DrawSprite {
                x,
                y,
                rows: U4::from_masked(word as u8),
            },
            0xE000 => match word & 0xF0FF {
                0xE09E => Self::SkipIfKeyPressed { x },
                0xE0A1 => Self::SkipIfKeyNotPressed { x },
                _ => return unknown,
            },
            0xF000 => match word & 0xF0FF {
                0xF007 => Self::AssignDelayTimerVal { x },
                0xF00A => Self::WaitForKeyPress { x },
                0xF015 => Self::SetDelayTimer { x },
                0xF018 => Self::SetSoundTimer { x },
                0xF01E => Self::AddAssignI { x },
                0xF029 => Self::AssignGlyphAddrToI { x },
                0xF033 => Self::StoreBcd { x },
                0xF055 => Self::StoreRegisterValues { last: x },
                0xF065 => Self::LoadRegisterValues { last: x },
                _ => return unknown,
            },
            _ => unreachable!("masked to the leading nibble"),
        };

        Ok(instruction)
    }

    /// The instruction word this instruction decodes from.
    pub fn encode(self) -> u16 {
        fn xy(opcode: u16, x: DataRegister, y: DataRegister, n: u16) -> u16 {
            opcode | (x as u16) << 8 | (y as u16) << 4 | n
        }
        fn xkk(opcode: u16, x: DataRegister, value: u8) -> u16 {
            opcode | (x as u16) << 8 | value as u16
        }
        fn nnn(opcode: u16, address: U12) -> u16 {
            opcode | address.into_u16()
        }
        fn fx(low_byte: u16, x: DataRegister) -> u16 {
            0xF000 | (x as u16) << 8 | low_byte
        }

        match self {
            Self::ClearScreen => 0x00E0,
            Self::Return => 0x00EE,
            Self::Jump { address } => nnn(0x1000, address),
            Self::Call { address } => nnn(0x2000, address),
            Self::SkipEqConst { x, value } => xkk(0x3000, x, value),
            Self::SkipNeqConst { x, value } => xkk(0x4000, x, value),
            Self::SkipEq { x, y } => xy(0x5000, x, y, 0x0),
            Self::AssignConst { x, value } => xkk(0x6000, x, value),
            Self::AddAssignConst { x, value } => xkk(0x7000, x, value),
            Self::Assign { x, y } => xy(0x8000, x, y, 0x0),
            Self::OrAssign { x, y } => xy(0x8000, x, y, 0x1),
            Self::AndAssign { x, y } => xy(0x8000, x, y, 0x2),
            Self::XorAssign { x, y } => xy(0x8000, x, y, 0x3),
            Self::AddAssign { x, y } => xy(0x8000, x, y, 0x4),
            Self::SubAssign { x, y } => xy(0x8000, x, y, 0x5),
            Self::ShrAssign { x, y } => xy(0x8000, x, y, 0x6),
            Self::RevSubAssign { x, y } => xy(0x8000, x, y, 0x7),
            Self::ShlAssign { x, y } => xy(0x8000, x, y, 0xE),
            Self::SkipNeq { x, y } => xy(0x9000, x, y, 0x0),
            Self::AssignAddrToI { address } => nnn(0xA000, address),
            Self::JumpOffset { address } => nnn(0xB000, address),
            Self::AssignRandomMasked { x, mask } => xkk(0xC000, x, mask),
            Self::DrawSprite { x, y, rows } => xy(0xD000, x, y, rows.into_u8() as u16),
            Self::SkipIfKeyPressed { x } => xkk(0xE000, x, 0x9E),
            Self::SkipIfKeyNotPressed { x } => xkk(0xE000, x, 0xA1),
            Self::AssignDelayTimerVal { x } => fx(0x07, x),
            Self::WaitForKeyPress { x } => fx(0x0A, x),
            Self::SetDelayTimer { x } => fx(0x15, x),
            Self::SetSoundTimer { x } => fx(0x18, x),
            Self::AddAssignI { x } => fx(0x1E, x),
            Self::AssignGlyphAddrToI { x } => fx(0x29, x),
            Self::StoreBcd { x } => fx(0x33, x),
            Self::StoreRegisterValues { last } => fx(0x55, last),
            Self::LoadRegisterValues { last } => fx(0x65, last),
        }
    }
}

impl TryFrom<u16> for Instruction {
    type Error = UnknownInstructionError;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        Self::decode(word)
    }
}

impl From<Instruction> for u16 {
    fn from(instruction: Instruction) -> Self {
        instruction.encode()
    }
}

impl From<Instruction> for [u8; 2] {
    fn from(instruction: Instruction) -> Self {
        instruction.encode().to_be_bytes()
    }
}

/// Disassembly in the customary mnemonics, e.g. `LD V3, 0x2A`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ClearScreen => write!(f, "CLS"),
            Self::Return => write!(f, "RET"),
            Self::Jump { address } => write!(f, "JP {:#05X}", address.into_u16()),
            Self::Call { address } => write!(f, "CALL {:#05X}", address.into_u16()),
            Self::SkipEqConst { x, value } => write!(f, "SE {}, {:#04X}", x, value),
            Self::SkipNeqConst { x, value } => write!(f, "SNE {}, {:#04X}", x, value),
            Self::SkipEq { x, y } => write!(f, "SE {}, {}", x, y),
            Self::AssignConst { x, value } => write!(f, "LD {}, {:#04X}", x, value),
            Self::AddAssignConst { x, value } => write!(f, "ADD {}, {:#04X}", x, value),
            Self::Assign { x, y } => write!(f, "LD {}, {}", x, y),
            Self::OrAssign { x, y } => write!(f, "OR {}, {}", x, y),
            Self::AndAssign { x, y } => write!(f, "AND {}, {}", x, y),
            Self::XorAssign { x, y } => write!(f, "XOR {}, {}", x, y),
            Self::AddAssign { x, y } => write!(f, "ADD {}, {}", x, y),
            Self::SubAssign { x, y } => write!(f, "SUB {}, {}", x, y),
            Self::ShrAssign { x, y } => write!(f, "SHR {}, {}", x, y),
            Self::RevSubAssign { x, y } => write!(f, "SUBN {}, {}", x, y),
            Self::ShlAssign { x, y } => write!(f, "SHL {}, {}", x, y),
            Self::SkipNeq { x, y } => write!(f, "SNE {}, {}", x, y),
            Self::AssignAddrToI { address } => write!(f, "LD I, {:#05X}", address.into_u16()),
            Self::JumpOffset { address } => write!(f, "JP V0, {:#05X}", address.into_u16()),
            Self::AssignRandomMasked { x, mask } => write!(f, "RND {}, {:#04X}", x, mask),
            Self::DrawSprite { x, y, rows } => write!(f, "DRW {}, {}, {}", x, y, rows),
            Self::SkipIfKeyPressed { x } => write!(f, "SKP {}", x),
            Self::SkipIfKeyNotPressed { x } => write!(f, "SKNP {}", x),
            Self::AssignDelayTimerVal { x } => write!(f, "LD {}, DT", x),
            Self::WaitForKeyPress { x } => write!(f, "LD {}, K", x),
            Self::SetDelayTimer { x } => write!(f, "LD DT, {}", x),
            Self::SetSoundTimer { x } => write!(f, "LD ST, {}", x),
            Self::AddAssignI { x } => write!(f, "ADD I, {}", x),
            Self::AssignGlyphAddrToI { x } => write!(f, "LD F, {}", x),
            Self::StoreBcd { x } => write!(f, "LD B, {}", x),
            Self::StoreRegisterValues { last } => write!(f, "LD [I], {}", last),
            Self::LoadRegisterValues { last } => write!(f, "LD {}, [I]", last),
        }
    }
}
