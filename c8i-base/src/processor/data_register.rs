use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive, UnsafeFromPrimitive};

use crate::nibble_ints::U4;

/// Data register of the CHIP-8 processor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    UnsafeFromPrimitive,
)]
#[repr(u8)]
pub enum DataRegister {
    /// Used as the offset in [`Instruction::JumpOffset`](crate::instruction::Instruction::JumpOffset).
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    /// Carry, borrow and collision flag, and the shifted-out bit after bit shifts.
    VF,
}

impl DataRegister {
    pub const COUNT: usize = 16;

    /// `V0` up to and including `last`.
    pub fn up_to(last: DataRegister) -> impl Iterator<Item = DataRegister> {
        (0..=last as u8).map(|i| DataRegister::from(U4::from_masked(i)))
    }
}

impl From<DataRegister> for U4 {
    fn from(reg: DataRegister) -> Self {
        U4::from_masked(reg as u8)
    }
}

impl From<U4> for DataRegister {
    fn from(val: U4) -> Self {
        // SAFETY: DataRegister has a variant for each of the U4::MAX + 1 nibble values.
        unsafe { DataRegister::from_unchecked(u8::from(val)) }
    }
}

impl fmt::Display for DataRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{:X}", *self as u8)
    }
}
