use derive_more::*;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value {value:#X} exceeds the maximum value {max_value:#X}")]
pub struct UpperBoundExceededError {
    value: usize,
    max_value: usize,
}

/// A minimal 4-bit integer, as found in the nibble fields of an instruction.
/// Need not actually use only 4-bits in memory.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, AsRef, Into, Display)]
#[repr(transparent)]
pub struct U4(u8);

impl U4 {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(0xF);

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    /// Keep only the low nibble of `val`.
    pub const fn from_masked(val: u8) -> Self {
        Self(val & Self::MAX.0)
    }
}

impl TryFrom<u8> for U4 {
    type Error = UpperBoundExceededError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= U4::MAX.0 {
            Ok(U4(value))
        } else {
            Err(UpperBoundExceededError {
                value: value as usize,
                max_value: U4::MAX.0 as usize,
            })
        }
    }
}

/// A minimal 12-bit integer, the width of a CHIP-8 address.
/// Need not actually use only 12-bits in memory.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, AsRef, Into, Display)]
#[repr(transparent)]
pub struct U12(u16);

impl U12 {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(0xFFF);

    pub const fn into_u16(self) -> u16 {
        self.0
    }

    /// Keep only the low 12 bits of `val`, i.e. take it modulo `0x1000`.
    pub const fn from_masked(val: u16) -> Self {
        Self(val & Self::MAX.0)
    }

    /// Add `offset`, wrapping around at the end of the 12-bit range.
    pub const fn wrapping_add(self, offset: u16) -> Self {
        Self::from_masked(self.0.wrapping_add(offset))
    }
}

impl TryFrom<u16> for U12 {
    type Error = UpperBoundExceededError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value <= U12::MAX.0 {
            Ok(U12(value))
        } else {
            Err(UpperBoundExceededError {
                value: value as usize,
                max_value: U12::MAX.0 as usize,
            })
        }
    }
}

impl From<U12> for usize {
    fn from(val: U12) -> Self {
        val.0 as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn u4_try_from() {
        assert_eq!(U4::try_from(0xFu8).map(U4::into_u8), Ok(0xF));
        assert_eq!(
            U4::try_from(0x10u8),
            Err(UpperBoundExceededError {
                value: 0x10,
                max_value: 0xF
            })
        );
    }

    #[test]
    fn u12_wraps() {
        assert_eq!(U12::from_masked(0x1234).into_u16(), 0x234);
        assert_eq!(U12::MAX.wrapping_add(2).into_u16(), 0x001);
        assert!(U12::try_from(0x1000u16).is_err());
    }
}
