use num_enum::{IntoPrimitive, TryFromPrimitive, UnsafeFromPrimitive};

use crate::nibble_ints::U4;

/// A key of the hexadecimal CHIP-8 keypad.
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
pub enum Key {
    K0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF,
}

impl Key {
    /// All keys, ordered by their value.
    pub const ALL: [Key; 16] = [
        Key::K0,
        Key::K1,
        Key::K2,
        Key::K3,
        Key::K4,
        Key::K5,
        Key::K6,
        Key::K7,
        Key::K8,
        Key::K9,
        Key::KA,
        Key::KB,
        Key::KC,
        Key::KD,
        Key::KE,
        Key::KF,
    ];
}

impl From<Key> for U4 {
    fn from(key: Key) -> Self {
        U4::from_masked(key as u8)
    }
}

impl From<U4> for Key {
    fn from(val: U4) -> Self {
        // SAFETY: Key has a variant for each of the U4::MAX + 1 nibble values.
        unsafe { Key::from_unchecked(u8::from(val)) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    NotPressed,
}

impl Default for KeyState {
    fn default() -> Self {
        Self::NotPressed
    }
}

/// The set of keys currently held down.
///
/// Written by whatever listens to the physical keyboard, only read by the processor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    key_states: [KeyState; 16],
}

impl InputState {
    pub fn key_state(&self, key: Key) -> KeyState {
        self.key_states[key as u8 as usize]
    }

    pub fn set_key_state(&mut self, key: Key, state: KeyState) {
        self.key_states[key as u8 as usize] = state;
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.key_state(key) == KeyState::Pressed
    }

    pub fn press(&mut self, key: Key) {
        self.set_key_state(key, KeyState::Pressed);
    }

    pub fn release(&mut self, key: Key) {
        self.set_key_state(key, KeyState::NotPressed);
    }

    /// The lowest-numbered key that is down, if any.
    ///
    /// This is the non-blocking form of waiting for any key;
    /// callers poll it until it yields a key.
    pub fn first_down(&self) -> Option<Key> {
        Key::ALL.iter().copied().find(|key| self.is_down(*key))
    }

    /// Iterate over the keys that are down, lowest first.
    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.iter().copied().filter(move |key| self.is_down(*key))
    }
}
