use std::{collections::HashMap, str::FromStr};

use c8i_base::input::Key;
use thiserror::Error;

/// Physical keys of the left hand QWERTY block, in CHIP-8 key order `0` to `F`.
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// q w e r   ->   4 5 6 D
/// a s d f        7 8 9 E
/// z x c v        A 0 B F
/// ```
const DEFAULT_LAYOUT: [char; 16] = [
    'x', '1', '2', '3', 'q', 'w', 'e', 'a', 's', 'd', 'z', 'c', '4', 'r', 'f', 'v',
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeymapError {
    #[error("a keymap needs exactly 16 characters, one per CHIP-8 key, got {0}")]
    WrongLength(usize),
    #[error("`{character}` is mapped to both key {first:X} and key {second:X}")]
    Duplicate {
        character: char,
        first: u8,
        second: u8,
    },
}

/// Table of physical characters to CHIP-8 keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    keys: HashMap<char, Key>,
}

impl Keymap {
    /// The CHIP-8 key `character` is mapped to.
    ///
    /// Letters are matched case insensitively.
    pub fn key(&self, character: char) -> Option<Key> {
        self.keys
            .get(&character)
            .or_else(|| self.keys.get(&character.to_ascii_lowercase()))
            .copied()
    }

    /// The character mapped to `key`.
    pub fn character(&self, key: Key) -> Option<char> {
        self.keys
            .iter()
            .find_map(|(&character, &mapped)| (mapped == key).then(|| character))
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            keys: DEFAULT_LAYOUT.iter().copied().zip(Key::ALL).collect(),
        }
    }
}

impl FromStr for Keymap {
    type Err = KeymapError;

    /// Parse 16 characters, the `n`th being the physical key for CHIP-8 key `n`.
    fn from_str(layout: &str) -> Result<Self, Self::Err> {
        let characters: Vec<char> = layout.chars().collect();
        if characters.len() != Key::ALL.len() {
            return Err(KeymapError::WrongLength(characters.len()));
        }

        let mut keys = HashMap::with_capacity(Key::ALL.len());
        for (character, key) in characters.into_iter().zip(Key::ALL) {
            if let Some(first) = keys.insert(character, key) {
                return Err(KeymapError::Duplicate {
                    character,
                    first: first.into(),
                    second: key.into(),
                });
            }
        }
        Ok(Self { keys })
    }
}
