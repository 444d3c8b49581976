use std::fmt;

/// The return address stack, with room for [`CallStack::CAPACITY`] nested calls.
///
/// Slots above the pointer are not part of the stack,
/// so equality and `Debug` only look at the pushed frames.
#[derive(Clone, Copy)]
pub struct CallStack {
    frames: [u16; Self::CAPACITY],
    pointer: u8,
}

impl CallStack {
    pub const CAPACITY: usize = 16;

    /// Number of addresses on the stack, i.e. the index the next push writes to.
    pub fn len(&self) -> usize {
        self.pointer as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pointer == 0
    }

    /// The pushed return addresses, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.frames[..self.len()]
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.pointer = self.pointer.checked_sub(1)?;
        Some(self.frames[self.len()])
    }

    /// Push `address`, failing with `false` if the stack is full.
    #[must_use]
    pub fn push(&mut self, address: u16) -> bool {
        if self.len() < Self::CAPACITY {
            self.frames[self.len()] = address;
            self.pointer += 1;
            true
        } else {
            false
        }
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self {
            frames: [0; Self::CAPACITY],
            pointer: 0,
        }
    }
}

impl PartialEq for CallStack {
    fn eq(&self, other: &Self) -> bool {
        self.frames() == other.frames()
    }
}

impl Eq for CallStack {}

impl fmt::Debug for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames()).finish()
    }
}

impl<'a> FromIterator<&'a u16> for CallStack {
    /// Stack holding the given addresses, the last one on top.
    /// Addresses beyond the capacity are dropped.
    fn from_iter<I: IntoIterator<Item = &'a u16>>(iter: I) -> Self {
        let mut call_stack = Self::default();
        for address in iter {
            if !call_stack.push(*address) {
                break;
            }
        }
        call_stack
    }
}
