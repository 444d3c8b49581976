//! A CHIP-8 interpreter core: memory, screen, keypad, instruction decoding and the processor.

mod font;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod memory;
pub mod nibble_ints;
pub mod processor;

pub use font::{FONT, GLYPH_HEIGHT};
pub use processor::{Processor, ProcessorBuilder, ProcessorError};
