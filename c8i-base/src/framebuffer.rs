use std::fmt::{Debug, Write};

use static_assertions::const_assert_eq;

/// The 64x32 monochrome display of the CHIP-8, one bit per pixel.
///
/// Pixels are packed row-major, the most significant bit of a byte being the leftmost pixel.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Framebuffer {
    pixel_data: [u8; Self::WIDTH_BYTES * Self::HEIGHT as usize],
}

const_assert_eq!(Framebuffer::WIDTH as usize, Framebuffer::WIDTH_BYTES * 8);

impl Framebuffer {
    pub const WIDTH_BYTES: usize = 8;
    pub const WIDTH: u8 = Self::WIDTH_BYTES as u8 * u8::BITS as u8;
    pub const HEIGHT: u8 = 32;

    /// Index of the byte holding pixel `(x, y)` and the mask of the pixel within it.
    /// Coordinates are taken modulo the screen size.
    fn locate(x: u8, y: u8) -> (usize, u8) {
        let x = (x % Self::WIDTH) as usize;
        let y = (y % Self::HEIGHT) as usize;
        (x / 8 + y * Self::WIDTH_BYTES, 0b1000_0000 >> (x % 8))
    }

    /// Get the pixel at `(x, y)` as `0` or `1`.
    pub fn get(&self, x: u8, y: u8) -> u8 {
        let (index, mask) = Self::locate(x, y);
        (self.pixel_data[index] & mask > 0) as u8
    }

    /// Set the pixel at `(x, y)` to on if `bit` is non-zero, else to off.
    pub fn set(&mut self, x: u8, y: u8, bit: u8) {
        let (index, mask) = Self::locate(x, y);
        if bit != 0 {
            self.pixel_data[index] |= mask;
        } else {
            self.pixel_data[index] &= !mask;
        }
    }

    /// XOR the pixel at `(x, y)` with `bit`.
    ///
    /// Returns `true` if a set pixel has been unset, `false` otherwise.
    pub fn xor_draw(&mut self, x: u8, y: u8, bit: u8) -> bool {
        if bit == 0 {
            return false;
        }
        let (index, mask) = Self::locate(x, y);
        let was_set = self.pixel_data[index] & mask > 0;
        self.pixel_data[index] ^= mask;
        was_set
    }

    /// XOR `byte` onto the screen byte at `byte_x` in row `y`.
    ///
    /// Returns `true` if a set pixel has been unset, `false` otherwise.
    fn draw_byte(&mut self, byte_x: usize, y: usize, byte: u8) -> bool {
        let screen_byte = &mut self.pixel_data[byte_x + y * Self::WIDTH_BYTES];
        // A one in both the screen byte and the sprite byte unsets a set pixel.
        let set_pixel_unset = *screen_byte & byte > 0;
        *screen_byte ^= byte;
        set_pixel_unset
    }

    /// XOR a sprite of one byte per row onto the screen, its top left corner at `(x, y)`.
    ///
    /// The corner is always taken modulo the screen size,
    /// parts of the sprite running past an edge are clipped or wrapped as `partial_offscreen_drawing` says.
    ///
    /// Returns `true` if a set pixel has been unset, `false` otherwise.
    pub fn draw_sprite(
        &mut self,
        x: u8,
        y: u8,
        sprite: &[u8],
        partial_offscreen_drawing: PartialOffscreenDrawing,
    ) -> bool {
        let x = (x % Self::WIDTH) as usize;
        let y = (y % Self::HEIGHT) as usize;
        let mut set_pixel_unset = false;

        for (i, sprite_byte) in sprite.iter().copied().enumerate() {
            let y = if y + i < Self::HEIGHT as usize {
                y + i
            } else if partial_offscreen_drawing.should_wrap_y() {
                (y + i) % Self::HEIGHT as usize
            } else {
                break;
            };

            set_pixel_unset |= self.draw_byte(x / 8, y, sprite_byte >> (x % 8));

            // Byte aligned sprites fit into a single screen byte.
            if x % 8 == 0 {
                continue;
            }

            let rem_byte_x = x / 8 + 1;
            let rem_byte_x = if rem_byte_x < Self::WIDTH_BYTES {
                rem_byte_x
            } else if partial_offscreen_drawing.should_wrap_x() {
                0
            } else {
                continue;
            };

            set_pixel_unset |= self.draw_byte(rem_byte_x, y, sprite_byte << (8 - (x % 8)));
        }

        set_pixel_unset
    }

    pub fn clear(&mut self) {
        self.pixel_data.fill(0);
    }

    /// The pixels of row `y`, `true` being on.
    pub fn row(&self, y: u8) -> impl Iterator<Item = bool> + '_ {
        let start = (y % Self::HEIGHT) as usize * Self::WIDTH_BYTES;
        self.pixel_data[start..start + Self::WIDTH_BYTES]
            .iter()
            .copied()
            .flat_map(|byte| (0..8).rev().map(move |i| byte >> i & 1 > 0))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixel_data: [0; Self::WIDTH_BYTES * Self::HEIGHT as usize],
        }
    }
}

impl Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            writeln!(f, "Framebuffer(")?;
            for y in 0..Self::HEIGHT {
                for pixel_on in self.row(y) {
                    f.write_char(if pixel_on { '#' } else { '_' })?;
                }
                f.write_char('\n')?;
            }
            write!(f, ")")
        } else {
            f.debug_tuple("Framebuffer").field(&self.pixel_data).finish()
        }
    }
}

/// Drawing behavior for sprites that are partially offscreen.
///
/// Sprites that are drawn at coordinates fully offscreen will *always*
/// have the modulo of the screen size applied to their coordinates.
/// The partial offscreen drawing behavior will be applied after this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialOffscreenDrawing {
    /// Clip offscreen parts of sprites in both X and Y.
    ClipXY,
    /// Clip offscreen parts of sprites in X, wrap in Y.
    ClipXWrapY,
    /// Wrap offscreen parts of sprites in X, clip in Y.
    WrapXClipY,
    /// Wrap offscreen parts of sprites in both X and Y.
    WrapXY,
}

impl Default for PartialOffscreenDrawing {
    fn default() -> Self {
        Self::ClipXY
    }
}

impl PartialOffscreenDrawing {
    pub fn should_wrap_x(self) -> bool {
        matches!(self, Self::WrapXY | Self::WrapXClipY)
    }

    pub fn should_wrap_y(self) -> bool {
        matches!(self, Self::WrapXY | Self::ClipXWrapY)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit_pixels(framebuffer: &Framebuffer) -> Vec<(u8, u8)> {
        (0..Framebuffer::HEIGHT)
            .flat_map(|y| (0..Framebuffer::WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| framebuffer.get(x, y) == 1)
            .collect()
    }

    #[test]
    fn xor_draw_reports_collision() {
        let mut framebuffer = Framebuffer::default();

        assert!(!framebuffer.xor_draw(3, 4, 1));
        assert_eq!(framebuffer.get(3, 4), 1);
        assert!(!framebuffer.xor_draw(3, 4, 0));
        assert_eq!(framebuffer.get(3, 4), 1);
        assert!(framebuffer.xor_draw(3, 4, 1));
        assert_eq!(framebuffer.get(3, 4), 0);
    }

    #[test]
    fn coordinates_wrap() {
        let mut framebuffer = Framebuffer::default();
        framebuffer.set(64 + 2, 32 + 1, 1);

        assert_eq!(framebuffer.get(2, 1), 1);
        assert_eq!(lit_pixels(&framebuffer), vec![(2, 1)]);

        framebuffer.set(2, 1, 0);
        assert!(lit_pixels(&framebuffer).is_empty());
    }

    #[test]
    fn unaligned_sprite() {
        let mut framebuffer = Framebuffer::default();

        let collided =
            framebuffer.draw_sprite(5, 2, &[0b1000_0001], PartialOffscreenDrawing::ClipXY);

        assert!(!collided);
        assert_eq!(lit_pixels(&framebuffer), vec![(5, 2), (12, 2)]);
    }

    #[test]
    fn start_corner_is_taken_modulo_screen_size() {
        let mut framebuffer = Framebuffer::default();

        framebuffer.draw_sprite(64 + 8, 32 + 3, &[0b1100_0000], PartialOffscreenDrawing::ClipXY);

        assert_eq!(lit_pixels(&framebuffer), vec![(8, 3), (9, 3)]);
    }

    #[test]
    fn clip_at_right_and_bottom_edge() {
        let mut framebuffer = Framebuffer::default();

        framebuffer.draw_sprite(62, 31, &[0xFF, 0xFF], PartialOffscreenDrawing::ClipXY);

        assert_eq!(lit_pixels(&framebuffer), vec![(62, 31), (63, 31)]);
    }

    #[test]
    fn wrap_at_right_and_bottom_edge() {
        let mut framebuffer = Framebuffer::default();

        framebuffer.draw_sprite(62, 31, &[0b1110_0000, 0b1000_0000], PartialOffscreenDrawing::WrapXY);

        assert_eq!(
            lit_pixels(&framebuffer),
            vec![(62, 0), (0, 31), (62, 31), (63, 31)]
        );
    }

    #[test]
    fn redraw_erases_and_collides() {
        let mut framebuffer = Framebuffer::default();
        let sprite = [0xF0, 0x90, 0x90, 0x90, 0xF0];

        assert!(!framebuffer.draw_sprite(10, 10, &sprite, PartialOffscreenDrawing::ClipXY));
        assert!(framebuffer.draw_sprite(10, 10, &sprite, PartialOffscreenDrawing::ClipXY));
        assert_eq!(framebuffer, Framebuffer::default());
    }

    #[test]
    fn alternate_debug_renders_rows() {
        let mut framebuffer = Framebuffer::default();
        framebuffer.set(0, 0, 1);

        let rendered = format!("{:#?}", framebuffer);
        let mut lines = rendered.lines();

        assert_eq!(lines.next(), Some("Framebuffer("));
        assert_eq!(lines.next().map(|row| &row[..3]), Some("#__"));
        assert_eq!(rendered.lines().count(), Framebuffer::HEIGHT as usize + 2);
    }
}
