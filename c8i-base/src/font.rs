use static_assertions::const_assert_eq;

macro_rules! pixel_to_bit {
    (#) => {
        1
    };
    (,) => {
        0
    };
}

/// Builds the glyph bytes from rows of four pixels each.
/// The pixels land in the high nibble, the low nibble stays clear.
macro_rules! glyphs_4x5 {
    (
        $(
            $(
                ($pixel0:tt $pixel1:tt $pixel2:tt $pixel3:tt)
            )*
            ------
        )*
    ) => {
        [
            $(
                $(
                    (pixel_to_bit!($pixel0) << 7
                        | pixel_to_bit!($pixel1) << 6
                        | pixel_to_bit!($pixel2) << 5
                        | pixel_to_bit!($pixel3) << 4),
                )*
            )*
        ]
    };
}

/// Height of one glyph in rows (= bytes).
pub const GLYPH_HEIGHT: usize = 5;

/// Length of the font data in bytes.
pub const FONT_LEN: usize = GLYPH_HEIGHT * (0xF + 1);

/// The built-in font of the hexadecimal digits, one 4x5 glyph per digit.
///
/// It lives at address `0x000` of memory, so the glyph of digit `d`
/// starts at `d * GLYPH_HEIGHT`.
pub const FONT: [u8; FONT_LEN] = glyphs_4x5![
    (####)
    (#,,#)
    (#,,#)
    (#,,#)
    (####)
    ------
    (,,#,)
    (,##,)
    (,,#,)
    (,,#,)
    (,###)
    ------
    (####)
    (,,,#)
    (####)
    (#,,,)
    (####)
    ------
    (####)
    (,,,#)
    (####)
    (,,,#)
    (####)
    ------
    (#,,#)
    (#,,#)
    (####)
    (,,,#)
    (,,,#)
    ------
    (####)
    (#,,,)
    (####)
    (,,,#)
    (####)
    ------
    (####)
    (#,,,)
    (####)
    (#,,#)
    (####)
    ------
    (####)
    (,,,#)
    (,,#,)
    (,#,,)
    (,#,,)
    ------
    (####)
    (#,,#)
    (####)
    (#,,#)
    (####)
    ------
    (####)
    (#,,#)
    (####)
    (,,,#)
    (####)
    ------
    (####)
    (#,,#)
    (####)
    (#,,#)
    (#,,#)
    ------
    (###,)
    (#,,#)
    (###,)
    (#,,#)
    (###,)
    ------
    (####)
    (#,,,)
    (#,,,)
    (#,,,)
    (####)
    ------
    (###,)
    (#,,#)
    (#,,#)
    (#,,#)
    (###,)
    ------
    (####)
    (#,,,)
    (####)
    (#,,,)
    (####)
    ------
    (####)
    (#,,,)
    (####)
    (#,,,)
    (#,,,)
    ------
];

const_assert_eq!(FONT.len(), 80);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn glyph_bytes() {
        assert_eq!(&FONT[0..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(&FONT[5..10], &[0x20, 0x60, 0x20, 0x20, 0x70]);
        assert_eq!(&FONT[35..40], &[0xF0, 0x10, 0x20, 0x40, 0x40]);
        assert_eq!(&FONT[55..60], &[0xE0, 0x90, 0xE0, 0x90, 0xE0]);
        assert_eq!(&FONT[75..80], &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
    }
}
