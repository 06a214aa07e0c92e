//! Inline color markup.
//!
//! Text handled by this crate is a byte string: every byte is a character
//! code in the 0-255 range. A [`COLOR_SENTINEL`] byte followed by exactly
//! three bytes (red, green, blue) switches the draw color for the characters
//! that follow. A sentinel with fewer than three bytes after it is not a
//! marker and is treated as ordinary text.
//!
//! ```
//! use bitfont::markup::{color_marker, strip_colors};
//!
//! let mut text = color_marker(255, 0, 0).to_vec();
//! text.extend_from_slice(b"red");
//! assert_eq!(strip_colors(&text), b"red");
//! ```

/// Byte that introduces an inline color marker.
pub const COLOR_SENTINEL: u8 = 0xFF;

/// Length of a well-formed marker (sentinel + R + G + B).
pub const MARKER_LEN: usize = 4;

/// Build the four-byte marker that switches to the given color.
#[inline]
pub const fn color_marker(r: u8, g: u8, b: u8) -> [u8; MARKER_LEN] {
    [COLOR_SENTINEL, r, g, b]
}

/// A piece of marked-up text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A run of literal character codes.
    Text(&'a [u8]),
    /// A color change, as 8-bit RGB.
    Color([u8; 3]),
}

/// Iterator over the [`Segment`]s of a byte string, left to right.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Segments<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

#[inline]
fn marker_at(bytes: &[u8], i: usize) -> bool {
    bytes[i] == COLOR_SENTINEL && i + MARKER_LEN <= bytes.len()
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.bytes;
        let start = self.pos;
        if start >= bytes.len() {
            return None;
        }

        if marker_at(bytes, start) {
            self.pos = start + MARKER_LEN;
            return Some(Segment::Color([
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ]));
        }

        let end = (start + 1..bytes.len())
            .find(|&i| marker_at(bytes, i))
            .unwrap_or(bytes.len());
        self.pos = end;
        Some(Segment::Text(&bytes[start..end]))
    }
}

/// Split marked-up text into literal runs and color changes.
pub fn segments(text: &[u8]) -> Segments<'_> {
    Segments::new(text)
}

/// Remove every well-formed color marker, keeping the literal text.
///
/// Malformed markers (a trailing sentinel with fewer than three following
/// bytes) are left in place.
pub fn strip_colors(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for segment in segments(text) {
        if let Segment::Text(run) = segment {
            out.extend_from_slice(run);
        }
    }
    out
}

/// The color in effect after the whole text has been drawn, if any marker
/// was present.
pub fn last_color(text: &[u8]) -> Option<[u8; 3]> {
    segments(text).fold(None, |acc, s| match s {
        Segment::Color(rgb) => Some(rgb),
        Segment::Text(_) => acc,
    })
}

/// Split text into lines at `'\n'` bytes.
///
/// Bytes inside a color marker are never line breaks, so a marker whose
/// channel happens to be 10 stays intact. The returned slices exclude the
/// newline itself; text ending in `'\n'` yields a trailing empty line.
pub fn lines(text: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < text.len() {
        if marker_at(text, i) {
            i += MARKER_LEN;
        } else if text[i] == b'\n' {
            out.push(&text[start..i]);
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    out.push(&text[start..]);
    out
}

/// Drop trailing spaces, looking through color markers that sit among them.
/// Markers are kept so the color state after the text is unchanged.
pub(crate) fn trim_trailing_spaces(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    // Spaces and markers seen since the last visible byte.
    let mut pending = Vec::new();
    for segment in segments(text) {
        match segment {
            Segment::Text(run) => {
                for &b in run {
                    pending.push(b);
                    if b != b' ' {
                        out.append(&mut pending);
                    }
                }
            }
            Segment::Color([r, g, b]) => pending.extend_from_slice(&color_marker(r, g, b)),
        }
    }
    for segment in segments(&pending) {
        if let Segment::Color([r, g, b]) = segment {
            out.extend_from_slice(&color_marker(r, g, b));
        }
    }
    out
}
