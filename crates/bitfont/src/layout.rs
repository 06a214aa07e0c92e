//! Placement, sizing and wrapping of text.
//!
//! All measurements coming out of a [`FontInstance`] are normalized to the
//! font's pixel height; the helpers here multiply them by the draw size so
//! that box placement, auto-sizing and wrapping agree with what the draw
//! path renders.

use glam::Vec2;
use tracing::trace;

use crate::font::FontInstance;
use crate::logging::targets;
use crate::markup::{self, Segment};
use crate::types::{Color, Rect, Size};

/// Horizontal anchoring of a line relative to the draw position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlign {
    /// The position is the left edge.
    #[default]
    Left,
    /// The position is the horizontal center.
    Center,
    /// The position is the right edge.
    Right,
}

/// Which vertical feature of the text sits at the draw position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAnchor {
    /// Baseline of the first line.
    #[default]
    Baseline,
    /// Top of the tallest glyph on the first line.
    Top,
    /// Middle of the glyph bounding box of the whole text.
    Center,
    /// Bottom of the lowest glyph on the last line.
    Bottom,
    /// The font's ascender line.
    Ascender,
    /// The font's descender line, below the last baseline.
    Descender,
}

/// Vertical placement of text inside a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
    /// Centered on the line box rather than the glyph box, so strings with
    /// and without descenders sit at the same height.
    LineCenter,
    /// The font's ascender at the top of the box.
    Ascender,
}

/// A drop shadow drawn under the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    /// Offset in pixels, applied right and down.
    pub offset: f32,
    pub color: Color,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            offset: 1.0,
            color: Color::BLACK.with_alpha(0.5),
        }
    }
}

/// How one string is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOptions {
    /// Draw size in pixels; 1.0 normalized unit becomes `size` pixels.
    pub size: f32,
    /// Color in effect before any markup.
    pub color: Color,
    pub align: HorizontalAlign,
    pub anchor: VerticalAnchor,
    pub shadow: Option<Shadow>,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            color: Color::WHITE,
            align: HorizontalAlign::Left,
            anchor: VerticalAnchor::Baseline,
            shadow: None,
        }
    }
}

impl DrawOptions {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_align(mut self, align: HorizontalAlign) -> Self {
        self.align = align;
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: VerticalAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: Shadow) -> Self {
        self.shadow = Some(shadow);
        self
    }
}

/// Where to draw text so it sits in `rect` with the given alignment.
///
/// Returns the draw position together with the anchors to draw it with.
pub fn box_anchor(
    rect: Rect,
    align: HorizontalAlign,
    valign: VerticalAlign,
    size: f32,
    descender: f32,
) -> (Vec2, HorizontalAlign, VerticalAnchor) {
    let x = match align {
        HorizontalAlign::Left => rect.x,
        HorizontalAlign::Center => rect.x + rect.width / 2.0,
        HorizontalAlign::Right => rect.x + rect.width,
    };
    let (y, anchor) = match valign {
        VerticalAlign::Top => (rect.y, VerticalAnchor::Top),
        VerticalAlign::Center => (rect.y + rect.height / 2.0, VerticalAnchor::Center),
        VerticalAlign::Bottom => (rect.y + rect.height, VerticalAnchor::Bottom),
        VerticalAlign::LineCenter => (
            rect.y + rect.height / 2.0 + (1.0 + descender) * size / 2.0,
            VerticalAnchor::Baseline,
        ),
        VerticalAlign::Ascender => (rect.y, VerticalAnchor::Ascender),
    };
    (Vec2::new(x, y), align, anchor)
}

/// Box size needed to show `text` without clipping.
///
/// Width is the widest line, rounded up. Height follows either the glyph
/// bounding box (rounded) or, with `obey_line_height`, the font's line
/// height times the line count. Outline and shadow rendering add to both.
pub fn auto_size(
    font: &FontInstance,
    text: &[u8],
    options: &DrawOptions,
    obey_line_height: bool,
) -> Size {
    let size = options.size;
    let extent = font.text_extent(text);
    let step = font.line_height() * size;

    let mut extra = 0.0;
    if font.is_outline() {
        extra += 2.0 * font.outline_width() * size / font.spec().pixel_height();
    }
    if let Some(shadow) = options.shadow {
        extra += shadow.offset;
    }

    let width = (font.text_width(text) * size).ceil();
    let height = if obey_line_height {
        step * extent.lines as f32
    } else {
        ((extent.height - extent.descender) * size + (extent.lines - 1) as f32 * step).round()
    };
    Size::new(width + extra, height + extra)
}

/// Break `text` into lines no wider than `max_width` pixels at `size`.
///
/// Breaks go after the last space that fits; a word wider than the box is
/// split between characters. Each continuation line starts with the color
/// marker active at the break, trailing spaces are dropped, and lines that
/// would not fit in `max_height` are discarded.
///
/// A box shorter than one and a half lines or narrower than `size` returns
/// the text unchanged.
pub fn wrap_text(
    font: &FontInstance,
    text: &[u8],
    max_width: f32,
    max_height: f32,
    size: f32,
) -> Vec<u8> {
    let line_px = font.line_height() * size;
    if max_height < 1.5 * line_px || max_width < size {
        return text.to_vec();
    }
    let max_lines = (max_height / line_px).floor() as usize;
    let limit = max_width / size;

    let mut wrapper = Wrapper::new(font, limit, max_lines);
    for paragraph in markup::lines(text) {
        if wrapper.full() {
            break;
        }
        wrapper.paragraph(paragraph);
    }

    trace!(
        target: targets::LAYOUT,
        lines = wrapper.lines.len(),
        max_lines,
        "wrapped text"
    );
    wrapper.lines.join(&b'\n')
}

/// Greedy line breaker state.
struct Wrapper<'a> {
    font: &'a FontInstance,
    limit: f32,
    max_lines: usize,
    lines: Vec<Vec<u8>>,
    color: Option<[u8; 3]>,
    line: Vec<u8>,
    width: f32,
    visible: usize,
    /// Whether `line` holds anything besides spaces.
    words: bool,
    /// Byte index just past the last space in `line`, the line width at that
    /// point and the color active there.
    last_space: Option<(usize, f32, Option<[u8; 3]>)>,
}

impl<'a> Wrapper<'a> {
    fn new(font: &'a FontInstance, limit: f32, max_lines: usize) -> Self {
        Self {
            font,
            limit,
            max_lines,
            lines: Vec::new(),
            color: None,
            line: Vec::new(),
            width: 0.0,
            visible: 0,
            words: false,
            last_space: None,
        }
    }

    fn full(&self) -> bool {
        self.lines.len() >= self.max_lines
    }

    fn paragraph(&mut self, text: &[u8]) {
        self.line.clear();
        self.width = 0.0;
        self.visible = 0;
        self.words = false;
        self.last_space = None;

        for segment in markup::segments(text) {
            match segment {
                Segment::Color(rgb) => {
                    let [r, g, b] = rgb;
                    self.line.extend_from_slice(&markup::color_marker(r, g, b));
                    self.color = Some(rgb);
                }
                Segment::Text(run) => {
                    for &code in run {
                        self.push(code);
                        if self.full() {
                            return;
                        }
                    }
                }
            }
        }
        self.emit(Vec::new());
    }

    fn push(&mut self, code: u8) {
        let adv = self.font.spec().glyph(code).adv;

        while self.visible > 0 && self.width + adv > self.limit && !self.full() {
            if code == b' ' {
                if !self.words {
                    // Leading spaces wider than the box.
                    return;
                }
                // The space itself becomes the break.
                let next = self.continuation(self.color);
                self.emit(next);
                return;
            }
            match self.last_space.take() {
                Some((at, width_at, color_at)) => {
                    let tail = self.line.split_off(at);
                    let carried = self.width - width_at;
                    let mut next = self.continuation(color_at);
                    next.extend_from_slice(&tail);
                    self.emit(next);
                    let visible = markup::strip_colors(&tail);
                    self.width = carried;
                    self.visible = visible.len();
                    self.words = visible.iter().any(|&c| c != b' ');
                }
                None if !self.words => {
                    // Only spaces so far; drop them rather than emit a
                    // blank line.
                    self.line = self.continuation(self.color);
                    self.width = 0.0;
                    self.visible = 0;
                }
                None => {
                    let next = self.continuation(self.color);
                    self.emit(next);
                }
            }
        }
        if self.full() {
            return;
        }

        self.line.push(code);
        self.width += adv;
        self.visible += 1;
        if code != b' ' {
            self.words = true;
        } else if self.words {
            // A break before the first word would leave an empty line.
            self.last_space = Some((self.line.len(), self.width, self.color));
        }
    }

    /// Start of a wrapped line that continues in `color`.
    fn continuation(&self, color: Option<[u8; 3]>) -> Vec<u8> {
        match color {
            Some([r, g, b]) => markup::color_marker(r, g, b).to_vec(),
            None => Vec::new(),
        }
    }

    /// Finish the current line and start `next`. Width bookkeeping for
    /// `next` is reset; callers adjust it when they carry text over.
    fn emit(&mut self, next: Vec<u8>) {
        let done = std::mem::replace(&mut self.line, next);
        if !self.full() {
            self.lines.push(markup::trim_trailing_spaces(&done));
        }
        self.width = 0.0;
        self.visible = 0;
        self.words = false;
        self.last_space = None;
    }
}
