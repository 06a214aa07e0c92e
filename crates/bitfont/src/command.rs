//! Prebuilt, replayable draw commands.
//!
//! Every glyph of a font is compiled once, at load time, into a
//! [`DrawCommand`]: a short list of [`RenderOp`]s a [`TextBackend`] can
//! interpret. Whole lines of text are composed from those glyph commands by
//! reference, so a cached line replays without touching the atlas spec.
//!
//! Two glyph modes exist and one is chosen for the whole font:
//!
//! - **Plain**: one textured quad at the glyph's normalized bounding box,
//!   then an advance of `adv`. Command units are normalized (1.0 = the
//!   font's pixel height).
//! - **Outline**: a halo of eight offset copies of the glyph in a dark
//!   translucent color, the glyph itself on top, then an advance of
//!   `width + whitespace`. Command units are atlas pixels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::atlas::{CODE_COUNT, GlyphAtlasSpec, GlyphMetrics};
use crate::backend::TextBackend;
use crate::markup::{self, Segment};
use crate::types::{Color, GlyphQuad};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a built [`DrawCommand`].
///
/// Backends that compile commands into GPU buffers key them by this id and
/// free them when the registry reports the id as released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// One step of a draw command.
#[derive(Debug, Clone)]
pub enum RenderOp {
    /// Draw a textured quad from the currently bound atlas.
    Quad(GlyphQuad),
    /// Move the pen.
    Translate(f32, f32),
    /// Replace the current color.
    SetColor(Color),
    /// Save the current color and switch to another.
    PushColor(Color),
    /// Restore the color saved by the matching `PushColor`.
    PopColor,
    /// Replay another command in place.
    Call(Arc<DrawCommand>),
}

/// An immutable sequence of render ops with a known pen advance.
#[derive(Debug)]
pub struct DrawCommand {
    id: CommandId,
    ops: Vec<RenderOp>,
    advance: f32,
}

impl DrawCommand {
    pub fn new(ops: Vec<RenderOp>, advance: f32) -> Self {
        Self {
            id: CommandId::next(),
            ops,
            advance,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Horizontal pen movement after replaying, in command units.
    pub fn advance(&self) -> f32 {
        self.advance
    }

    /// Number of quads drawn by a full replay, nested calls included.
    pub fn quad_count(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                RenderOp::Quad(_) => 1,
                RenderOp::Call(inner) => inner.quad_count(),
                _ => 0,
            })
            .sum()
    }

    /// Interpret every op against a backend.
    pub fn replay<B: TextBackend + ?Sized>(&self, backend: &mut B) {
        for op in &self.ops {
            match op {
                RenderOp::Quad(quad) => backend.draw_quad(quad),
                RenderOp::Translate(dx, dy) => backend.translate(*dx, *dy),
                RenderOp::SetColor(color) => backend.set_color(*color),
                RenderOp::PushColor(color) => backend.push_color(*color),
                RenderOp::PopColor => backend.pop_color(),
                RenderOp::Call(inner) => backend.call(inner),
            }
        }
    }
}

/// Appearance of the outline-mode halo.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HaloStyle {
    /// Distance of each halo copy from the glyph, in atlas pixels.
    pub offset: f32,
    /// Halo opacity.
    pub alpha: f32,
    /// Halo color as 8-bit RGB.
    pub rgb: [u8; 3],
}

impl HaloStyle {
    /// The eight copy directions: left, right, down, up, then the diagonals.
    const DIRECTIONS: [(f32, f32); 8] = [
        (-1.0, 0.0),
        (1.0, 0.0),
        (0.0, -1.0),
        (0.0, 1.0),
        (-1.0, -1.0),
        (1.0, -1.0),
        (-1.0, 1.0),
        (1.0, 1.0),
    ];

    pub fn color(&self) -> Color {
        let [r, g, b] = self.rgb;
        Color::from_rgb8(r, g, b).with_alpha(self.alpha)
    }

    /// Offsets of the eight halo copies.
    pub fn offsets(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        Self::DIRECTIONS
            .iter()
            .map(|&(dx, dy)| (dx * self.offset, dy * self.offset))
    }
}

impl Default for HaloStyle {
    fn default() -> Self {
        Self {
            offset: 2.0,
            alpha: 0.75,
            rgb: [0, 0, 0],
        }
    }
}

/// How glyphs of one font are rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlyphMode {
    Plain,
    /// Halo behind each glyph.
    ///
    /// After the halo the glyph is drawn in the color that was current
    /// before it (`PopColor`), not forced to opaque white, so inline markup
    /// and the caller's color apply to outlined text too.
    Outline(HaloStyle),
}

impl GlyphMode {
    pub fn is_outline(&self) -> bool {
        matches!(self, GlyphMode::Outline(_))
    }

    /// Factor converting command units to multiples of the draw size.
    ///
    /// Plain commands are already normalized; outline commands are in atlas
    /// pixels.
    pub fn unit_scale(&self, spec: &GlyphAtlasSpec) -> f32 {
        match self {
            GlyphMode::Plain => 1.0,
            GlyphMode::Outline(_) => 1.0 / spec.pixel_height(),
        }
    }
}

/// Compiles glyph metrics into draw commands.
#[derive(Debug, Clone, Copy)]
pub struct GlyphCommandBuilder {
    mode: GlyphMode,
    tex_width: f32,
    tex_height: f32,
}

impl GlyphCommandBuilder {
    pub fn new(spec: &GlyphAtlasSpec, mode: GlyphMode) -> Self {
        let (w, h) = spec.texture_size();
        Self {
            mode,
            tex_width: w as f32,
            tex_height: h as f32,
        }
    }

    pub fn mode(&self) -> GlyphMode {
        self.mode
    }

    /// Texture coordinates of a glyph, flipped so `v` grows upward.
    fn uv(&self, g: &GlyphMetrics) -> (f32, f32, f32, f32) {
        (
            g.txn / self.tex_width,
            1.0 - g.tyn / self.tex_height,
            g.txp / self.tex_width,
            1.0 - g.typ / self.tex_height,
        )
    }

    /// Build the command for one glyph.
    pub fn build_glyph(&self, g: &GlyphMetrics) -> DrawCommand {
        let (u0, v0, u1, v1) = self.uv(g);
        match self.mode {
            GlyphMode::Plain => {
                let quad = GlyphQuad {
                    x0: g.oxn,
                    y0: g.oyn,
                    x1: g.oxp,
                    y1: g.oyp,
                    u0,
                    v0,
                    u1,
                    v1,
                };
                DrawCommand::new(
                    vec![RenderOp::Quad(quad), RenderOp::Translate(g.adv, 0.0)],
                    g.adv,
                )
            }
            GlyphMode::Outline(halo) => {
                let quad = GlyphQuad {
                    x0: 0.0,
                    y0: g.ymin,
                    x1: g.width,
                    y1: g.ymax,
                    u0,
                    v0,
                    u1,
                    v1,
                };
                let step = g.width + g.whitespace;

                let mut ops = Vec::with_capacity(13);
                ops.push(RenderOp::Translate(g.init_dist, 0.0));
                ops.push(RenderOp::PushColor(halo.color()));
                ops.extend(halo.offsets().map(|(dx, dy)| RenderOp::Quad(quad.offset(dx, dy))));
                ops.push(RenderOp::PopColor);
                ops.push(RenderOp::Quad(quad));
                ops.push(RenderOp::Translate(step, 0.0));
                DrawCommand::new(ops, g.init_dist + step)
            }
        }
    }

    /// Build commands for all 256 codes. Codes without an entry share the
    /// space glyph's command.
    pub fn build_table(&self, spec: &GlyphAtlasSpec) -> GlyphTable {
        let fallback = Arc::new(self.build_glyph(spec.fallback()));
        let commands = (0..CODE_COUNT)
            .map(|code| {
                let code = code as u8;
                if spec.has_glyph(code) {
                    Arc::new(self.build_glyph(spec.glyph(code)))
                } else {
                    Arc::clone(&fallback)
                }
            })
            .collect();
        GlyphTable {
            commands,
            mode: self.mode,
        }
    }
}

/// Glyph commands of one font, indexed by character code.
#[derive(Debug)]
pub struct GlyphTable {
    commands: Vec<Arc<DrawCommand>>,
    mode: GlyphMode,
}

impl GlyphTable {
    pub fn mode(&self) -> GlyphMode {
        self.mode
    }

    #[inline]
    pub fn get(&self, code: u8) -> &Arc<DrawCommand> {
        &self.commands[code as usize]
    }

    /// Ids of the distinct glyph commands. Codes sharing the fallback
    /// command contribute one id.
    pub fn command_ids(&self) -> Vec<CommandId> {
        let mut ids: Vec<CommandId> = self.commands.iter().map(|c| c.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Compose one line of marked-up text into a single command.
    ///
    /// Literal runs become calls to the glyph commands and color markers
    /// become `SetColor` ops, in text order.
    pub fn compose(&self, line: &[u8]) -> DrawCommand {
        let mut ops = Vec::with_capacity(line.len());
        let mut advance = 0.0;
        for segment in markup::segments(line) {
            match segment {
                Segment::Text(run) => {
                    for &code in run {
                        let glyph = self.get(code);
                        advance += glyph.advance();
                        ops.push(RenderOp::Call(Arc::clone(glyph)));
                    }
                }
                Segment::Color([r, g, b]) => ops.push(RenderOp::SetColor(Color::from_rgb8(r, g, b))),
            }
        }
        DrawCommand::new(ops, advance)
    }
}
