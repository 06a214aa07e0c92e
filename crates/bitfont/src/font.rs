//! A loaded font: atlas, glyph commands and line cache.

use std::sync::Arc;

use glam::Vec2;
use tracing::trace;

use crate::atlas::{AtlasTexture, GlyphAtlasSpec};
use crate::backend::TextBackend;
use crate::command::{CommandId, DrawCommand, GlyphCommandBuilder, GlyphMode, GlyphTable};
use crate::layout::{self, DrawOptions, HorizontalAlign, VerticalAlign, VerticalAnchor};
use crate::logging::targets;
use crate::markup;
use crate::options::FontOptions;
use crate::string_cache::{StringCache, StringCacheStats};
use crate::types::{Color, Rect};

/// Vertical extent of a piece of text, normalized to the pixel height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    /// Highest glyph top on the first line, above its baseline.
    pub height: f32,
    /// Lowest glyph bottom on the last line, relative to its baseline (zero
    /// or negative).
    pub descender: f32,
    /// Number of lines, at least one.
    pub lines: usize,
}

/// Registry state a draw depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEnv {
    /// Current registry time, stamped on cache entries.
    pub now: f64,
    pub cache_enabled: bool,
    pub floor_positions: bool,
}

impl Default for DrawEnv {
    fn default() -> Self {
        Self {
            now: 0.0,
            cache_enabled: true,
            floor_positions: true,
        }
    }
}

/// One loaded font.
///
/// The atlas spec, texture and glyph table are fixed once built; only the
/// line cache changes while drawing.
#[derive(Debug)]
pub struct FontInstance {
    name: String,
    base_name: String,
    options: FontOptions,
    pixel_size: u32,
    outline_width: f32,
    outline_weight: f32,
    spec: Arc<GlyphAtlasSpec>,
    texture: Arc<AtlasTexture>,
    glyphs: GlyphTable,
    cache: StringCache,
}

impl FontInstance {
    /// Build a font from a parsed spec and its atlas.
    ///
    /// `name` is the registry key and `base_name` the asset name it was
    /// loaded from. Glyph commands for all 256 codes are built here.
    pub fn new(
        name: impl Into<String>,
        base_name: impl Into<String>,
        options: FontOptions,
        spec: Arc<GlyphAtlasSpec>,
        texture: Arc<AtlasTexture>,
        mode: GlyphMode,
    ) -> Self {
        let glyphs = GlyphCommandBuilder::new(&spec, mode).build_table(&spec);
        Self {
            pixel_size: spec.pixel_height().round() as u32,
            name: name.into(),
            base_name: base_name.into(),
            options,
            outline_width: 0.0,
            outline_weight: 0.0,
            spec,
            texture,
            glyphs,
            cache: StringCache::new(),
        }
    }

    /// Set the outline parameters used for sizing.
    #[must_use]
    pub fn with_outline(mut self, width: f32, weight: f32) -> Self {
        self.outline_width = width;
        self.outline_weight = weight;
        self
    }

    /// Record the pixel height the font was requested at.
    #[must_use]
    pub fn with_pixel_size(mut self, size: u32) -> Self {
        self.pixel_size = size;
        self
    }

    /// Registry key, option prefix and overrides included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asset name, without option prefix or overrides.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn options(&self) -> FontOptions {
        self.options
    }

    /// Pixel height the font was requested at.
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn outline_width(&self) -> f32 {
        self.outline_width
    }

    pub fn outline_weight(&self) -> f32 {
        self.outline_weight
    }

    pub fn spec(&self) -> &Arc<GlyphAtlasSpec> {
        &self.spec
    }

    pub fn texture(&self) -> &Arc<AtlasTexture> {
        &self.texture
    }

    pub fn glyphs(&self) -> &GlyphTable {
        &self.glyphs
    }

    pub fn is_outline(&self) -> bool {
        self.glyphs.mode().is_outline()
    }

    pub fn cache(&self) -> &StringCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> StringCacheStats {
        self.cache.stats()
    }

    /// Swap in a freshly loaded atlas. The glyph table is rebuilt before
    /// anything is replaced; the line cache is emptied. Returns the ids of
    /// the old glyph commands and of the dropped lines.
    pub fn replace_atlas(
        &mut self,
        spec: Arc<GlyphAtlasSpec>,
        texture: Arc<AtlasTexture>,
    ) -> Vec<CommandId> {
        let glyphs = GlyphCommandBuilder::new(&spec, self.glyphs.mode()).build_table(&spec);
        let old = std::mem::replace(&mut self.glyphs, glyphs);
        self.spec = spec;
        self.texture = texture;

        let mut released = old.command_ids();
        released.extend(self.cache.clear());
        released
    }

    /// Ids of every command this font owns, glyphs and cached lines, for a
    /// font about to be dropped. The line cache is emptied.
    pub fn release_commands(&mut self) -> Vec<CommandId> {
        let mut released = self.glyphs.command_ids();
        released.extend(self.cache.clear());
        released
    }

    /// Remove lines not drawn within `max_age` of `now`.
    pub fn sweep_cache(&mut self, now: f64, max_age: f64) -> Vec<CommandId> {
        self.cache.sweep(now, max_age)
    }

    /// Drop every cached line.
    pub fn clear_cache(&mut self) -> Vec<CommandId> {
        self.cache.clear()
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    /// Sum of advances of one line, ignoring markup.
    fn raw_width(&self, line: &[u8]) -> f32 {
        markup::strip_colors(line)
            .iter()
            .map(|&code| self.spec.glyph(code).adv)
            .sum()
    }

    /// Width of the widest line, normalized.
    ///
    /// Lines that are cached report their recorded width. Codes without a
    /// glyph measure as a space.
    pub fn text_width(&self, text: &[u8]) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        markup::lines(text)
            .into_iter()
            .map(|line| self.cache.width(line).unwrap_or_else(|| self.raw_width(line)))
            .fold(0.0, f32::max)
    }

    /// Vertical glyph extent of the text.
    pub fn text_extent(&self, text: &[u8]) -> TextExtent {
        let lines = markup::lines(text);
        let height = self.spec.pixel_height();
        let first = lines.first().map(|l| markup::strip_colors(l)).unwrap_or_default();
        let last = lines.last().map(|l| markup::strip_colors(l)).unwrap_or_default();
        let top = first
            .iter()
            .map(|&c| self.spec.glyph(c).ymax)
            .fold(0.0, f32::max);
        let bottom = last
            .iter()
            .map(|&c| self.spec.glyph(c).ymin)
            .fold(0.0, f32::min);

        TextExtent {
            height: top / height,
            descender: bottom / height,
            lines: lines.len(),
        }
    }

    /// Height of the glyph box of the whole text, normalized.
    pub fn text_height(&self, text: &[u8]) -> f32 {
        let extent = self.text_extent(text);
        extent.height - extent.descender + (extent.lines - 1) as f32 * self.line_height()
    }

    /// Distance between baselines, normalized.
    pub fn line_height(&self) -> f32 {
        self.spec.line_height()
    }

    pub fn ascender(&self) -> f32 {
        self.spec.ascender()
    }

    pub fn descender(&self) -> f32 {
        self.spec.descender()
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// The command for one line, from the cache when enabled.
    fn line_command(&mut self, line: &[u8], env: DrawEnv) -> Arc<DrawCommand> {
        if !env.cache_enabled {
            return Arc::new(self.glyphs.compose(line));
        }
        let glyphs = &self.glyphs;
        let spec = &self.spec;
        self.cache.fetch(line, env.now, || {
            let width = markup::strip_colors(line)
                .iter()
                .map(|&code| spec.glyph(code).adv)
                .sum();
            (glyphs.compose(line), width)
        })
    }

    /// Baseline of the first line for an anchor at `y`.
    fn first_baseline(&self, text: &[u8], y: f32, anchor: VerticalAnchor, size: f32) -> f32 {
        let extent = self.text_extent(text);
        let step = self.line_height() * size;
        let below = (extent.lines - 1) as f32 * step;
        let h = extent.height * size;
        let d = extent.descender * size;
        match anchor {
            VerticalAnchor::Baseline => y,
            VerticalAnchor::Top => y + h,
            VerticalAnchor::Center => y + (h + d - below) / 2.0,
            VerticalAnchor::Bottom => y + d - below,
            VerticalAnchor::Ascender => y + self.ascender() * size,
            VerticalAnchor::Descender => y + self.descender() * size - below,
        }
    }

    /// Draw text with its anchor at `(x, y)`.
    ///
    /// `y` grows downward. Each line is drawn from its own (cached) command;
    /// markup colors carry over from one line to the next.
    ///
    /// Returns the ids of line commands built for this call only, which is
    /// every line while caching is disabled. They are dead once the call
    /// returns.
    pub fn draw(
        &mut self,
        backend: &mut dyn TextBackend,
        text: &[u8],
        x: f32,
        y: f32,
        options: &DrawOptions,
        env: DrawEnv,
    ) -> Vec<CommandId> {
        let size = options.size;
        let step = self.line_height() * size;
        let unit = self.glyphs.mode().unit_scale(&self.spec) * size;
        let baseline = self.first_baseline(text, y, options.anchor, size);
        let texture = Arc::clone(&self.texture);

        let mut one_off = Vec::new();
        let mut carried: Option<[u8; 3]> = None;
        for (i, line) in markup::lines(text).into_iter().enumerate() {
            let line_color = carried;
            if let Some(rgb) = markup::last_color(line) {
                carried = Some(rgb);
            }
            if line.is_empty() {
                continue;
            }

            let width = self.text_width(line) * size;
            let mut pos = Vec2::new(
                match options.align {
                    HorizontalAlign::Left => x,
                    HorizontalAlign::Center => x - width / 2.0,
                    HorizontalAlign::Right => x - width,
                },
                baseline + i as f32 * step,
            );
            if env.floor_positions {
                pos = pos.floor();
            }

            let command = self.line_command(line, env);
            let start_color = line_color.map_or(options.color, |[r, g, b]| Color::from_rgb8(r, g, b));

            backend.push_state();
            backend.bind_texture(&texture);
            backend.push_color(options.color);
            if let Some(shadow) = options.shadow {
                backend.push_state();
                backend.translate(pos.x + shadow.offset, pos.y + shadow.offset);
                backend.push_color(shadow.color);
                backend.lock_color();
                backend.scale(unit, -unit);
                backend.call(&command);
                backend.unlock_color();
                backend.pop_color();
                backend.pop_state();
            }
            backend.set_color(start_color);
            backend.translate(pos.x, pos.y);
            backend.scale(unit, -unit);
            backend.call(&command);
            backend.pop_color();
            backend.pop_state();

            trace!(
                target: targets::CACHE,
                id = command.id().value(),
                cached = env.cache_enabled,
                "drew line"
            );
            if !env.cache_enabled {
                one_off.push(command.id());
            }
        }
        one_off
    }

    /// Draw text aligned inside `rect`. Returns one-off command ids as
    /// [`draw`](Self::draw) does.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_in_box(
        &mut self,
        backend: &mut dyn TextBackend,
        text: &[u8],
        rect: Rect,
        align: HorizontalAlign,
        valign: VerticalAlign,
        options: &DrawOptions,
        env: DrawEnv,
    ) -> Vec<CommandId> {
        let (pos, align, anchor) =
            layout::box_anchor(rect, align, valign, options.size, self.descender());
        let options = options.with_align(align).with_anchor(anchor);
        self.draw(backend, text, pos.x, pos.y, &options, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::TextureFilter;
    use crate::backend::{BackendEvent, RecordingBackend};
    use crate::command::HaloStyle;
    use crate::layout::Shadow;
    use crate::markup::color_marker;
    use image::RgbaImage;

    const SPEC: &str = r#"{
        "srcFile": "T.ttf", "family": "T", "style": "Regular",
        "height": 10, "yStep": 12, "xTexSize": 100, "yTexSize": 100,
        "glyphs": {
            "32":  { "adv": 0.4, "oxn": 0, "oyn": 0, "oxp": 0, "oyp": 0,
                     "txn": 0, "tyn": 0, "txp": 0, "typ": 0, "whitespace": 4 },
            "65":  { "adv": 1.0, "oxn": 0, "oyn": 0, "oxp": 0.8, "oyp": 0.8,
                     "txn": 0, "tyn": 0, "txp": 8, "typ": 8,
                     "xmax": 8, "ymax": 8, "width": 8, "whitespace": 2 },
            "103": { "adv": 0.8, "oxn": 0, "oyn": -0.3, "oxp": 0.6, "oyp": 0.5,
                     "txn": 10, "tyn": 0, "txp": 16, "typ": 8,
                     "ymin": -3, "xmax": 6, "ymax": 5, "width": 6, "whitespace": 2 }
        }
    }"#;

    fn font(mode: GlyphMode) -> FontInstance {
        let spec = Arc::new(GlyphAtlasSpec::from_json_str(SPEC, "t.json").unwrap());
        let texture = Arc::new(AtlasTexture::from_image(
            RgbaImage::new(100, 100),
            TextureFilter::Linear,
        ));
        FontInstance::new("Test", "Test", FontOptions::default(), spec, texture, mode)
    }

    fn first_translate(backend: &RecordingBackend) -> (f32, f32) {
        backend
            .events()
            .iter()
            .find_map(|e| match e {
                BackendEvent::Translate(x, y) => Some((*x, *y)),
                _ => None,
            })
            .unwrap()
    }

    fn quad_colors(backend: &RecordingBackend) -> Vec<Color> {
        backend
            .quads()
            .map(|e| match e {
                BackendEvent::Quad { color, .. } => *color,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn width_sums_advances_and_ignores_markup() {
        let font = font(GlyphMode::Plain);
        assert!((font.text_width(b"A A") - 2.4).abs() < 1e-6);
        // 'Z' has no glyph and measures as a space.
        assert!((font.text_width(b"AZ") - 1.4).abs() < 1e-6);

        let mut marked = color_marker(1, 2, 3).to_vec();
        marked.extend_from_slice(b"A A");
        assert_eq!(font.text_width(&marked), font.text_width(b"A A"));
        assert_eq!(font.text_width(b""), 0.0);
    }

    #[test]
    fn multi_line_width_is_widest_line() {
        let font = font(GlyphMode::Plain);
        assert_eq!(font.text_width(b"A\nAAA\nAA"), 3.0);
    }

    #[test]
    fn extent_uses_first_and_last_lines() {
        let font = font(GlyphMode::Plain);
        let extent = font.text_extent(b"A\ng");
        assert_eq!(extent.lines, 2);
        assert_eq!(extent.height, 0.8);
        assert_eq!(extent.descender, -0.3);

        let empty = font.text_extent(b"");
        assert_eq!((empty.height, empty.descender, empty.lines), (0.0, 0.0, 1));
    }

    #[test]
    fn repeated_draw_reuses_cached_command() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        let options = DrawOptions::new(10.0);

        font.draw(&mut backend, b"AA", 0.0, 0.0, &options, DrawEnv::default());
        let first = backend.calls()[0];
        assert_eq!(font.cache().len(), 1);

        backend.clear();
        let later = DrawEnv {
            now: 2.0,
            ..DrawEnv::default()
        };
        font.draw(&mut backend, b"AA", 50.0, 50.0, &options, later);
        assert_eq!(backend.calls()[0], first);
        assert_eq!(font.cache().len(), 1);
        assert_eq!(font.cache().last_used(b"AA"), Some(2.0));
        assert_eq!(font.cache_stats().hits, 1);
    }

    #[test]
    fn disabled_cache_is_never_populated() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        let env = DrawEnv {
            cache_enabled: false,
            ..DrawEnv::default()
        };
        let first = font.draw(&mut backend, b"AA", 0.0, 0.0, &DrawOptions::new(10.0), env);
        let second = font.draw(&mut backend, b"AA", 0.0, 0.0, &DrawOptions::new(10.0), env);

        assert!(font.cache().is_empty());
        assert_eq!(backend.quads().count(), 4);
        let calls = backend.calls();
        // A fresh line command each time, reported back as one-off.
        assert_ne!(calls[0], calls[3]);
        assert_eq!(first, vec![calls[0]]);
        assert_eq!(second, vec![calls[3]]);
    }

    #[test]
    fn cached_draws_report_no_one_off_commands() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        let options = DrawOptions::new(10.0);
        assert!(font.draw(&mut backend, b"A\nAA", 0.0, 0.0, &options, DrawEnv::default()).is_empty());
        assert!(font.draw(&mut backend, b"A\nAA", 0.0, 0.0, &options, DrawEnv::default()).is_empty());
    }

    #[test]
    fn positions_are_floored_when_enabled() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        font.draw(&mut backend, b"A", 10.7, 5.2, &DrawOptions::new(10.0), DrawEnv::default());
        assert_eq!(first_translate(&backend), (10.0, 5.0));

        let mut backend = RecordingBackend::new();
        let env = DrawEnv {
            floor_positions: false,
            ..DrawEnv::default()
        };
        font.draw(&mut backend, b"A", 10.5, 5.25, &DrawOptions::new(10.0), env);
        assert_eq!(first_translate(&backend), (10.5, 5.25));
    }

    #[test]
    fn alignment_and_anchor_move_the_baseline() {
        let mut font = font(GlyphMode::Plain);
        let draw = |font: &mut FontInstance, options: DrawOptions| {
            let mut backend = RecordingBackend::new();
            font.draw(&mut backend, b"AA", 100.0, 100.0, &options, DrawEnv::default());
            first_translate(&backend)
        };

        let base = DrawOptions::new(10.0);
        assert_eq!(draw(&mut font, base), (100.0, 100.0));
        assert_eq!(draw(&mut font, base.with_align(HorizontalAlign::Center)), (90.0, 100.0));
        assert_eq!(draw(&mut font, base.with_align(HorizontalAlign::Right)), (80.0, 100.0));
        assert_eq!(draw(&mut font, base.with_anchor(VerticalAnchor::Top)), (100.0, 108.0));
        assert_eq!(draw(&mut font, base.with_anchor(VerticalAnchor::Center)), (100.0, 104.0));
    }

    #[test]
    fn second_line_is_one_step_down() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        font.draw(&mut backend, b"A\nA", 0.0, 0.0, &DrawOptions::new(10.0), DrawEnv::default());

        let translates: Vec<(f32, f32)> = backend
            .events()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Translate(x, y) if *x == 0.0 => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(translates, vec![(0.0, 0.0), (0.0, 12.0)]);
        assert_eq!(font.cache().len(), 1);
        assert_eq!(backend.state_depth(), 0);
        assert_eq!(backend.color_depth(), 0);
    }

    #[test]
    fn markup_colors_quads_and_carries_across_lines() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        let red = Color::from_rgb8(255, 0, 0);

        let mut text = b"A".to_vec();
        text.extend_from_slice(&color_marker(255, 0, 0));
        text.extend_from_slice(b"A\nA");
        font.draw(&mut backend, &text, 0.0, 0.0, &DrawOptions::new(10.0), DrawEnv::default());

        assert_eq!(quad_colors(&backend), vec![Color::WHITE, red, red]);
        assert_eq!(backend.current_color(), Color::WHITE);
    }

    #[test]
    fn shadow_pass_ignores_markup() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        let shadow = Shadow::default();
        let red = Color::from_rgb8(255, 0, 0);

        let mut text = color_marker(255, 0, 0).to_vec();
        text.push(b'A');
        let options = DrawOptions::new(10.0).with_shadow(shadow);
        font.draw(&mut backend, &text, 0.0, 0.0, &options, DrawEnv::default());

        assert_eq!(quad_colors(&backend), vec![shadow.color, red]);
        assert_eq!(first_translate(&backend), (1.0, 1.0));
    }

    #[test]
    fn outline_halo_restores_markup_color() {
        let mut font = font(GlyphMode::Outline(HaloStyle::default()));
        let mut backend = RecordingBackend::new();
        let red = Color::from_rgb8(255, 0, 0);

        let mut text = color_marker(255, 0, 0).to_vec();
        text.push(b'A');
        font.draw(&mut backend, &text, 0.0, 0.0, &DrawOptions::new(10.0), DrawEnv::default());

        let colors = quad_colors(&backend);
        assert_eq!(colors.len(), 9);
        assert!(colors[..8].iter().all(|c| *c == HaloStyle::default().color()));
        assert_eq!(colors[8], red);
        assert!(font.is_outline());
    }

    #[test]
    fn replace_atlas_clears_cache() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        font.draw(&mut backend, b"A", 0.0, 0.0, &DrawOptions::new(10.0), DrawEnv::default());

        let line = backend.calls()[0];
        let old_glyph = font.glyphs().get(b'A').id();

        let spec = Arc::clone(font.spec());
        let texture = Arc::new(AtlasTexture::from_image(
            RgbaImage::new(100, 100),
            TextureFilter::Nearest,
        ));
        let released = font.replace_atlas(spec, texture);
        assert!(released.contains(&line));
        assert!(released.contains(&old_glyph));
        assert_ne!(font.glyphs().get(b'A').id(), old_glyph);
        assert!(font.cache().is_empty());
        assert_eq!(font.texture().filter(), TextureFilter::Nearest);
    }

    #[test]
    fn release_commands_lists_glyphs_and_lines() {
        let mut font = font(GlyphMode::Plain);
        let mut backend = RecordingBackend::new();
        font.draw(&mut backend, b"g", 0.0, 0.0, &DrawOptions::new(10.0), DrawEnv::default());
        let line = backend.calls()[0];

        let released = font.release_commands();
        // Space, 'A', 'g', the shared fallback and the cached line.
        assert_eq!(released.len(), 5);
        assert!(released.contains(&line));
        assert!(released.contains(&font.glyphs().get(b'g').id()));
        assert!(font.cache().is_empty());
    }
}
