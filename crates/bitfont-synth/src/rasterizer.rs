//! Vector font rasterization with cosmic-text's swash cache.

use std::collections::BTreeMap;
use std::path::Path;

use bitfont::{AtlasSynthesizer, FontResult, GlyphMetrics, MetricsDescription, SynthesisRequest};
use cosmic_text::{CacheKey, CacheKeyFlags, FontSystem, SwashCache, SwashContent};
use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::error::{SynthError, SynthResult};
use crate::pack::{AtlasLayout, pack};

const TARGET: &str = "bitfont_synth";

/// Space advance used when the face has no space glyph, relative to the
/// pixel height.
const BLANK_SPACE_ADVANCE: f32 = 0.25;

/// Vertical metrics and naming of a face, in font units.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMetrics {
    pub family: String,
    pub style: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

/// One rasterized glyph, RGBA with the coverage in alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub code: u8,
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the left edge of the bitmap.
    pub left: i32,
    /// Offset from the baseline up to the top edge of the bitmap.
    pub top: i32,
    /// Advance in pixels.
    pub advance: f32,
    pub rgba: Vec<u8>,
}

impl RasterGlyph {
    /// A glyph with no bitmap, only an advance.
    pub fn blank(code: u8, advance: f32) -> Self {
        Self {
            code,
            width: 0,
            height: 0,
            left: 0,
            top: 0,
            advance,
            rgba: Vec::new(),
        }
    }

    /// Metrics for this glyph placed at `(x, y)` in the atlas.
    ///
    /// `tyn` is the bitmap's bottom row and `typ` its top row, so the
    /// flipped texture coordinates line up with the y-up quad.
    pub fn metrics(&self, x: u32, y: u32, pixel_height: f32) -> GlyphMetrics {
        let (w, h) = (self.width as f32, self.height as f32);
        let (left, top) = (self.left as f32, self.top as f32);
        let (x, y) = (x as f32, y as f32);

        GlyphMetrics {
            code: self.code,
            adv: self.advance / pixel_height,
            oxn: left / pixel_height,
            oyn: (top - h) / pixel_height,
            oxp: (left + w) / pixel_height,
            oyp: top / pixel_height,
            txn: x,
            tyn: y + h,
            txp: x + w,
            typ: y,
            xmin: left,
            ymin: top - h,
            xmax: left + w,
            ymax: top,
            init_dist: left,
            width: w,
            whitespace: self.advance - left - w,
        }
    }

    fn blit(&self, atlas: &mut RgbaImage, x: u32, y: u32) {
        for row in 0..self.height {
            for col in 0..self.width {
                let i = ((row * self.width + col) * 4) as usize;
                let Some(&[r, g, b, a]) = self.rgba.get(i..i + 4) else {
                    return;
                };
                atlas.put_pixel(x + col, y + row, Rgba([r, g, b, a]));
            }
        }
    }
}

/// Build the metrics description for glyphs packed with `layout`.
pub fn describe(
    src_file: &str,
    face: &FaceMetrics,
    pixel_height: u32,
    glyphs: &[RasterGlyph],
    layout: &AtlasLayout,
) -> MetricsDescription {
    let height = pixel_height as f32;
    let em = f32::from(face.units_per_em.max(1));
    let ascender = f32::from(face.ascender) / em;
    let descender = f32::from(face.descender) / em;
    let line_gap = f32::from(face.line_gap) / em;

    let glyphs: BTreeMap<u32, GlyphMetrics> = glyphs
        .iter()
        .zip(&layout.positions)
        .map(|(g, &(x, y))| (u32::from(g.code), g.metrics(x, y, height)))
        .collect();

    MetricsDescription {
        src_file: src_file.to_owned(),
        family: face.family.clone(),
        style: face.style.clone(),
        height,
        y_step: ((ascender - descender + line_gap) * height).ceil(),
        x_tex_size: layout.width,
        y_tex_size: layout.height,
        ascender: Some(ascender),
        descender: Some(descender),
        glyphs,
    }
}

/// Rasterizes TrueType and OpenType fonts into atlases.
#[derive(Debug, Clone)]
pub struct CosmicSynthesizer {
    locale: String,
}

impl CosmicSynthesizer {
    pub fn new() -> Self {
        Self::with_locale("en-US")
    }

    /// Use `locale` for the font system's fallback selection.
    pub fn with_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// Rasterize the request's source and write both output files.
    pub fn render(&self, request: &SynthesisRequest) -> SynthResult<()> {
        let source = &request.source;
        if !source.is_file() {
            return Err(SynthError::NoVectorSource(source.clone()));
        }

        let mut db = fontdb::Database::new();
        db.load_font_file(source).map_err(|e| SynthError::Io {
            path: source.clone(),
            source: e,
        })?;
        let face_id = db
            .faces()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SynthError::FaceParse(source.clone()))?;
        let (family, style) = db
            .face(face_id)
            .map(|info| (family_name(info), style_name(info)))
            .ok_or_else(|| SynthError::FaceParse(source.clone()))?;

        let size = request.pixel_height as f32;
        let (face, mapped) = db
            .with_face_data(face_id, |data, index| {
                let face = ttf_parser::Face::parse(data, index).ok()?;
                let metrics = FaceMetrics {
                    family,
                    style,
                    units_per_em: face.units_per_em(),
                    ascender: face.ascender(),
                    descender: face.descender(),
                    line_gap: face.line_gap(),
                };
                let scale = size / f32::from(face.units_per_em().max(1));
                let mapped: Vec<(u8, u16, f32)> = (request.first_char..=request.last_char)
                    .filter_map(|code| {
                        let ch = char::from(code);
                        if ch.is_control() {
                            return None;
                        }
                        let glyph = face.glyph_index(ch)?;
                        let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                        Some((code, glyph.0, f32::from(advance) * scale))
                    })
                    .collect();
                Some((metrics, mapped))
            })
            .flatten()
            .ok_or_else(|| SynthError::FaceParse(source.clone()))?;

        let mut font_system = FontSystem::new_with_locale_and_db(self.locale.clone(), db);
        let mut swash = SwashCache::new();

        let mut glyphs: Vec<RasterGlyph> = mapped
            .into_iter()
            .map(|(code, glyph_id, advance)| {
                let (key, _, _) =
                    CacheKey::new(face_id, glyph_id, size, (0.0, 0.0), CacheKeyFlags::empty());
                rasterize(&mut swash, &mut font_system, key, code, advance)
            })
            .collect();
        if !glyphs.iter().any(|g| g.code == b' ') {
            glyphs.push(RasterGlyph::blank(b' ', size * BLANK_SPACE_ADVANCE));
        }

        let sizes: Vec<(u32, u32)> = glyphs.iter().map(|g| (g.width, g.height)).collect();
        let layout = pack(&sizes, request.padding, request.spacing);

        let mut atlas = RgbaImage::new(layout.width, layout.height);
        for (glyph, &(x, y)) in glyphs.iter().zip(&layout.positions) {
            glyph.blit(&mut atlas, x, y);
        }
        atlas
            .save(&request.image_path)
            .map_err(|e| SynthError::Image {
                path: request.image_path.clone(),
                source: e,
            })?;

        let description = describe(&file_name(source), &face, request.pixel_height, &glyphs, &layout);
        let json = serde_json::to_string_pretty(&description)?;
        std::fs::write(&request.metrics_path, json).map_err(|e| SynthError::Io {
            path: request.metrics_path.clone(),
            source: e,
        })?;

        info!(
            target: TARGET,
            source = %source.display(),
            pixel_height = request.pixel_height,
            glyphs = glyphs.len(),
            width = layout.width,
            height = layout.height,
            "synthesized atlas"
        );
        Ok(())
    }
}

impl Default for CosmicSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasSynthesizer for CosmicSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> FontResult<()> {
        Ok(self.render(request)?)
    }
}

fn rasterize(
    swash: &mut SwashCache,
    font_system: &mut FontSystem,
    key: CacheKey,
    code: u8,
    advance: f32,
) -> RasterGlyph {
    let Some(img) = swash.get_image(font_system, key) else {
        debug!(target: TARGET, code, "glyph has no image");
        return RasterGlyph::blank(code, advance);
    };
    if img.placement.width == 0 || img.placement.height == 0 {
        return RasterGlyph::blank(code, advance);
    }

    let rgba = match img.content {
        SwashContent::Mask => img.data.iter().flat_map(|&a| [255, 255, 255, a]).collect(),
        SwashContent::Color => img.data.clone(),
        SwashContent::SubpixelMask => img
            .data
            .chunks_exact(4)
            .flat_map(|px| [255, 255, 255, px[0].max(px[1]).max(px[2])])
            .collect(),
    };

    RasterGlyph {
        code,
        width: img.placement.width,
        height: img.placement.height,
        left: img.placement.left,
        top: img.placement.top,
        advance,
        rgba,
    }
}

fn family_name(info: &fontdb::FaceInfo) -> String {
    info.families
        .first()
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| info.post_script_name.clone())
}

fn style_name(info: &fontdb::FaceInfo) -> String {
    let bold = info.weight.0 >= fontdb::Weight::BOLD.0;
    let slanted = info.style != fontdb::Style::Normal;
    match (bold, slanted) {
        (true, true) => "Bold Italic",
        (true, false) => "Bold",
        (false, true) => "Italic",
        (false, false) => "Regular",
    }
    .to_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
