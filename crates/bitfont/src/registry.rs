//! The table of loaded fonts.
//!
//! A [`FontRegistry`] owns every [`FontInstance`], hands out [`FontId`]
//! handles, tracks the active and default fonts and runs the periodic
//! eviction sweep over the line caches. It is an explicit object passed to
//! whoever measures or draws text; there is no global font state.
//!
//! ```no_run
//! use bitfont::{DrawOptions, FontRegistry, FontRegistryConfig, RecordingBackend};
//!
//! let config = FontRegistryConfig::new()
//!     .with_font_dir("assets/fonts")
//!     .with_default_font("FreeSans");
//! let mut fonts = FontRegistry::new(config);
//! let mut backend = RecordingBackend::new();
//!
//! // Once per frame:
//! if let Some(font) = fonts.active() {
//!     fonts.draw(font, &mut backend, b"Score: 100", 10.0, 10.0, &DrawOptions::new(16.0));
//! }
//! fonts.update(1.0 / 60.0);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};
use tracing::{debug, info, trace, warn};

use crate::atlas::{AtlasLoader, AtlasSynthesizer, AtlasTexture, GlyphAtlasSpec};
use crate::backend::TextBackend;
use crate::command::{CommandId, GlyphMode};
use crate::config::FontRegistryConfig;
use crate::error::{FontError, FontResult};
use crate::font::{DrawEnv, FontInstance, TextExtent};
use crate::layout::{self, DrawOptions, HorizontalAlign, VerticalAlign};
use crate::logging::targets;
use crate::options::{FontOptions, FontRequest};
use crate::types::{Rect, Size};

new_key_type! {
    /// Handle to a font loaded in a [`FontRegistry`].
    pub struct FontId;
}

/// Owns loaded fonts and their caches.
pub struct FontRegistry {
    config: FontRegistryConfig,
    loader: AtlasLoader,
    fonts: SlotMap<FontId, FontInstance>,
    by_key: HashMap<String, FontId>,
    /// Parsed specs by metrics path, shared between fonts that differ only
    /// in options.
    specs: HashMap<PathBuf, Arc<GlyphAtlasSpec>>,
    active: Option<FontId>,
    default: Option<FontId>,
    cache_enabled: bool,
    clock: f64,
    since_sweep: f64,
    released: Vec<CommandId>,
}

impl FontRegistry {
    /// Create a registry without a synthesizer. Fonts must already have
    /// their atlas assets on disk.
    pub fn new(config: FontRegistryConfig) -> Self {
        let loader = AtlasLoader::new(config.font_dirs.clone(), config.synthesis);
        Self::with_loader(config, loader)
    }

    /// Create a registry that rasterizes missing atlases from vector fonts.
    pub fn with_synthesizer(
        config: FontRegistryConfig,
        synthesizer: Box<dyn AtlasSynthesizer>,
    ) -> Self {
        let mut loader = AtlasLoader::new(config.font_dirs.clone(), config.synthesis);
        loader.set_synthesizer(synthesizer);
        Self::with_loader(config, loader)
    }

    fn with_loader(config: FontRegistryConfig, loader: AtlasLoader) -> Self {
        let mut registry = Self {
            cache_enabled: config.cache_enabled,
            config,
            loader,
            fonts: SlotMap::with_key(),
            by_key: HashMap::new(),
            specs: HashMap::new(),
            active: None,
            default: None,
            clock: 0.0,
            since_sweep: 0.0,
            released: Vec::new(),
        };
        if let Some(name) = registry.config.default_font.clone() {
            registry.set_default_font(&name);
        }
        registry
    }

    pub fn config(&self) -> &FontRegistryConfig {
        &self.config
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a font, or return the handle of the identical font already
    /// loaded.
    pub fn load_font(&mut self, request: &FontRequest) -> FontResult<FontId> {
        let key = request.key();
        if let Some(&id) = self.by_key.get(&key) {
            trace!(target: targets::REGISTRY, %key, "font already loaded");
            return Ok(id);
        }

        let (options, base_name) = FontOptions::parse_name(&request.name);
        let size = request.size.unwrap_or(self.config.default_size);
        let (spec, texture) = self.load_atlas(base_name, size, options, false)?;

        let mode = if options.outline {
            GlyphMode::Outline(self.config.halo)
        } else {
            GlyphMode::Plain
        };
        let font = FontInstance::new(key.clone(), base_name, options, spec, texture, mode)
            .with_pixel_size(size)
            .with_outline(
                request.outline_width.unwrap_or(self.config.outline_width),
                request.outline_weight.unwrap_or(self.config.outline_weight),
            );

        let id = self.fonts.insert(font);
        self.by_key.insert(key.clone(), id);
        info!(target: targets::REGISTRY, %key, size, outline = options.outline, "loaded font");
        Ok(id)
    }

    /// Load a font by name with the configured defaults.
    pub fn load(&mut self, name: &str) -> FontResult<FontId> {
        self.load_font(&FontRequest::new(name))
    }

    /// Resolve, parse and decode the atlas of a base name. With `fresh`,
    /// the shared spec cache is bypassed and refreshed. A spec is only
    /// shared once its texture has decoded too.
    fn load_atlas(
        &mut self,
        base_name: &str,
        size: u32,
        options: FontOptions,
        fresh: bool,
    ) -> FontResult<(Arc<GlyphAtlasSpec>, Arc<AtlasTexture>)> {
        let assets = self.loader.load(base_name, size)?;

        let cached = if fresh {
            None
        } else {
            self.specs.get(&assets.metrics).cloned()
        };
        let parsed = cached.is_none();
        let spec = match cached {
            Some(spec) => spec,
            None => Arc::new(GlyphAtlasSpec::load(&assets.metrics).inspect_err(|err| {
                warn!(target: targets::ATLAS, %err, "could not read font metrics");
            })?),
        };

        let texture = AtlasTexture::load(&assets.image, options.filter)?;
        texture.check_dimensions(spec.texture_size());
        if parsed {
            self.specs.insert(assets.metrics, Arc::clone(&spec));
        }
        Ok((spec, Arc::new(texture)))
    }

    /// Re-read a font's assets from disk.
    ///
    /// The new spec, texture and glyph commands are fully built before the
    /// old ones are dropped, so a failed reload leaves the font untouched.
    /// The font's line cache is emptied.
    pub fn reload_font(&mut self, id: FontId) -> FontResult<()> {
        let font = self.get(id).ok_or_else(|| FontError::UnknownFont(format!("{id:?}")))?;
        let base_name = font.base_name().to_string();
        let (size, options) = (font.pixel_size(), font.options());

        let (spec, texture) = self.load_atlas(&base_name, size, options, true)?;
        if let Some(font) = self.fonts.get_mut(id) {
            let released = font.replace_atlas(spec, texture);
            info!(target: targets::REGISTRY, key = font.name(), "reloaded font");
            self.released.extend(released);
        }
        Ok(())
    }

    /// Unload a font and release its cached commands. Unknown handles are
    /// ignored.
    pub fn unload_font(&mut self, id: FontId) -> bool {
        let Some(mut font) = self.fonts.remove(id) else {
            return false;
        };
        self.by_key.remove(font.name());
        self.released.extend(font.release_commands());
        if self.active == Some(id) {
            self.active = None;
        }
        if self.default == Some(id) {
            self.default = None;
        }

        // Forget the spec once no font shares it.
        let path = font.spec().path().to_path_buf();
        drop(font);
        if self.specs.get(&path).is_some_and(|spec| Arc::strong_count(spec) == 1) {
            self.specs.remove(&path);
        }

        info!(target: targets::REGISTRY, ?id, "unloaded font");
        true
    }

    pub fn get(&self, id: FontId) -> Option<&FontInstance> {
        self.fonts.get(id)
    }

    pub fn get_mut(&mut self, id: FontId) -> Option<&mut FontInstance> {
        self.fonts.get_mut(id)
    }

    /// Handle of a loaded font by registry key.
    pub fn find(&self, key: &str) -> Option<FontId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FontId, &FontInstance)> {
        self.fonts.iter()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn active(&self) -> Option<FontId> {
        self.active
    }

    pub fn default_font(&self) -> Option<FontId> {
        self.default
    }

    /// Load `name` and make it the default font. If nothing is active yet it
    /// becomes active too. On failure the previous default stays.
    pub fn set_default_font(&mut self, name: &str) -> bool {
        match self.load(name) {
            Ok(id) => {
                self.default = Some(id);
                if self.active.is_none() {
                    self.active = Some(id);
                }
                debug!(target: targets::REGISTRY, name, "default font set");
                true
            }
            Err(err) => {
                warn!(target: targets::REGISTRY, name, %err, "keeping previous default font");
                false
            }
        }
    }

    /// Load `name` and make it the active font. On failure the previous
    /// active font stays, so drawing keeps working.
    pub fn use_font(&mut self, name: &str) -> bool {
        match self.load(name) {
            Ok(id) => {
                self.active = Some(id);
                true
            }
            Err(err) => {
                warn!(target: targets::REGISTRY, name, %err, "keeping previous active font");
                false
            }
        }
    }

    pub fn use_default_font(&mut self) {
        self.active = self.default;
    }

    // =========================================================================
    // Measurement and drawing
    // =========================================================================

    /// Width of the widest line, normalized. Zero for unknown fonts.
    pub fn text_width(&self, id: FontId, text: &[u8]) -> f32 {
        self.get(id).map_or(0.0, |font| font.text_width(text))
    }

    pub fn text_extent(&self, id: FontId, text: &[u8]) -> Option<TextExtent> {
        self.get(id).map(|font| font.text_extent(text))
    }

    /// Glyph box height of the text, normalized.
    pub fn text_height(&self, id: FontId, text: &[u8]) -> f32 {
        self.get(id).map_or(0.0, |font| font.text_height(text))
    }

    /// Baseline distance, normalized.
    pub fn line_height(&self, id: FontId) -> f32 {
        self.get(id).map_or(0.0, FontInstance::line_height)
    }

    fn env(&self) -> DrawEnv {
        DrawEnv {
            now: self.clock,
            cache_enabled: self.cache_enabled,
            floor_positions: self.config.floor_positions,
        }
    }

    /// Draw text with its anchor at `(x, y)`. Unknown fonts draw nothing.
    ///
    /// Line commands built only for this call (caching disabled) are queued
    /// for [`take_released_commands`](Self::take_released_commands).
    pub fn draw(
        &mut self,
        id: FontId,
        backend: &mut dyn TextBackend,
        text: &[u8],
        x: f32,
        y: f32,
        options: &DrawOptions,
    ) {
        let env = self.env();
        if let Some(font) = self.fonts.get_mut(id) {
            let one_off = font.draw(backend, text, x, y, options, env);
            self.released.extend(one_off);
        }
    }

    /// Draw text aligned inside `rect`. Unknown fonts draw nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_in_box(
        &mut self,
        id: FontId,
        backend: &mut dyn TextBackend,
        text: &[u8],
        rect: Rect,
        align: HorizontalAlign,
        valign: VerticalAlign,
        options: &DrawOptions,
    ) {
        let env = self.env();
        if let Some(font) = self.fonts.get_mut(id) {
            let one_off = font.draw_in_box(backend, text, rect, align, valign, options, env);
            self.released.extend(one_off);
        }
    }

    /// Wrap text to a box. Unknown fonts return the text unchanged.
    pub fn wrap_text(
        &self,
        id: FontId,
        text: &[u8],
        max_width: f32,
        max_height: f32,
        size: f32,
    ) -> Vec<u8> {
        match self.get(id) {
            Some(font) => layout::wrap_text(font, text, max_width, max_height, size),
            None => text.to_vec(),
        }
    }

    /// Box size needed for the text. Zero for unknown fonts.
    pub fn auto_size(
        &self,
        id: FontId,
        text: &[u8],
        options: &DrawOptions,
        obey_line_height: bool,
    ) -> Size {
        self.get(id).map_or(Size::ZERO, |font| {
            layout::auto_size(font, text, options, obey_line_height)
        })
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    pub fn enable_cache(&mut self) {
        self.cache_enabled = true;
    }

    /// Stop caching line commands and drop every cached line.
    pub fn disable_cache(&mut self) {
        self.cache_enabled = false;
        self.free_cache(None);
    }

    pub fn cache_state(&self) -> bool {
        self.cache_enabled
    }

    /// Unload the named font, or the active font for `None`. Unknown names
    /// are ignored.
    pub fn free_font(&mut self, name: Option<&str>) {
        let id = match name {
            Some(name) => self.find(name),
            None => self.active,
        };
        if let Some(id) = id {
            self.unload_font(id);
        }
    }

    /// Unload every font.
    pub fn free_fonts(&mut self) {
        let ids: Vec<FontId> = self.fonts.keys().collect();
        for id in ids {
            self.unload_font(id);
        }
    }

    /// Empty the line cache of the named font, or of every font for `None`.
    pub fn free_cache(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                if let Some(font) = self.find(name).and_then(|id| self.fonts.get_mut(id)) {
                    self.released.extend(font.clear_cache());
                }
            }
            None => {
                for font in self.fonts.values_mut() {
                    self.released.extend(font.clear_cache());
                }
            }
        }
    }

    /// Advance the registry clock by `dt` and run an eviction sweep once
    /// `sweep_interval` time has accumulated since the last one. Returns the
    /// number of evicted lines.
    pub fn update(&mut self, dt: f64) -> usize {
        self.clock += dt;
        self.since_sweep += dt;
        if self.since_sweep < self.config.sweep_interval {
            return 0;
        }
        self.since_sweep = 0.0;

        let (now, max_age) = (self.clock, self.config.max_cache_age);
        let before = self.released.len();
        for font in self.fonts.values_mut() {
            self.released.extend(font.sweep_cache(now, max_age));
        }
        let evicted = self.released.len() - before;
        debug!(target: targets::CACHE, now, evicted, "eviction sweep");
        evicted
    }

    /// Accumulated time seen by [`update`](Self::update).
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Ids of commands dropped since the last call, for backends that keep
    /// compiled copies: evicted and purged lines, one-off lines drawn with
    /// caching disabled, and the glyph commands of unloaded or reloaded
    /// fonts.
    pub fn take_released_commands(&mut self) -> Vec<CommandId> {
        std::mem::take(&mut self.released)
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("fonts", &self.fonts.len())
            .field("active", &self.active)
            .field("default", &self.default)
            .field("cache_enabled", &self.cache_enabled)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
