//! Integration tests for font loading, selection and the line cache.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use bitfont::{
    AtlasSynthesizer, BackendEvent, DrawOptions, FontError, FontRegistry, FontRegistryConfig,
    FontRequest, FontResult, RecordingBackend, SynthesisRequest, TextureFilter,
};

use common::{font_dir, registry, simple_description, write_atlas};

fn draw(fonts: &mut FontRegistry, name: &str, text: &[u8]) {
    let id = fonts.find(name).unwrap();
    let mut backend = RecordingBackend::new();
    fonts.draw(id, &mut backend, text, 0.0, 0.0, &DrawOptions::new(16.0));
}

fn cached_lines(fonts: &FontRegistry, name: &str) -> usize {
    let id = fonts.find(name).unwrap();
    fonts.get(id).unwrap().cache().len()
}

#[test]
fn test_text_width_end_to_end() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let font = fonts.load("Simple").unwrap();

    assert_eq!(fonts.text_width(font, b"A A"), 24.0);
    assert_eq!(fonts.text_width(font, b""), 0.0);
    // Unknown codes measure as a space.
    assert_eq!(fonts.text_width(font, b"A~"), 14.0);
    assert_eq!(fonts.line_height(font), 1.25);
}

#[test]
fn test_loading_same_name_returns_same_handle() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let a = fonts.load("Simple").unwrap();
    let b = fonts.load("Simple").unwrap();
    assert_eq!(a, b);
    assert_eq!(fonts.len(), 1);
}

#[test]
fn test_option_variants_share_one_spec() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let plain = fonts.load("Simple").unwrap();
    let outlined = fonts.load(":on:Simple").unwrap();
    assert_ne!(plain, outlined);

    let plain = fonts.get(plain).unwrap();
    let outlined = fonts.get(outlined).unwrap();
    assert!(Arc::ptr_eq(plain.spec(), outlined.spec()));
    assert!(outlined.is_outline());
    assert!(!plain.is_outline());
    assert_eq!(outlined.texture().filter(), TextureFilter::Nearest);
    assert_eq!(outlined.base_name(), "Simple");
}

#[test]
fn test_request_overrides() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let request = FontRequest::new(":o:Simple").with_size(16).with_outline_width(1.5);
    let id = fonts.load_font(&request).unwrap();
    let font = fonts.get(id).unwrap();

    assert_eq!(font.name(), request.key());
    assert_eq!(font.outline_width(), 1.5);
    assert_eq!(font.outline_weight(), fonts.config().outline_weight);
    assert_eq!(font.pixel_size(), 16);
}

#[test]
fn test_missing_font_is_missing_asset() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let err = fonts.load("Nope").unwrap_err();
    assert!(err.is_missing_asset());
    let FontError::MissingAsset { searched, .. } = err else {
        unreachable!();
    };
    assert!(searched.iter().any(|p| p.ends_with("Nope_16.json")));
    assert!(searched.iter().any(|p| p.ends_with("Nope.ttf")));
}

#[test]
fn test_malformed_spec_is_reported() {
    let dir = font_dir();
    std::fs::write(dir.path().join("Broken_16.json"), r#"{ "family": "Broken" }"#).unwrap();
    image::RgbaImage::new(4, 4)
        .save(dir.path().join("Broken_16.png"))
        .unwrap();

    let mut fonts = registry(dir.path());
    assert!(fonts.load("Broken").unwrap_err().is_malformed());
    assert!(fonts.is_empty());
}

#[test]
fn test_use_font_keeps_previous_on_failure() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    assert!(fonts.use_font("Simple"));
    let simple = fonts.active();

    assert!(!fonts.use_font("Nope"));
    assert_eq!(fonts.active(), simple);

    assert!(fonts.use_font("Mono"));
    assert_ne!(fonts.active(), simple);
}

#[test]
fn test_default_font_from_config() {
    let dir = font_dir();
    let config = FontRegistryConfig::new()
        .with_font_dir(dir.path())
        .with_default_font("Simple");
    let mut fonts = FontRegistry::new(config);

    let default = fonts.default_font();
    assert!(default.is_some());
    assert_eq!(fonts.active(), default);

    fonts.use_font("Mono");
    assert_ne!(fonts.active(), default);
    fonts.use_default_font();
    assert_eq!(fonts.active(), default);
}

#[test]
fn test_missing_default_font_leaves_registry_empty() {
    let dir = font_dir();
    let config = FontRegistryConfig::new()
        .with_font_dir(dir.path())
        .with_default_font("Nope");
    let fonts = FontRegistry::new(config);
    assert!(fonts.default_font().is_none());
    assert!(fonts.active().is_none());
}

#[test]
fn test_repeat_draw_hits_cache() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();

    let mut backend = RecordingBackend::new();
    let options = DrawOptions::new(16.0);
    fonts.draw(id, &mut backend, b"A A", 0.0, 0.0, &options);
    let first = backend.calls()[0];
    assert_eq!(cached_lines(&fonts, "Simple"), 1);

    fonts.update(0.5);
    backend.clear();
    fonts.draw(id, &mut backend, b"A A", 30.0, 40.0, &options);
    assert_eq!(backend.calls()[0], first);
    assert_eq!(cached_lines(&fonts, "Simple"), 1);

    let font = fonts.get(id).unwrap();
    assert_eq!(font.cache().last_used(b"A A"), Some(0.5));
    let stats = font.cache_stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn test_eviction_at_age_boundary() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    fonts.load("Simple").unwrap();

    draw(&mut fonts, "Simple", b"old");
    fonts.update(0.1);
    draw(&mut fonts, "Simple", b"new");
    assert_eq!(cached_lines(&fonts, "Simple"), 2);

    assert_eq!(fonts.update(0.9), 0);
    assert_eq!(fonts.update(1.0), 0);
    // Sweep at 3.0: "old" is exactly 3.0 old, "new" 2.9.
    assert_eq!(fonts.update(1.0), 1);
    assert_eq!(fonts.clock(), 3.0);

    let id = fonts.find("Simple").unwrap();
    let cache = fonts.get(id).unwrap().cache();
    assert!(cache.peek(b"old").is_none());
    assert!(cache.peek(b"new").is_some());
    assert_eq!(fonts.take_released_commands().len(), 1);
    assert!(fonts.take_released_commands().is_empty());
}

#[test]
fn test_sweeps_only_run_at_interval() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    fonts.load("Simple").unwrap();
    draw(&mut fonts, "Simple", b"A");

    // Sweeps run at 1.2 and 2.4. At 3.2 the entry is old enough to go but
    // no sweep is due until 3.6.
    for _ in 0..8 {
        fonts.update(0.4);
    }
    assert_eq!(cached_lines(&fonts, "Simple"), 1);
    fonts.update(0.4);
    assert_eq!(cached_lines(&fonts, "Simple"), 0);
}

#[test]
fn test_disable_cache_purges_and_bypasses() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    fonts.load("Simple").unwrap();
    draw(&mut fonts, "Simple", b"A");
    assert!(fonts.cache_state());

    fonts.disable_cache();
    assert!(!fonts.cache_state());
    assert_eq!(cached_lines(&fonts, "Simple"), 0);
    assert_eq!(fonts.take_released_commands().len(), 1);

    draw(&mut fonts, "Simple", b"A");
    draw(&mut fonts, "Simple", b"AA");
    assert_eq!(cached_lines(&fonts, "Simple"), 0);

    fonts.enable_cache();
    assert_eq!(cached_lines(&fonts, "Simple"), 0);
    draw(&mut fonts, "Simple", b"A");
    assert_eq!(cached_lines(&fonts, "Simple"), 1);
}

#[test]
fn test_free_cache_and_fonts() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    fonts.load("Simple").unwrap();
    fonts.load("Mono").unwrap();
    draw(&mut fonts, "Simple", b"A");
    draw(&mut fonts, "Mono", b"abc");

    fonts.free_cache(Some("Mono"));
    assert_eq!(cached_lines(&fonts, "Simple"), 1);
    assert_eq!(cached_lines(&fonts, "Mono"), 0);

    fonts.free_cache(None);
    assert_eq!(cached_lines(&fonts, "Simple"), 0);

    // Unknown names are ignored.
    fonts.free_cache(Some("Nope"));
    fonts.free_font(Some("Nope"));
    assert_eq!(fonts.len(), 2);

    fonts.free_font(Some("Mono"));
    assert!(fonts.find("Mono").is_none());
    fonts.free_fonts();
    assert!(fonts.is_empty());
}

#[test]
fn test_free_font_without_name_unloads_active() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    fonts.use_font("Mono");
    fonts.load("Simple").unwrap();

    fonts.free_font(None);
    assert!(fonts.find("Mono").is_none());
    assert!(fonts.find("Simple").is_some());
    assert!(fonts.active().is_none());
}

#[test]
fn test_unknown_handle_is_inert() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();
    assert!(fonts.unload_font(id));
    assert!(!fonts.unload_font(id));

    let mut backend = RecordingBackend::new();
    fonts.draw(id, &mut backend, b"A", 0.0, 0.0, &DrawOptions::default());
    assert!(backend.events().is_empty());
    assert_eq!(fonts.text_width(id, b"A"), 0.0);
    assert_eq!(fonts.wrap_text(id, b"A A", 10.0, 10.0, 16.0), b"A A".to_vec());
    assert!(matches!(fonts.reload_font(id), Err(FontError::UnknownFont(_))));
}

#[test]
fn test_reload_picks_up_new_metrics() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();
    draw(&mut fonts, "Simple", b"A");
    let old_texture = fonts.get(id).unwrap().texture().id();

    let mut description = simple_description();
    if let Some(a) = description.glyphs.get_mut(&(b'A' as u32)) {
        a.adv = 20.0;
    }
    write_atlas(dir.path(), "Simple_16", &description);

    let old_glyph = fonts.get(id).unwrap().glyphs().get(b'A').id();
    fonts.reload_font(id).unwrap();
    let font = fonts.get(id).unwrap();
    assert_eq!(font.text_width(b"A"), 20.0);
    assert!(font.cache().is_empty());
    assert_ne!(font.texture().id(), old_texture);
    assert_ne!(font.glyphs().get(b'A').id(), old_glyph);

    // The cached line and the replaced glyph commands are all released.
    let released = fonts.take_released_commands();
    assert!(released.len() > 1);
    assert!(released.contains(&old_glyph));
}

#[test]
fn test_failed_image_load_does_not_cache_metrics() {
    let dir = tempfile::tempdir().unwrap();
    write_atlas(dir.path(), "Simple_16", &simple_description());
    std::fs::write(dir.path().join("Simple_16.png"), b"not a png").unwrap();

    let mut fonts = registry(dir.path());
    assert!(fonts.load("Simple").is_err());
    assert!(fonts.is_empty());

    let mut description = simple_description();
    if let Some(a) = description.glyphs.get_mut(&(b'A' as u32)) {
        a.adv = 20.0;
    }
    write_atlas(dir.path(), "Simple_16", &description);

    let id = fonts.load("Simple").unwrap();
    assert_eq!(fonts.text_width(id, b"A"), 20.0);
}

#[test]
fn test_uncached_draws_and_unload_release_commands() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();
    fonts.disable_cache();
    fonts.take_released_commands();

    let mut backend = RecordingBackend::new();
    let options = DrawOptions::new(16.0);
    let mut lines = Vec::new();
    for _ in 0..5 {
        fonts.draw(id, &mut backend, b"A", 0.0, 0.0, &options);
        let line = backend.take_events().into_iter().find_map(|e| match e {
            BackendEvent::Call(id) => Some(id),
            _ => None,
        });
        lines.push(line.unwrap());
        fonts.update(1.0);
    }
    assert_eq!(cached_lines(&fonts, "Simple"), 0);

    let released = fonts.take_released_commands();
    assert_eq!(released.len(), 5);
    assert!(lines.iter().all(|line| released.contains(line)));

    let glyph = fonts.get(id).unwrap().glyphs().get(b'A').id();
    assert!(fonts.unload_font(id));
    assert!(fonts.take_released_commands().contains(&glyph));
}

#[test]
fn test_name_containing_at_sign_reloads() {
    let dir = font_dir();
    write_atlas(dir.path(), "Odd@Name_16", &simple_description());

    let mut fonts = registry(dir.path());
    let id = fonts.load_font(&FontRequest::new("Odd@Name").with_size(16)).unwrap();
    assert_eq!(fonts.get(id).unwrap().base_name(), "Odd@Name");

    fonts.reload_font(id).unwrap();
    assert_eq!(fonts.text_width(id, b"A A"), 24.0);
}

#[test]
fn test_failed_reload_keeps_font() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();
    std::fs::write(dir.path().join("Simple_16.json"), "not json").unwrap();

    assert!(fonts.reload_font(id).unwrap_err().is_malformed());
    assert_eq!(fonts.text_width(id, b"A A"), 24.0);
}

#[test]
fn test_draw_binds_font_texture() {
    let dir = font_dir();
    let mut fonts = registry(dir.path());
    let id = fonts.load("Simple").unwrap();
    let texture = fonts.get(id).unwrap().texture().id();

    let mut backend = RecordingBackend::new();
    fonts.draw(id, &mut backend, b"AA", 0.0, 0.0, &DrawOptions::new(16.0));
    assert!(backend.events().contains(&BackendEvent::BindTexture(texture)));
    assert_eq!(backend.quads().count(), 2);
}

struct CopyingSynth {
    calls: Rc<Cell<usize>>,
}

impl AtlasSynthesizer for CopyingSynth {
    fn synthesize(&self, request: &SynthesisRequest) -> FontResult<()> {
        self.calls.set(self.calls.get() + 1);
        assert_eq!(request.pixel_height, 16);
        assert_eq!((request.first_char, request.last_char), (0, 255));
        let dir = request.metrics_path.parent().unwrap();
        write_atlas(dir, "Vector_16", &simple_description());
        Ok(())
    }
}

#[test]
fn test_missing_atlas_is_synthesized_from_vector_source() {
    let dir = font_dir();
    std::fs::write(dir.path().join("Vector.ttf"), b"not really a font").unwrap();

    let calls = Rc::new(Cell::new(0));
    let synth = CopyingSynth {
        calls: Rc::clone(&calls),
    };
    let config = FontRegistryConfig::new().with_font_dir(dir.path());
    let mut fonts = FontRegistry::with_synthesizer(config, Box::new(synth));

    let id = fonts.load("Vector").unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(fonts.text_width(id, b"A A"), 24.0);

    // The written atlas is found directly next time.
    fonts.unload_font(id);
    fonts.load("Vector").unwrap();
    assert_eq!(calls.get(), 1);
}
