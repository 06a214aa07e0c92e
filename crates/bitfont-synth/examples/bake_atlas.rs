//! Bake a vector font into an atlas and lay out some text with it.
//!
//! The atlas is written next to the font file on first run and reused
//! afterwards.
//!
//! Run with: cargo run -p bitfont-synth --example bake_atlas -- <font.ttf> [pixel height]

use std::path::PathBuf;

use bitfont::{
    BackendEvent, DrawOptions, FontRegistry, FontRegistryConfig, FontRequest, HorizontalAlign,
    RecordingBackend, Rect, VerticalAlign,
};
use bitfont_synth::CosmicSynthesizer;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(source) = args.next().map(PathBuf::from) else {
        eprintln!("usage: bake_atlas <font.ttf> [pixel height]");
        std::process::exit(2);
    };
    let size: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(24);

    let dir = source.parent().map(PathBuf::from).unwrap_or_default();
    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let config = FontRegistryConfig::new()
        .with_font_dir(dir)
        .with_default_size(size);
    let mut fonts = FontRegistry::with_synthesizer(config, Box::new(CosmicSynthesizer::new()));

    let font = match fonts.load_font(&FontRequest::new(name.as_str())) {
        Ok(font) => font,
        Err(err) => {
            eprintln!("failed to load {}: {err}", source.display());
            std::process::exit(1);
        }
    };

    let text = b"The quick brown fox jumps over the lazy dog.";
    let options = DrawOptions::new(size as f32);
    println!("width at {size} px: {:.1}", fonts.text_width(font, text) * size as f32);

    let wrapped = fonts.wrap_text(font, text, 200.0, 400.0, size as f32);
    println!("wrapped to 200 px:");
    for line in bitfont::strip_colors(&wrapped).split(|&b| b == b'\n') {
        println!("  {}", String::from_utf8_lossy(line));
    }

    let mut backend = RecordingBackend::new();
    let rect = Rect::new(0.0, 0.0, 200.0, 400.0);
    for _ in 0..3 {
        fonts.draw_in_box(
            font,
            &mut backend,
            &wrapped,
            rect,
            HorizontalAlign::Center,
            VerticalAlign::Center,
            &options,
        );
        fonts.update(1.0 / 60.0);
    }

    let quads = backend
        .events()
        .iter()
        .filter(|e| matches!(e, BackendEvent::Quad { .. }))
        .count();
    println!("quads drawn over 3 frames: {quads}");
    if let Some(stats) = fonts.get(font).map(|f| f.cache_stats()) {
        println!(
            "string cache: {} entries, {:.0}% hits",
            stats.entries,
            stats.hit_rate() * 100.0
        );
    }
}
