pub mod config;
pub mod error;
pub mod fonts;
pub mod graphics;
pub mod images;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod renderer;

pub use config::{CancellationToken, LayoutConfig};
pub use error::{Error, Result};
pub use fonts::{FontLibrary, FontMetrics, StandardMetrics, TextMeasurer};
pub use graphics::{Canvas, DrawOp, LinkTarget, Pen, RecordingCanvas};
pub use images::{FileImageSource, ImageFailure, ImageInfo, ImageSource};
pub use layout::{FormattedDocument, FormattedPage, PageInfo, PageNumber, Rectangle};
pub use model::Document;
pub use renderer::{DocumentRenderer, RenderOptions};

use std::path::Path;
use std::time::Instant;

/// Formats `document` and writes it as PDF bytes, measuring with `library`.
pub fn render_to_pdf(
    document: &Document,
    library: &FontLibrary,
    images: &dyn ImageSource,
    config: LayoutConfig,
) -> Result<Vec<u8>> {
    let mut renderer = DocumentRenderer::with_config(document, library, images, config);
    renderer.prepare_document()?;
    pdf::write_pdf(&renderer, library)
}

/// Reads a JSON content tree from `input` and writes the PDF to `output`.
/// Fonts come from `FLOWPAGE_FONTS` and the system folders; images resolve
/// relative to the input file.
pub fn convert_json_to_pdf(input: &Path, output: &Path) -> Result<()> {
    let t0 = Instant::now();

    let doc = Document::from_json_file(input)?;
    let t_parse = t0.elapsed();

    let library = FontLibrary::new(&[], true);
    let images = match input.parent() {
        Some(dir) => FileImageSource::with_base_dir(dir),
        None => FileImageSource::new(),
    };
    let bytes = render_to_pdf(&doc, &library, &images, LayoutConfig::default())?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}

/// Same as [`convert_json_to_pdf`] for an in-memory JSON document. Relative
/// image paths resolve against the working directory.
pub fn convert_json_bytes_to_pdf(input: &[u8], output: &Path) -> Result<()> {
    let t0 = Instant::now();

    let doc: Document = serde_json::from_slice(input)?;
    let t_parse = t0.elapsed();

    let library = FontLibrary::new(&[], true);
    let bytes = render_to_pdf(&doc, &library, &FileImageSource::new(), LayoutConfig::default())?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
