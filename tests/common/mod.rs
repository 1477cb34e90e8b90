use std::path::{Path, PathBuf};
use std::{fs, io};

use flowpage::layout::FormatInfo;
use flowpage::model::Font;
use flowpage::{
    Document, DocumentRenderer, FontMetrics, FormattedPage, ImageFailure, ImageInfo, ImageSource,
    LayoutConfig, TextMeasurer,
};
use serde_json::{Value, json};

/// Every char is a tenth of the font size wide; lines are 1.2 x size.
/// At the default 10pt that is 1pt per char and 12pt per line.
pub struct Fixed;

impl TextMeasurer for Fixed {
    fn measure_string(&self, text: &str, font: &Font) -> f32 {
        text.chars().count() as f32 * font.size / 10.0
    }

    fn font_metrics(&self, font: &Font) -> FontMetrics {
        FontMetrics {
            ascent: font.size * 0.8,
            descent: font.size * 0.2,
            line_height: font.size * 1.2,
        }
    }
}

/// Image source where nothing can be found.
pub struct FailingImages;

impl ImageSource for FailingImages {
    fn intrinsic(&self, _: &str) -> Result<ImageInfo, ImageFailure> {
        Err(ImageFailure::FileNotFound)
    }
}

/// Every image is `width_px` x `height_px` at 72 dpi.
pub struct SizedImages {
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageSource for SizedImages {
    fn intrinsic(&self, _: &str) -> Result<ImageInfo, ImageFailure> {
        Ok(ImageInfo {
            width_px: self.width_px,
            height_px: self.height_px,
            resolution: None,
        })
    }
}

pub fn doc(value: Value) -> Document {
    serde_json::from_value(value).expect("valid document JSON")
}

/// Page whose content area is `width` x `height`, starting at (left, 25).
pub fn page_setup(left: f32, width: f32, height: f32) -> Value {
    json!({
        "page_width": left * 2.0 + width,
        "page_height": height + 50.0,
        "top_margin": 25.0,
        "bottom_margin": 25.0,
        "left_margin": left,
        "right_margin": left,
        "header_distance": 10.0,
        "footer_distance": 10.0
    })
}

/// Paragraph of `lines` ten-char words; one word per line in a 15-wide area.
pub fn words(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            let c = (b'a' + (i % 26) as u8) as char;
            c.to_string().repeat(10)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn para(text: &str) -> Value {
    json!({ "type": "paragraph", "content": [{ "type": "text", "text": text }] })
}

pub fn para_with(text: &str, format: Value) -> Value {
    json!({
        "type": "paragraph",
        "format": format,
        "content": [{ "type": "text", "text": text }]
    })
}

/// Single-section document in a 15 x 50 content area.
pub fn narrow_doc(elements: Vec<Value>) -> Document {
    doc(json!({
        "sections": [{ "page_setup": page_setup(40.0, 15.0, 50.0), "elements": elements }]
    }))
}

pub fn prepare(document: &Document) -> DocumentRenderer<'_> {
    prepare_with(document, &FailingImages, LayoutConfig::default())
}

pub fn prepare_with<'a>(
    document: &'a Document,
    images: &'a dyn ImageSource,
    config: LayoutConfig,
) -> DocumentRenderer<'a> {
    let mut renderer = DocumentRenderer::with_config(document, &Fixed, images, config);
    renderer.prepare_document().expect("format pass");
    renderer
}

/// Line count of every paragraph fragment on the page, in flow order.
pub fn paragraph_lines(page: &FormattedPage<'_>) -> Vec<usize> {
    page.content
        .iter()
        .filter_map(|info| match &info.format {
            FormatInfo::Paragraph(p) => Some(p.lines.len()),
            _ => None,
        })
        .collect()
}

/// `paragraph_lines` for every page of a prepared document.
pub fn lines_per_page(renderer: &DocumentRenderer<'_>) -> Vec<Vec<usize>> {
    renderer
        .formatted()
        .expect("prepared")
        .pages
        .iter()
        .map(paragraph_lines)
        .collect()
}

/// Discover JSON fixtures. Filter with FLOWPAGE_CASE (file stem).
pub fn discover_fixtures() -> io::Result<Vec<PathBuf>> {
    let fixtures_dir = Path::new("tests/fixtures");
    let case_filter = std::env::var("FLOWPAGE_CASE").ok();
    let mut fixtures: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(fixtures_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(ref filter) = case_filter {
            if display_name(&path) != *filter {
                continue;
            }
        }
        fixtures.push(path);
    }
    fixtures.sort();
    Ok(fixtures)
}

pub fn display_name(fixture: &Path) -> String {
    fixture
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Output directory: tests/output/<case>/
pub fn output_dir(fixture: &Path) -> PathBuf {
    PathBuf::from("tests/output").join(display_name(fixture))
}
