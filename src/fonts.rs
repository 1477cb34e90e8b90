//! Measurement collaborator: string widths and vertical metrics.
//!
//! `FontLibrary` resolves families against TrueType/OpenType files found in
//! `FLOWPAGE_FONTS` and the platform font folders. Families that cannot be
//! found are measured with built-in Helvetica widths, which is also what the
//! PDF backend falls back to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use memmap2::Mmap;
use ttf_parser::Face;

use crate::model::Font;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    /// Distance below the baseline, positive.
    pub descent: f32,
    pub line_height: f32,
}

pub trait TextMeasurer: Sync {
    fn measure_string(&self, text: &str, font: &Font) -> f32;
    fn font_metrics(&self, font: &Font) -> FontMetrics;
}

/// Built-in Helvetica metrics; needs no font files.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardMetrics;

impl TextMeasurer for StandardMetrics {
    fn measure_string(&self, text: &str, font: &Font) -> f32 {
        let size = font.effective_size();
        text.chars()
            .map(|ch| helvetica_width_1000(ch) * size / 1000.0)
            .sum()
    }

    fn font_metrics(&self, font: &Font) -> FontMetrics {
        let size = font.effective_size();
        FontMetrics {
            ascent: size * 0.75,
            descent: size * 0.21,
            line_height: size * 1.2,
        }
    }
}

/// Approximate Helvetica widths at 1000 units/em, keyed by WinAnsi byte.
pub(crate) fn helvetica_width_1000(ch: char) -> f32 {
    match char_to_winansi(ch) {
        0 if ch != '\0' => 556.0,             // unmappable, average width
        0..=31 => 0.0,
        32 => 278.0,                          // space
        33..=47 => 333.0,                     // punctuation
        48..=57 => 556.0,                     // digits
        58..=64 => 333.0,
        73 | 74 => 278.0,                     // I J
        77 => 833.0,                          // M
        65..=90 => 667.0,
        91..=96 => 333.0,
        102 | 105 | 106 | 108 | 116 => 278.0, // f i j l t
        109 | 119 => 833.0,                   // m w
        _ => 556.0,
    }
}

/// Map a Unicode char to its WinAnsi (Windows-1252) byte, or 0 if unmappable.
pub(crate) fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95, // bullet
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// (lowercase family name, bold, italic) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool, bool), (PathBuf, u32)>;

/// A parsed font file kept in memory for measuring and embedding.
pub struct LoadedFace {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    pub data: Vec<u8>,
    pub face_index: u32,
    units_per_em: f32,
    ascender: f32,
    descender: f32,
    line_gap: f32,
    advances: Mutex<HashMap<char, Option<f32>>>,
}

impl LoadedFace {
    fn load(family: &str, bold: bool, italic: bool, path: &Path, face_index: u32) -> Option<Self> {
        let data = std::fs::read(path).ok()?;
        let face = Face::parse(&data, face_index).ok()?;
        let units_per_em = face.units_per_em() as f32;
        let ascender = face.ascender() as f32;
        let descender = face.descender() as f32;
        let line_gap = face.line_gap() as f32;
        Some(Self {
            family: family.to_string(),
            bold,
            italic,
            data,
            face_index,
            units_per_em,
            ascender,
            descender,
            line_gap,
            advances: Mutex::new(HashMap::new()),
        })
    }

    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }

    /// Advance of `ch` in 1000-units, `None` when the face has no glyph for it.
    pub fn advance_1000(&self, ch: char) -> Option<f32> {
        if let Ok(cache) = self.advances.lock()
            && let Some(&w) = cache.get(&ch)
        {
            return w;
        }
        let w = self.face().and_then(|face| {
            let gid = face.glyph_index(ch)?;
            let adv = face.glyph_hor_advance(gid)?;
            Some(adv as f32 / self.units_per_em * 1000.0)
        });
        if let Ok(mut cache) = self.advances.lock() {
            cache.insert(ch, w);
        }
        w
    }

    fn metrics(&self, size: f32) -> FontMetrics {
        let scale = size / self.units_per_em;
        FontMetrics {
            ascent: self.ascender * scale,
            descent: -self.descender * scale,
            line_height: (self.ascender - self.descender + self.line_gap) * scale,
        }
    }
}

/// First candidate of a `;`-separated family list.
pub(crate) fn primary_font_name(name: &str) -> &str {
    name.split(';').next().unwrap_or(name).trim()
}

type FaceKey = (String, bool, bool);

/// Font discovery plus a lazily filled cache of loaded faces.
pub struct FontLibrary {
    index: FontLookup,
    loaded: Mutex<HashMap<FaceKey, Option<Arc<LoadedFace>>>>,
}

impl FontLibrary {
    /// Scans `FLOWPAGE_FONTS`, `extra_dirs` and, if requested, the platform font folders.
    pub fn new(extra_dirs: &[PathBuf], system_fonts: bool) -> Self {
        let mut dirs = env_font_directories();
        dirs.extend(extra_dirs.iter().cloned());
        if system_fonts {
            dirs.extend(system_font_directories());
        }
        Self {
            index: scan_font_dirs(dirs),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Library with no font files; every family measures as Helvetica.
    pub fn empty() -> Self {
        Self {
            index: FontLookup::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn family_count(&self) -> usize {
        self.index.len()
    }

    fn find_font_file(&self, family: &str, bold: bool, italic: bool) -> Option<(PathBuf, u32)> {
        let key = family.to_lowercase();
        self.index
            .get(&(key.clone(), bold, italic))
            .or_else(|| {
                if bold || italic {
                    self.index.get(&(key, false, false))
                } else {
                    None
                }
            })
            .cloned()
    }

    /// Face used for `font`, trying each `;`-separated candidate in order.
    pub fn resolve(&self, font: &Font) -> Option<Arc<LoadedFace>> {
        let key = (font.name.to_lowercase(), font.bold, font.italic);
        if let Ok(loaded) = self.loaded.lock()
            && let Some(hit) = loaded.get(&key)
        {
            return hit.clone();
        }

        let face = font.name.split(';').map(str::trim).find_map(|candidate| {
            let (path, index) = self.find_font_file(candidate, font.bold, font.italic)?;
            LoadedFace::load(candidate, font.bold, font.italic, &path, index).map(Arc::new)
        });
        if face.is_none() && !is_standard_family(primary_font_name(&font.name)) {
            log::warn!(
                "Font not found: {} bold={} italic={}, measuring as Helvetica",
                font.name,
                font.bold,
                font.italic
            );
        }
        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.insert(key, face.clone());
        }
        face
    }
}

impl TextMeasurer for FontLibrary {
    fn measure_string(&self, text: &str, font: &Font) -> f32 {
        let Some(face) = self.resolve(font) else {
            return StandardMetrics.measure_string(text, font);
        };
        let size = font.effective_size();
        text.chars()
            .map(|ch| {
                face.advance_1000(ch)
                    .unwrap_or_else(|| helvetica_width_1000(ch))
                    * size
                    / 1000.0
            })
            .sum()
    }

    fn font_metrics(&self, font: &Font) -> FontMetrics {
        match self.resolve(font) {
            Some(face) => face.metrics(font.effective_size()),
            None => StandardMetrics.font_metrics(font),
        }
    }
}

fn is_standard_family(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "helvetica" | "arial")
}

fn env_font_directories() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(val) = std::env::var("FLOWPAGE_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        for part in val.split(sep) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                dirs.push(PathBuf::from(trimmed));
            }
        }
    }
    dirs
}

fn system_font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn font_family_name(face: &Face) -> Option<String> {
    // Name ID 1 keeps "Noto Sans" and "Noto Sans Display" apart
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

fn scan_font_dirs(dirs: Vec<PathBuf>) -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut files_scanned = 0u32;
    let mut visited = std::collections::HashSet::new();

    let mut stack = dirs;
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            files_scanned += 1;
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            // SAFETY: font files are only read while the map is alive; a
            // concurrent truncation at worst yields a parse failure.
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
            for face_index in 0..face_count {
                let Ok(face) = Face::parse(&data, face_index) else {
                    continue;
                };
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold(), face.is_italic()))
                        .or_insert((path.clone(), face_index));
                }
            }
        }
    }

    log::info!(
        "Font scan: {:.1}ms, {} dirs, {} files parsed, {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        visited.len(),
        files_scanned,
        index.len(),
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_metrics_scale_with_size() {
        let font = Font {
            size: 20.0,
            ..Font::default()
        };
        let m = StandardMetrics.font_metrics(&font);
        assert_eq!(m.line_height, 24.0);
        assert_eq!(m.ascent, 15.0);
        let w = StandardMetrics.measure_string("ii", &font);
        assert!((w - 2.0 * 278.0 * 20.0 / 1000.0).abs() < 1e-4);
    }

    #[test]
    fn superscript_shrinks_measurement() {
        let plain = Font::default();
        let sup = Font {
            superscript: true,
            ..Font::default()
        };
        assert!(
            StandardMetrics.measure_string("abc", &sup) < StandardMetrics.measure_string("abc", &plain)
        );
    }

    #[test]
    fn empty_library_falls_back_to_helvetica() {
        let lib = FontLibrary::empty();
        let font = Font {
            name: "Definitely Missing Sans".into(),
            ..Font::default()
        };
        assert!(lib.resolve(&font).is_none());
        assert_eq!(
            lib.measure_string("Hello", &font),
            StandardMetrics.measure_string("Hello", &font)
        );
    }

    #[test]
    fn winansi_maps_specials() {
        assert_eq!(char_to_winansi('\u{2022}'), 0x95);
        assert_eq!(char_to_winansi('A'), b'A');
        assert_eq!(char_to_winansi('\u{4E2D}'), 0);
    }
}
