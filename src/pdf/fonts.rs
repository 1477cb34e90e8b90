use std::collections::{HashMap, HashSet};

use pdf_writer::{Name, Pdf, Rect, Ref};

use crate::fonts::{FontLibrary, LoadedFace, char_to_winansi, primary_font_name};
use crate::model::Font;

/// (lowercase family list, bold, italic); the same key `FontLibrary` caches by.
pub(crate) type FontKey = (String, bool, bool);

pub(crate) fn font_key(font: &Font) -> FontKey {
    (font.name.to_lowercase(), font.bold, font.italic)
}

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Present for embedded TrueType fonts, which are addressed by glyph id.
    char_to_gid: Option<HashMap<char, u16>>,
}

impl FontEntry {
    /// Bytes for a `Tj` operand in this font's encoding.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}

/// WinAnsi bytes for the base-14 fallback; unmappable chars become `?`.
fn to_winansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match char_to_winansi(ch) {
            0 => b'?',
            byte => byte,
        })
        .collect()
}

fn helvetica_variant(bold: bool, italic: bool) -> &'static [u8] {
    match (bold, italic) {
        (false, false) => b"Helvetica",
        (true, false) => b"Helvetica-Bold",
        (false, true) => b"Helvetica-Oblique",
        (true, true) => b"Helvetica-BoldOblique",
    }
}

fn postscript_name(face: &LoadedFace) -> String {
    let base = face.family.replace(' ', "");
    match (face.bold, face.italic) {
        (false, false) => base,
        (true, false) => format!("{base}-Bold"),
        (false, true) => format!("{base}-Italic"),
        (true, true) => format!("{base}-BoldItalic"),
    }
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to only include glyphs used in the document.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    face_data: &LoadedFace,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<HashMap<char, u16>> {
    let face = face_data.face()?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    let mut chars: Vec<char> = used_chars.iter().copied().collect();
    chars.sort_unstable();
    for ch in chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            if char_to_gid.insert(ch, new_gid).is_none() {
                let w = face
                    .glyph_hor_advance(gid)
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0);
                gid_widths.push((new_gid, w));
            }
        }
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let ps_name = postscript_name(face_data);
    let subset_data = subsetter::subset(&face_data.data, face_data.face_index, &remapper)
        .unwrap_or_else(|e| {
            log::warn!("Font subsetting failed for {ps_name}: {e}, embedding full font");
            face_data.data.clone()
        });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let cid_font_ref = alloc();
    let tounicode_ref = alloc();

    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(if face_data.italic { -12.0 } else { 0.0 })
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(if face_data.bold { 120.0 } else { 80.0 })
        .font_file2(data_ref);

    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

/// Writes the font objects for `font` and returns how to address it in
/// content streams. Families the library cannot resolve use base-14 Helvetica.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    font: &Font,
    library: &FontLibrary,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &HashSet<char>,
) -> FontEntry {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let char_to_gid = library
        .resolve(font)
        .and_then(|face| embed_truetype(pdf, font_ref, &face, used_chars, alloc));

    if char_to_gid.is_none() {
        log::debug!(
            "register_font: {} bold={} italic={} uses base-14 Helvetica",
            primary_font_name(&font.name),
            font.bold,
            font.italic
        );
        pdf.type1_font(font_ref)
            .base_font(Name(helvetica_variant(font.bold, font.italic)))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    log::debug!(
        "register_font: {} bold={} italic={} → {:.1}ms",
        font.name,
        font.bold,
        font.italic,
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    FontEntry {
        pdf_name,
        font_ref,
        char_to_gid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_ids_are_big_endian_pairs() {
        let map = HashMap::from([('a', 0x0102u16), ('b', 3)]);
        assert_eq!(encode_as_gids("ab?", &map), vec![1, 2, 0, 3, 0, 0]);
    }

    #[test]
    fn winansi_fallback_replaces_unmappable() {
        assert_eq!(to_winansi_bytes("A€\u{4e2d}"), vec![b'A', 0x80, b'?']);
    }

    #[test]
    fn key_ignores_case() {
        let font = Font {
            name: "Open Sans".into(),
            bold: true,
            ..Font::default()
        };
        assert_eq!(font_key(&font), ("open sans".to_string(), true, false));
    }
}
