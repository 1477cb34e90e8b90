//! PDF backend: paints every formatted page into a display list and writes
//! the lists out with `pdf-writer`.

mod fonts;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use pdf_writer::types::{ActionType, AnnotationType};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::{Error, Result};
use crate::fonts::FontLibrary;
use crate::graphics::{DrawOp, LinkTarget, Pen, RecordingCanvas};
use crate::images::ImageSource;
use crate::layout::Rectangle;
use crate::model::{Color, DashStyle, Font};
use crate::renderer::{DocumentRenderer, RenderOptions};
use fonts::{FontEntry, FontKey, font_key, register_font};

struct PageOps {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

/// Link annotation in PDF user space.
struct PendingLink {
    rect: Rect,
    target: LinkTarget,
}

/// Writes a prepared document as PDF bytes. Fonts are resolved through
/// `library`; image pixels come from the renderer's image source.
pub fn write_pdf(renderer: &DocumentRenderer<'_>, library: &FontLibrary) -> Result<Vec<u8>> {
    let t0 = Instant::now();
    let count = renderer.page_count()?;
    if count == 0 {
        return Err(Error::Pdf("document has no pages".into()));
    }

    let mut pages = Vec::with_capacity(count);
    for page in 1..=count {
        let info = renderer.page_info(page)?;
        let mut canvas = RecordingCanvas::new();
        renderer.render_page(page, &mut canvas, RenderOptions::default())?;
        pages.push(PageOps {
            width: info.width,
            height: info.height,
            ops: canvas.ops,
        });
    }
    let t_paint = t0.elapsed();

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: fonts, subset to the characters actually painted
    let mut font_order: Vec<FontKey> = Vec::new();
    let mut used_chars: HashMap<FontKey, (Font, HashSet<char>)> = HashMap::new();
    for op in pages.iter().flat_map(|p| &p.ops) {
        if let DrawOp::Text { text, font, .. } = op {
            let key = font_key(font);
            let entry = used_chars.entry(key.clone()).or_insert_with(|| {
                font_order.push(key);
                (font.clone(), HashSet::new())
            });
            entry.1.extend(text.chars());
        }
    }
    let mut seen_fonts: HashMap<FontKey, FontEntry> = HashMap::new();
    for (i, key) in font_order.iter().enumerate() {
        let (font, chars) = &used_chars[key];
        let entry = register_font(&mut pdf, font, library, format!("F{}", i + 1), &mut alloc, chars);
        seen_fonts.insert(key.clone(), entry);
    }
    let t_fonts = t0.elapsed();

    // Phase 2: images, one XObject per distinct source
    let mut image_xobjects: HashMap<&str, (String, Ref)> = HashMap::new();
    for op in pages.iter().flat_map(|p| &p.ops) {
        if let DrawOp::Image { source, .. } = op
            && !image_xobjects.contains_key(source.as_str())
        {
            let pdf_name = format!("Im{}", image_xobjects.len() + 1);
            match embed_image(&mut pdf, &mut alloc, renderer.images(), source) {
                Some(xobj_ref) => {
                    image_xobjects.insert(source.as_str(), (pdf_name, xobj_ref));
                }
                None => log::warn!("Image {source} could not be embedded, leaving its box empty"),
            }
        }
    }
    let t_images = t0.elapsed();

    // Phase 3: page objects, content streams and annotations
    let page_ids: Vec<Ref> = (0..count).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..count).map(|_| alloc()).collect();

    let font_pairs: Vec<(String, Ref)> = font_order
        .iter()
        .map(|key| (seen_fonts[key].pdf_name.clone(), seen_fonts[key].font_ref))
        .collect();

    for (i, page) in pages.iter().enumerate() {
        let mut content = Content::new();
        let mut links = Vec::new();
        for op in &page.ops {
            write_op(&mut content, op, page.height, &seen_fonts, &image_xobjects, &mut links);
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);

        let mut annot_refs = Vec::with_capacity(links.len());
        for link in &links {
            let destination = match &link.target {
                LinkTarget::Url(_) => None,
                LinkTarget::Bookmark(name) => match renderer.bookmark_physical_page(name)? {
                    Some(physical) => Some(physical),
                    None => {
                        log::warn!("Link to unknown bookmark {name} dropped");
                        continue;
                    }
                },
            };
            let annot_ref = alloc();
            let mut annot = pdf.annotation(annot_ref);
            annot
                .subtype(AnnotationType::Link)
                .rect(link.rect)
                .border(0.0, 0.0, 0.0, None);
            match (&link.target, destination) {
                (LinkTarget::Url(url), _) => {
                    annot
                        .action()
                        .action_type(ActionType::Uri)
                        .uri(Str(url.as_bytes()));
                }
                (LinkTarget::Bookmark(_), Some(physical)) => {
                    let target_height = pages[physical - 1].height;
                    annot
                        .action()
                        .action_type(ActionType::GoTo)
                        .destination()
                        .page(page_ids[physical - 1])
                        .xyz(0.0, target_height, None);
                }
                (LinkTarget::Bookmark(_), None) => {}
            }
            annot_refs.push(annot_ref);
        }

        let mut pdf_page = pdf.page(page_ids[i]);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page.width, page.height))
            .parent(pages_id)
            .contents(content_ids[i]);
        if !annot_refs.is_empty() {
            pdf_page.annotations(annot_refs.iter().copied());
        }
        let mut resources = pdf_page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in image_xobjects.values() {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(count as i32);

    let info_id = alloc();
    let doc_info = &renderer.document().info;
    {
        let mut info = pdf.document_info(info_id);
        if !doc_info.title.is_empty() {
            info.title(TextStr(&doc_info.title));
        }
        if !doc_info.author.is_empty() {
            info.author(TextStr(&doc_info.author));
        }
        if !doc_info.subject.is_empty() {
            info.subject(TextStr(&doc_info.subject));
        }
        info.producer(TextStr("flowpage"));
    }
    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: paint={:.1}ms, font_embed={:.1}ms, images={:.1}ms, assembly={:.1}ms ({} pages)",
        t_paint.as_secs_f64() * 1000.0,
        (t_fonts - t_paint).as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_images).as_secs_f64() * 1000.0,
        count,
    );

    Ok(pdf.finish())
}

/// Writes an image XObject. JPEGs in RGB are passed through; everything else
/// is decoded and stored as deflated RGB with an optional alpha soft mask.
fn embed_image(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    images: &dyn ImageSource,
    source: &str,
) -> Option<Ref> {
    let decoded = match images.decode(source) {
        Ok(decoded) => decoded,
        Err(failure) => {
            log::warn!("{}: {source}", failure.message());
            return None;
        }
    };
    let xobj_ref = alloc();
    let (w, h) = (decoded.width() as i32, decoded.height() as i32);

    if decoded.color() == image::ColorType::Rgb8
        && let Some(jpeg) = images.jpeg_bytes(source)
    {
        let mut xobj = pdf.image_xobject(xobj_ref, &jpeg);
        xobj.filter(Filter::DctDecode);
        xobj.width(w);
        xobj.height(h);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        return Some(xobj_ref);
    }

    let rgba = decoded.to_rgba8();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
    let rgb_data: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

    let smask_ref = if has_alpha {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(w);
        mask.height(h);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        Some(mask_ref)
    } else {
        None
    };

    let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w);
    xobj.height(h);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    Some(xobj_ref)
}

/// Rectangle in PDF user space (origin bottom-left).
fn flip(rect: Rectangle, page_height: f32) -> (f32, f32, f32, f32) {
    (rect.x, page_height - rect.bottom(), rect.width, rect.height)
}

fn set_pen(content: &mut Content, pen: &Pen) {
    let [r, g, b] = pen.color.components();
    content.set_stroke_rgb(r, g, b);
    content.set_line_width(pen.width);
    let w = pen.width.max(0.5);
    match pen.dash {
        DashStyle::Solid => {}
        DashStyle::Dash => {
            content.set_dash_pattern([3.0 * w, 3.0 * w], 0.0);
        }
        DashStyle::Dot => {
            content.set_dash_pattern([w, w], 0.0);
        }
        DashStyle::DashDot => {
            content.set_dash_pattern([3.0 * w, w, w, w], 0.0);
        }
    }
}

fn set_fill(content: &mut Content, color: Color) {
    let [r, g, b] = color.components();
    content.set_fill_rgb(r, g, b);
}

/// Cubic Bézier segments approximating a circular arc in PDF user space.
/// Returns the start point and one `[x1, y1, x2, y2, x3, y3]` per segment of
/// at most 90 degrees. Angles are counter-clockwise from 3 o'clock.
fn arc_segments(cx: f32, cy: f32, radius: f32, start_deg: f32, sweep_deg: f32) -> ((f32, f32), Vec<[f32; 6]>) {
    let point = |a: f32| (cx + radius * a.cos(), cy + radius * a.sin());
    let start = start_deg.to_radians();
    let n = (sweep_deg.abs() / 90.0).ceil().max(1.0) as usize;
    let step = sweep_deg.to_radians() / n as f32;
    let k = 4.0 / 3.0 * (step / 4.0).tan() * radius;

    let mut segments = Vec::with_capacity(n);
    let mut a0 = start;
    for _ in 0..n {
        let a1 = a0 + step;
        let (x0, y0) = point(a0);
        let (x3, y3) = point(a1);
        segments.push([
            x0 - k * a0.sin(),
            y0 + k * a0.cos(),
            x3 + k * a1.sin(),
            y3 - k * a1.cos(),
            x3,
            y3,
        ]);
        a0 = a1;
    }
    (point(start), segments)
}

fn write_op(
    content: &mut Content,
    op: &DrawOp,
    height: f32,
    fonts: &HashMap<FontKey, FontEntry>,
    images: &HashMap<&str, (String, Ref)>,
    links: &mut Vec<PendingLink>,
) {
    match op {
        DrawOp::FillRect { rect, color } => {
            let (x, y, w, h) = flip(*rect, height);
            content.save_state();
            set_fill(content, *color);
            content.rect(x, y, w, h).fill_nonzero();
            content.restore_state();
        }
        DrawOp::StrokeRect { rect, pen } => {
            let (x, y, w, h) = flip(*rect, height);
            content.save_state();
            set_pen(content, pen);
            content.rect(x, y, w, h).stroke();
            content.restore_state();
        }
        DrawOp::Line { x1, y1, x2, y2, pen } => {
            content.save_state();
            set_pen(content, pen);
            content.move_to(*x1, height - y1);
            content.line_to(*x2, height - y2);
            content.stroke();
            content.restore_state();
        }
        DrawOp::Arc {
            cx,
            cy,
            radius,
            start_deg,
            sweep_deg,
            pen,
            fill,
        } => {
            let (cx, cy) = (*cx, height - cy);
            let ((sx, sy), segments) = arc_segments(cx, cy, *radius, *start_deg, *sweep_deg);
            content.save_state();
            // A filled arc is a pie wedge through the centre.
            if fill.is_some() {
                content.move_to(cx, cy);
                content.line_to(sx, sy);
            } else {
                content.move_to(sx, sy);
            }
            for [x1, y1, x2, y2, x3, y3] in segments {
                content.cubic_to(x1, y1, x2, y2, x3, y3);
            }
            if let Some(pen) = pen {
                set_pen(content, pen);
            }
            match (fill, pen) {
                (Some(color), Some(_)) => {
                    set_fill(content, *color);
                    content.close_path();
                    content.fill_nonzero_and_stroke();
                }
                (Some(color), None) => {
                    set_fill(content, *color);
                    content.close_path();
                    content.fill_nonzero();
                }
                (None, Some(_)) => {
                    content.stroke();
                }
                (None, None) => {
                    content.end_path();
                }
            }
            content.restore_state();
        }
        DrawOp::Text {
            text,
            font,
            x,
            baseline,
        } => {
            let Some(entry) = fonts.get(&font_key(font)) else {
                return;
            };
            let encoded = entry.encode(text);
            content.save_state();
            set_fill(content, font.color);
            content
                .begin_text()
                .set_font(Name(entry.pdf_name.as_bytes()), font.effective_size())
                .next_line(*x, height - baseline)
                .show(Str(&encoded))
                .end_text();
            content.restore_state();
        }
        DrawOp::Image { source, rect } => {
            let Some((name, _)) = images.get(source.as_str()) else {
                return;
            };
            let (x, y, w, h) = flip(*rect, height);
            content.save_state();
            content.transform([w, 0.0, 0.0, h, x, y]);
            content.x_object(Name(name.as_bytes()));
            content.restore_state();
        }
        DrawOp::Link { rect, target } => {
            let (x, y, w, h) = flip(*rect, height);
            links.push(PendingLink {
                rect: Rect::new(x, y, x + w, y + h),
                target: target.clone(),
            });
        }
    }
}
