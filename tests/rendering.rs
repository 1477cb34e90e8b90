mod common;

use common::{FailingImages, SizedImages, doc, page_setup, para, para_with, prepare, prepare_with};
use flowpage::model::Color;
use flowpage::{DrawOp, LayoutConfig, LinkTarget, RecordingCanvas, RenderOptions};
use rayon::prelude::*;
use serde_json::json;

fn render(renderer: &flowpage::DocumentRenderer<'_>, page: usize, options: RenderOptions) -> RecordingCanvas {
    let mut canvas = RecordingCanvas::new();
    renderer.render_page(page, &mut canvas, options).unwrap();
    canvas
}

#[test]
fn justified_line_spreads_its_gaps() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 50.0, 200.0),
            "elements": [para_with(
                "aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddddddddddddd",
                json!({ "alignment": "justify" })
            )]
        }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let texts: Vec<_> = canvas.texts().collect();

    // three 10-wide words in a 50-wide line leave two gaps of 10
    let xs: Vec<f32> = texts.iter().map(|t| t.1).collect();
    assert_eq!(&xs[..3], &[10.0, 30.0, 50.0]);
    assert_eq!(texts[3].0, "dddddddddddddddddddd");
    assert_eq!(xs[3], 10.0);
    assert_eq!(texts[3].2 - texts[0].2, 12.0);
}

#[test]
fn centered_and_right_aligned_lines() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 50.0, 200.0),
            "elements": [
                para_with("abcd", json!({ "alignment": "center" })),
                para_with("abcd", json!({ "alignment": "right" })),
            ]
        }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let xs: Vec<f32> = canvas.texts().map(|t| t.1).collect();
    assert_eq!(xs, vec![33.0, 56.0]);
}

#[test]
fn missing_image_keeps_its_space_and_paints_a_placeholder() {
    let document = doc(json!({
        "sections": [{ "elements": [
            { "type": "image", "source": "missing.png" },
            para("after")
        ] }]
    }));
    let renderer = prepare_with(&document, &FailingImages, LayoutConfig::default());
    let page = renderer.page(1).unwrap();
    let image = &page.content[0].layout.content_area;
    assert!((image.width - 70.866).abs() < 1e-3);
    assert!((image.height - 70.866).abs() < 1e-3);
    assert!((page.content[1].layout.content_area.y - image.bottom()).abs() < 1e-3);

    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let frame = canvas.ops.iter().find_map(|op| match op {
        DrawOp::StrokeRect { rect, .. } => Some(*rect),
        _ => None,
    });
    assert_eq!(frame, Some(*image));
    let label = canvas.ops.iter().find_map(|op| match op {
        DrawOp::Text { text, font, .. } if text == "Image not found" => Some(font.color),
        _ => None,
    });
    assert_eq!(label, Some(Color::RED));
    assert!(!canvas.ops.iter().any(|op| matches!(op, DrawOp::Image { .. })));
}

#[test]
fn image_size_follows_pixels_and_aspect_ratio() {
    let document = doc(json!({
        "sections": [{ "elements": [
            { "type": "image", "source": "wide.png" },
            { "type": "image", "source": "wide.png", "width": 72.0 }
        ] }]
    }));
    let images = SizedImages {
        width_px: 144,
        height_px: 72,
    };
    let renderer = prepare_with(&document, &images, LayoutConfig::default());
    let page = renderer.page(1).unwrap();
    let natural = page.content[0].layout.content_area;
    let scaled = page.content[1].layout.content_area;
    assert_eq!((natural.width, natural.height), (144.0, 72.0));
    assert_eq!((scaled.width, scaled.height), (72.0, 36.0));

    let canvas = render(&renderer, 1, RenderOptions::default());
    let drawn = canvas
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Image { source, .. } if source == "wide.png"))
        .count();
    assert_eq!(drawn, 2);
}

#[test]
fn footer_fields_show_page_numbers() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 100.0),
            "footers": { "primary": { "elements": [{
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Page " },
                    { "type": "field", "kind": "page" },
                    { "type": "text", "text": " of " },
                    { "type": "field", "kind": "num_pages" }
                ]
            }] } },
            "elements": [
                para("one"), { "type": "page_break" },
                para("two"), { "type": "page_break" },
                para("three")
            ]
        }]
    }));
    let renderer = prepare(&document);
    assert_eq!(renderer.page_count().unwrap(), 3);

    let footer_only = RenderOptions {
        header: false,
        content: false,
        footer: true,
    };
    for page in 1..=3 {
        let canvas = render(&renderer, page, footer_only);
        assert_eq!(canvas.text_content(), format!("Page {page} of 3"));
    }

    // footer sits on footer_distance, content stops above it
    let page = renderer.page(1).unwrap();
    let footer = &page.footer[0].layout.content_area;
    assert_eq!(footer.bottom(), 140.0);
    assert!(page.content_rect.bottom() <= footer.y);
}

#[test]
fn first_page_header_differs() {
    let document = doc(json!({
        "sections": [{
            "page_setup": { "different_first_page_header_footer": true },
            "headers": {
                "primary": { "elements": [para("Running")] },
                "first_page": { "elements": [para("Cover")] }
            },
            "elements": [para("one"), { "type": "page_break" }, para("two")]
        }]
    }));
    let renderer = prepare(&document);
    let header_only = RenderOptions {
        header: true,
        content: false,
        footer: false,
    };
    assert_eq!(render(&renderer, 1, header_only).text_content(), "Cover");
    assert_eq!(render(&renderer, 2, header_only).text_content(), "Running");
}

#[test]
fn header_lists_do_not_advance_body_numbering() {
    let item = |text: &str| para_with(text, json!({ "list_info": { "list_type": "number_list1" } }));
    let document = doc(json!({
        "sections": [{
            "headers": { "primary": { "elements": [item("h")] } },
            "elements": [item("a"), { "type": "page_break" }, item("b")]
        }]
    }));
    let renderer = prepare(&document);
    let content = RenderOptions::content_only();
    assert_eq!(render(&renderer, 1, content).text_content(), "1. a");
    assert_eq!(render(&renderer, 2, content).text_content(), "2. b");

    let header_only = RenderOptions {
        header: true,
        content: false,
        footer: false,
    };
    assert_eq!(render(&renderer, 2, header_only).text_content(), "1. h");
}

#[test]
fn page_reference_resolves_to_the_bookmark_page() {
    let document = doc(json!({
        "sections": [{ "elements": [
            { "type": "paragraph", "content": [
                { "type": "text", "text": "see page " },
                { "type": "field", "kind": "page_ref", "name": "target" }
            ] },
            { "type": "page_break" },
            { "type": "paragraph", "content": [
                { "type": "bookmark", "name": "target" },
                { "type": "text", "text": "here" }
            ] }
        ] }]
    }));
    let renderer = prepare(&document);
    assert_eq!(renderer.bookmark_physical_page("target").unwrap(), Some(2));
    assert_eq!(renderer.bookmark_shown_page("target").unwrap(), Some(2));
    assert_eq!(renderer.bookmark_physical_page("nowhere").unwrap(), None);

    let canvas = render(&renderer, 1, RenderOptions::content_only());
    assert_eq!(canvas.text_content(), "see page 2");
}

#[test]
fn hyperlink_becomes_a_link_rect() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 100.0),
            "elements": [{ "type": "paragraph", "content": [
                { "type": "text", "text": "go " },
                { "type": "hyperlink", "target": "https://example.com", "content": [
                    { "type": "text", "text": "there" }
                ] }
            ] }]
        }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let links: Vec<_> = canvas
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Link { rect, target } => Some((*rect, target.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].0.x, 13.0);
    assert_eq!(links[0].0.width, 5.0);
    assert_eq!(links[0].1, LinkTarget::Url("https://example.com".into()));
}

#[test]
fn hyperlink_without_target_is_rejected() {
    let document = doc(json!({
        "sections": [{ "elements": [{ "type": "paragraph", "content": [
            { "type": "hyperlink", "content": [{ "type": "text", "text": "dangling" }] }
        ] }] }]
    }));
    let mut renderer =
        flowpage::DocumentRenderer::new(&document, &common::Fixed, &common::FailingImages);
    let err = renderer.prepare_document().unwrap_err();
    assert!(matches!(err, flowpage::Error::Configuration(_)), "{err}");
}

#[test]
fn tab_leader_fills_up_to_the_stop() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 100.0),
            "elements": [{
                "type": "paragraph",
                "format": { "tab_stops": [{ "position": 20.0, "leader": "dots" }] },
                "content": [
                    { "type": "text", "text": "ab" },
                    { "type": "tab" },
                    { "type": "text", "text": "cd" }
                ]
            }]
        }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let texts: Vec<_> = canvas.texts().collect();
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[1].0, ".".repeat(18));
    assert_eq!(texts[2].0, "cd");
    assert_eq!(texts[2].1, 30.0);
}

#[test]
fn text_frame_paints_its_content_inside() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 100.0),
            "elements": [{
                "type": "text_frame",
                "width": 60.0,
                "height": 40.0,
                "margin_left": 5.0,
                "margin_top": 5.0,
                "fill": { "r": 230, "g": 230, "b": 230 },
                "elements": [para("inside")]
            }]
        }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    assert!(matches!(canvas.ops.first(), Some(DrawOp::FillRect { .. })));
    let (text, x, baseline) = canvas.texts().next().unwrap();
    assert_eq!(text, "inside");
    assert_eq!(x, 15.0);
    // frame top 25, margin 5, ascent 8
    assert_eq!(baseline, 38.0);
}

#[test]
fn pie_chart_paints_filled_wedges() {
    let document = doc(json!({
        "sections": [{ "elements": [{
            "type": "chart",
            "kind": "pie",
            "width": 120.0,
            "height": 120.0,
            "series": [{ "name": "share", "values": [1.0, 1.0, 2.0] }]
        }] }]
    }));
    let renderer = prepare(&document);
    let canvas = render(&renderer, 1, RenderOptions::content_only());
    let sweeps: Vec<f32> = canvas
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Arc { sweep_deg, fill: Some(_), .. } => Some(*sweep_deg),
            _ => None,
        })
        .collect();
    assert_eq!(sweeps, vec![-90.0, -90.0, -180.0]);
}

#[test]
fn objects_on_a_page_are_listed_once() {
    let document = common::narrow_doc(vec![para(&common::words(5)), para("tail")]);
    let renderer = prepare(&document);
    assert_eq!(renderer.document_objects_from_page(1).unwrap().len(), 1);
    // the continued paragraph and the short one
    assert_eq!(renderer.document_objects_from_page(2).unwrap().len(), 2);
    assert!(matches!(
        renderer.document_objects_from_page(9),
        Err(flowpage::Error::PageOutOfRange(9))
    ));
}

#[test]
fn pages_render_the_same_in_parallel() {
    let elements: Vec<_> = (0..40).map(|i| para(&format!("paragraph number {i}"))).collect();
    let document = doc(json!({
        "sections": [{ "page_setup": page_setup(10.0, 100.0, 100.0), "elements": elements }]
    }));
    let renderer = prepare(&document);
    let count = renderer.page_count().unwrap();
    assert!(count > 3);

    let sequential: Vec<Vec<DrawOp>> = (1..=count)
        .map(|p| render(&renderer, p, RenderOptions::default()).ops)
        .collect();
    let parallel: Vec<Vec<DrawOp>> = (1..=count)
        .into_par_iter()
        .map(|p| render(&renderer, p, RenderOptions::default()).ops)
        .collect();
    assert_eq!(sequential, parallel);
}
