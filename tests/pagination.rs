mod common;

use common::{doc, lines_per_page, narrow_doc, page_setup, para, para_with, prepare, words};
use flowpage::layout::FormatInfo;
use flowpage::{CancellationToken, Document, DocumentRenderer, Error, LayoutConfig};
use serde_json::json;

#[test]
fn lines_fill_the_page_without_widow_control() {
    let document = narrow_doc(vec![para_with(&words(5), json!({ "widow_control": false }))]);
    let renderer = prepare(&document);
    // 50pt holds four 12pt lines
    assert_eq!(lines_per_page(&renderer), vec![vec![4], vec![1]]);
}

#[test]
fn widow_control_moves_a_line_along() {
    let document = narrow_doc(vec![para(&words(5))]);
    let renderer = prepare(&document);
    assert_eq!(lines_per_page(&renderer), vec![vec![3], vec![2]]);

    let pages = &renderer.formatted().unwrap().pages;
    let second = &pages[1].content[0];
    assert!(!second.format.is_starting());
    assert!(second.format.is_ending());
    assert_eq!(second.layout.content_area.y, 25.0);
}

/// Leaf ranges of every line of the element at `index`, across all pages,
/// plus the element's leaf count.
fn line_ranges(
    renderer: &DocumentRenderer<'_>,
    document: &Document,
    index: usize,
) -> (Vec<(usize, usize)>, usize) {
    let element = &document.sections[0].elements[index];
    let mut ranges = Vec::new();
    let mut leaves = 0;
    for page in &renderer.formatted().unwrap().pages {
        for info in page.content.iter().filter(|i| std::ptr::eq(i.element, element)) {
            if let FormatInfo::Paragraph(p) = &info.format {
                leaves = p.arena.len();
                ranges.extend(p.lines.iter().map(|l| (l.start, l.end)));
            }
        }
    }
    (ranges, leaves)
}

fn assert_covered_once(ranges: &[(usize, usize)], leaves: usize) {
    assert_eq!(ranges.first().map(|r| r.0), Some(0), "{ranges:?}");
    assert!(ranges.iter().all(|r| r.0 < r.1), "{ranges:?}");
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "{ranges:?}");
    }
    assert_eq!(ranges.last().map(|r| r.1), Some(leaves), "{ranges:?}");
}

#[test]
fn split_paragraph_covers_its_content_once() {
    let document = narrow_doc(vec![para(&words(9))]);
    let renderer = prepare(&document);
    // the third page would hold a single widow line, so page two gives one up
    assert_eq!(lines_per_page(&renderer), vec![vec![4], vec![3], vec![2]]);

    let (ranges, leaves) = line_ranges(&renderer, &document, 0);
    assert_eq!(ranges.len(), 9);
    assert_covered_once(&ranges, leaves);
}

#[test]
fn reopened_ending_still_covers_the_paragraph_once() {
    let document = narrow_doc(vec![
        para_with(&words(4), json!({ "keep_with_next": true })),
        para(&words(1)),
    ]);
    let renderer = prepare(&document);
    // the last two lines move on with the following paragraph
    assert_eq!(lines_per_page(&renderer), vec![vec![2], vec![2, 1]]);

    let (ranges, leaves) = line_ranges(&renderer, &document, 0);
    assert_eq!(ranges.len(), 4);
    assert_covered_once(&ranges, leaves);
}

#[test]
fn orphan_moves_the_whole_paragraph() {
    let document = narrow_doc(vec![para(&words(3)), para(&words(3))]);
    let renderer = prepare(&document);
    // only one line of the second paragraph would fit after the first
    assert_eq!(lines_per_page(&renderer), vec![vec![3], vec![3]]);
}

#[test]
fn keep_together_moves_the_paragraph() {
    let document = narrow_doc(vec![
        para(&words(2)),
        para_with(&words(3), json!({ "keep_together": true, "widow_control": false })),
    ]);
    let renderer = prepare(&document);
    assert_eq!(lines_per_page(&renderer), vec![vec![2], vec![3]]);
}

#[test]
fn keep_with_next_pulls_the_paragraph_onto_the_next_page() {
    let document = narrow_doc(vec![
        para(&words(1)),
        para_with(&words(3), json!({ "keep_with_next": true })),
        para(&words(1)),
    ]);
    let renderer = prepare(&document);
    assert_eq!(lines_per_page(&renderer), vec![vec![1], vec![3, 1]]);
}

#[test]
fn vertical_margins_collapse() {
    let spaced = |after: f32, before: f32| {
        doc(json!({
            "sections": [{
                "page_setup": page_setup(10.0, 100.0, 200.0),
                "elements": [
                    para_with("x", json!({ "space_after": after })),
                    para_with("y", json!({ "space_before": before })),
                ]
            }]
        }))
    };

    let document = spaced(10.0, 6.0);
    let renderer = prepare(&document);
    let content = &renderer.page(1).unwrap().content;
    assert_eq!(content[1].layout.content_area.y, 25.0 + 12.0 + 10.0);

    let document = spaced(-4.0, 6.0);
    let renderer = prepare(&document);
    let content = &renderer.page(1).unwrap().content;
    assert_eq!(content[1].layout.content_area.y, 25.0 + 12.0 + 2.0);
}

#[test]
fn space_before_applies_only_on_the_first_page() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 200.0),
            "elements": [
                para_with("first", json!({ "space_before": 5.0 })),
                { "type": "page_break" },
                para_with("second", json!({ "space_before": 5.0 })),
            ]
        }]
    }));
    let renderer = prepare(&document);
    assert_eq!(renderer.page_count().unwrap(), 2);
    assert_eq!(renderer.page(1).unwrap().content[0].layout.content_area.y, 30.0);
    assert_eq!(renderer.page(2).unwrap().content[0].layout.content_area.y, 25.0);
}

#[test]
fn page_break_before_at_top_adds_no_page() {
    let document = doc(json!({
        "sections": [{
            "page_setup": page_setup(10.0, 100.0, 200.0),
            "elements": [
                para_with("a", json!({ "page_break_before": true })),
                para_with("b", json!({ "page_break_before": true })),
            ]
        }]
    }));
    let renderer = prepare(&document);
    assert_eq!(lines_per_page(&renderer), vec![vec![1], vec![1]]);
}

#[test]
fn empty_section_still_gets_a_page() {
    let document = doc(json!({ "sections": [{}] }));
    let renderer = prepare(&document);
    assert_eq!(renderer.page_count().unwrap(), 1);
    assert!(renderer.page(1).unwrap().content.is_empty());
}

#[test]
fn odd_section_start_inserts_an_empty_page() {
    let document = doc(json!({
        "sections": [
            {
                "page_setup": page_setup(10.0, 100.0, 200.0),
                "elements": [para("one"), { "type": "page_break" }, para("two")]
            },
            {
                "page_setup": {
                    "page_width": 120.0, "page_height": 250.0,
                    "top_margin": 25.0, "bottom_margin": 25.0,
                    "left_margin": 10.0, "right_margin": 10.0,
                    "section_start": "odd_page"
                },
                "elements": [para("three")]
            }
        ]
    }));
    let renderer = prepare(&document);
    let pages = &renderer.formatted().unwrap().pages;
    assert_eq!(pages.len(), 4);

    let empty = &pages[2];
    assert!(empty.empty);
    assert!(empty.content.is_empty() && empty.header.is_empty());
    assert_eq!(empty.section, 1);

    let content = &pages[3];
    assert!(!content.empty);
    assert_eq!(content.field_infos.section, 2);
    assert_eq!(content.field_infos.physical_page, 4);
    assert_eq!(common::paragraph_lines(content), vec![1]);
    assert!(pages.iter().all(|p| p.field_infos.num_pages == 4));
    assert_eq!(pages[0].field_infos.section_pages, 2);
}

#[test]
fn starting_number_restarts_shown_pages() {
    let document = doc(json!({
        "sections": [
            { "elements": [para("intro")] },
            {
                "page_setup": { "starting_number": 1 },
                "elements": [para("body"), { "type": "page_break" }, para("more")]
            }
        ]
    }));
    let renderer = prepare(&document);
    let shown: Vec<u32> = renderer
        .formatted()
        .unwrap()
        .pages
        .iter()
        .map(|p| p.field_infos.shown_page)
        .collect();
    assert_eq!(shown, vec![1, 1, 2]);
}

#[test]
fn landscape_swaps_page_size() {
    let document = doc(json!({
        "sections": [{ "page_setup": { "orientation": "landscape" }, "elements": [para("wide")] }]
    }));
    let renderer = prepare(&document);
    let info = renderer.page_info(1).unwrap();
    assert!(info.width > info.height);
    assert_eq!(info.width, 841.89);
}

#[test]
fn repeated_preparation_gives_the_same_layout() {
    let document = narrow_doc(vec![
        para(&words(5)),
        para_with(&words(2), json!({ "keep_with_next": true })),
        para(&words(4)),
    ]);
    let mut renderer = DocumentRenderer::new(&document, &common::Fixed, &common::FailingImages);
    renderer.prepare_document().unwrap();
    let snapshot = |r: &DocumentRenderer<'_>| -> Vec<Vec<(usize, f32, f32)>> {
        r.formatted()
            .unwrap()
            .pages
            .iter()
            .map(|p| {
                let lines = common::paragraph_lines(p);
                p.content
                    .iter()
                    .zip(lines)
                    .map(|(info, n)| (n, info.layout.content_area.y, info.layout.content_area.height))
                    .collect()
            })
            .collect()
    };
    let first = snapshot(&renderer);
    renderer.prepare_document().unwrap();
    assert_eq!(snapshot(&renderer), first);
}

#[test]
fn cancelled_pass_reports_cancellation() {
    let document = narrow_doc(vec![para(&words(8))]);
    let token = CancellationToken::new();
    token.cancel();
    let config = LayoutConfig::default().with_cancellation(token);
    let mut renderer =
        DocumentRenderer::with_config(&document, &common::Fixed, &common::FailingImages, config);
    let err = renderer.prepare_document().unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!renderer.is_prepared());
}

#[test]
fn zero_size_page_is_a_configuration_error() {
    let document = doc(json!({
        "sections": [{ "page_setup": { "page_width": 0.0 }, "elements": [para("x")] }]
    }));
    let mut renderer = DocumentRenderer::new(&document, &common::Fixed, &common::FailingImages);
    let err = renderer.prepare_document().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn unprepared_renderer_refuses_page_queries() {
    let document = narrow_doc(vec![para("x")]);
    let renderer = DocumentRenderer::new(&document, &common::Fixed, &common::FailingImages);
    assert!(matches!(renderer.page_count(), Err(Error::NotPrepared)));
    assert!(matches!(renderer.page_info(1), Err(Error::NotPrepared)));
}
