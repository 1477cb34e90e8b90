//! Draws lines whose breaks were decided by the measurer.

use crate::graphics::{Canvas, LinkTarget, Pen};
use crate::layout::area::Rectangle;
use crate::layout::info::RenderInfo;
use crate::layout::renderer::PaintContext;
use crate::layout::shape::paint_image_placeholder;
use crate::model::{Block, Border, Font, HyperlinkKind, ParagraphAlignment, ParagraphFormat};

use super::iter::{InlineArena, Leaf, NodeKind};
use super::{FieldText, Geometry, LeafMeasure, LineInfo, ParagraphFormatInfo};

/// Link rectangle grown over consecutive leaves of one hyperlink.
struct LinkSpan {
    node: usize,
    rect: Rectangle,
}

#[derive(Default)]
struct LinkTracker {
    open: Option<LinkSpan>,
    finished: Vec<(Rectangle, LinkTarget)>,
}

impl LinkTracker {
    fn extend(&mut self, arena: &InlineArena<'_>, link: Option<usize>, rect: Rectangle) {
        match (&mut self.open, link) {
            (Some(span), Some(node)) if span.node == node => {
                span.rect = span.rect.unite(&rect);
            }
            (_, Some(node)) => {
                self.close(arena);
                self.open = Some(LinkSpan { node, rect });
            }
            (_, None) => self.close(arena),
        }
    }

    fn close(&mut self, arena: &InlineArena<'_>) {
        let Some(span) = self.open.take() else {
            return;
        };
        if let NodeKind::Hyperlink { target, kind } = arena.node(span.node).kind {
            let target = match kind {
                HyperlinkKind::Url => LinkTarget::Url(target.to_string()),
                HyperlinkKind::Bookmark => LinkTarget::Bookmark(target.to_string()),
            };
            self.finished.push((span.rect, target));
        }
    }
}

pub fn paint_paragraph(
    info: &RenderInfo<'_>,
    p: &ParagraphFormatInfo<'_>,
    pctx: &PaintContext<'_>,
    canvas: &mut dyn Canvas,
) {
    let Block::Paragraph(paragraph) = info.element else {
        return;
    };
    let format = &paragraph.format;
    let area = info.layout.content_area;
    if p.lines.is_empty() {
        return;
    }

    paint_decoration(format, area, p, canvas);

    let painter = LinePainter {
        leaves: LeafMeasure {
            arena: &p.arena,
            env: pctx.text_env(),
        },
        fields: FieldText::Resolved {
            infos: pctx.field_infos,
            bookmarks: pctx.bookmarks,
        },
        format,
        area,
    };

    if let (Some(symbol), Some(first)) = (&p.list_symbol, p.lines.first())
        && first.is_first_line
    {
        let geometry = Geometry::new(format, area.width);
        let number_position = format.list_info.as_ref().map_or(0.0, |l| l.number_position);
        canvas.draw_string(
            &symbol.text,
            &symbol.font,
            area.x + geometry.first_line_left + number_position,
            area.y + first.baseline(),
        );
    }

    let mut links = LinkTracker::default();
    for line in &p.lines {
        painter.paint_line(line, p.is_last_line(line), &mut links, canvas);
        links.close(&p.arena);
    }
    for (rect, target) in &links.finished {
        canvas.link(*rect, target);
    }
}

/// Shading behind the fragment and its borders. Top and bottom borders only
/// appear on the fragments that start and end the paragraph.
fn paint_decoration(format: &ParagraphFormat, area: Rectangle, p: &ParagraphFormatInfo<'_>, canvas: &mut dyn Canvas) {
    let left = area.x + format.left_indent;
    let right = area.x + area.width - format.right_indent;
    let rect = Rectangle::new(left, area.y, right - left, area.height);
    if let Some(color) = format.shading {
        canvas.fill_rect(rect, color);
    }
    let borders = &format.borders;
    let visible = |b: &Option<Border>| b.filter(|b| b.visible && b.width > 0.0);
    if p.top_padding > 0.0
        && let Some(b) = visible(&borders.top)
    {
        let y = rect.y + b.width / 2.0;
        canvas.line(left, y, right, y, &Pen::from(&b));
    }
    if p.bottom_padding > 0.0
        && let Some(b) = visible(&borders.bottom)
    {
        let y = rect.bottom() - b.width / 2.0;
        canvas.line(left, y, right, y, &Pen::from(&b));
    }
    if let Some(b) = visible(&borders.left) {
        let x = left + b.width / 2.0;
        canvas.line(x, rect.y, x, rect.bottom(), &Pen::from(&b));
    }
    if let Some(b) = visible(&borders.right) {
        let x = right - b.width / 2.0;
        canvas.line(x, rect.y, x, rect.bottom(), &Pen::from(&b));
    }
}

struct LinePainter<'a, 'd> {
    leaves: LeafMeasure<'a, 'd>,
    fields: FieldText<'a>,
    format: &'a ParagraphFormat,
    area: Rectangle,
}

impl LinePainter<'_, '_> {
    /// Right end of the content once fields show their final text.
    fn resolved_end_x(&self, line: &LineInfo) -> f32 {
        if !line.reformat {
            return line.end_x;
        }
        let from = line.last_tab.map_or(line.start, |t| t + 1);
        let delta: f32 = (from..line.end)
            .filter(|pos| matches!(self.leaves.arena.leaf(*pos), Leaf::Field(_)))
            .map(|pos| {
                self.leaves.content_width(pos, self.fields)
                    - self.leaves.content_width(pos, FieldText::Measuring)
            })
            .sum();
        line.end_x + delta
    }

    /// Last leaf on the line that draws something; blanks after it are trailing.
    fn last_content(&self, line: &LineInfo) -> Option<usize> {
        (line.start..line.end)
            .rev()
            .find(|pos| self.leaves.arena.leaf(*pos).is_content())
    }

    fn paint_line(&self, line: &LineInfo, is_last: bool, links: &mut LinkTracker, canvas: &mut dyn Canvas) {
        let arena = self.leaves.arena;
        let end_x = self.resolved_end_x(line);
        let free = (line.max_x - end_x).max(0.0);
        let justify = self.format.alignment == ParagraphAlignment::Justify
            && !is_last
            && !line.ends_with_line_break
            && line.blank_count > 0;
        let offset = match self.format.alignment {
            ParagraphAlignment::Center => free / 2.0,
            ParagraphAlignment::Right => free,
            ParagraphAlignment::Left | ParagraphAlignment::Justify => 0.0,
        };
        let extra_per_blank = if justify { free / line.blank_count as f32 } else { 0.0 };
        let last_content = self.last_content(line);
        let stretch_from = line.last_tab.map_or(line.start, |t| t + 1);

        let top = self.area.y + line.y;
        let baseline = self.area.y + line.baseline();
        let mut x = self.area.x + line.start_x + offset;

        for pos in line.start..line.end {
            let font = arena.font(pos);
            let link = arena.hyperlink_at(pos);
            let leaf_start = x;
            match arena.leaf(pos) {
                Leaf::Word(_) | Leaf::Symbol { .. } | Leaf::Field(_) => {
                    if let Some(text) = self.leaves.text(pos, self.fields) {
                        let width = self.leaves.env.measurer.measure_string(&text, font);
                        canvas.draw_string(&text, font, x, baseline + font.baseline_shift());
                        underline(canvas, font, x, width, baseline);
                        x += width;
                    }
                }
                Leaf::Image(image) => {
                    if let Some(extent) = self.leaves.image_extent(pos) {
                        let rect = Rectangle::new(x, baseline - extent.height, extent.width, extent.height);
                        match extent.failure {
                            Some(failure) => paint_image_placeholder(canvas, rect, failure),
                            None => canvas.draw_image(&image.source, rect),
                        }
                        x += extent.width;
                    }
                }
                Leaf::Blank => {
                    let mut width = self.leaves.space_width(pos);
                    let interior = last_content.is_some_and(|last| pos < last);
                    if interior && pos >= stretch_from {
                        width += extra_per_blank;
                    }
                    if interior {
                        underline(canvas, font, x, width, baseline);
                    }
                    x += width;
                }
                Leaf::Tab => {
                    if let Some(tab) = line.tab_offsets.iter().find(|t| t.pos == pos) {
                        let target = (self.area.x + offset + tab.x + tab.width).max(x);
                        if let Some(fill) = tab.leader.fill_char() {
                            paint_leader(canvas, self.leaves.env.measurer, fill, font, x, target, baseline);
                        }
                        x = target;
                    }
                }
                Leaf::SoftHyphen => {
                    if line.hyphenated && pos + 1 == line.end {
                        canvas.draw_string("-", font, x, baseline + font.baseline_shift());
                    }
                }
                Leaf::LineBreak | Leaf::Bookmark(_) => {}
            }
            if x > leaf_start || link.is_none() {
                let rect = Rectangle::new(leaf_start, top, x - leaf_start, line.metrics.height);
                links.extend(arena, link, rect);
            }
        }
    }
}

fn underline(canvas: &mut dyn Canvas, font: &Font, x: f32, width: f32, baseline: f32) {
    if !font.underline || width <= 0.0 {
        return;
    }
    let size = font.effective_size();
    let y = baseline + font.baseline_shift() + size * 0.1;
    canvas.line(x, y, x + width, y, &Pen::solid(size * 0.05, font.color));
}

/// Fills `[from, to)` with leader characters, flush against the tab stop.
fn paint_leader(
    canvas: &mut dyn Canvas,
    measurer: &dyn crate::fonts::TextMeasurer,
    fill: char,
    font: &Font,
    from: f32,
    to: f32,
    baseline: f32,
) {
    let glyph = measurer.measure_string(fill.encode_utf8(&mut [0; 4]), font);
    if glyph <= 0.0 || to - from < glyph {
        return;
    }
    let count = ((to - from) / glyph).floor() as usize;
    let text: String = std::iter::repeat_n(fill, count).collect();
    canvas.draw_string(&text, font, to - count as f32 * glyph, baseline);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::graphics::{DrawOp, RecordingCanvas};
    use crate::layout::context::FormattingContext;
    use crate::layout::info::{BookmarkMap, FieldInfos, FormatInfo};
    use crate::layout::paragraph::ParagraphRenderer;
    use crate::layout::testing::{Fixed, NoImages};
    use crate::model::{Document, FieldKind, Inline, NumberFormat, Paragraph};

    fn field_infos(config: &LayoutConfig) -> FieldInfos {
        FieldInfos {
            physical_page: 1,
            shown_page: 123,
            section: 1,
            section_pages: 1,
            num_pages: 1,
            date: config.print_date,
        }
    }

    fn paint_block(block: &Block, width: f32) -> RecordingCanvas {
        let doc = Document::default();
        let config = LayoutConfig::default();
        let mut ctx = FormattingContext::new(&doc, &Fixed, &NoImages, &config);
        let Block::Paragraph(p) = block else {
            panic!("expected paragraph");
        };
        let mut renderer = ParagraphRenderer::new(block, p, &mut ctx).unwrap();
        let info = renderer
            .format(Rectangle::new(0.0, 0.0, width, 500.0), None, true, &mut ctx)
            .unwrap();
        let infos = field_infos(&config);
        let bookmarks = BookmarkMap::new();
        let pctx = PaintContext {
            measurer: &Fixed,
            images: &NoImages,
            config: &config,
            info: &doc.info,
            default_tab_stop: 36.0,
            field_infos: &infos,
            bookmarks: &bookmarks,
        };
        let mut canvas = RecordingCanvas::new();
        let FormatInfo::Paragraph(pf) = &info.format else {
            panic!("expected paragraph format");
        };
        paint_paragraph(&info, pf, &pctx, &mut canvas);
        canvas
    }

    #[test]
    fn justified_gaps_share_the_free_space() {
        let mut p = Paragraph::with_text("aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddddddddddddd");
        p.format.alignment = ParagraphAlignment::Justify;
        let canvas = paint_block(&Block::Paragraph(p), 50.0);
        let xs: Vec<f32> = canvas.texts().map(|(_, x, _)| x).collect();
        // three 10-wide words in 50: two gaps of 10
        assert_eq!(&xs[..3], &[0.0, 20.0, 40.0]);
        // the last line keeps natural spacing
        assert_eq!(xs[3], 0.0);
    }

    #[test]
    fn right_alignment_uses_resolved_field_width() {
        let mut p = Paragraph {
            content: vec![Inline::Field(FieldKind::Page {
                format: NumberFormat::Arabic,
            })],
            ..Paragraph::default()
        };
        p.format.alignment = ParagraphAlignment::Right;
        let canvas = paint_block(&Block::Paragraph(p), 50.0);
        let (text, x, _) = canvas.texts().next().unwrap();
        assert_eq!(text, "123");
        assert_eq!(x, 47.0);
    }

    #[test]
    fn hyperlink_rect_spans_its_words() {
        let p = Paragraph {
            content: vec![
                Inline::Text { text: "see ".into() },
                Inline::Hyperlink {
                    target: Some("https://example.com".into()),
                    kind: HyperlinkKind::Url,
                    content: vec![Inline::Text {
                        text: "the site".into(),
                    }],
                },
            ],
            ..Paragraph::default()
        };
        let canvas = paint_block(&Block::Paragraph(p), 100.0);
        let links: Vec<_> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Link { rect, target } => Some((*rect, target.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0.x, 4.0);
        assert_eq!(links[0].0.width, 8.0);
        assert_eq!(links[0].1, LinkTarget::Url("https://example.com".into()));
    }

    #[test]
    fn dotted_leader_fills_tab_gap() {
        let mut p = Paragraph::with_text("ab\tcd");
        p.format.tab_stops.push(crate::model::TabStop {
            position: 20.0,
            alignment: crate::model::TabAlignment::Left,
            leader: crate::model::TabLeader::Dots,
        });
        let canvas = paint_block(&Block::Paragraph(p), 100.0);
        let texts: Vec<_> = canvas.texts().collect();
        assert_eq!(texts[0].0, "ab");
        assert_eq!(texts[1].0, ".".repeat(18));
        assert_eq!(texts[1].1, 2.0);
        assert_eq!(texts[2], ("cd", 20.0, texts[0].2));
    }
}
