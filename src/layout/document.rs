//! Pagination driver: hands out page content areas section by section and
//! formats headers and footers for every page it creates.

use crate::error::{Error, Result};
use crate::layout::area::Rectangle;
use crate::layout::context::FormattingContext;
use crate::layout::info::{BookmarkMap, FieldInfos, LayoutInfo, PageInfo, PageNumber, RenderInfo};
use crate::layout::top_down::{
    AreaProvider, SingleAreaProvider, TopDownFormatter, align_horizontally, align_vertically,
};
use crate::model::{
    Block, Document, HeaderFooter, HeadersFooters, PageSetup, RelativeHorizontal, RelativeVertical,
    Section, SectionStart,
};

/// Page-position class used to pick headers and footers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagePosition {
    First,
    Odd,
    Even,
}

#[derive(Clone, Debug)]
pub struct FormattedPage<'d> {
    pub info: PageInfo,
    /// 0-based section index.
    pub section: usize,
    pub field_infos: FieldInfos,
    pub position: PagePosition,
    /// Inserted to satisfy an odd/even section start; carries no content.
    pub empty: bool,
    /// Page area inside the margins, after mirroring.
    pub margin_rect: Rectangle,
    /// Area the body flowed into, between header and footer.
    pub content_rect: Rectangle,
    pub header: Vec<RenderInfo<'d>>,
    pub content: Vec<RenderInfo<'d>>,
    pub footer: Vec<RenderInfo<'d>>,
}

impl FormattedPage<'_> {
    pub fn page_rect(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.info.width, self.info.height)
    }

    fn is_even(&self) -> bool {
        self.field_infos.physical_page % 2 == 0
    }
}

/// Result of the format pass over a whole document.
#[derive(Clone, Debug, Default)]
pub struct FormattedDocument<'d> {
    pub pages: Vec<FormattedPage<'d>>,
    pub bookmarks: BookmarkMap,
}

impl<'d> FormattedDocument<'d> {
    /// Formats every section, then back-fills section and document page counts.
    pub fn format(document: &'d Document, ctx: &mut FormattingContext<'_>) -> Result<Self> {
        let mut pages = Vec::new();
        let mut shown = 0u32;
        for (si, section) in document.sections.iter().enumerate() {
            let mut pager = SectionPager {
                section,
                section_index: si,
                pages: &mut pages,
                shown: &mut shown,
                content_pages: 0,
            };
            TopDownFormatter::new(&section.elements).format_on_areas(&mut pager, ctx)?;

            let count = pages.iter().filter(|p| p.section == si).count();
            for page in pages.iter_mut().filter(|p| p.section == si) {
                page.field_infos.section_pages = count;
            }
        }
        let total = pages.len();
        for page in &mut pages {
            page.field_infos.num_pages = total;
        }
        Ok(Self {
            pages,
            bookmarks: ctx.bookmarks.clone(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page by 1-based physical number.
    pub fn page(&self, physical: usize) -> Option<&FormattedPage<'d>> {
        physical.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn bookmark(&self, name: &str) -> Option<PageNumber> {
        self.bookmarks.get(name).copied()
    }
}

fn select(set: &HeadersFooters, position: PagePosition) -> Option<&HeaderFooter> {
    match position {
        PagePosition::First => set.first_page.as_ref(),
        PagePosition::Even => set.even_page.as_ref(),
        PagePosition::Odd => set.primary.as_ref(),
    }
}

/// Formats a header or footer into `area`. Bands are laid out afresh on
/// every page and leave list numbering and bookmarks of the body untouched.
fn format_band<'d>(
    elements: &'d [Block],
    area: Rectangle,
    ctx: &mut FormattingContext<'_>,
) -> Result<SingleAreaProvider<'d>> {
    let checkpoint = ctx.checkpoint();
    let mut provider = SingleAreaProvider::new(area);
    let result = TopDownFormatter::new(elements).format_on_areas(&mut provider, ctx);
    ctx.restore(checkpoint);
    result.map(|()| provider)
}

/// Area provider for one section's body.
struct SectionPager<'p, 'd> {
    section: &'d Section,
    section_index: usize,
    pages: &'p mut Vec<FormattedPage<'d>>,
    /// Shown number of the last page created.
    shown: &'p mut u32,
    /// Content pages created for this section so far.
    content_pages: usize,
}

impl<'d> SectionPager<'_, 'd> {
    fn setup(&self) -> &'d PageSetup {
        &self.section.page_setup
    }

    /// Whether the section must first skip a page to land on the right parity.
    /// Pages are counted from zero here, so an odd start follows an even count.
    fn needs_parity_page(&self) -> bool {
        if self.section_index == 0 || self.content_pages > 0 {
            return false;
        }
        match self.setup().section_start {
            SectionStart::NextPage => false,
            SectionStart::OddPage => self.pages.len() % 2 == 0,
            SectionStart::EvenPage => self.pages.len() % 2 == 1,
        }
    }

    fn current(&self) -> Option<&FormattedPage<'d>> {
        self.pages.last()
    }

    fn push_page(&mut self, ctx: &mut FormattingContext<'_>, empty: bool) -> Result<Rectangle> {
        let section = self.section;
        let setup = self.setup();
        let (width, height) = setup.effective_size();
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::Configuration(format!(
                "section {} has a zero-size page ({width}x{height})",
                self.section_index + 1
            )));
        }
        let physical = self.pages.len() + 1;
        let shown = match setup.starting_number {
            Some(n) if !empty && self.content_pages == 0 => n,
            _ => *self.shown + 1,
        };
        *self.shown = shown;
        ctx.current_page = PageNumber { physical, shown };

        let even = physical % 2 == 0;
        let position = if !empty && self.content_pages == 0 && setup.different_first_page_header_footer {
            PagePosition::First
        } else if setup.odd_and_even_pages_header_footer && even {
            PagePosition::Even
        } else {
            PagePosition::Odd
        };
        let (left, right) = if setup.mirror_margins && even {
            (setup.right_margin, setup.left_margin)
        } else {
            (setup.left_margin, setup.right_margin)
        };
        let margin_rect = Rectangle::new(
            left,
            setup.top_margin,
            width - left - right,
            height - setup.top_margin - setup.bottom_margin,
        );

        let field_infos = FieldInfos {
            physical_page: physical,
            shown_page: shown,
            section: self.section_index + 1,
            section_pages: 0,
            num_pages: 0,
            date: ctx.config.print_date,
        };

        let mut page = FormattedPage {
            info: PageInfo {
                width,
                height,
                orientation: setup.orientation,
            },
            section: self.section_index,
            field_infos,
            position,
            empty,
            margin_rect,
            content_rect: margin_rect,
            header: Vec::new(),
            content: Vec::new(),
            footer: Vec::new(),
        };

        if !empty {
            let mut top = margin_rect.y;
            let mut bottom = margin_rect.bottom();
            if let Some(header) = select(&section.headers, position) {
                let area = Rectangle::new(left, setup.header_distance, margin_rect.width, height - setup.header_distance);
                let provider = format_band(&header.elements, area, ctx)?;
                top = top.max(provider.content_bottom());
                page.header = provider.into_render_infos();
            }
            if let Some(footer) = select(&section.footers, position) {
                let area = Rectangle::new(left, 0.0, margin_rect.width, height - setup.footer_distance);
                let provider = format_band(&footer.elements, area, ctx)?;
                let used = provider.content_bottom();
                let dy = height - setup.footer_distance - used;
                let mut infos = provider.into_render_infos();
                for info in &mut infos {
                    info.shift(0.0, dy);
                }
                let footer_top = infos
                    .iter()
                    .filter(|i| !i.layout.is_floating())
                    .map(|i| i.layout.content_area.y)
                    .fold(f32::INFINITY, f32::min);
                if footer_top.is_finite() {
                    bottom = bottom.min(footer_top);
                }
                page.footer = infos;
            }
            page.content_rect = Rectangle::new(margin_rect.x, top, margin_rect.width, bottom - top);
            self.content_pages += 1;
        }

        let rect = page.content_rect;
        self.pages.push(page);
        Ok(rect)
    }
}

impl<'d> AreaProvider<'d> for SectionPager<'_, 'd> {
    fn next_area(&mut self, ctx: &mut FormattingContext<'_>) -> Result<Option<Rectangle>> {
        if self.needs_parity_page() {
            log::debug!(
                "Inserting empty page {} before section {}",
                self.pages.len() + 1,
                self.section_index + 1
            );
            self.push_page(ctx, true)?;
        }
        self.push_page(ctx, false).map(Some)
    }

    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>) {
        if let Some(page) = self.pages.last_mut() {
            page.content.extend(infos);
        }
    }

    fn is_area_break_before(&self, layout: &LayoutInfo) -> bool {
        layout.page_break_before
    }

    fn position_horizontally(&self, info: &mut RenderInfo<'d>) {
        let Some(page) = self.current() else { return };
        let reference = match info.layout.horizontal_reference {
            RelativeHorizontal::Area => page.content_rect,
            RelativeHorizontal::Margin => page.margin_rect,
            RelativeHorizontal::Page => page.page_rect(),
        };
        align_horizontally(info, reference, page.is_even());
    }

    fn position_vertically(&self, info: &mut RenderInfo<'d>) {
        let Some(page) = self.current() else { return };
        let reference = match info.layout.vertical_reference {
            RelativeVertical::Area => page.content_rect,
            RelativeVertical::Margin => page.margin_rect,
            RelativeVertical::Page => page.page_rect(),
        };
        align_vertically(info, reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::testing::{Fixed, NoImages};
    use crate::model::{Block, Paragraph};

    fn page_setup(height: f32) -> PageSetup {
        PageSetup {
            page_width: 200.0,
            page_height: height,
            top_margin: 10.0,
            bottom_margin: 10.0,
            left_margin: 20.0,
            right_margin: 30.0,
            header_distance: 4.0,
            footer_distance: 4.0,
            ..PageSetup::default()
        }
    }

    fn format(doc: &Document) -> FormattedDocument<'_> {
        let config = LayoutConfig::default();
        let mut ctx = FormattingContext::new(doc, &Fixed, &NoImages, &config);
        FormattedDocument::format(doc, &mut ctx).unwrap()
    }

    #[test]
    fn mirrored_margins_swap_on_even_pages() {
        let mut setup = page_setup(100.0);
        setup.mirror_margins = true;
        let doc = Document {
            sections: vec![Section {
                page_setup: setup,
                elements: vec![
                    Block::Paragraph(Paragraph::with_text("a")),
                    Block::PageBreak,
                    Block::Paragraph(Paragraph::with_text("b")),
                ],
                ..Section::default()
            }],
            ..Document::default()
        };
        let formatted = format(&doc);
        assert_eq!(formatted.page_count(), 2);
        assert_eq!(formatted.pages[0].content_rect.x, 20.0);
        assert_eq!(formatted.pages[1].content_rect.x, 30.0);
    }

    #[test]
    fn header_pushes_content_down() {
        let mut section = Section {
            page_setup: page_setup(100.0),
            elements: vec![Block::Paragraph(Paragraph::with_text("body"))],
            ..Section::default()
        };
        let mut tall = Paragraph::with_text("head");
        tall.format.font.size = 20.0;
        section.headers.primary = Some(HeaderFooter {
            elements: vec![Block::Paragraph(tall)],
        });
        let doc = Document {
            sections: vec![section],
            ..Document::default()
        };
        let formatted = format(&doc);
        // header at 4 with a 24pt line ends at 28, below the 10pt margin
        assert_eq!(formatted.pages[0].content_rect.y, 28.0);
        assert_eq!(formatted.pages[0].header.len(), 1);
    }

    #[test]
    fn footer_bottom_sits_at_footer_distance() {
        let mut section = Section {
            page_setup: page_setup(100.0),
            ..Section::default()
        };
        section.footers.primary = Some(HeaderFooter {
            elements: vec![Block::Paragraph(Paragraph::with_text("foot"))],
        });
        let doc = Document {
            sections: vec![section],
            ..Document::default()
        };
        let formatted = format(&doc);
        let footer = &formatted.pages[0].footer[0];
        assert_eq!(footer.bottom(), 96.0);
        assert_eq!(formatted.pages[0].content_rect.bottom(), 84.0);
    }

    #[test]
    fn starting_number_restarts_shown_pages() {
        let mut second = page_setup(100.0);
        second.starting_number = Some(10);
        let doc = Document {
            sections: vec![
                Section {
                    page_setup: page_setup(100.0),
                    elements: vec![Block::Paragraph(Paragraph::with_text("a"))],
                    ..Section::default()
                },
                Section {
                    page_setup: second,
                    elements: vec![Block::Paragraph(Paragraph::with_text("b"))],
                    ..Section::default()
                },
            ],
            ..Document::default()
        };
        let formatted = format(&doc);
        let shown: Vec<u32> = formatted.pages.iter().map(|p| p.field_infos.shown_page).collect();
        assert_eq!(shown, vec![1, 10]);
        assert!(formatted.pages.iter().all(|p| p.field_infos.num_pages == 2));
        assert_eq!(formatted.pages[1].field_infos.section, 2);
    }
}
