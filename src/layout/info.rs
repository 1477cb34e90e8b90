//! Per-fragment layout records produced by the format pass.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::layout::area::Rectangle;
use crate::layout::paragraph::ParagraphFormatInfo;
use crate::layout::shape::ShapeFormatInfo;
use crate::layout::table::TableFormatInfo;
use crate::model::{
    Block, LeftPosition, Orientation, RelativeHorizontal, RelativeVertical, TopPosition, WrapStyle,
};

/// Geometric placement of one fragment plus the break flags the flow engine reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutInfo {
    pub content_area: Rectangle,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub page_break_before: bool,
    pub horizontal_reference: RelativeHorizontal,
    pub vertical_reference: RelativeVertical,
    pub left: LeftPosition,
    pub top: TopPosition,
    pub wrap: WrapStyle,
    /// Narrowest width the element can be laid out in.
    pub min_width: f32,
}

impl LayoutInfo {
    /// Floating fragments are positioned by the area provider and do not
    /// advance the flow.
    pub fn is_floating(&self) -> bool {
        self.wrap != WrapStyle::TopBottom || self.vertical_reference != RelativeVertical::Area
    }
}

/// Per-kind pagination state of a fragment.
#[derive(Clone, Debug)]
pub enum FormatInfo<'d> {
    Paragraph(ParagraphFormatInfo<'d>),
    Table(TableFormatInfo<'d>),
    Shape(ShapeFormatInfo<'d>),
    PageBreak,
}

impl FormatInfo<'_> {
    /// First fragment of its element.
    pub fn is_starting(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.is_starting(),
            FormatInfo::Table(t) => t.is_starting(),
            FormatInfo::Shape(_) | FormatInfo::PageBreak => true,
        }
    }

    /// Last fragment of its element.
    pub fn is_ending(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.is_ending(),
            FormatInfo::Table(t) => t.is_ending(),
            FormatInfo::Shape(s) => !s.is_empty(),
            FormatInfo::PageBreak => true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.is_starting() && self.is_ending()
    }

    /// Nothing of the element could be placed.
    pub fn is_empty(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.is_empty(),
            FormatInfo::Table(t) => t.is_empty(),
            FormatInfo::Shape(s) => s.is_empty(),
            FormatInfo::PageBreak => false,
        }
    }

    /// Starting fragment that also satisfies orphan control.
    pub fn starting_is_complete(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.starting_is_complete(),
            _ => self.is_starting() && !self.is_empty(),
        }
    }

    /// Ending fragment that also satisfies widow control.
    pub fn ending_is_complete(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.ending_is_complete(),
            _ => self.is_ending(),
        }
    }
}

/// Layout result for one fragment of one content element.
#[derive(Clone, Debug)]
pub struct RenderInfo<'d> {
    pub element: &'d Block,
    pub format: FormatInfo<'d>,
    pub layout: LayoutInfo,
}

impl RenderInfo<'_> {
    /// Moves the fragment and everything nested in it.
    pub fn shift(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.layout.content_area = self.layout.content_area.translate(dx, dy);
        match &mut self.format {
            FormatInfo::Table(table) => {
                for cell in &mut table.cells {
                    cell.rect = cell.rect.translate(dx, dy);
                    for info in &mut cell.contents {
                        info.shift(dx, dy);
                    }
                }
            }
            FormatInfo::Shape(shape) => {
                for info in &mut shape.contents {
                    info.shift(dx, dy);
                }
            }
            FormatInfo::Paragraph(_) | FormatInfo::PageBreak => {}
        }
    }

    /// Lowest edge of the fragment's content area.
    pub fn bottom(&self) -> f32 {
        self.layout.content_area.bottom()
    }
}

impl<'d> RenderInfo<'d> {
    /// Bookmarks placed by this fragment, including those nested in table
    /// cells and text frames. Repeated heading rows are not counted.
    pub fn bookmarks(&self) -> Vec<&'d str> {
        let mut names = Vec::new();
        self.collect_bookmarks(&mut names);
        names
    }

    fn collect_bookmarks(&self, names: &mut Vec<&'d str>) {
        match &self.format {
            FormatInfo::Paragraph(p) => names.extend(p.bookmarks()),
            FormatInfo::Table(t) => {
                for cell in t.cells.iter().filter(|c| c.row >= t.start_row) {
                    for info in &cell.contents {
                        info.collect_bookmarks(names);
                    }
                }
            }
            FormatInfo::Shape(s) => {
                for info in &s.contents {
                    info.collect_bookmarks(names);
                }
            }
            FormatInfo::PageBreak => {}
        }
    }
}

/// Physical and shown page number of a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageNumber {
    /// 1-based position in the output.
    pub physical: usize,
    /// Number printed by page fields; restarts with `starting_number`.
    pub shown: u32,
}

/// Bookmark name to the page its defining paragraph was placed on.
pub type BookmarkMap = BTreeMap<String, PageNumber>;

/// Values page-dependent fields resolve against while painting one page.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfos {
    pub physical_page: usize,
    pub shown_page: u32,
    /// 1-based section number.
    pub section: usize,
    /// Filled in once the whole section has been formatted.
    pub section_pages: usize,
    /// Filled in once the whole document has been formatted.
    pub num_pages: usize,
    pub date: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    pub width: f32,
    pub height: f32,
    pub orientation: Orientation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ShapeLayout, WrapStyle};

    #[test]
    fn floating_follows_wrap_and_reference() {
        let mut layout = LayoutInfo::default();
        assert!(!layout.is_floating());
        layout.wrap = WrapStyle::Through;
        assert!(layout.is_floating());
        layout.wrap = ShapeLayout::default().wrap;
        layout.vertical_reference = RelativeVertical::Page;
        assert!(layout.is_floating());
    }
}
