//! Table pagination: rows are the atomic unit, heading rows repeat on every
//! area the table continues into.

pub mod merged;

use crate::error::{Error, Result};
use crate::graphics::{Canvas, Pen};
use crate::layout::area::{Rectangle, TOLERANCE};
use crate::layout::context::FormattingContext;
use crate::layout::info::{FormatInfo, LayoutInfo, RenderInfo};
use crate::layout::renderer::{PaintContext, paint};
use crate::layout::top_down::{SingleAreaProvider, TopDownFormatter};
use crate::model::{
    Block, Border, Borders, Color, RoundedCorner, RowAlignment, RowHeightRule, Table,
    VerticalAlignment,
};

use merged::MergedCellList;

/// Cell content is formatted once against this height.
const UNBOUNDED_HEIGHT: f32 = 1.0e7;

/// Largest radius used for rounded cell corners.
const CORNER_RADIUS: f32 = 6.0;

/// One cell as placed on one fragment.
#[derive(Clone, Debug)]
pub struct FormattedCell<'d> {
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub rect: Rectangle,
    pub contents: Vec<RenderInfo<'d>>,
    pub borders: Borders,
    pub shading: Option<Color>,
    pub rounded_corner: RoundedCorner,
}

/// Pagination state of one table fragment.
#[derive(Clone, Debug)]
pub struct TableFormatInfo<'d> {
    /// First body row of this fragment.
    pub start_row: usize,
    /// One past the last body row of this fragment.
    pub end_row: usize,
    /// Heading rows drawn above the body rows; zero on the first fragment,
    /// where they are part of the body.
    pub repeated_header_rows: usize,
    pub row_count: usize,
    pub cells: Vec<FormattedCell<'d>>,
    starting: bool,
}

impl TableFormatInfo<'_> {
    pub fn is_starting(&self) -> bool {
        self.starting
    }

    pub fn is_ending(&self) -> bool {
        !self.is_empty() && self.end_row >= self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count > 0 && self.end_row <= self.start_row
    }

    /// Rows that appear on this fragment, repeated heading rows first.
    pub fn rendered_rows(&self) -> Vec<usize> {
        (0..self.repeated_header_rows)
            .chain(self.start_row..self.end_row)
            .collect()
    }
}

/// Formatted content of one merged cell, relative to the table's top-left
/// corner and the cell's top edge.
struct CellLayout<'d> {
    contents: Vec<RenderInfo<'d>>,
    /// Horizontal offset of the cell's left edge.
    x: f32,
    width: f32,
    content_height: f32,
    top_padding: f32,
    bottom_padding: f32,
    v_align: VerticalAlignment,
    shading: Option<Color>,
}

pub struct TableRenderer<'d> {
    block: &'d Block,
    table: &'d Table,
    merged: MergedCellList<'d>,
    cells: Vec<CellLayout<'d>>,
    /// Top of every row boundary; `positions[r]` is the top of row `r`.
    positions: Vec<f32>,
    /// Inclusive row ranges that must stay in one area.
    groups: Vec<(usize, usize)>,
    header_end: usize,
    width: f32,
}

impl<'d> TableRenderer<'d> {
    /// Resolves spans, formats every cell once and derives row positions.
    pub fn new(block: &'d Block, table: &'d Table, ctx: &mut FormattingContext<'_>) -> Result<Self> {
        let width = table.columns.iter().map(|c| c.width).sum();
        if table.columns.is_empty() {
            log::warn!("Table without columns is not laid out");
            return Ok(Self {
                block,
                table,
                merged: MergedCellList::default(),
                cells: Vec::new(),
                positions: vec![0.0],
                groups: Vec::new(),
                header_end: 0,
                width: 0.0,
            });
        }

        let merged = MergedCellList::build(table)?;
        let mut column_x = Vec::with_capacity(table.columns.len() + 1);
        column_x.push(0.0f32);
        for column in &table.columns {
            let last = column_x.last().copied().unwrap_or(0.0);
            column_x.push(last + column.width);
        }

        // Cell bookmarks belong to the page their row lands on; they are
        // recorded when the row is placed.
        let bookmarks = ctx.bookmarks.clone();
        let mut cells = Vec::with_capacity(merged.len());
        for m in merged.iter() {
            let row = &table.rows[m.row];
            let first_column = &table.columns[m.column];
            let last_column = &table.columns[m.column + m.column_span - 1];
            let left_padding = first_column.left_padding.unwrap_or(table.left_padding);
            let right_padding = last_column.right_padding.unwrap_or(table.right_padding);
            let top_padding = row.top_padding.unwrap_or(table.top_padding);
            let bottom_padding = row.bottom_padding.unwrap_or(table.bottom_padding);
            let x = column_x[m.column];
            let cell_width = column_x[m.column + m.column_span] - x;

            let inner = Rectangle::new(
                x + left_padding,
                0.0,
                (cell_width - left_padding - right_padding).max(0.0),
                UNBOUNDED_HEIGHT,
            );
            let mut provider = SingleAreaProvider::new(inner);
            TopDownFormatter::new(&m.cell.elements).format_on_areas(&mut provider, ctx)?;
            let content_height = provider.content_bottom();

            cells.push(CellLayout {
                contents: provider.into_render_infos(),
                x,
                width: cell_width,
                content_height,
                top_padding,
                bottom_padding,
                v_align: m.cell.vertical_alignment.unwrap_or(row.vertical_alignment),
                shading: m.cell.shading.or(row.shading).or(table.shading),
            });
        }
        ctx.bookmarks = bookmarks;

        let positions = row_positions(table, &merged, &cells);
        let header_end = table
            .rows
            .iter()
            .take_while(|r| r.heading_format)
            .count();
        let groups = connected_groups(table, &merged, header_end);

        Ok(Self {
            block,
            table,
            merged,
            cells,
            positions,
            groups,
            header_end,
            width,
        })
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        LayoutInfo {
            margin_top: self.table.space_before,
            margin_bottom: self.table.space_after,
            keep_together: self.table.keep_together,
            keep_with_next: self.table.keep_with_next,
            min_width: self.width,
            ..LayoutInfo::default()
        }
    }

    fn row_count(&self) -> usize {
        self.positions.len() - 1
    }

    /// Height between the tops of rows `from` and `to`.
    fn span_height(&self, from: usize, to: usize) -> f32 {
        self.positions[to] - self.positions[from]
    }

    fn table_x(&self, area: Rectangle) -> f32 {
        let indent = self.table.rows_left_indent;
        match self.table.rows_alignment {
            RowAlignment::Left => area.x + indent,
            RowAlignment::Center => area.x + (area.width - self.width) / 2.0,
            RowAlignment::Right => area.right() - self.width,
        }
    }

    /// Places the groups of rows that fit, starting after the previous fragment.
    pub fn format(
        &mut self,
        area: Rectangle,
        previous: Option<&FormatInfo<'d>>,
        top_of_area: bool,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<RenderInfo<'d>> {
        let start_row = match previous {
            None => 0,
            Some(FormatInfo::Table(prev)) => prev.end_row,
            Some(_) => {
                return Err(Error::Internal(
                    "table continued from a fragment of another element".into(),
                ));
            }
        };
        let starting = previous.is_none();
        let row_count = self.row_count();
        let repeated_header_rows = if !starting && start_row >= self.header_end {
            self.header_end
        } else {
            0
        };
        let header_height = self.span_height(0, repeated_header_rows);

        let mut end_row = start_row;
        for &(first, last) in self.groups.iter().filter(|g| g.0 >= start_row) {
            let height = header_height + self.span_height(start_row, last + 1);
            if height > area.height + TOLERANCE {
                if end_row == start_row && top_of_area {
                    log::debug!("Table rows {first}..={last} exceed the area, placing them anyway");
                    end_row = last + 1;
                }
                break;
            }
            end_row = last + 1;
        }

        let table_x = self.table_x(area);
        let mut cells = Vec::new();
        if end_row > start_row {
            for (idx, m) in self.merged.iter().enumerate() {
                let top = if m.row < repeated_header_rows {
                    Some(area.y + self.span_height(0, m.row))
                } else if m.row >= start_row && m.row < end_row {
                    Some(area.y + header_height + self.span_height(start_row, m.row))
                } else {
                    None
                };
                let Some(top) = top else { continue };
                let last = (m.last_row() + 1).min(self.row_count());
                let height = self.span_height(m.row, last);
                cells.push(self.place_cell(idx, table_x, top, height));
            }
        }

        let height = if end_row > start_row {
            header_height + self.span_height(start_row, end_row)
        } else {
            0.0
        };
        let mut layout = self.initial_layout_info();
        layout.content_area = Rectangle::new(table_x, area.y, self.width, height);
        if !starting {
            layout.margin_top = 0.0;
        }
        let info = RenderInfo {
            element: self.block,
            format: FormatInfo::Table(TableFormatInfo {
                start_row,
                end_row,
                repeated_header_rows,
                row_count,
                cells,
                starting,
            }),
            layout,
        };
        for name in info.bookmarks() {
            ctx.record_bookmark(name);
        }
        Ok(info)
    }

    fn place_cell(&self, idx: usize, table_x: f32, top: f32, height: f32) -> FormattedCell<'d> {
        let m = self.merged.get(idx);
        let layout = &self.cells[idx];
        let bottom_border = Border::effective_width(m.borders.bottom.as_ref());
        let available = height - layout.top_padding - layout.bottom_padding - bottom_border;
        let slack = (available - layout.content_height).max(0.0);
        let offset = match layout.v_align {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Center => slack / 2.0,
            VerticalAlignment::Bottom => slack,
        };
        let dy = top + layout.top_padding + offset;
        let contents = layout
            .contents
            .iter()
            .cloned()
            .map(|mut info| {
                info.shift(table_x, dy);
                info
            })
            .collect();
        FormattedCell {
            row: m.row,
            column: m.column,
            row_span: m.row_span,
            rect: Rectangle::new(table_x + layout.x, top, layout.width, height),
            contents,
            borders: m.borders.clone(),
            shading: layout.shading,
            rounded_corner: m.cell.rounded_corner,
        }
    }

    /// Gives back the last group of rows so it can move on with the next element.
    pub fn remove_ending(&self, info: &mut RenderInfo<'d>) -> bool {
        let FormatInfo::Table(t) = &mut info.format else {
            return false;
        };
        let Some(&(first, _)) = self.groups.iter().find(|g| g.1 + 1 == t.end_row) else {
            return false;
        };
        if first <= t.start_row {
            return false;
        }
        let removed = self.span_height(first, t.end_row);
        t.end_row = first;
        // repeated heading rows all lie above `first`
        t.cells.retain(|c| c.row < first);
        info.layout.content_area.height -= removed;
        true
    }
}

/// Row boundaries from the height rules and the content of cells ending in
/// each row. Cells ending in an `Exactly` row do not push it down.
fn row_positions(table: &Table, merged: &MergedCellList<'_>, cells: &[CellLayout<'_>]) -> Vec<f32> {
    let mut positions = vec![0.0f32; table.rows.len() + 1];
    for (r, row) in table.rows.iter().enumerate() {
        let top = positions[r];
        let bottom = match row.height_rule {
            RowHeightRule::Exactly => top + row.height,
            rule => {
                let minimum = if rule == RowHeightRule::AtLeast { row.height } else { 0.0 };
                merged
                    .iter()
                    .zip(cells)
                    .filter(|(m, _)| m.last_row() == r)
                    .map(|(m, c)| {
                        positions[m.row]
                            + c.top_padding
                            + c.content_height
                            + c.bottom_padding
                            + Border::effective_width(m.borders.bottom.as_ref())
                    })
                    .fold(top + minimum, f32::max)
            }
        };
        positions[r + 1] = bottom;
    }
    positions
}

/// Splits the rows into inclusive ranges held together by vertical merges,
/// `keep_with` counts and the link between heading rows and the first body row.
fn connected_groups(table: &Table, merged: &MergedCellList<'_>, header_end: usize) -> Vec<(usize, usize)> {
    let rows = table.rows.len();
    let mut reach: Vec<usize> = (0..rows)
        .map(|r| (r + table.rows[r].keep_with as usize).min(rows.saturating_sub(1)))
        .collect();
    for m in merged.iter() {
        reach[m.row] = reach[m.row].max(m.last_row());
    }
    if header_end > 0 && header_end < rows {
        for r in reach.iter_mut().take(header_end) {
            *r = (*r).max(header_end);
        }
    }

    let mut groups = Vec::new();
    let mut start = 0;
    while start < rows {
        let mut end = reach[start];
        let mut r = start;
        while r <= end {
            end = end.max(reach[r]);
            r += 1;
        }
        groups.push((start, end));
        start = end + 1;
    }
    groups
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

pub fn paint_table(
    _info: &RenderInfo<'_>,
    t: &TableFormatInfo<'_>,
    pctx: &PaintContext<'_>,
    canvas: &mut dyn Canvas,
) {
    for cell in &t.cells {
        if let Some(color) = cell.shading {
            canvas.fill_rect(cell.rect, color);
        }
        for content in &cell.contents {
            paint(content, pctx, canvas);
        }
        paint_cell_borders(cell, canvas);
    }
}

fn visible(border: &Option<Border>) -> Option<Border> {
    border.filter(|b| b.visible && b.width > 0.0)
}

fn paint_cell_borders(cell: &FormattedCell<'_>, canvas: &mut dyn Canvas) {
    let r = cell.rect;
    let radius = if cell.rounded_corner == RoundedCorner::None {
        0.0
    } else {
        CORNER_RADIUS.min(r.width / 2.0).min(r.height / 2.0)
    };
    let at = |corner: RoundedCorner| if cell.rounded_corner == corner { radius } else { 0.0 };
    let b = &cell.borders;

    if let Some(border) = visible(&b.top) {
        canvas.line(
            r.x + at(RoundedCorner::TopLeft),
            r.y,
            r.right() - at(RoundedCorner::TopRight),
            r.y,
            &Pen::from(&border),
        );
    }
    if let Some(border) = visible(&b.bottom) {
        canvas.line(
            r.x + at(RoundedCorner::BottomLeft),
            r.bottom(),
            r.right() - at(RoundedCorner::BottomRight),
            r.bottom(),
            &Pen::from(&border),
        );
    }
    if let Some(border) = visible(&b.left) {
        canvas.line(
            r.x,
            r.y + at(RoundedCorner::TopLeft),
            r.x,
            r.bottom() - at(RoundedCorner::BottomLeft),
            &Pen::from(&border),
        );
    }
    if let Some(border) = visible(&b.right) {
        canvas.line(
            r.right(),
            r.y + at(RoundedCorner::TopRight),
            r.right(),
            r.bottom() - at(RoundedCorner::BottomRight),
            &Pen::from(&border),
        );
    }

    if radius <= 0.0 {
        return;
    }
    let (cx, cy, start, border) = match cell.rounded_corner {
        RoundedCorner::TopLeft => (r.x + radius, r.y + radius, 90.0, b.top),
        RoundedCorner::TopRight => (r.right() - radius, r.y + radius, 0.0, b.top),
        RoundedCorner::BottomLeft => (r.x + radius, r.bottom() - radius, 180.0, b.bottom),
        RoundedCorner::BottomRight => (r.right() - radius, r.bottom() - radius, 270.0, b.bottom),
        RoundedCorner::None => return,
    };
    if let Some(border) = visible(&border) {
        canvas.arc(cx, cy, radius, start, 90.0, Some(&Pen::from(&border)), None);
    }
}
