//! Resolution of row and column spans into a flat, ordered cell list.

use crate::error::{Error, Result};
use crate::model::{Border, Borders, Cell, RoundedCorner, Table};

/// A cell with its grid position, its spans, and the borders it is drawn with.
#[derive(Clone, Debug)]
pub struct MergedCell<'d> {
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub column_span: usize,
    pub cell: &'d Cell,
    pub borders: Borders,
}

impl MergedCell<'_> {
    /// Last row the cell covers.
    pub fn last_row(&self) -> usize {
        self.row + self.row_span - 1
    }
}

/// Every visible cell of a table, ordered by (row, column).
#[derive(Clone, Debug, Default)]
pub struct MergedCellList<'d> {
    cells: Vec<MergedCell<'d>>,
}

impl<'d> MergedCellList<'d> {
    pub fn build(table: &'d Table) -> Result<Self> {
        let columns = table.columns.len();
        let rows = table.rows.len();
        let mut occupied = vec![vec![false; columns]; rows];
        let mut cells = Vec::new();

        for (r, row) in table.rows.iter().enumerate() {
            let mut c = 0;
            for cell in &row.cells {
                while c < columns && occupied[r][c] {
                    c += 1;
                }
                if c >= columns {
                    return Err(Error::Configuration(format!(
                        "row {r} has more cells than the table's {columns} columns"
                    )));
                }
                let column_span = cell.merge_right as usize + 1;
                let row_span = cell.merge_down as usize + 1;
                if c + column_span > columns || r + row_span > rows {
                    return Err(Error::Configuration(format!(
                        "cell at row {r}, column {c} spans past the table edge"
                    )));
                }
                for covered in occupied.iter_mut().skip(r).take(row_span) {
                    for slot in covered.iter_mut().skip(c).take(column_span) {
                        *slot = true;
                    }
                }
                let mut borders = cell
                    .borders
                    .as_ref()
                    .or(row.borders.as_ref())
                    .unwrap_or(&table.borders)
                    .clone();
                equalize_corner(&mut borders, cell.rounded_corner);
                cells.push(MergedCell {
                    row: r,
                    column: c,
                    row_span,
                    column_span,
                    cell,
                    borders,
                });
                c += column_span;
            }
        }
        cells.sort_by_key(|m| (m.row, m.column));
        Ok(Self { cells })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergedCell<'d>> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, idx: usize) -> &MergedCell<'d> {
        &self.cells[idx]
    }
}

/// A rounded corner is stroked with one pen, so both sides meeting there
/// take whichever border is set.
fn equalize_corner(borders: &mut Borders, corner: RoundedCorner) {
    let (first, second) = match corner {
        RoundedCorner::None => return,
        RoundedCorner::TopLeft => (&mut borders.top, &mut borders.left),
        RoundedCorner::TopRight => (&mut borders.top, &mut borders.right),
        RoundedCorner::BottomLeft => (&mut borders.bottom, &mut borders.left),
        RoundedCorner::BottomRight => (&mut borders.bottom, &mut borders.right),
    };
    copy_missing(first, second);
}

fn copy_missing(a: &mut Option<Border>, b: &mut Option<Border>) {
    match (a.as_ref(), b.as_ref()) {
        (Some(x), None) => *b = Some(*x),
        (None, Some(y)) => *a = Some(*y),
        _ => {}
    }
}
