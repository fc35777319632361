//! In-memory worksheets.
//!
//! [`MemoryWorkbook`] answers the same questions a live spreadsheet does,
//! including current-region detection, which makes it a stand-in for the
//! automation bridge when exercising the export pipeline.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::address::{self, AbsoluteMode};
use crate::error::{Error, Result};
use crate::source::{Workbook, Worksheet};
use crate::value::CellValue;

/// (row, column), both 1-based
type Position = (u32, u32);

/// Inclusive rectangle as (top, left, bottom, right)
type Bounds = (u32, u32, u32, u32);

/// A worksheet held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    cells: BTreeMap<Position, CellValue>,
    hyperlinks: BTreeMap<Position, Vec<String>>,
    range_reads: Cell<usize>,
    hyperlink_queries: Cell<usize>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set a cell's value. Setting [`CellValue::Empty`] clears the cell.
    pub fn set_value(&mut self, cell: &str, value: impl Into<CellValue>) -> Result<()> {
        let pos = parse_cell(cell)?;
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&pos);
            }
            value => {
                self.cells.insert(pos, value);
            }
        }
        Ok(())
    }

    /// Fill a row to the right of `cell`.
    pub fn set_row<V: Into<CellValue>>(
        &mut self,
        cell: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<()> {
        let (row, col) = parse_cell(cell)?;
        for (offset, value) in values.into_iter().enumerate() {
            let target = address::cell(&address::column_letters(col + offset as u32), row);
            self.set_value(&target, value)?;
        }
        Ok(())
    }

    /// Attach a hyperlink target to a cell.
    pub fn add_hyperlink(&mut self, cell: &str, target: impl Into<String>) -> Result<()> {
        let pos = parse_cell(cell)?;
        self.hyperlinks.entry(pos).or_default().push(target.into());
        Ok(())
    }

    /// Number of bulk range reads served so far.
    pub fn range_reads(&self) -> usize {
        self.range_reads.get()
    }

    /// Number of hyperlink queries served so far.
    pub fn hyperlink_queries(&self) -> usize {
        self.hyperlink_queries.get()
    }

    fn occupied(&self, row: u32, col: u32) -> bool {
        row >= 1 && col >= 1 && self.cells.contains_key(&(row, col))
    }

    fn any_occupied(&self, rows: (u32, u32), cols: (u32, u32)) -> bool {
        (rows.0..=rows.1).any(|r| (cols.0..=cols.1).any(|c| self.occupied(r, c)))
    }
}

impl Worksheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell_value(&self, cell: &str) -> Result<CellValue> {
        let pos = parse_cell(cell)?;
        Ok(self.cells.get(&pos).cloned().unwrap_or_default())
    }

    fn current_region(&self, cell: &str) -> Result<String> {
        let (row, col) = parse_cell(cell)?;
        let (mut top, mut left, mut bottom, mut right) = (row, col, row, col);

        // Grow while any cell touching the rectangle, diagonals included, is occupied.
        loop {
            let outer_left = left.saturating_sub(1).max(1);
            let outer_right = right + 1;
            let mut grown = false;

            if top > 1 && self.any_occupied((top - 1, top - 1), (outer_left, outer_right)) {
                top -= 1;
                grown = true;
            }
            if self.any_occupied((bottom + 1, bottom + 1), (outer_left, outer_right)) {
                bottom += 1;
                grown = true;
            }
            if left > 1 && self.any_occupied((top, bottom), (left - 1, left - 1)) {
                left -= 1;
                grown = true;
            }
            if self.any_occupied((top, bottom), (right + 1, right + 1)) {
                right += 1;
                grown = true;
            }

            if !grown {
                break;
            }
        }

        let begin = absolute_cell(top, left);
        if (top, left) == (bottom, right) {
            Ok(begin)
        } else {
            Ok(address::join(&begin, &absolute_cell(bottom, right)))
        }
    }

    fn range_values(&self, range: &str) -> Result<Vec<Vec<CellValue>>> {
        self.range_reads.set(self.range_reads.get() + 1);
        let (top, left, bottom, right) = parse_bounds(range)?;
        Ok((top..=bottom)
            .map(|r| {
                (left..=right)
                    .map(|c| self.cells.get(&(r, c)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    fn row_hyperlinks(&self, range: &str, row: usize) -> Result<Vec<String>> {
        self.hyperlink_queries.set(self.hyperlink_queries.get() + 1);
        let (top, left, _, right) = parse_bounds(range)?;
        let offset = u32::try_from(row)
            .ok()
            .and_then(|r| r.checked_sub(1))
            .ok_or_else(|| Error::source_error(format!("row {row} outside of {range}")))?;
        let target_row = top + offset;
        Ok((left..=right)
            .filter_map(|c| self.hyperlinks.get(&(target_row, c)))
            .flatten()
            .cloned()
            .collect())
    }
}

/// A workbook held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a worksheet at the end of the document.
    pub fn push(&mut self, sheet: MemorySheet) {
        self.sheets.push(sheet);
    }
}

impl Workbook for MemoryWorkbook {
    type Sheet = MemorySheet;

    fn worksheets(&self) -> Result<Vec<MemorySheet>> {
        Ok(self.sheets.clone())
    }
}

fn parse_cell(cell: &str) -> Result<Position> {
    let (col, row) = address::column_row(cell, AbsoluteMode::StrictRelative)?;
    let row: u32 = row.parse().map_err(|_| Error::malformed(cell))?;
    if row == 0 {
        return Err(Error::malformed(cell));
    }
    Ok((row, address::column_index(&col)?))
}

fn parse_bounds(range: &str) -> Result<Bounds> {
    let (begin, end) = address::split(range)?;
    let (r0, c0) = parse_cell(begin)?;
    let (r1, c1) = parse_cell(end.unwrap_or(begin))?;
    Ok((r0.min(r1), c0.min(c1), r0.max(r1), c0.max(c1)))
}

fn absolute_cell(row: u32, col: u32) -> String {
    format!("${}${}", address::column_letters(col), row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid() -> MemorySheet {
        let mut sheet = MemorySheet::new("Grid");
        sheet.set_row("A1", ["id", "name", "link"]).unwrap();
        sheet.set_row("A2", [CellValue::from(1), "alpha".into(), "go".into()]).unwrap();
        sheet.set_row("A3", [CellValue::from(2), "beta".into(), "go".into()]).unwrap();
        // Separated by an empty column and row, so outside A1's region.
        sheet.set_value("E5", "island").unwrap();
        sheet
    }

    #[test]
    fn test_current_region() {
        let sheet = grid();
        assert_eq!(sheet.current_region("A1").unwrap(), "$A$1:$C$3");
        assert_eq!(sheet.current_region("B2").unwrap(), "$A$1:$C$3");
        assert_eq!(sheet.current_region("E5").unwrap(), "$E$5");
        assert_eq!(sheet.current_region("H9").unwrap(), "$H$9");
    }

    #[test]
    fn test_current_region_follows_diagonals() {
        let mut sheet = MemorySheet::new("Diagonal");
        sheet.set_value("B2", 1).unwrap();
        sheet.set_value("C3", 2).unwrap();
        assert_eq!(sheet.current_region("B2").unwrap(), "$B$2:$C$3");
    }

    #[test]
    fn test_range_values() {
        let sheet = grid();
        let values = sheet.range_values("B2:C3").unwrap();
        assert_eq!(
            values,
            vec![
                vec![CellValue::from("alpha"), CellValue::from("go")],
                vec![CellValue::from("beta"), CellValue::from("go")],
            ]
        );
        assert_eq!(sheet.range_values("D1").unwrap(), vec![vec![CellValue::Empty]]);
        assert_eq!(sheet.range_reads(), 2);
    }

    #[test]
    fn test_row_hyperlinks() {
        let mut sheet = grid();
        sheet.add_hyperlink("C3", "https://example.com/beta").unwrap();
        assert!(sheet.row_hyperlinks("C2:C3", 1).unwrap().is_empty());
        assert_eq!(
            sheet.row_hyperlinks("C2:C3", 2).unwrap(),
            vec!["https://example.com/beta".to_string()]
        );
        assert!(sheet.row_hyperlinks("C2:C3", 0).is_err());
    }

    #[test]
    fn test_clear_cell() {
        let mut sheet = grid();
        sheet.set_value("A1", CellValue::Empty).unwrap();
        assert_eq!(sheet.cell_value("A1").unwrap(), CellValue::Empty);
    }
}
