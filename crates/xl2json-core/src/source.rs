//! The boundary to a live spreadsheet application.
//!
//! The engine never talks to a spreadsheet directly; it asks a [`Workbook`]
//! for its worksheets and each [`Worksheet`] for values, regions and
//! hyperlinks. Every call may be a round-trip to another process, so the
//! engine keeps the number of calls per sheet small: one probe of the origin
//! cell, one current-region lookup, one bulk value read, plus one hyperlink
//! query per data row when a URL column is requested.

use crate::error::Result;
use crate::value::CellValue;

/// A single worksheet of an open workbook.
pub trait Worksheet {
    /// Sheet name as shown on its tab.
    fn name(&self) -> &str;

    /// Value of one cell.
    fn cell_value(&self, cell: &str) -> Result<CellValue>;

    /// Address of the current region around `cell`: the maximal rectangle of
    /// contiguous non-empty cells containing it.
    fn current_region(&self, cell: &str) -> Result<String>;

    /// Values of a rectangle, row-major. Always a matrix, even for one cell.
    fn range_values(&self, range: &str) -> Result<Vec<Vec<CellValue>>>;

    /// Hyperlink targets attached to the `row`-th row (1-based) of `range`,
    /// in the order the application reports them.
    fn row_hyperlinks(&self, range: &str, row: usize) -> Result<Vec<String>>;
}

/// An open workbook.
pub trait Workbook {
    type Sheet: Worksheet;

    /// Worksheets in document order.
    fn worksheets(&self) -> Result<Vec<Self::Sheet>>;
}
