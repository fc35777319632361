//! Header row extraction.
//!
//! Headers are read once from the origin sheet and reused for every sheet of
//! the run; sheets are assumed to share one layout.

use crate::address;
use crate::error::Result;
use crate::source::Worksheet;

/// Column names found on `row` between `col_begin` and `col_end`.
pub fn read_headers<S: Worksheet>(
    sheet: &S,
    col_begin: &str,
    col_end: &str,
    row: u32,
) -> Result<Vec<String>> {
    let range = address::rect(col_begin, row, col_end, row);
    let values = sheet.range_values(&range)?;
    Ok(values
        .into_iter()
        .next()
        .unwrap_or_default()
        .iter()
        .map(|value| value.header_text())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySheet;
    use crate::CellValue;

    #[test]
    fn test_read_headers() {
        let mut sheet = MemorySheet::new("Sheet1");
        sheet
            .set_row("A1", [CellValue::from("Name"), CellValue::Empty, 2024.into()])
            .unwrap();
        let headers = read_headers(&sheet, "A", "C", 1).unwrap();
        assert_eq!(headers, vec!["Name", "", "2024"]);
        assert_eq!(sheet.range_reads(), 1);
    }

    #[test]
    fn test_read_headers_partial_span() {
        let mut sheet = MemorySheet::new("Sheet1");
        sheet.set_row("A3", ["skip", "keep", "also"]).unwrap();
        assert_eq!(read_headers(&sheet, "B", "C", 3).unwrap(), vec!["keep", "also"]);
    }
}
