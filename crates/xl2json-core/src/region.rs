//! Table region resolution.
//!
//! Resolution runs in two stages. [`make_params`] inspects the first sheet
//! once and fixes the column span, the first data row and the header names
//! for the whole run. [`resolve_region`] then only looks up where each
//! sheet's data ends, so every sheet is cut with the same columns.

use serde::Serialize;
use tracing::debug;

use crate::address;
use crate::error::Result;
use crate::header;
use crate::source::Worksheet;

/// Name of the column appended when hyperlink targets are extracted.
pub const URL_HEADER: &str = "URL";

/// What to extract from each sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Top-left anchor of the table on every sheet.
    pub origin: String,
    /// `B:C`-style column span; derived from the first sheet when absent.
    pub columns: Option<String>,
    /// Column whose hyperlink targets are appended to each row.
    pub url: Option<String>,
    /// Whether the first row at `origin` names the columns.
    pub has_header: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            origin: "A1".to_string(),
            columns: None,
            url: None,
            has_header: true,
        }
    }
}

impl ExportOptions {
    /// Check every address before anything is read.
    pub fn validate(&self) -> Result<()> {
        address::column_row(&self.origin, address::AbsoluteMode::StrictRelative)?;
        if let Some(columns) = &self.columns {
            address::column_label(address::begin_at(columns)?)?;
            address::column_label(address::end_at(columns)?)?;
        }
        if let Some(url) = &self.url {
            address::column_label(url)?;
        }
        Ok(())
    }
}

/// Layout shared by every sheet of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableParams {
    pub col_begin: String,
    pub col_end: String,
    /// First data row, already past the header row when there is one.
    pub row_begin: u32,
    pub has_header: bool,
    pub headers: Option<Vec<String>>,
}

/// Ranges to read from one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion {
    pub whole_table: String,
    pub url_table: Option<String>,
}

/// Last cell of the current region around `origin`.
pub fn end_of_current_region<S: Worksheet>(sheet: &S, origin: &str) -> Result<String> {
    let region = sheet.current_region(origin)?;
    Ok(address::end_at(&region)?.to_string())
}

/// Compute the run-wide layout from the origin sheet.
pub fn make_params<S: Worksheet>(options: &ExportOptions, sheet: &S) -> Result<TableParams> {
    let end = end_of_current_region(sheet, &options.origin)?;
    let begin = options.origin.as_str();

    let (col_begin, col_end) = match &options.columns {
        Some(columns) => (
            address::column_label(address::begin_at(columns)?)?,
            address::column_label(address::end_at(columns)?)?,
        ),
        None => (address::column(begin)?, address::column(&end)?),
    };

    let mut row_begin = address::row(begin)?;
    let headers = if options.has_header {
        let names = header::read_headers(sheet, &col_begin, &col_end, row_begin)?;
        row_begin += 1;
        Some(names)
    } else {
        None
    };

    let headers = headers.map(|mut names| {
        if options.url.is_some() {
            names.push(URL_HEADER.to_string());
        }
        names
    });

    let params = TableParams {
        col_begin,
        col_end,
        row_begin,
        has_header: options.has_header,
        headers,
    };
    debug!(?params, sheet = sheet.name(), "resolved table parameters");
    Ok(params)
}

/// Ranges to read from `sheet`, or `None` when it has no data rows.
pub fn resolve_region<S: Worksheet>(
    params: &TableParams,
    options: &ExportOptions,
    sheet: &S,
) -> Result<Option<TableRegion>> {
    let end = end_of_current_region(sheet, &options.origin)?;

    let row_end = address::row(&end)?;
    let row_begin = params.row_begin;
    if row_begin > row_end {
        return Ok(None);
    }

    let whole_table = address::rect(&params.col_begin, row_begin, &params.col_end, row_end);
    let url_table = match &options.url {
        Some(url) => {
            let url = address::column_label(url)?;
            Some(address::rect(&url, row_begin, &url, row_end))
        }
        None => None,
    };

    debug!(sheet = sheet.name(), %whole_table, ?url_table, "resolved region");
    Ok(Some(TableRegion {
        whole_table,
        url_table,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySheet;
    use crate::{CellValue, Error};
    use pretty_assertions::assert_eq;

    /// 4 columns, a header row and 4 data rows at A1:D5.
    fn sheet() -> MemorySheet {
        let mut sheet = MemorySheet::new("Sales");
        sheet.set_row("A1", ["Region", "Product", "Link", "Units"]).unwrap();
        for (i, region) in ["North", "South", "East", "West"].iter().enumerate() {
            let row = i as i32 + 2;
            sheet
                .set_row(
                    &format!("A{row}"),
                    [CellValue::from(*region), "Widget".into(), "open".into(), row.into()],
                )
                .unwrap();
        }
        sheet
    }

    #[test]
    fn test_params_with_header() {
        let params = make_params(&ExportOptions::default(), &sheet()).unwrap();
        assert_eq!(params.col_begin, "A");
        assert_eq!(params.col_end, "D");
        assert_eq!(params.row_begin, 2);
        assert!(params.has_header);
        assert_eq!(
            params.headers,
            Some(vec![
                "Region".to_string(),
                "Product".to_string(),
                "Link".to_string(),
                "Units".to_string(),
            ])
        );
    }

    #[test]
    fn test_params_without_header() {
        let options = ExportOptions {
            has_header: false,
            ..Default::default()
        };
        let params = make_params(&options, &sheet()).unwrap();
        assert_eq!(params.row_begin, 1);
        assert_eq!(params.headers, None);
    }

    #[test]
    fn test_params_with_url_column() {
        let options = ExportOptions {
            url: Some("C".into()),
            ..Default::default()
        };
        let params = make_params(&options, &sheet()).unwrap();
        let headers = params.headers.unwrap();
        assert_eq!(headers.len(), 5);
        assert_eq!(headers.last().map(String::as_str), Some(URL_HEADER));
    }

    #[test]
    fn test_params_with_column_override() {
        let options = ExportOptions {
            columns: Some("B:C".into()),
            ..Default::default()
        };
        let params = make_params(&options, &sheet()).unwrap();
        assert_eq!((params.col_begin.as_str(), params.col_end.as_str()), ("B", "C"));
        assert_eq!(
            params.headers,
            Some(vec!["Product".to_string(), "Link".to_string()])
        );
    }

    #[test]
    fn test_params_with_offset_origin() {
        let mut sheet = MemorySheet::new("Offset");
        sheet.set_row("B3", ["x", "y"]).unwrap();
        sheet.set_row("B4", [1, 2]).unwrap();
        let options = ExportOptions {
            origin: "B3".into(),
            ..Default::default()
        };
        let params = make_params(&options, &sheet).unwrap();
        assert_eq!((params.col_begin.as_str(), params.col_end.as_str()), ("B", "C"));
        assert_eq!(params.row_begin, 4);
    }

    #[test]
    fn test_resolve_region() {
        let sheet = sheet();
        let options = ExportOptions {
            url: Some("C".into()),
            ..Default::default()
        };
        let params = make_params(&options, &sheet).unwrap();
        let region = resolve_region(&params, &options, &sheet).unwrap().unwrap();
        assert_eq!(region.whole_table, "A2:D5");
        assert_eq!(region.url_table.as_deref(), Some("C2:C5"));
    }

    #[test]
    fn test_resolve_region_uses_each_sheets_own_end() {
        let options = ExportOptions::default();
        let params = make_params(&options, &sheet()).unwrap();

        let mut shorter = MemorySheet::new("Short");
        shorter.set_row("A1", ["a", "b", "c", "d"]).unwrap();
        shorter.set_row("A2", [1, 2, 3, 4]).unwrap();
        let region = resolve_region(&params, &options, &shorter).unwrap().unwrap();
        assert_eq!(region.whole_table, "A2:D2");
        assert_eq!(region.url_table, None);
    }

    #[test]
    fn test_header_only_sheet_has_no_region() {
        let options = ExportOptions::default();
        let params = make_params(&options, &sheet()).unwrap();

        let mut header_only = MemorySheet::new("Empty");
        header_only.set_row("A1", ["a", "b", "c", "d"]).unwrap();
        assert_eq!(resolve_region(&params, &options, &header_only).unwrap(), None);
    }

    #[test]
    fn test_validate() {
        assert!(ExportOptions::default().validate().is_ok());

        let bad_origin = ExportOptions {
            origin: "1A".into(),
            ..Default::default()
        };
        assert!(matches!(bad_origin.validate(), Err(Error::MalformedAddress(_))));

        let bad_columns = ExportOptions {
            columns: Some("B2:C".into()),
            ..Default::default()
        };
        assert!(bad_columns.validate().is_err());

        let bad_url = ExportOptions {
            url: Some("C:D".into()),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let single_column = ExportOptions {
            columns: Some("$B".into()),
            url: Some("e".into()),
            ..Default::default()
        };
        assert!(single_column.validate().is_ok());
    }
}
