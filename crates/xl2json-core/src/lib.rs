//! # xl2json-core
//!
//! The extraction engine behind `xl2json`: A1 address algebra, table region
//! resolution, header and row extraction, and the per-sheet JSON export.
//!
//! The engine reads through the [`Workbook`] and [`Worksheet`] traits, so the
//! same pipeline runs against a live spreadsheet application or the
//! in-memory [`memory::MemoryWorkbook`].
//!
//! ```
//! use xl2json_core::memory::{MemorySheet, MemoryWorkbook};
//! use xl2json_core::{export_workbook, ExportOptions};
//!
//! let mut sheet = MemorySheet::new("Sheet1");
//! sheet.set_row("A1", ["name", "qty"]).unwrap();
//! sheet.set_row("A2", ["apple", "3"]).unwrap();
//!
//! let mut book = MemoryWorkbook::new();
//! book.push(sheet);
//!
//! let dest = tempfile::tempdir().unwrap();
//! let report = export_workbook(&book, &ExportOptions::default(), dest.path()).unwrap();
//! assert_eq!(report.index.len(), 1);
//! ```

pub mod address;
pub mod error;
pub mod export;
pub mod header;
pub mod memory;
pub mod region;
pub mod source;
pub mod table;
pub mod value;

pub use error::{Error, Result};
pub use export::{
    export_workbook, write_json, ExportReport, Index, SheetExportRecord, SheetExporter,
    SheetOutcome, SkipReason, COLUMNS_FILE, INDEX_FILE,
};
pub use region::{make_params, resolve_region, ExportOptions, TableParams, TableRegion, URL_HEADER};
pub use source::{Workbook, Worksheet};
pub use table::{materialize, Row};
pub use value::CellValue;
