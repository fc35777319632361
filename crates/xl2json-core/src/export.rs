//! Per-sheet export and the JSON artifacts of a run.
//!
//! A run writes `sheet1.json`, `sheet2.json`, ... (one array of rows per
//! exported sheet, numbered by successful exports only), `columns.json`
//! when headers are enabled, and `index.json` mapping sheet names to the
//! files written for them.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::error::{Error, Result};
use crate::region::{self, ExportOptions, TableParams};
use crate::source::{Workbook, Worksheet};
use crate::table;

/// File holding the shared column names.
pub const COLUMNS_FILE: &str = "columns.json";

/// File holding the sheet name to output file mapping.
pub const INDEX_FILE: &str = "index.json";

/// Why a sheet produced no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The origin cell is empty.
    EmptyOriginCell,
    /// The region has no rows past the header.
    EmptyDataRegion,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyOriginCell => write!(f, "blank worksheet"),
            SkipReason::EmptyDataRegion => write!(f, "empty line worksheet"),
        }
    }
}

/// A sheet that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetExportRecord {
    pub sheet_name: String,
    pub file_path: PathBuf,
}

/// Result of exporting one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOutcome {
    Exported(SheetExportRecord),
    Skipped(SkipReason),
}

/// Sheet name to output file, in export order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    records: Vec<SheetExportRecord>,
}

impl Index {
    pub fn records(&self) -> &[SheetExportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Output file recorded for `sheet_name`.
    pub fn get(&self, sheet_name: &str) -> Option<&Path> {
        self.records
            .iter()
            .find(|r| r.sheet_name == sheet_name)
            .map(|r| r.file_path.as_path())
    }
}

impl Serialize for Index {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.sheet_name, &record.file_path.display().to_string())?;
        }
        map.end()
    }
}

/// Exports sheets one at a time into a destination directory.
pub struct SheetExporter<'a> {
    options: &'a ExportOptions,
    params: &'a TableParams,
    dest: PathBuf,
    index: Index,
}

impl<'a> SheetExporter<'a> {
    pub fn new(options: &'a ExportOptions, params: &'a TableParams, dest: impl Into<PathBuf>) -> Self {
        Self {
            options,
            params,
            dest: dest.into(),
            index: Index::default(),
        }
    }

    /// Export one sheet, or report why it was skipped.
    pub fn export_sheet<S: Worksheet>(&mut self, sheet: &S) -> Result<SheetOutcome> {
        let name = sheet.name();

        if sheet.cell_value(&self.options.origin)?.is_empty() {
            info!("Skipping blank worksheet at {name}");
            return Ok(SheetOutcome::Skipped(SkipReason::EmptyOriginCell));
        }

        let Some(region) = region::resolve_region(self.params, self.options, sheet)? else {
            info!("Skipping empty line worksheet at {name}");
            return Ok(SheetOutcome::Skipped(SkipReason::EmptyDataRegion));
        };

        let rows = table::materialize(sheet, &region)?;

        let counter = self.index.len() + 1;
        let file_path = self.dest.join(format!("sheet{counter}.json"));
        write_json(&file_path, &rows)?;
        info!("{counter}: {}: {name}", file_path.display());

        let record = SheetExportRecord {
            sheet_name: name.to_string(),
            file_path,
        };
        self.index.records.push(record.clone());
        Ok(SheetOutcome::Exported(record))
    }

    /// Write `columns.json` (when headers are enabled) and `index.json`.
    pub fn finish(self) -> Result<Index> {
        if self.params.has_header {
            if let Some(headers) = &self.params.headers {
                write_json(&self.dest.join(COLUMNS_FILE), headers)?;
            }
        }
        write_json(&self.dest.join(INDEX_FILE), &self.index)?;
        Ok(self.index)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub params: TableParams,
    pub index: Index,
    /// Sheets that produced no file, in document order.
    pub skipped: Vec<(String, SkipReason)>,
}

/// Export every worksheet of `workbook` into `dest`.
///
/// The first worksheet fixes the layout for all others.
pub fn export_workbook<W: Workbook>(
    workbook: &W,
    options: &ExportOptions,
    dest: &Path,
) -> Result<ExportReport> {
    options.validate()?;

    let sheets = workbook.worksheets()?;
    let first = sheets
        .first()
        .ok_or_else(|| Error::source_error("workbook has no worksheets"))?;
    let params = region::make_params(options, first)?;

    let mut exporter = SheetExporter::new(options, &params, dest);
    let mut skipped = Vec::new();
    for sheet in &sheets {
        if let SheetOutcome::Skipped(reason) = exporter.export_sheet(sheet)? {
            skipped.push((sheet.name().to_string(), reason));
        }
    }
    let index = exporter.finish()?;

    Ok(ExportReport {
        params,
        index,
        skipped,
    })
}

/// Write `value` as UTF-8 JSON indented by four spaces.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut ser =
        serde_json::Serializer::with_formatter(BufWriter::new(file), PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    ser.into_inner().flush().map_err(io_error)
}
