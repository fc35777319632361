//! Workbook and worksheet handles exposing the bridge as an [`xl2json_core`] source.

use excel_com_protocol::{CellValue as WireValue, SheetRef};
use tracing::{info, warn};
use xl2json_core::{CellValue, Result};

use crate::bridge::{BridgeError, ExcelBridge};

/// A handle to an open workbook in the Excel COM bridge.
///
/// The workbook is closed without saving when [`Workbook::close`] is called
/// or the handle is dropped, whichever comes first.
pub struct Workbook<'a> {
    bridge: &'a ExcelBridge,
    handle: u64,
    path: String,
    closed: bool,
}

impl<'a> Workbook<'a> {
    pub(crate) fn new(bridge: &'a ExcelBridge, handle: u64, path: String) -> Self {
        Self {
            bridge,
            handle,
            path,
            closed: false,
        }
    }

    /// Get the internal handle ID.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Path the workbook was opened from, as seen by Excel.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the workbook, discarding any changes.
    pub fn close(mut self) -> std::result::Result<(), BridgeError> {
        self.release()
    }

    fn release(&mut self) -> std::result::Result<(), BridgeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.bridge.close_workbook(self.handle)?;
        info!("{} closed.", self.path);
        Ok(())
    }
}

impl Drop for Workbook<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to close {}: {e}", self.path);
        }
    }
}

impl<'a> xl2json_core::Workbook for Workbook<'a> {
    type Sheet = Worksheet<'a>;

    fn worksheets(&self) -> Result<Vec<Worksheet<'a>>> {
        let names = self.bridge.list_worksheets(self.handle)?;
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Worksheet {
                bridge: self.bridge,
                workbook: self.handle,
                index: index as u32,
                name,
            })
            .collect())
    }
}

/// One worksheet of an open workbook. Every read is a bridge round-trip.
pub struct Worksheet<'a> {
    bridge: &'a ExcelBridge,
    workbook: u64,
    index: u32,
    name: String,
}

impl Worksheet<'_> {
    fn sheet_ref(&self) -> SheetRef {
        SheetRef::Index(self.index)
    }
}

impl xl2json_core::Worksheet for Worksheet<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell_value(&self, cell: &str) -> Result<CellValue> {
        let value = self
            .bridge
            .get_cell_value(self.workbook, self.sheet_ref(), cell)?;
        Ok(from_wire(value))
    }

    fn current_region(&self, cell: &str) -> Result<String> {
        Ok(self
            .bridge
            .get_current_region(self.workbook, self.sheet_ref(), cell)?)
    }

    fn range_values(&self, range: &str) -> Result<Vec<Vec<CellValue>>> {
        let rows = self
            .bridge
            .get_range_values(self.workbook, self.sheet_ref(), range)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(from_wire).collect())
            .collect())
    }

    fn row_hyperlinks(&self, range: &str, row: usize) -> Result<Vec<String>> {
        let row = u32::try_from(row)
            .map_err(|_| xl2json_core::Error::source_error(format!("row {row} out of range")))?;
        Ok(self
            .bridge
            .get_row_hyperlinks(self.workbook, self.sheet_ref(), range, row)?)
    }
}

fn from_wire(value: WireValue) -> CellValue {
    match value {
        WireValue::Null => CellValue::Empty,
        WireValue::Bool(b) => CellValue::Bool(b),
        WireValue::Number(n) => CellValue::Number(n),
        WireValue::String(s) => CellValue::String(s),
        WireValue::Error(e) => CellValue::Error(e.code),
    }
}
