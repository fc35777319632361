//! Excel-specific COM automation layer built on top of the generic IDispatch wrapper.

#![cfg(windows)]

use std::collections::HashMap;

use windows::Win32::System::Variant::VARIANT;

use excel_com_protocol::{CellError, CellValue, SheetRef};

use crate::dispatch::{
    variant_bool, variant_get_2d_array, variant_get_bool, variant_get_error_code,
    variant_get_f64, variant_get_i32, variant_get_string, variant_i32, variant_is_array,
    variant_is_empty, variant_str, DispatchObject,
};

/// Manages an Excel.Application COM instance and its open workbooks.
pub struct ExcelApp {
    app: DispatchObject,
    workbooks_collection: DispatchObject,
    /// Map from our handle IDs to workbook dispatch objects.
    workbooks: HashMap<u64, DispatchObject>,
    next_handle: u64,
}

impl ExcelApp {
    /// Create a new Excel.Application instance via COM.
    pub fn new(visible: bool) -> Result<Self, String> {
        let app = DispatchObject::create_from_progid("Excel.Application")?;

        app.set_property("Visible", variant_bool(visible))?;
        // Opening a workbook must never wait on a modal prompt.
        app.set_property("DisplayAlerts", variant_bool(false))?;
        app.set_property("AskToUpdateLinks", variant_bool(false))?;

        let workbooks_collection = app.get_child("Workbooks")?;

        Ok(Self {
            app,
            workbooks_collection,
            workbooks: HashMap::new(),
            next_handle: 1,
        })
    }

    /// Open a workbook from a file path. Returns the handle ID.
    pub fn open_workbook(&mut self, path: &str) -> Result<u64, String> {
        let wb = self
            .workbooks_collection
            .invoke_child("Open", &[variant_str(path)])?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        Ok(handle)
    }

    fn get_workbook(&self, wb_handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&wb_handle)
            .ok_or_else(|| format!("Unknown workbook handle: {wb_handle}"))
    }

    /// Worksheet names in document order.
    pub fn list_worksheets(&self, wb_handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.get_workbook(wb_handle)?.get_child("Worksheets")?;
        let count = variant_get_i32(&sheets.get_property("Count")?)
            .ok_or_else(|| "Worksheets.Count is not a number".to_string())?;

        (1..=count)
            .map(|i| {
                let sheet = sheets.get_indexed("Item", &variant_i32(i))?;
                variant_get_string(&sheet.get_property("Name")?)
                    .ok_or_else(|| format!("Worksheet {i} has no name"))
            })
            .collect()
    }

    /// Get a worksheet from a workbook.
    fn get_sheet(&self, wb_handle: u64, sheet: &SheetRef) -> Result<DispatchObject, String> {
        let sheets = self.get_workbook(wb_handle)?.get_child("Worksheets")?;
        match sheet {
            SheetRef::Index(idx) => {
                // Excel worksheets are 1-based, our protocol uses 0-based
                let excel_index = (*idx as i32) + 1;
                sheets.get_indexed("Item", &variant_i32(excel_index))
            }
            SheetRef::Name(name) => sheets.get_indexed("Item", &variant_str(name)),
        }
    }

    /// Get a Range object for a cell or range reference.
    fn get_range(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        reference: &str,
    ) -> Result<DispatchObject, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        ws.get_indexed("Range", &variant_str(reference))
    }

    /// Get a cell's value.
    pub fn get_cell_value(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        cell_ref: &str,
    ) -> Result<CellValue, String> {
        let range = self.get_range(wb_handle, sheet, cell_ref)?;
        let variant = range.get_property("Value")?;
        Ok(variant_to_cell_value(&variant))
    }

    /// Address of the current region around a cell, e.g. `$A$1:$D$5`.
    pub fn get_current_region(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        cell_ref: &str,
    ) -> Result<String, String> {
        let region = self
            .get_range(wb_handle, sheet, cell_ref)?
            .get_child("CurrentRegion")?;
        variant_get_string(&region.get_property("Address")?)
            .ok_or_else(|| "CurrentRegion.Address is not a string".to_string())
    }

    /// All values of a range in a single `Value` read, row-major.
    pub fn get_range_values(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        range_ref: &str,
    ) -> Result<Vec<Vec<CellValue>>, String> {
        let range = self.get_range(wb_handle, sheet, range_ref)?;
        let variant = range.get_property("Value")?;

        // A single-cell range yields a scalar rather than an array.
        if !variant_is_array(&variant) {
            return Ok(vec![vec![variant_to_cell_value(&variant)]]);
        }

        variant_get_2d_array(&variant, variant_to_cell_value)
    }

    /// Hyperlink targets on the `row`-th (1-based) row of a range.
    pub fn get_row_hyperlinks(
        &self,
        wb_handle: u64,
        sheet: &SheetRef,
        range_ref: &str,
        row: u32,
    ) -> Result<Vec<String>, String> {
        let range = self.get_range(wb_handle, sheet, range_ref)?;
        let row_range = range
            .get_child("Rows")?
            .get_indexed("Item", &variant_i32(row as i32))?;
        let hyperlinks = row_range.get_child("Hyperlinks")?;
        let count = variant_get_i32(&hyperlinks.get_property("Count")?).unwrap_or(0);

        (1..=count)
            .map(|i| {
                let link = hyperlinks.get_indexed("Item", &variant_i32(i))?;
                Ok(variant_get_string(&link.get_property("Address")?).unwrap_or_default())
            })
            .collect()
    }

    /// Close a workbook without saving. With `mark_saved`, the workbook is
    /// flagged as unmodified first so Excel has nothing to prompt about.
    pub fn close_workbook(&mut self, wb_handle: u64, mark_saved: bool) -> Result<(), String> {
        let wb = self
            .workbooks
            .remove(&wb_handle)
            .ok_or_else(|| format!("Unknown workbook handle: {wb_handle}"))?;
        if mark_saved {
            wb.set_property("Saved", variant_bool(true))?;
        }
        wb.invoke_method("Close", &[variant_bool(false)])?;
        Ok(())
    }

    /// Shut down: close all workbooks and quit Excel.
    pub fn shutdown(mut self) -> Result<(), String> {
        let handles: Vec<u64> = self.workbooks.keys().copied().collect();
        for h in handles {
            let _ = self.close_workbook(h, true);
        }
        self.app.invoke_method("Quit", &[])?;
        Ok(())
    }
}

/// Convert a COM VARIANT to our protocol CellValue.
fn variant_to_cell_value(variant: &VARIANT) -> CellValue {
    if variant_is_empty(variant) {
        CellValue::Null
    } else if let Some(b) = variant_get_bool(variant) {
        CellValue::Bool(b)
    } else if let Some(n) = variant_get_f64(variant) {
        CellValue::Number(n)
    } else if let Some(s) = variant_get_string(variant) {
        CellValue::String(s)
    } else if let Some(code) = variant_get_error_code(variant) {
        CellValue::Error(CellError::from_xl_code(code))
    } else {
        CellValue::Null
    }
}
