//! Shared protocol types for communication between the native Linux client
//! and the Windows COM bridge process running under WINE.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! Every command is read-only with respect to workbook contents.

use serde::{Deserialize, Serialize};

/// A command sent from the Linux client to the WINE bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM and create the Excel.Application instance.
    Init { visible: bool },

    /// Open an existing workbook from a file path (Windows path).
    OpenWorkbook { path: String },

    /// Close a workbook. With `mark_saved`, Excel is told the workbook has
    /// no pending changes first, so nothing is ever written back.
    CloseWorkbook { workbook: u64, mark_saved: bool },

    /// List worksheet names in document order.
    ListWorksheets { workbook: u64 },

    /// Get a single cell's value.
    GetCellValue {
        workbook: u64,
        sheet: SheetRef,
        cell: String,
    },

    /// Get the address of the current region around a cell.
    GetCurrentRegion {
        workbook: u64,
        sheet: SheetRef,
        cell: String,
    },

    /// Get all values of a range in one read, row-major.
    GetRangeValues {
        workbook: u64,
        sheet: SheetRef,
        range: String,
    },

    /// Get the hyperlink targets on one row (1-based) of a range.
    GetRowHyperlinks {
        workbook: u64,
        sheet: SheetRef,
        range: String,
        row: u32,
    },

    /// Shut down the bridge: close all workbooks, quit Excel, uninitialize COM.
    Shutdown,
}

/// Reference to a worksheet by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(u32),
    Name(String),
}

/// A cell value that can be sent to/from Excel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Error(CellError),
}

/// Excel error values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub code: String,
}

impl CellError {
    /// Display code for an Excel `xlErr*` number (the low word of a VT_ERROR scode).
    pub fn from_xl_code(code: u32) -> Self {
        let code = match code {
            2000 => "#NULL!".to_string(),
            2007 => "#DIV/0!".to_string(),
            2015 => "#VALUE!".to_string(),
            2023 => "#REF!".to_string(),
            2029 => "#NAME?".to_string(),
            2036 => "#NUM!".to_string(),
            2042 => "#N/A".to_string(),
            other => format!("#ERR({other})"),
        };
        Self { code }
    }
}

/// A response sent from the WINE bridge back to the Linux client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
///
/// Untagged, so every variant carries a distinct field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to a newly opened workbook.
    WorkbookHandle { workbook: u64 },
    /// A cell value.
    Value { value: CellValue },
    /// A range address such as `$A$1:$D$5`.
    Address { address: String },
    /// Range values, row-major.
    Values { values: Vec<Vec<CellValue>> },
    /// Worksheet names.
    Names { names: Vec<String> },
    /// Hyperlink target addresses.
    Hyperlinks { hyperlinks: Vec<String> },
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "<empty>"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Error(e) => write!(f, "{}", e.code),
        }
    }
}
