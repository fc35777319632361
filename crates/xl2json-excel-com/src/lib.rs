//! Native Linux client for Excel COM automation via a WINE bridge process,
//! exposed as an [`xl2json_core`] worksheet source.
//!
//! This crate spawns a Windows `.exe` under WINE that automates Excel through COM,
//! communicating over JSON-over-stdio.
//!
//! # Architecture
//!
//! ```text
//! xl2json (native Linux)
//!     └── ExcelBridge (this crate)
//!           └── spawns: wine excel-com-bridge.exe
//!                 └── COM: Excel.Application
//! ```
//!
//! Both the session and each open workbook release themselves on drop: the
//! workbook is closed as saved-without-changes and Excel is told to quit.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use xl2json_core::{export_workbook, ExportOptions};
//! use xl2json_excel_com::{ExcelBridge, ExcelBridgeConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = ExcelBridge::start(ExcelBridgeConfig::default())?;
//!     let book = bridge.open_workbook(Path::new("/data/book.xlsx"))?;
//!     let report = export_workbook(&book, &ExportOptions::default(), Path::new("/data"))?;
//!     println!("exported {} sheets", report.index.len());
//!     book.close()?;
//!     bridge.shutdown()?;
//!     Ok(())
//! }
//! ```

mod bridge;
mod workbook;

pub use bridge::{linux_to_wine_path, BridgeError, ExcelBridge, ExcelBridgeConfig};
pub use excel_com_protocol::SheetRef;
pub use workbook::{Workbook, Worksheet};
