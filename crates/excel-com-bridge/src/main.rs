//! Excel COM Bridge: a Windows process that reads workbooks through Excel's
//! COM automation interface, controlled by JSON commands over stdin/stdout.
//!
//! Designed to be cross-compiled from Linux and run under WINE.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! - Reads `Request` objects from stdin
//! - Writes `Response` objects to stdout
//! - Diagnostic/log messages go to stderr (never stdout)

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;
#[cfg_attr(not(windows), allow(dead_code))]
mod numeric;

#[cfg(not(windows))]
fn main() {
    eprintln!("excel-com-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE on Linux.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead};

    use excel_com_protocol::*;

    // Use stderr for all diagnostic output so stdout stays clean for protocol
    eprintln!("[excel-com-bridge] Starting up...");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut excel: Option<excel::ExcelApp> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[excel-com-bridge] stdin read error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[excel-com-bridge] JSON parse error: {e}");
                eprintln!("[excel-com-bridge] Line was: {line}");
                // Send an error response with id=0 since we couldn't parse the request
                let resp = Response {
                    id: 0,
                    result: ResponseResult::Error {
                        message: format!("JSON parse error: {e}"),
                    },
                };
                send(&mut out, &resp);
                continue;
            }
        };

        let response = handle_command(&mut excel, &request);
        send(&mut out, &response);

        // Excel is gone after Shutdown either way; the client is waiting for us to exit
        if matches!(request.command, Command::Shutdown) {
            eprintln!("[excel-com-bridge] Shutdown complete, exiting.");
            break;
        }
    }

    // If Excel is still running when stdin closes, try to clean up
    if let Some(app) = excel {
        eprintln!("[excel-com-bridge] stdin closed, shutting down Excel...");
        let _ = app.shutdown();
    }

    eprintln!("[excel-com-bridge] Process exiting.");
}

/// Write one response line and flush it.
#[cfg(windows)]
fn send(out: &mut impl std::io::Write, response: &excel_com_protocol::Response) {
    match serde_json::to_string(response) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
            let _ = out.flush();
        }
        Err(e) => eprintln!("[excel-com-bridge] failed to encode response {}: {e}", response.id),
    }
}

#[cfg(windows)]
fn handle_command(
    excel: &mut Option<excel::ExcelApp>,
    request: &excel_com_protocol::Request,
) -> excel_com_protocol::Response {
    use excel_com_protocol::*;

    let id = request.id;

    let result = match &request.command {
        Command::Init { visible } => init_com_and_excel(excel, *visible),
        Command::OpenWorkbook { path } => with_excel(excel, |app| {
            let handle = app.open_workbook(path)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::WorkbookHandle { workbook: handle }),
            })
        }),
        Command::CloseWorkbook {
            workbook,
            mark_saved,
        } => with_excel(excel, |app| {
            app.close_workbook(*workbook, *mark_saved)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::ListWorksheets { workbook } => with_excel(excel, |app| {
            let names = app.list_worksheets(*workbook)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Names { names }),
            })
        }),
        Command::GetCellValue {
            workbook,
            sheet,
            cell,
        } => with_excel(excel, |app| {
            let value = app.get_cell_value(*workbook, sheet, cell)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Value { value }),
            })
        }),
        Command::GetCurrentRegion {
            workbook,
            sheet,
            cell,
        } => with_excel(excel, |app| {
            let address = app.get_current_region(*workbook, sheet, cell)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Address { address }),
            })
        }),
        Command::GetRangeValues {
            workbook,
            sheet,
            range,
        } => with_excel(excel, |app| {
            let values = app.get_range_values(*workbook, sheet, range)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Values { values }),
            })
        }),
        Command::GetRowHyperlinks {
            workbook,
            sheet,
            range,
            row,
        } => with_excel(excel, |app| {
            let hyperlinks = app.get_row_hyperlinks(*workbook, sheet, range, *row)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Hyperlinks { hyperlinks }),
            })
        }),
        Command::Shutdown => match excel.take() {
            Some(app) => match app.shutdown() {
                Ok(()) => {
                    uninit_com();
                    ResponseResult::Ok { data: None }
                }
                Err(e) => ResponseResult::Error {
                    message: format!("Shutdown failed: {e}"),
                },
            },
            None => ResponseResult::Ok { data: None },
        },
    };

    Response { id, result }
}

#[cfg(windows)]
fn init_com_and_excel(
    excel: &mut Option<excel::ExcelApp>,
    visible: bool,
) -> excel_com_protocol::ResponseResult {
    use excel_com_protocol::ResponseResult;
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if excel.is_some() {
        return ResponseResult::Ok { data: None }; // Already initialized
    }

    // Initialize COM in Single-Threaded Apartment mode (required by Excel)
    unsafe {
        let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        if let Err(e) = hr.ok() {
            return ResponseResult::Error {
                message: format!("CoInitializeEx failed: {e}"),
            };
        }
    }

    eprintln!("[excel-com-bridge] COM initialized (STA)");

    match excel::ExcelApp::new(visible) {
        Ok(app) => {
            eprintln!("[excel-com-bridge] Excel.Application created successfully");
            *excel = Some(app);
            ResponseResult::Ok { data: None }
        }
        Err(e) => ResponseResult::Error {
            message: format!("Failed to create Excel.Application: {e}"),
        },
    }
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    eprintln!("[excel-com-bridge] COM uninitialized");
}

#[cfg(windows)]
fn with_excel(
    excel: &mut Option<excel::ExcelApp>,
    f: impl FnOnce(&mut excel::ExcelApp) -> Result<excel_com_protocol::ResponseResult, String>,
) -> excel_com_protocol::ResponseResult {
    match excel.as_mut() {
        Some(app) => match f(app) {
            Ok(r) => r,
            Err(e) => excel_com_protocol::ResponseResult::Error { message: e },
        },
        None => excel_com_protocol::ResponseResult::Error {
            message: "Excel not initialized. Send 'Init' command first.".to_string(),
        },
    }
}
