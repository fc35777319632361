//! Subprocess management and JSON IPC for the WINE bridge process.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use excel_com_protocol::{
    CellValue, Command as BridgeCommand, Request, Response, ResponseData, ResponseResult, SheetRef,
};
use tracing::{debug, info, trace, warn};

use crate::workbook::Workbook;

/// Errors from the Excel COM bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn WINE bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Bridge connection is unusable after a panic")]
    Poisoned,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    BridgeError(String),

    #[error("Bridge did not exit within {0:?} and was killed")]
    ShutdownTimeout(Duration),

    #[error("Unexpected response data")]
    UnexpectedResponse,

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),
}

impl From<BridgeError> for xl2json_core::Error {
    fn from(err: BridgeError) -> Self {
        xl2json_core::Error::source_error(err.to_string())
    }
}

/// Configuration for the Excel COM bridge.
#[derive(Debug, Clone)]
pub struct ExcelBridgeConfig {
    /// Path to the `excel-com-bridge.exe` Windows executable.
    /// If None, will search in common locations relative to the current binary.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine".
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,

    /// How long to wait for the bridge to exit after `Shutdown` before killing it.
    pub timeout: Duration,

    /// Whether Excel shows its window while working.
    pub visible: bool,
}

impl Default for ExcelBridgeConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
            timeout: Duration::from_secs(30),
            visible: true,
        }
    }
}

/// A running Excel automation session.
///
/// Dropping the session shuts Excel down and reaps the bridge process, so a
/// session never outlives the scope that started it, even on error paths.
/// Use [`ExcelBridge::shutdown`] to observe shutdown failures.
pub struct ExcelBridge {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    next_id: AtomicU64,
    timeout: Duration,
    released: bool,
}

impl ExcelBridge {
    /// Start the bridge process and initialize Excel.
    pub fn start(config: ExcelBridgeConfig) -> Result<Self, BridgeError> {
        let exe_path = config.bridge_exe_path.unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = std::process::Command::new(&config.wine_path);

        if let Some(prefix) = &config.wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }

        cmd.arg(&exe_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        info!("Starting Excel bridge: {}", exe_path.display());
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BridgeError::NotRunning);
            }
        };

        let bridge = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
            timeout: config.timeout,
            released: false,
        };

        // On failure `bridge` is dropped here, which stops the process again.
        bridge.send_command(BridgeCommand::Init {
            visible: config.visible,
        })?;

        Ok(bridge)
    }

    /// Send a command to the bridge and wait for the response.
    fn send_command(&self, command: BridgeCommand) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.write_request(command)?;
        self.read_response(id)
    }

    /// Write one request line and return its id.
    fn write_request(&self, command: BridgeCommand) -> Result<u64, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;
        trace!("-> {json}");

        let mut stdin = self.stdin.lock().map_err(|_| BridgeError::Poisoned)?;
        writeln!(stdin, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        stdin
            .flush()
            .map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        Ok(id)
    }

    /// Block until the response to request `id` arrives.
    fn read_response(&self, id: u64) -> Result<Option<ResponseData>, BridgeError> {
        let response: Response = {
            let mut stdout = self.stdout.lock().map_err(|_| BridgeError::Poisoned)?;
            let mut line = String::new();
            stdout
                .read_line(&mut line)
                .map_err(|e| BridgeError::ReadFailed(e.to_string()))?;

            if line.is_empty() {
                return Err(BridgeError::NotRunning);
            }

            trace!("<- {}", line.trim_end());
            serde_json::from_str(&line)?
        };

        if response.id != id {
            return Err(BridgeError::ReadFailed(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(BridgeError::BridgeError(message)),
        }
    }

    /// Open an existing workbook from a Linux path.
    ///
    /// The workbook is closed, without saving, when the returned handle is
    /// closed or dropped.
    pub fn open_workbook(&self, path: &Path) -> Result<Workbook<'_>, BridgeError> {
        self.open_workbook_raw_path(&linux_to_wine_path(path))
    }

    /// Open a workbook using a raw Windows/WINE path (no conversion).
    pub fn open_workbook_raw_path(&self, wine_path: &str) -> Result<Workbook<'_>, BridgeError> {
        info!("Opening {wine_path} ...");
        let data = self.send_command(BridgeCommand::OpenWorkbook {
            path: wine_path.to_string(),
        })?;
        match data {
            Some(ResponseData::WorkbookHandle { workbook }) => {
                Ok(Workbook::new(self, workbook, wine_path.to_string()))
            }
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Shut down the bridge: close all workbooks, quit Excel, and terminate the process.
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), BridgeError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // The reply is only read once the process is gone, so a hung Quit
        // cannot block past the timeout.
        let sent = self.write_request(BridgeCommand::Shutdown);

        let exited = {
            let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            self.wait_or_kill(&mut child)?
        };

        let id = sent?;
        if !exited {
            return Err(BridgeError::ShutdownTimeout(self.timeout));
        }
        self.read_response(id).map(|_| ())
    }

    /// Wait for the process to exit; kill it once the timeout passes.
    /// Returns whether it exited on its own.
    fn wait_or_kill(&self, child: &mut Child) -> Result<bool, BridgeError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait()? {
                Some(status) => {
                    debug!("Bridge exited with {status}");
                    return Ok(true);
                }
                None if Instant::now() >= deadline => {
                    warn!("Bridge did not exit within {:?}, killing it", self.timeout);
                    child.kill()?;
                    child.wait()?;
                    return Ok(false);
                }
                None => thread::sleep(Duration::from_millis(50)),
            }
        }
    }

    // -- Internal methods used by Workbook and Worksheet --

    pub(crate) fn list_worksheets(&self, workbook: u64) -> Result<Vec<String>, BridgeError> {
        match self.send_command(BridgeCommand::ListWorksheets { workbook })? {
            Some(ResponseData::Names { names }) => Ok(names),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_cell_value(
        &self,
        workbook: u64,
        sheet: SheetRef,
        cell: &str,
    ) -> Result<CellValue, BridgeError> {
        let data = self.send_command(BridgeCommand::GetCellValue {
            workbook,
            sheet,
            cell: cell.to_string(),
        })?;
        match data {
            Some(ResponseData::Value { value }) => Ok(value),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_current_region(
        &self,
        workbook: u64,
        sheet: SheetRef,
        cell: &str,
    ) -> Result<String, BridgeError> {
        let data = self.send_command(BridgeCommand::GetCurrentRegion {
            workbook,
            sheet,
            cell: cell.to_string(),
        })?;
        match data {
            Some(ResponseData::Address { address }) => Ok(address),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_range_values(
        &self,
        workbook: u64,
        sheet: SheetRef,
        range: &str,
    ) -> Result<Vec<Vec<CellValue>>, BridgeError> {
        let data = self.send_command(BridgeCommand::GetRangeValues {
            workbook,
            sheet,
            range: range.to_string(),
        })?;
        match data {
            Some(ResponseData::Values { values }) => Ok(values),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_row_hyperlinks(
        &self,
        workbook: u64,
        sheet: SheetRef,
        range: &str,
        row: u32,
    ) -> Result<Vec<String>, BridgeError> {
        let data = self.send_command(BridgeCommand::GetRowHyperlinks {
            workbook,
            sheet,
            range: range.to_string(),
            row,
        })?;
        match data {
            Some(ResponseData::Hyperlinks { hyperlinks }) => Ok(hyperlinks),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn close_workbook(&self, workbook: u64) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::CloseWorkbook {
            workbook,
            mark_saved: true,
        })?;
        Ok(())
    }
}

impl Drop for ExcelBridge {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Excel bridge shutdown failed: {e}");
        }
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
/// The WINE prefix's `drive_c` maps to `C:\`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    // WINE maps the root filesystem to Z:
    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Attempt to locate the bridge exe relative to the current executable or in common paths.
fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join("excel-com-bridge.exe");
        if candidate.exists() {
            return candidate;
        }
    }

    // Development builds
    for profile in ["release", "debug"] {
        let candidate = PathBuf::from(format!(
            "target/x86_64-pc-windows-gnu/{profile}/excel-com-bridge.exe"
        ));
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from("excel-com-bridge.exe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_to_wine_path() {
        assert_eq!(
            linux_to_wine_path(Path::new("/home/user/book.xlsx")),
            r"Z:\home\user\book.xlsx"
        );
    }

    #[test]
    fn test_missing_bridge_exe() {
        let config = ExcelBridgeConfig {
            bridge_exe_path: Some(PathBuf::from("/nonexistent/excel-com-bridge.exe")),
            ..Default::default()
        };
        assert!(matches!(
            ExcelBridge::start(config),
            Err(BridgeError::BridgeExeNotFound(_))
        ));
    }

    /// A bridge whose process never reads a request or answers one.
    #[cfg(unix)]
    fn silent_bridge(timeout: Duration) -> ExcelBridge {
        let mut child = std::process::Command::new("sh")
            .args(["-c", "exec sleep 30"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        ExcelBridge {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
            timeout,
            released: false,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_release_kills_process_behind_poisoned_lock() {
        let bridge = silent_bridge(Duration::from_millis(200));
        let pid = bridge.child.lock().unwrap().id();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = bridge.child.lock().unwrap();
            panic!("panic while holding the child lock");
        }));
        assert!(bridge.child.is_poisoned());

        let err = bridge.shutdown().unwrap_err();
        assert!(matches!(err, BridgeError::ShutdownTimeout(_)));

        let alive = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[test]
    fn test_bridge_error_converts_to_source_error() {
        let err: xl2json_core::Error = BridgeError::BridgeError("no such sheet".into()).into();
        assert!(matches!(err, xl2json_core::Error::Source(msg) if msg.contains("no such sheet")));
    }
}
