//! xl2json - dump every worksheet of an Excel workbook to JSON files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xl2json_core::{export_workbook, ExportOptions, ExportReport};
use xl2json_excel_com::{ExcelBridge, ExcelBridgeConfig};

#[derive(Parser, Debug)]
#[command(name = "xl2json")]
#[command(
    author,
    version,
    about = "Convert the worksheets of an Excel workbook into JSON files"
)]
struct Cli {
    /// Workbook to convert, relative to DEST unless absolute
    filename: PathBuf,

    /// Output directory (must already exist)
    dest: PathBuf,

    /// Top-left cell of the table on every sheet
    #[arg(short, long, default_value = "A1")]
    origin: String,

    /// Column span to export, e.g. B:F (default: the origin's current region)
    #[arg(short, long)]
    columns: Option<String>,

    /// Column whose hyperlinks are appended to each row
    #[arg(short, long)]
    url: Option<String>,

    /// The table has no header row
    #[arg(short, long)]
    noheader: bool,

    /// Keep the Excel window hidden
    #[arg(short, long)]
    invisible: bool,

    /// Print arguments, parameters and the index
    #[arg(short, long)]
    verbose: bool,

    /// Path to excel-com-bridge.exe
    #[arg(long, value_name = "PATH")]
    bridge_exe: Option<PathBuf>,

    /// WINE executable
    #[arg(long, value_name = "PATH", default_value = "wine")]
    wine: PathBuf,

    /// WINEPREFIX for the bridge process
    #[arg(long, value_name = "DIR")]
    wine_prefix: Option<PathBuf>,

    /// Seconds to wait for Excel to quit before killing the bridge
    #[arg(long, value_name = "SECS", default_value = "30")]
    timeout: u64,
}

impl Cli {
    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            origin: self.origin.clone(),
            columns: self.columns.clone(),
            url: self.url.clone(),
            has_header: !self.noheader,
        }
    }

    fn bridge_config(&self) -> ExcelBridgeConfig {
        ExcelBridgeConfig {
            bridge_exe_path: self.bridge_exe.clone(),
            wine_path: self.wine.clone(),
            wine_prefix: self.wine_prefix.clone(),
            timeout: Duration::from_secs(self.timeout),
            visible: !self.invisible,
        }
    }

    /// The workbook path; an absolute `filename` ignores `dest`.
    fn workbook_path(&self) -> PathBuf {
        self.dest.join(&self.filename)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let (path, options) = prepare(cli)?;

    if cli.verbose {
        println!("{cli:#?}");
    }

    let report = convert(&path, &options, &cli.dest, cli.bridge_config())?;
    info!("{}", summary(&report));

    if cli.verbose {
        print_report(&report)?;
    }
    Ok(())
}

/// Everything that can be checked before Excel is started.
fn prepare(cli: &Cli) -> Result<(PathBuf, ExportOptions)> {
    if !cli.dest.is_dir() {
        bail!("Output directory not found: {}", cli.dest.display());
    }

    let options = cli.export_options();
    options.validate().context("Invalid address argument")?;

    Ok((cli.workbook_path(), options))
}

fn convert(
    path: &Path,
    options: &ExportOptions,
    dest: &Path,
    config: ExcelBridgeConfig,
) -> Result<ExportReport> {
    let bridge = ExcelBridge::start(config).context("Failed to start Excel")?;
    let book = bridge
        .open_workbook(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let report = export_workbook(&book, options, dest)
        .with_context(|| format!("Failed to export {}", path.display()))?;

    book.close()
        .with_context(|| format!("Failed to close {}", path.display()))?;
    bridge.shutdown().context("Failed to shut down Excel")?;
    Ok(report)
}

fn summary(report: &ExportReport) -> String {
    format!(
        "{} worksheet(s) exported, {} skipped",
        report.index.len(),
        report.skipped.len()
    )
}

fn print_report(report: &ExportReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&report.params).context("Failed to encode parameters")?
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&report.index).context("Failed to encode index")?
    );
    for (name, reason) in &report.skipped {
        println!("skipped {name}: {reason}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ffi::OsString;
    use xl2json_core::memory::{MemorySheet, MemoryWorkbook};

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["xl2json", "book.xlsx", "/tmp/out"]);
        assert_eq!(cli.export_options(), ExportOptions::default());

        let config = cli.bridge_config();
        assert!(config.visible);
        assert_eq!(config.wine_path, PathBuf::from("wine"));
        assert_eq!(config.bridge_exe_path, None);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "xl2json", "book.xlsx", "out", "-o", "B3", "-c", "B:F", "-u", "G", "-n", "-i", "-v",
        ]);
        assert_eq!(
            cli.export_options(),
            ExportOptions {
                origin: "B3".to_string(),
                columns: Some("B:F".to_string()),
                url: Some("G".to_string()),
                has_header: false,
            }
        );
        assert!(cli.verbose);
        assert!(!cli.bridge_config().visible);
    }

    #[test]
    fn test_bridge_flags() {
        let cli = Cli::parse_from([
            "xl2json",
            "book.xlsx",
            "out",
            "--bridge-exe",
            "/opt/bridge/excel-com-bridge.exe",
            "--wine",
            "/usr/bin/wine64",
            "--wine-prefix",
            "/home/me/.wine-excel",
            "--timeout",
            "5",
        ]);
        let config = cli.bridge_config();
        assert_eq!(
            config.bridge_exe_path,
            Some(PathBuf::from("/opt/bridge/excel-com-bridge.exe"))
        );
        assert_eq!(config.wine_path, PathBuf::from("/usr/bin/wine64"));
        assert_eq!(config.wine_prefix, Some(PathBuf::from("/home/me/.wine-excel")));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_workbook_path_joins_dest() {
        let cli = Cli::parse_from(["xl2json", "book.xlsx", "/data/out"]);
        assert_eq!(cli.workbook_path(), PathBuf::from("/data/out/book.xlsx"));

        let cli = Cli::parse_from(["xl2json", "/books/book.xlsx", "/data/out"]);
        assert_eq!(cli.workbook_path(), PathBuf::from("/books/book.xlsx"));
    }

    fn cli_in(dest: &Path, extra: &[&str]) -> Cli {
        let mut args: Vec<OsString> = vec![
            "xl2json".into(),
            "book.xlsx".into(),
            dest.as_os_str().to_owned(),
        ];
        args.extend(extra.iter().map(OsString::from));
        Cli::parse_from(args)
    }

    #[test]
    fn test_missing_dest_fails_before_excel() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_in(&dir.path().join("nope"), &[]);
        let err = prepare(&cli).unwrap_err();
        assert!(err.to_string().contains("Output directory not found"));
    }

    #[test]
    fn test_malformed_origin_fails_before_excel() {
        let dir = tempfile::tempdir().unwrap();
        assert!(prepare(&cli_in(dir.path(), &["-o", "1A"])).is_err());
        assert!(prepare(&cli_in(dir.path(), &["-c", "B:2"])).is_err());
        assert!(prepare(&cli_in(dir.path(), &["-u", "G7"])).is_err());
    }

    #[test]
    fn test_prepare_resolves_workbook_in_dest() {
        let dir = tempfile::tempdir().unwrap();
        let (path, options) = prepare(&cli_in(dir.path(), &["-n"])).unwrap();
        assert_eq!(path, dir.path().join("book.xlsx"));
        assert!(!options.has_header);
    }

    #[test]
    fn test_summary_counts_exports_and_skips() {
        let mut book = MemoryWorkbook::new();
        let mut data = MemorySheet::new("Data");
        data.set_row("A1", ["name", "qty"]).unwrap();
        data.set_row("A2", ["apple", "3"]).unwrap();
        book.push(data);
        book.push(MemorySheet::new("Blank"));

        let dir = tempfile::tempdir().unwrap();
        let report = export_workbook(&book, &ExportOptions::default(), dir.path()).unwrap();
        assert_eq!(summary(&report), "1 worksheet(s) exported, 1 skipped");
    }
}
