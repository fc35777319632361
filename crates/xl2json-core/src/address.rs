//! A1-style address algebra.
//!
//! Addresses are handled as text: a cell is a column label followed by a
//! 1-based row number (`B12`), either part optionally fixed with a `$`
//! marker (`$B$12`, `B$12`, `$B12`). A range joins two cells with a colon
//! (`A1:D5`); a bare cell is a degenerate range whose end is its begin.
//!
//! Live spreadsheet regions always come back fully `$`-qualified while user
//! input is usually relative, so decomposition is parameterized by
//! [`AbsoluteMode`] instead of keeping one grammar per caller.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([$A-Za-z0-9]+)(?::([$A-Za-z0-9]+))?$").unwrap());

static CELL_AS_IS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\$?[A-Za-z]+)(\$?[0-9]+)$").unwrap());

static CELL_RELATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]+)\$?([0-9]+)$").unwrap());

static COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$?([A-Za-z]+)$").unwrap());

/// A maximal run of letters or of digits, with the marker already in front of it, if any.
static RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$?([A-Za-z]+|[0-9]+)").unwrap());

/// How [`column_row`] treats `$` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsoluteMode {
    /// Return both parts exactly as written, markers included.
    AsIs,
    /// Return bare column letters and row digits with markers dropped.
    StrictRelative,
    /// Mark every part absolute first, then behave like [`AbsoluteMode::AsIs`].
    ForceAbsolute,
}

/// Join two cell addresses into `begin:end`.
pub fn join(begin: &str, end: &str) -> String {
    format!("{begin}:{end}")
}

/// Split `BEGIN` or `BEGIN:END` into its halves.
///
/// ```
/// use xl2json_core::address;
///
/// assert_eq!(address::split("A1:D5").unwrap(), ("A1", Some("D5")));
/// assert_eq!(address::split("$B$3").unwrap(), ("$B$3", None));
/// ```
pub fn split(address: &str) -> Result<(&str, Option<&str>)> {
    let caps = RANGE
        .captures(address)
        .ok_or_else(|| Error::malformed(address))?;
    let begin = caps.get(1).map_or("", |m| m.as_str());
    let end = caps.get(2).map(|m| m.as_str());
    Ok((begin, end))
}

/// First half of a range.
pub fn begin_at(address: &str) -> Result<&str> {
    Ok(split(address)?.0)
}

/// Second half of a range, or the whole address for a single cell.
pub fn end_at(address: &str) -> Result<&str> {
    let (begin, end) = split(address)?;
    Ok(end.unwrap_or(begin))
}

/// Remove every `$` marker.
pub fn strip_absolute(address: &str) -> String {
    address.replace('$', "")
}

/// Decompose a cell address into its column and row substrings.
///
/// ```
/// use xl2json_core::address::{column_row, AbsoluteMode};
///
/// let (col, row) = column_row("$B$12", AbsoluteMode::AsIs).unwrap();
/// assert_eq!((col.as_str(), row.as_str()), ("$B", "$12"));
///
/// let (col, row) = column_row("B12", AbsoluteMode::ForceAbsolute).unwrap();
/// assert_eq!((col.as_str(), row.as_str()), ("$B", "$12"));
/// ```
pub fn column_row(address: &str, mode: AbsoluteMode) -> Result<(String, String)> {
    let caps = match mode {
        AbsoluteMode::AsIs => CELL_AS_IS.captures(address),
        AbsoluteMode::StrictRelative => CELL_RELATIVE.captures(address),
        AbsoluteMode::ForceAbsolute => {
            let marked = force_absolute(address);
            return column_row(&marked, AbsoluteMode::AsIs)
                .map_err(|_| Error::malformed(address));
        }
    };
    let caps = caps.ok_or_else(|| Error::malformed(address))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// Insert a `$` in front of every letter or digit run that lacks one.
fn force_absolute(address: &str) -> String {
    RUN.replace_all(address, |caps: &Captures<'_>| format!("${}", &caps[1]))
        .into_owned()
}

/// Column letters of a cell address, without markers.
pub fn column(address: &str) -> Result<String> {
    Ok(column_row(address, AbsoluteMode::StrictRelative)?.0)
}

/// 1-based row number of a cell address.
pub fn row(address: &str) -> Result<u32> {
    let (_, row) = column_row(address, AbsoluteMode::StrictRelative)?;
    row.parse().map_err(|_| Error::malformed(address))
}

/// Validate a bare column token (`B` or `$B`) and return its letters.
pub fn column_label(token: &str) -> Result<String> {
    let caps = COLUMN
        .captures(token)
        .ok_or_else(|| Error::malformed(token))?;
    Ok(caps[1].to_string())
}

/// Convert column letters to a 1-based index (A = 1, Z = 26, AA = 27, etc.)
pub fn column_index(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::malformed(letters));
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::malformed(letters));
        }
        index = index
            .checked_mul(26)
            .and_then(|n| n.checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
            .ok_or_else(|| Error::malformed(letters))?;
    }
    Ok(index)
}

/// Convert a 1-based column index to letters (1 = A, 26 = Z, 27 = AA, etc.)
pub fn column_letters(index: u32) -> String {
    let mut result = String::new();
    let mut n = index;

    while n > 0 {
        n -= 1;
        result.insert(0, ((n % 26) as u8 + b'A') as char);
        n /= 26;
    }

    result
}

/// Format a relative cell address.
pub fn cell(column: &str, row: u32) -> String {
    format!("{column}{row}")
}

/// Format the rectangle spanning `column_begin`..=`column_end` over `row_begin`..=`row_end`.
pub fn rect(column_begin: &str, row_begin: u32, column_end: &str, row_end: u32) -> String {
    join(&cell(column_begin, row_begin), &cell(column_end, row_end))
}
