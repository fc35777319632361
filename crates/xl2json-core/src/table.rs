//! Reading a resolved region into rows.

use tracing::debug;

use crate::error::Result;
use crate::region::TableRegion;
use crate::source::Worksheet;
use crate::value::CellValue;

/// One exported row: the table's cells, plus the hyperlink target when requested.
pub type Row = Vec<CellValue>;

/// Read `region` from `sheet` as row-major rows.
///
/// The table itself is fetched with a single bulk read. Hyperlinks are not
/// part of a bulk value read, so when a URL column is requested each row
/// costs one more query; the first target found on that row is appended,
/// or `null` when the row has none.
pub fn materialize<S: Worksheet>(sheet: &S, region: &TableRegion) -> Result<Vec<Row>> {
    let rows = sheet.range_values(&region.whole_table)?;

    let Some(url_table) = &region.url_table else {
        return Ok(rows);
    };

    debug!(sheet = sheet.name(), rows = rows.len(), %url_table, "collecting hyperlinks");
    rows.into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let target = sheet.row_hyperlinks(url_table, i + 1)?.into_iter().next();
            row.push(CellValue::from(target));
            Ok(row)
        })
        .collect()
}
