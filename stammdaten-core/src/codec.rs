//! Row codec: ordered cell lists to keyed records and back, given a header.

use crate::record::Record;

/// Encode a record as one cell per header column, in header order.
/// Missing columns become empty cells; record columns absent from the
/// header are silently dropped.
pub fn encode_row(record: &Record, header: &[String]) -> Vec<String> {
    header
        .iter()
        .map(|column| record.get_or_empty(column).to_string())
        .collect()
}

/// Decode a raw row against a header. Rows shorter than the header decode
/// their missing trailing cells as empty strings; cells beyond the header
/// are ignored. Columns with empty names are skipped.
pub fn decode_row(cells: &[String], header: &[String]) -> Record {
    let mut record = Record::new();
    for (index, column) in header.iter().enumerate() {
        if column.is_empty() {
            continue;
        }
        let value = cells.get(index).map(String::as_str).unwrap_or("");
        record.set(column.clone(), value);
    }
    record
}

/// A row is blank (skipped when listing) if every cell is empty.
/// Whitespace-only cells count as empty here; values are trimmed on
/// write, so such cells only appear through hand edits of the sheet.
pub fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

/// Trim column names as read from the first row of a tab.
pub fn normalize_header(raw: &[String]) -> Vec<String> {
    raw.iter().map(|column| column.trim().to_string()).collect()
}
