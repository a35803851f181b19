//! Workbook Reader
//!
//! Flattens every worksheet of a spreadsheet file into headers plus
//! JSON-valued rows. The first row of each sheet names the columns.

use calamine::{open_workbook_auto, DataType, Reader};
use serde_json::{json, Value};
use std::path::Path;

use crate::error::{AppError, AppResult};
use sheetforge_models::{SheetTable, WorkbookData};

/// Read an `.xlsx` or `.xls` workbook from disk.
pub fn read_workbook(path: &Path) -> AppResult<WorkbookData> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::processing(format!(
            "Failed to open workbook '{}': {}",
            path.display(),
            e
        ))
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .ok_or_else(|| {
                AppError::processing(format!("Worksheet '{}' could not be located", sheet_name))
            })?
            .map_err(|e| {
                AppError::processing(format!("Failed to read worksheet '{}': {}", sheet_name, e))
            })?;

        let mut rows_iter = range.rows();

        // First row is headers
        let columns: Vec<String> = match rows_iter.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(idx, cell)| header_name(cell, idx))
                .collect(),
            None => {
                sheets.push(SheetTable::new(sheet_name, Vec::new(), Vec::new()));
                continue;
            }
        };

        let rows: Vec<Vec<Value>> = rows_iter
            .map(|row| {
                (0..columns.len())
                    .map(|idx| row.get(idx).map(cell_to_value).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        sheets.push(SheetTable::new(sheet_name, columns, rows));
    }

    Ok(WorkbookData { sheets })
}

/// Blank header cells still need an addressable name.
fn header_name(cell: &DataType, index: usize) -> String {
    let text = cell.to_string().trim().to_string();
    if text.is_empty() {
        format!("Column{}", index + 1)
    } else {
        text
    }
}

fn cell_to_value(cell: &DataType) -> Value {
    match cell {
        DataType::Int(i) => json!(i),
        DataType::Float(f) => json!(f),
        DataType::String(s) => json!(s),
        DataType::Bool(b) => json!(b),
        DataType::DateTime(serial) => json!(serial),
        DataType::Empty => Value::Null,
        DataType::Error(_) => Value::Null,
        other => json!(other.to_string()),
    }
}
