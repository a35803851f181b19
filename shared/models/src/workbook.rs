use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One worksheet flattened to header names plus value rows.
///
/// The first spreadsheet row supplies `columns`; every following row is kept
/// as a vector aligned to the column count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SheetTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows as column-keyed objects, the shape serialized into prompts.
    pub fn records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Non-blank display strings from the first column, one per labeled row.
    pub fn first_column_labels(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(display_text))
            .collect()
    }

    /// Copy of this sheet keeping at most `max_rows` data rows.
    pub fn truncated(&self, max_rows: usize) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().take(max_rows).cloned().collect(),
        }
    }
}

/// Every sheet of a workbook, in worksheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkbookData {
    pub sheets: Vec<SheetTable>,
}

impl WorkbookData {
    pub fn sheet(&self, name: &str) -> Option<&SheetTable> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// A template sheet: its columns, its data rows, and the first-column label
/// of each data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSheet {
    pub name: String,
    pub columns: Vec<String>,
    pub row_labels: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TemplateSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The layout the output workbook must follow, derived from the template
/// workbook. Sheets without any data row carry no layout and are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateStructure {
    pub sheets: Vec<TemplateSheet>,
}

impl TemplateStructure {
    pub fn from_workbook(data: &WorkbookData) -> Self {
        let sheets = data
            .sheets
            .iter()
            .filter(|sheet| !sheet.is_empty())
            .map(|sheet| TemplateSheet {
                name: sheet.name.clone(),
                columns: sheet.columns.clone(),
                row_labels: sheet.first_column_labels(),
                rows: sheet.rows.clone(),
            })
            .collect();
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&TemplateSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// A restructured row keyed by template column name.
pub type MappedRow = serde_json::Map<String, Value>;

/// Restructured workbook content keyed by template sheet name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedWorkbook {
    pub sheets: BTreeMap<String, Vec<MappedRow>>,
}

impl MappedWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&Vec<MappedRow>> {
        self.sheets.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, rows: Vec<MappedRow>) {
        self.sheets.insert(name.into(), rows);
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Display text of a cell value; `None` for null or blank strings.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Comparison key for row labels: trimmed, lowercased, inner runs of
/// whitespace collapsed to single spaces.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
