//! Direct mapping pre-pass
//!
//! When an upload already carries the template's sheets and row labels, the
//! restructuring is deterministic and no provider call is needed. The pass
//! only claims a workbook when every template sheet and every row label
//! resolves unambiguously; anything partial falls through to the AI path.

use serde_json::Value;
use std::collections::HashMap;

use sheetforge_models::{
    display_text, normalize_label, MappedRow, MappedWorkbook, SheetTable, TemplateSheet,
    TemplateStructure, WorkbookData,
};

pub fn direct_map(template: &TemplateStructure, input: &WorkbookData) -> Option<MappedWorkbook> {
    if template.is_empty() {
        return None;
    }

    let mut mapped = MappedWorkbook::default();
    for template_sheet in &template.sheets {
        let input_sheet = input.sheet(&template_sheet.name)?;
        let rows = map_sheet(template_sheet, input_sheet)?;
        mapped.insert(template_sheet.name.clone(), rows);
    }
    Some(mapped)
}

fn map_sheet(template_sheet: &TemplateSheet, input_sheet: &SheetTable) -> Option<Vec<MappedRow>> {
    // Label -> row index; a duplicated label makes the match ambiguous and
    // poisons that entry.
    let mut by_label: HashMap<String, Option<usize>> = HashMap::new();
    for (idx, row) in input_sheet.rows.iter().enumerate() {
        if let Some(label) = row.first().and_then(display_text) {
            by_label
                .entry(normalize_label(&label))
                .and_modify(|slot| *slot = None)
                .or_insert(Some(idx));
        }
    }

    let mut rows = Vec::with_capacity(template_sheet.row_labels.len());
    for label in &template_sheet.row_labels {
        let row_idx = (*by_label.get(&normalize_label(label))?)?;
        rows.push(project_row(
            template_sheet,
            input_sheet,
            &input_sheet.rows[row_idx],
        ));
    }
    Some(rows)
}

/// Input row values under the template's column names; columns the input
/// lacks come through as null.
fn project_row(
    template_sheet: &TemplateSheet,
    input_sheet: &SheetTable,
    row: &[Value],
) -> MappedRow {
    let mut record = MappedRow::new();
    for column in &template_sheet.columns {
        let value = input_sheet
            .columns
            .iter()
            .position(|c| normalize_label(c) == normalize_label(column))
            .and_then(|idx| row.get(idx).cloned())
            .unwrap_or(Value::Null);
        record.insert(column.clone(), value);
    }
    record
}
