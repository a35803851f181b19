//! Output workbook writer
//!
//! Rebuilds the template layout with rust_xlsxwriter and lays the mapped
//! rows over it. The template file itself is never touched; its content was
//! already captured in `TemplateStructure`.

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use std::path::Path;

use sheetforge_models::{MappedWorkbook, TemplateSheet, TemplateStructure};
use sheetforge_utils::{AppError, AppResult};

const HEADER_FILL: Color = Color::RGB(0xD9E1F2);
const LABEL_COLUMN_WIDTH: f64 = 30.0;
const VALUE_COLUMN_WIDTH: f64 = 15.0;

/// Write the mapped data into a fresh timestamp-named workbook under
/// `output_dir` and return the file name.
pub fn write_output(
    template: &TemplateStructure,
    mapped: &MappedWorkbook,
    output_dir: &Path,
) -> AppResult<String> {
    let file_name = format!("processed_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"));

    let header_format = Format::new()
        .set_bold()
        .set_background_color(HEADER_FILL)
        .set_border(FormatBorder::Thin);
    let label_format = Format::new().set_bold().set_border(FormatBorder::Thin);
    let body_format = Format::new().set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    let mut emitted = 0usize;

    for template_sheet in &template.sheets {
        let Some(rows) = mapped.sheet(&template_sheet.name) else {
            continue;
        };
        emitted += 1;

        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&template_sheet.name)
            .map_err(xlsx_error)?;

        // Template content first, so rows beyond the mapped region survive.
        reproduce_template(worksheet, template_sheet)?;

        for (idx, column) in template_sheet.columns.iter().enumerate() {
            let col = idx as u16;
            worksheet
                .write_string_with_format(0, col, column, &header_format)
                .map_err(xlsx_error)?;
            let width = if idx == 0 {
                LABEL_COLUMN_WIDTH
            } else {
                VALUE_COLUMN_WIDTH
            };
            worksheet.set_column_width(col, width).map_err(xlsx_error)?;
        }

        for (row_idx, record) in rows.iter().enumerate() {
            let row = (row_idx + 1) as u32;
            for (col_idx, column) in template_sheet.columns.iter().enumerate() {
                let format = if col_idx == 0 {
                    &label_format
                } else {
                    &body_format
                };
                let value = record.get(column).unwrap_or(&Value::Null);
                write_value(worksheet, row, col_idx as u16, value, format)?;
            }
        }

        worksheet.set_freeze_panes(1, 0).map_err(xlsx_error)?;
    }

    if emitted == 0 {
        workbook
            .add_worksheet()
            .set_name("Sheet1")
            .map_err(xlsx_error)?;
    }

    let output_path = output_dir.join(&file_name);
    workbook.save(&output_path).map_err(|e| {
        AppError::internal(format!(
            "Failed to save output workbook '{}': {}",
            output_path.display(),
            e
        ))
    })?;

    Ok(file_name)
}

fn reproduce_template(worksheet: &mut Worksheet, sheet: &TemplateSheet) -> AppResult<()> {
    for (idx, column) in sheet.columns.iter().enumerate() {
        worksheet
            .write_string(0, idx as u16, column)
            .map_err(xlsx_error)?;
    }
    for (row_idx, row) in sheet.rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            write_plain_value(worksheet, (row_idx + 1) as u32, col_idx as u16, value)?;
        }
    }
    Ok(())
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> AppResult<()> {
    let result = match value {
        Value::Null => worksheet.write_blank(row, col, format),
        Value::Bool(b) => worksheet.write_boolean_with_format(row, col, *b, format),
        Value::Number(n) => {
            worksheet.write_number_with_format(row, col, n.as_f64().unwrap_or(0.0), format)
        }
        Value::String(s) => worksheet.write_string_with_format(row, col, s, format),
        other => worksheet.write_string_with_format(row, col, &other.to_string(), format),
    };
    result.map_err(xlsx_error)?;
    Ok(())
}

fn write_plain_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> AppResult<()> {
    let result = match value {
        Value::Null => return Ok(()),
        Value::Bool(b) => worksheet.write_boolean(row, col, *b),
        Value::Number(n) => worksheet.write_number(row, col, n.as_f64().unwrap_or(0.0)),
        Value::String(s) => worksheet.write_string(row, col, s),
        other => worksheet.write_string(row, col, &other.to_string()),
    };
    result.map_err(xlsx_error)?;
    Ok(())
}

fn xlsx_error(error: XlsxError) -> AppError {
    AppError::internal(format!("Workbook write failed: {}", error))
}
