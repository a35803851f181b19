//! Model output parsing
//!
//! Chat models are asked for bare JSON but still wrap it in code fences, add
//! prose, leave trailing commas, or drop key quotes often enough that a
//! cleanup pass pays for itself. Parsing is strict about the root shape
//! (`sheets` object of row arrays) and lenient about everything inside it.

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use sheetforge_models::{MappedRow, MappedWorkbook, TemplateStructure};
use sheetforge_utils::{AppError, AppResult};

pub fn parse_mapped(raw: &str, template: &TemplateStructure) -> AppResult<MappedWorkbook> {
    let cleaned = clean_response(raw)?;

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(first_err) => {
            let repaired = repair_json(&cleaned);
            serde_json::from_str(&repaired).map_err(|_| {
                AppError::processing(format!("AI response is not valid JSON: {}", first_err))
            })?
        }
    };

    into_mapped(value, template)
}

/// Cut the reply down to the outermost JSON object.
fn clean_response(raw: &str) -> AppResult<String> {
    let mut text = raw.trim();

    // ```json ... ``` or plain ``` fences
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    let start = text
        .find('{')
        .ok_or_else(|| AppError::processing("AI response contained no JSON object"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AppError::processing("AI response appears truncated"))?;
    if end < start {
        return Err(AppError::processing("AI response appears truncated"));
    }

    Ok(text[start..=end].to_string())
}

/// Two repairs cover nearly all real-world malformed replies: trailing
/// commas before a closing bracket, and unquoted object keys.
fn repair_json(text: &str) -> String {
    let trailing_commas = Regex::new(r",\s*([}\]])").unwrap();
    let repaired = trailing_commas.replace_all(text, "${1}");

    let bare_keys = Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).unwrap();
    bare_keys.replace_all(&repaired, "${1}\"${2}\":").to_string()
}

/// Enforce the root shape; drift inside it (row counts, key sets) only warns
/// because the writer tolerates both.
fn into_mapped(value: Value, template: &TemplateStructure) -> AppResult<MappedWorkbook> {
    let mut root = match value {
        Value::Object(map) => map,
        _ => return Err(AppError::processing("AI response root must be a JSON object")),
    };

    let sheets = match root.remove("sheets") {
        Some(Value::Object(sheets)) => sheets,
        Some(_) => {
            return Err(AppError::processing(
                "AI response 'sheets' must be a JSON object",
            ))
        }
        None => return Err(AppError::processing("AI response is missing 'sheets'")),
    };

    let mut mapped = MappedWorkbook::default();
    for (name, rows_value) in sheets {
        let rows_value = match rows_value {
            Value::Array(rows) => rows,
            _ => {
                return Err(AppError::processing(format!(
                    "AI response sheet '{}' must be an array of rows",
                    name
                )))
            }
        };

        let mut rows: Vec<MappedRow> = Vec::with_capacity(rows_value.len());
        for row in rows_value {
            match row {
                Value::Object(record) => rows.push(record),
                _ => {
                    return Err(AppError::processing(format!(
                        "AI response sheet '{}' contains a non-object row",
                        name
                    )))
                }
            }
        }

        if let Some(template_sheet) = template.sheet(&name) {
            if rows.len() != template_sheet.row_count() {
                warn!(
                    sheet = %name,
                    expected = template_sheet.row_count(),
                    actual = rows.len(),
                    "mapped row count differs from template"
                );
            }
            for row in &rows {
                for key in row.keys() {
                    if !template_sheet.columns.iter().any(|c| c == key) {
                        warn!(sheet = %name, column = %key, "mapped column not in template");
                    }
                }
            }
        } else {
            warn!(sheet = %name, "mapped sheet not present in template");
        }

        mapped.insert(name, rows);
    }

    Ok(mapped)
}
