//! Prompt assembly
//!
//! Reduces the uploaded workbook to the sheets that plausibly feed the
//! template, then lays out a single instruction message. The wording is a
//! tunable, not a contract; the response format section is the part the
//! parser depends on.

use serde_json::{json, Map, Value};

use sheetforge_models::{ChatMessage, SheetTable, TemplateStructure, WorkbookData};

const MATCHED_SHEET_ROW_CAP: usize = 20;
const FALLBACK_SHEET_CAP: usize = 3;
const FALLBACK_ROW_CAP: usize = 10;
const TEMPLATE_SAMPLE_CAP: usize = 10;

pub const SYSTEM_PROMPT: &str = "You are an Excel data processing expert. \
Process the data and return only valid JSON. Do not include any markdown \
formatting or code blocks.";

/// Input sheets that relate to the template by name: exact match, or
/// case-insensitive containment either way. Nothing matching keeps the first
/// few sheets as a best guess.
pub fn filter_relevant(template: &TemplateStructure, input: &WorkbookData) -> Vec<SheetTable> {
    let matched: Vec<SheetTable> = input
        .sheets
        .iter()
        .filter(|sheet| {
            template
                .sheets
                .iter()
                .any(|t| names_relate(&t.name, &sheet.name))
        })
        .map(|sheet| sheet.truncated(MATCHED_SHEET_ROW_CAP))
        .collect();

    if !matched.is_empty() {
        return matched;
    }

    input
        .sheets
        .iter()
        .take(FALLBACK_SHEET_CAP)
        .map(|sheet| sheet.truncated(FALLBACK_ROW_CAP))
        .collect()
}

fn names_relate(template_name: &str, input_name: &str) -> bool {
    let t = template_name.to_lowercase();
    let i = input_name.to_lowercase();
    t == i || t.contains(&i) || i.contains(&t)
}

pub fn build_messages(
    template: &TemplateStructure,
    input: &WorkbookData,
    filtered: &[SheetTable],
) -> Vec<ChatMessage> {
    let mut prompt = String::new();

    prompt.push_str("TEMPLATE STRUCTURE (target layout):\n");
    push_json(&mut prompt, &template_overview(template));

    prompt.push_str("\nTEMPLATE SAMPLE ROWS:\n");
    push_json(&mut prompt, &template_samples(template));

    prompt.push_str("\nUPLOADED DATA OVERVIEW:\n");
    push_json(&mut prompt, &input_overview(input));

    prompt.push_str("\nUPLOADED DATA:\n");
    push_json(&mut prompt, &filtered_records(filtered));

    prompt.push_str(
        "\nINSTRUCTIONS:\n\
         1. Map each row of the uploaded data onto the template's sheets and columns.\n\
         2. Use the template's exact sheet names and column names as JSON keys.\n\
         3. Keep one output row per template row label, in the template's row order.\n\
         4. Normalize values to fit the template (numbers stay numbers, text stays text).\n\
         5. Use null for any template cell the uploaded data does not cover.\n\
         \n\
         CRITICAL OUTPUT REQUIREMENTS:\n\
         - Return a single JSON object and nothing else.\n\
         - The root object must have exactly one key: \"sheets\".\n\
         - Each value under \"sheets\" must be an array of row objects.\n\
         - Do not wrap the JSON in code blocks or add commentary.\n",
    );

    prompt.push_str("\nRESPONSE FORMAT EXAMPLE:\n");
    push_json(&mut prompt, &format_example(template));

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

fn push_json(prompt: &mut String, value: &Value) {
    // Pretty JSON keeps the model oriented in long tables.
    prompt.push_str(&serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    prompt.push('\n');
}

fn template_overview(template: &TemplateStructure) -> Value {
    Value::Array(
        template
            .sheets
            .iter()
            .map(|sheet| {
                json!({
                    "sheet": sheet.name,
                    "columns": sheet.columns,
                    "row_count": sheet.row_count(),
                })
            })
            .collect(),
    )
}

/// A representative slice of each template sheet: the first rows, the middle
/// when the sheet is long enough, and the tail.
fn template_samples(template: &TemplateStructure) -> Value {
    let mut samples = Map::new();
    for sheet in &template.sheets {
        let n = sheet.rows.len();
        let mut indices: Vec<usize> = (0..n.min(3)).collect();
        if n >= 5 {
            indices.push(n / 2);
        }
        indices.extend(n.saturating_sub(2)..n);
        indices.sort_unstable();
        indices.dedup();
        indices.truncate(TEMPLATE_SAMPLE_CAP);

        let rows: Vec<Value> = indices
            .into_iter()
            .map(|idx| {
                let record: Map<String, Value> = sheet
                    .columns
                    .iter()
                    .cloned()
                    .zip(sheet.rows[idx].iter().cloned())
                    .collect();
                Value::Object(record)
            })
            .collect();
        samples.insert(sheet.name.clone(), Value::Array(rows));
    }
    Value::Object(samples)
}

fn input_overview(input: &WorkbookData) -> Value {
    Value::Array(
        input
            .sheets
            .iter()
            .map(|sheet| {
                json!({
                    "sheet": sheet.name,
                    "columns": sheet.columns,
                    "row_labels": sheet.first_column_labels(),
                })
            })
            .collect(),
    )
}

fn filtered_records(filtered: &[SheetTable]) -> Value {
    let mut sheets = Map::new();
    for sheet in filtered {
        let rows: Vec<Value> = sheet
            .records()
            .into_iter()
            .map(Value::Object)
            .collect();
        sheets.insert(sheet.name.clone(), Value::Array(rows));
    }
    Value::Object(sheets)
}

/// A skeletal response built from the actual template, so the model sees the
/// real sheet and column names in position.
fn format_example(template: &TemplateStructure) -> Value {
    let mut sheets = Map::new();
    for sheet in &template.sheets {
        let row: Map<String, Value> = sheet
            .columns
            .iter()
            .map(|column| (column.clone(), Value::String("...".to_string())))
            .collect();
        sheets.insert(sheet.name.clone(), json!([Value::Object(row)]));
    }
    json!({ "sheets": sheets })
}
