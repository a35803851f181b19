//! # SheetForge Domain Models
//!
//! Core domain types shared by the gateway service and the utility crate.
//! All models serialize with serde; request-facing ones carry validator
//! rules.
//!
//! ## Key Models
//!
//! - **ChatMessage** / **ChatOptions**: provider-neutral chat turns and
//!   tuning knobs
//! - **SheetTable** / **WorkbookData**: a workbook flattened to headers and
//!   value rows
//! - **TemplateStructure**: the layout the output workbook must follow
//! - **MappedWorkbook**: restructured rows keyed by template sheet name

pub mod chat;
pub mod workbook;

pub use chat::*;
pub use workbook::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_round_trip() {
        let msg = ChatMessage::user("map this workbook");
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded, json!({"role": "user", "content": "map this workbook"}));
        let decoded: ChatMessage = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_mapped_workbook_lookup() {
        let mut mapped = MappedWorkbook::default();
        assert!(mapped.is_empty());
        mapped.insert("Summary", vec![MappedRow::new()]);
        assert_eq!(mapped.sheet("Summary").map(Vec::len), Some(1));
        assert!(mapped.sheet("Missing").is_none());
    }
}
