//! Workbook pipeline
//!
//! Upload in, styled output file out: read the workbook, try the direct
//! mapping pre-pass, otherwise ask the configured provider to restructure
//! the data, then write the result under the template's layout.

pub mod mapper;
pub mod prompt;
pub mod response;
pub mod writer;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::ai::ChatClient;
use sheetforge_models::{ChatOptions, TemplateStructure};
use sheetforge_utils::{read_workbook, AppError, AppResult, StorageConfig};

/// Mapping wants determinism and headroom for large tables, not creativity.
const MAPPING_TEMPERATURE: f32 = 0.1;
const MAPPING_MAX_TOKENS: u32 = 16000;

pub struct WorkbookProcessor {
    client: Arc<dyn ChatClient>,
    storage: StorageConfig,
}

impl WorkbookProcessor {
    pub fn new(client: Arc<dyn ChatClient>, storage: StorageConfig) -> Self {
        Self { client, storage }
    }

    /// Process a saved upload and return the output file name.
    pub async fn process(&self, upload_path: &Path) -> AppResult<String> {
        if !self.storage.template_path.exists() {
            return Err(AppError::configuration(format!(
                "Template workbook not found at '{}'",
                self.storage.template_path.display()
            )));
        }

        let input = read_workbook(upload_path)?;
        let template_data = read_workbook(&self.storage.template_path)?;
        let template = TemplateStructure::from_workbook(&template_data);

        let mapped = match mapper::direct_map(&template, &input) {
            Some(mapped) => {
                info!(
                    upload = %upload_path.display(),
                    "all template rows matched directly, skipping AI call"
                );
                mapped
            }
            None => {
                let filtered = prompt::filter_relevant(&template, &input);
                let messages = prompt::build_messages(&template, &input, &filtered);
                let options = ChatOptions::default()
                    .with_temperature(MAPPING_TEMPERATURE)
                    .with_max_tokens(MAPPING_MAX_TOKENS);

                info!(
                    upload = %upload_path.display(),
                    provider = self.client.provider_name(),
                    sheets = filtered.len(),
                    "requesting AI mapping"
                );
                let reply = self.client.complete_chat(&messages, &options).await?;
                response::parse_mapped(&reply, &template)?
            }
        };

        let file_name = writer::write_output(&template, &mapped, &self.storage.output_dir)?;
        info!(output = %file_name, "workbook processed");
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_xlsxwriter::Workbook;
    use serde_json::json;
    use sheetforge_models::ChatMessage;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient {
        reply: String,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatClient for StubClient {
        async fn complete_chat(
            &self,
            _messages: &[ChatMessage],
            _options: &ChatOptions,
        ) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    fn write_sheet(path: &PathBuf, name: &str, rows: &[(&str, f64)]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(name).unwrap();
        sheet.write_string(0, 0, "Item").unwrap();
        sheet.write_string(0, 1, "Amount").unwrap();
        for (idx, (label, amount)) in rows.iter().enumerate() {
            let row = (idx + 1) as u32;
            sheet.write_string(row, 0, *label).unwrap();
            sheet.write_number(row, 1, *amount).unwrap();
        }
        workbook.save(path).unwrap();
    }

    fn storage(dir: &Path) -> StorageConfig {
        let storage = StorageConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("outputs"),
            template_path: dir.join("template.xlsx"),
            ..StorageConfig::default()
        };
        std::fs::create_dir_all(&storage.upload_dir).unwrap();
        std::fs::create_dir_all(&storage.output_dir).unwrap();
        storage
    }

    #[tokio::test]
    async fn test_direct_match_skips_provider() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        write_sheet(&storage.template_path, "Summary", &[("Revenue", 0.0)]);

        let upload = storage.upload_dir.join("upload.xlsx");
        write_sheet(&upload, "Summary", &[("Revenue", 1200.5)]);

        let client = Arc::new(StubClient::new("unused"));
        let processor = WorkbookProcessor::new(client.clone(), storage.clone());
        let file_name = processor.process(&upload).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        let data = read_workbook(&storage.output_dir.join(&file_name)).unwrap();
        assert_eq!(data.sheet("Summary").unwrap().rows[0][1], json!(1200.5));
    }

    #[tokio::test]
    async fn test_ai_path_parses_reply() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        write_sheet(&storage.template_path, "Summary", &[("Revenue", 0.0)]);

        let upload = storage.upload_dir.join("upload.xlsx");
        write_sheet(&upload, "Raw", &[("rev", 1200.5)]);

        let client = Arc::new(StubClient::new(
            r#"{"sheets": {"Summary": [{"Item": "Revenue", "Amount": 1200.5}]}}"#,
        ));
        let processor = WorkbookProcessor::new(client.clone(), storage.clone());
        let file_name = processor.process(&upload).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        let data = read_workbook(&storage.output_dir.join(&file_name)).unwrap();
        assert_eq!(data.sheet("Summary").unwrap().rows[0][0], json!("Revenue"));
    }

    #[tokio::test]
    async fn test_missing_template_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let upload = storage.upload_dir.join("upload.xlsx");
        write_sheet(&upload, "Summary", &[("Revenue", 1.0)]);

        let processor = WorkbookProcessor::new(Arc::new(StubClient::new("")), storage);
        let err = processor.process(&upload).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_unusable_reply_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        write_sheet(&storage.template_path, "Summary", &[("Revenue", 0.0)]);

        let upload = storage.upload_dir.join("upload.xlsx");
        write_sheet(&upload, "Raw", &[("rev", 1.0)]);

        let processor = WorkbookProcessor::new(
            Arc::new(StubClient::new("sorry, I cannot help with that")),
            storage,
        );
        let err = processor.process(&upload).await.unwrap_err();
        assert_eq!(err.error_code(), "PROCESSING_ERROR");
    }
}
