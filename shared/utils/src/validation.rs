use crate::error::{AppError, AppResult};
use regex::Regex;
use std::path::Path;
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> AppResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(AppError::validation(error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.message {
                Some(custom) => custom.to_string(),
                None => match &error.code {
                    std::borrow::Cow::Borrowed("length") => {
                        format!("Length validation failed for field '{}'", field)
                    }
                    std::borrow::Cow::Borrowed("range") => {
                        format!("Value out of range for field '{}'", field)
                    }
                    std::borrow::Cow::Borrowed("required") => {
                        format!("Field '{}' is required", field)
                    }
                    _ => format!("Validation failed for field '{}': {}", field, error.code),
                },
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Rejects uploads whose extension is not in the allow-list. The message is
/// what the client sees.
pub fn validate_upload_extension(file_name: &str, allowed: &[String]) -> AppResult<()> {
    let extension = file_extension(file_name);
    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        let listed = allowed
            .iter()
            .map(|a| format!(".{}", a))
            .collect::<Vec<_>>()
            .join(" and ");
        return Err(AppError::validation(format!(
            "Invalid file type. Only {} files are allowed",
            listed
        )));
    }
    Ok(())
}

pub fn validate_upload_size(file_size: usize, max_bytes: usize) -> AppResult<()> {
    if file_size > max_bytes {
        return Err(AppError::validation(format!(
            "File too large. Maximum size is {}MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Storage-safe version of a client-supplied file name: path components
/// stripped, whitespace runs collapsed to `_`, anything outside
/// `[A-Za-z0-9._-]` dropped, leading/trailing dots and underscores trimmed.
pub fn sanitize_filename(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let mut joined = String::with_capacity(base.len());
    for part in base.split_whitespace() {
        if !joined.is_empty() {
            joined.push('_');
        }
        joined.push_str(part);
    }

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Names served by the download endpoint: one path segment, spreadsheet
/// extension, no parent-directory tricks.
pub fn is_safe_download_name(file_name: &str) -> bool {
    if file_name.contains("..") {
        return false;
    }
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.(xlsx|xls)$").unwrap();
    pattern.is_match(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn allowed() -> Vec<String> {
        vec!["xlsx".to_string(), "xls".to_string()]
    }

    #[test]
    fn test_validate_upload_extension() {
        assert!(validate_upload_extension("report.xlsx", &allowed()).is_ok());
        assert!(validate_upload_extension("legacy.XLS", &allowed()).is_ok());

        let err = validate_upload_extension("data.csv", &allowed()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Only .xlsx and .xls files are allowed"
        );
        assert!(validate_upload_extension("noextension", &allowed()).is_err());
    }

    #[test]
    fn test_validate_upload_size() {
        let max = 16 * 1024 * 1024;
        assert!(validate_upload_size(max, max).is_ok());

        let err = validate_upload_size(max + 1, max).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 16MB");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.xlsx"), "report.xlsx");
        assert_eq!(sanitize_filename("my report 2024.xlsx"), "my_report_2024.xlsx");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("résumé.xls"), "rsum.xls");
        assert_eq!(sanitize_filename(".hidden.xlsx"), "hidden.xlsx");
        assert_eq!(sanitize_filename("   "), "upload");
    }

    #[test]
    fn test_is_safe_download_name() {
        assert!(is_safe_download_name("processed_20240101_120000.xlsx"));
        assert!(is_safe_download_name("out.xls"));

        assert!(!is_safe_download_name("../secret.xlsx"));
        assert!(!is_safe_download_name("a/b.xlsx"));
        assert!(!is_safe_download_name("a\\b.xlsx"));
        assert!(!is_safe_download_name("report.csv"));
        assert!(!is_safe_download_name(".env.xlsx"));
        assert!(!is_safe_download_name(""));
    }

    proptest! {
        #[test]
        fn prop_sanitized_names_are_storage_safe(name in ".{0,60}") {
            let sanitized = sanitize_filename(&name);
            prop_assert!(!sanitized.is_empty());
            prop_assert!(sanitized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
            prop_assert!(!sanitized.starts_with('.'));
        }
    }
}
