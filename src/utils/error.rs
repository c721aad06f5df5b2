use thiserror::Error;

#[derive(Error, Debug)]
pub enum GstError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}' ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read document '{path}': {message}")]
    DocumentParseError { path: String, message: String },

    #[error("Document cannot be converted: {reason}")]
    EmptyDocumentError { reason: String },

    #[error("Section '{section}' failed: {message}")]
    SectionError { section: String, message: String },

    #[error("Sheet '{sheet}' expects {expected} cells per row, got {actual}")]
    TableShapeError {
        sheet: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write '{path}': {message}")]
    WriteError { path: String, message: String },
}

/// 錯誤分類，對應轉換流程中的層級
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Document,
    Section,
    Output,
    System,
}

/// 錯誤嚴重程度，CLI 依此決定退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GstError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GstError::ConfigError { .. }
            | GstError::MissingConfigError { .. }
            | GstError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            GstError::DocumentParseError { .. }
            | GstError::EmptyDocumentError { .. }
            | GstError::SerializationError(_) => ErrorCategory::Document,
            GstError::SectionError { .. } | GstError::TableShapeError { .. } => {
                ErrorCategory::Section
            }
            GstError::WriteError { .. }
            | GstError::XlsxError(_)
            | GstError::CsvError(_)
            | GstError::ZipError(_) => ErrorCategory::Output,
            GstError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一區段失敗只會少一張工作表
            GstError::SectionError { .. } | GstError::TableShapeError { .. } => {
                ErrorSeverity::Low
            }
            GstError::DocumentParseError { .. }
            | GstError::EmptyDocumentError { .. }
            | GstError::SerializationError(_) => ErrorSeverity::Medium,
            GstError::WriteError { .. }
            | GstError::XlsxError(_)
            | GstError::CsvError(_)
            | GstError::ZipError(_)
            | GstError::IoError(_) => ErrorSeverity::High,
            GstError::ConfigError { .. }
            | GstError::MissingConfigError { .. }
            | GstError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the section configuration JSON and the TOML settings file"
            }
            ErrorCategory::Document => {
                "Make sure the source file is a valid GSTR JSON export with a top-level object"
            }
            ErrorCategory::Section => {
                "The section layout differs from its rule; adjust record_path/meta for that section"
            }
            ErrorCategory::Output => {
                "Check that the destination folder exists, is writable and the file is not open elsewhere"
            }
            ErrorCategory::System => "Retry the conversion; run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GstError::ConfigError { message } => format!("Configuration problem: {}", message),
            GstError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            GstError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            GstError::DocumentParseError { path, message } => {
                format!("Could not read '{}': {}", path, message)
            }
            GstError::WriteError { path, message } => {
                format!("Could not save '{}': {}", path, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GstError>;
