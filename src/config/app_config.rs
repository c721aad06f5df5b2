use crate::utils::error::{GstError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATE_COLUMN: &str = "Date";

/// 輸出檔格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Xlsx,
    CsvZip,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Xlsx => write!(f, "xlsx"),
            OutputFormat::CsvZip => write!(f, "csv-zip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub converter: ConverterSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConverterSection {
    pub name: Option<String>,
    pub sections_file: Option<String>,
    /// 固定的基本資訊欄位（GSTR-2 形式）；未設定時取所有頂層純量
    pub basic_info_keys: Option<Vec<String>>,
    pub date_columns: Option<Vec<String>>,
    pub date_formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub start_row: u32,
    #[serde(default)]
    pub start_col: u16,
    #[serde(default = "default_freeze_header")]
    pub freeze_header: bool,
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_freeze_header() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            start_row: 0,
            start_col: 0,
            freeze_header: default_freeze_header(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
}

/// 轉換時使用的選項，由 AppConfig 與 CLI 參數合併而來
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub basic_info_keys: Option<Vec<String>>,
    pub date_columns: Vec<String>,
    pub date_formats: Vec<String>,
    /// 寫出位置，區段檢查 Excel 上限時需計入偏移
    pub layout: SheetLayout,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            basic_info_keys: None,
            date_columns: vec![DEFAULT_DATE_COLUMN.to_string()],
            date_formats: Vec::new(),
            layout: SheetLayout::default(),
        }
    }
}

/// 工作表寫出位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub start_row: u32,
    pub start_col: u16,
    pub freeze_header: bool,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            start_row: 0,
            start_col: 0,
            freeze_header: true,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GstError::ConfigError {
            message: format!(
                "Cannot read application configuration '{}': {}",
                path.display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GstError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GST_OUTPUT_DIR})；未定義的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GstError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 區段設定檔路徑；相對路徑以 TOML 檔所在目錄為基準
    pub fn sections_file(&self, config_dir: Option<&Path>) -> Option<PathBuf> {
        let file = PathBuf::from(self.converter.sections_file.as_ref()?);
        match config_dir {
            Some(dir) if file.is_relative() => Some(dir.join(file)),
            _ => Some(file),
        }
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        let defaults = ConversionOptions::default();
        ConversionOptions {
            basic_info_keys: self.converter.basic_info_keys.clone(),
            date_columns: self
                .converter
                .date_columns
                .clone()
                .unwrap_or(defaults.date_columns),
            date_formats: self.converter.date_formats.clone().unwrap_or_default(),
            layout: self.sheet_layout(),
        }
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            start_row: self.output.start_row,
            start_col: self.output.start_col,
            freeze_header: self.output.freeze_header,
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output.output_dir", &self.output.output_dir)?;

        if let Some(file) = &self.converter.sections_file {
            validate_path("converter.sections_file", file)?;
        }

        // 留下空間給標題列與至少一筆資料
        validate_range("output.start_row", self.output.start_row, 0, 1_000_000)?;
        validate_range("output.start_col", self.output.start_col, 0, 16_000)?;

        for (field, values) in [
            ("converter.basic_info_keys", &self.converter.basic_info_keys),
            ("converter.date_columns", &self.converter.date_columns),
            ("converter.date_formats", &self.converter.date_formats),
        ] {
            for value in values.iter().flatten() {
                validate_non_empty_string(field, value)?;
            }
        }

        Ok(())
    }
}
