use crate::utils::error::{GstError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique_names, Validate};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// 路徑中的一步
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
    /// 展開陣列中的每個元素
    EachElement,
}

impl PathStep {
    /// 解析單一步驟描述：`"*"`/`"[]"`、鍵名字串、非負整數，
    /// 或物件形式 `{"key": k}`、`{"index": i}`、`{"each": true}`
    pub fn from_descriptor(field: &str, descriptor: &Value) -> Result<Self> {
        match descriptor {
            Value::String(s) if s == "*" || s == "[]" => Ok(PathStep::EachElement),
            Value::String(s) => Ok(PathStep::Key(s.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(|i| PathStep::Index(i as usize))
                .ok_or_else(|| invalid(field, descriptor, "Index must be a non-negative integer")),
            Value::Object(obj) => {
                if let Some(Value::String(key)) = obj.get("key") {
                    Ok(PathStep::Key(key.clone()))
                } else if let Some(index) = obj.get("index") {
                    index
                        .as_u64()
                        .map(|i| PathStep::Index(i as usize))
                        .ok_or_else(|| invalid(field, index, "Index must be a non-negative integer"))
                } else if obj.get("each") == Some(&Value::Bool(true)) {
                    Ok(PathStep::EachElement)
                } else {
                    Err(invalid(
                        field,
                        descriptor,
                        "Step object needs one of \"key\", \"index\" or \"each\": true",
                    ))
                }
            }
            _ => Err(invalid(field, descriptor, "Unsupported path step")),
        }
    }
}

fn invalid(field: &str, value: &Value, reason: &str) -> GstError {
    GstError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// 路徑可為單一字串或步驟陣列；缺省為空路徑
fn parse_path(field: &str, value: Option<&Value>) -> Result<Vec<PathStep>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(steps)) => steps
            .iter()
            .map(|step| PathStep::from_descriptor(field, step))
            .collect(),
        Some(single) => Ok(vec![PathStep::from_descriptor(field, single)?]),
    }
}

/// 由祖先層級帶到每筆紀錄的欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaField {
    pub name: String,
    pub path: Vec<PathStep>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, path: Vec<PathStep>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// 單一鍵名的 meta：欄名即鍵名
    pub fn key(name: &str) -> Self {
        Self::new(name, vec![PathStep::Key(name.to_string())])
    }

    fn from_value(field: &str, value: &Value) -> Result<Self> {
        let meta = match value {
            Value::String(name) => Self::key(name),
            Value::Object(obj) => {
                let name = match obj.get("name") {
                    Some(Value::String(name)) => name.clone(),
                    _ => return Err(invalid(field, value, "Meta entry needs a string \"name\"")),
                };
                let path = match obj.get("path") {
                    None | Some(Value::Null) => vec![PathStep::Key(name.clone())],
                    Some(path) => parse_path(field, Some(path))?,
                };
                Self::new(name, path)
            }
            _ => return Err(invalid(field, value, "Unsupported meta entry")),
        };

        validate_non_empty_string(field, &meta.name)?;
        if meta.path.is_empty() {
            return Err(invalid(field, value, "Meta path cannot be empty"));
        }
        if meta.path.contains(&PathStep::EachElement) {
            return Err(invalid(field, value, "Meta paths cannot expand array elements"));
        }
        Ok(meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMetaRule {
    pub record_path: Vec<PathStep>,
    pub meta: Vec<MetaField>,
    /// 紀錄內代表明細的陣列欄位（例如 `itms`）
    pub line_items: Option<String>,
}

/// 固定結構的區段處理器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedShape {
    HsnSummary,
    NilSummary,
    DocIssue,
    PartyDocuments {
        party_key: String,
        document_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    PathMeta(PathMetaRule),
    SimpleTable,
    FixedShape(FixedShape),
}

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::PathMeta(_) => "path_meta",
            ExtractionStrategy::SimpleTable => "simple_table",
            ExtractionStrategy::FixedShape(FixedShape::HsnSummary) => "hsn_summary",
            ExtractionStrategy::FixedShape(FixedShape::NilSummary) => "nil_summary",
            ExtractionStrategy::FixedShape(FixedShape::DocIssue) => "doc_issue",
            ExtractionStrategy::FixedShape(FixedShape::PartyDocuments { .. }) => "party_documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRule {
    pub section_key: String,
    pub sheet_name: String,
    pub strategy: ExtractionStrategy,
    /// 依宣告順序的改名對應
    pub rename: Vec<(String, String)>,
    pub column_order: Vec<String>,
    pub date_columns: Option<Vec<String>>,
}

impl SectionRule {
    /// 最簡規則：整段資料視為平面表格
    pub fn simple(section_key: &str) -> Self {
        Self {
            section_key: section_key.to_string(),
            sheet_name: section_key.to_string(),
            strategy: ExtractionStrategy::SimpleTable,
            rename: Vec::new(),
            column_order: Vec::new(),
            date_columns: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSectionRule {
    #[serde(default)]
    processor: Option<String>,
    #[serde(default)]
    record_path: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
    #[serde(default)]
    line_items: Option<String>,
    #[serde(default)]
    rename_dict: Option<Map<String, Value>>,
    #[serde(default)]
    order_df: Option<Vec<String>>,
    #[serde(default)]
    sheet_name: Option<String>,
    #[serde(default)]
    date_columns: Option<Vec<String>>,
    #[serde(default)]
    args: Option<Map<String, Value>>,
}

impl RawSectionRule {
    fn into_rule(self, section_key: &str) -> Result<SectionRule> {
        let field = |name: &str| format!("{}.{}", section_key, name);
        let args = self.args.unwrap_or_default();
        let string_arg = |name: &str, default: &str| -> Result<String> {
            match args.get(name) {
                None | Some(Value::Null) => Ok(default.to_string()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(invalid(&field(&format!("args.{}", name)), other, "Expected a string")),
            }
        };

        let processor = self.processor.as_deref().unwrap_or("path_meta");
        let strategy = match processor {
            "path_meta" | "json_normalize" => {
                let meta = match self.meta {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(entries)) => entries
                        .iter()
                        .map(|entry| MetaField::from_value(&field("meta"), entry))
                        .collect::<Result<Vec<_>>>()?,
                    Some(other) => return Err(invalid(&field("meta"), &other, "Expected an array")),
                };
                ExtractionStrategy::PathMeta(PathMetaRule {
                    record_path: parse_path(&field("record_path"), self.record_path.as_ref())?,
                    meta,
                    line_items: self.line_items.filter(|key| !key.trim().is_empty()),
                })
            }
            "simple_table" | "simple_dataframe" => ExtractionStrategy::SimpleTable,
            "hsn_summary" => ExtractionStrategy::FixedShape(FixedShape::HsnSummary),
            "nil_summary" => ExtractionStrategy::FixedShape(FixedShape::NilSummary),
            "doc_issue" => ExtractionStrategy::FixedShape(FixedShape::DocIssue),
            "party_documents" | "flatten_and_normalize" => {
                ExtractionStrategy::FixedShape(FixedShape::PartyDocuments {
                    party_key: string_arg("record_key", "ctin")?,
                    document_key: string_arg("item_key", "inv")?,
                })
            }
            unknown => {
                return Err(GstError::ConfigError {
                    message: format!(
                        "Unknown processor '{}' for section '{}'",
                        unknown, section_key
                    ),
                })
            }
        };

        let rename = self
            .rename_dict
            .unwrap_or_default()
            .into_iter()
            .map(|(from, to)| match to {
                Value::String(to) => Ok((from, to)),
                other => Err(invalid(&field("rename_dict"), &other, "Rename target must be a string")),
            })
            .collect::<Result<Vec<_>>>()?;

        let sheet_name = self
            .sheet_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| section_key.to_string());

        Ok(SectionRule {
            section_key: section_key.to_string(),
            sheet_name,
            strategy,
            rename,
            column_order: self.order_df.unwrap_or_default(),
            date_columns: self.date_columns,
        })
    }
}

/// 區段規則集合，依設定檔中的順序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionConfig {
    rules: Vec<SectionRule>,
}

impl SectionConfig {
    pub fn new(rules: Vec<SectionRule>) -> Self {
        Self { rules }
    }

    /// 從 JSON 檔案載入區段設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GstError::ConfigError {
            message: format!("Cannot read section configuration '{}': {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| GstError::ConfigError {
            message: format!("Section configuration is not valid JSON: {}", e),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let sections = match value {
            Value::Object(sections) => sections,
            _ => {
                return Err(GstError::ConfigError {
                    message: "Section configuration must be a JSON object keyed by section".to_string(),
                })
            }
        };

        let mut rules = Vec::with_capacity(sections.len());
        for (section_key, raw) in sections {
            let raw: RawSectionRule =
                serde_json::from_value(raw).map_err(|e| GstError::ConfigError {
                    message: format!("Section '{}' is malformed: {}", section_key, e),
                })?;
            rules.push(raw.into_rule(&section_key)?);
        }

        let config = Self { rules };
        config.validate()?;
        tracing::debug!("🧩 Loaded {} section rules", config.rules.len());
        Ok(config)
    }

    pub fn rules(&self) -> &[SectionRule] {
        &self.rules
    }

    pub fn get(&self, section_key: &str) -> Option<&SectionRule> {
        self.rules.iter().find(|rule| rule.section_key == section_key)
    }

    pub fn section_keys(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.section_key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 依 `only`/`skip` 篩選區段；名稱必須存在於設定中
    pub fn select(&self, only: &[String], skip: &[String]) -> Result<Self> {
        for name in only.iter().chain(skip) {
            if self.get(name).is_none() {
                return Err(GstError::InvalidConfigValueError {
                    field: "sections".to_string(),
                    value: name.clone(),
                    reason: format!(
                        "Unknown section. Configured sections: {}",
                        self.section_keys().join(", ")
                    ),
                });
            }
        }

        let rules = self
            .rules
            .iter()
            .filter(|rule| only.is_empty() || only.contains(&rule.section_key))
            .filter(|rule| !skip.contains(&rule.section_key))
            .cloned()
            .collect();
        Ok(Self { rules })
    }
}

impl Validate for SectionConfig {
    fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            validate_non_empty_string(&format!("{}.sheet_name", rule.section_key), &rule.sheet_name)?;
            validate_unique_names(&format!("{}.order_df", rule.section_key), &rule.column_order)?;
            for (from, to) in &rule.rename {
                validate_non_empty_string(&format!("{}.rename_dict.{}", rule.section_key, from), to)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_path_meta_rule() {
        let config = SectionConfig::from_value(json!({
            "b2b": {
                "record_path": ["*", "inv", "*"],
                "meta": [{"name": "recipient_gstin", "path": "ctin"}, "pos"],
                "line_items": "itms",
                "rename_dict": {"inum": "invoice_or_note_number", "idt": "Date"},
                "order_df": ["recipient_gstin", "invoice_or_note_number", "Date"],
                "sheet_name": "B2B"
            }
        }))
        .unwrap();

        let rule = config.get("b2b").unwrap();
        assert_eq!(rule.sheet_name, "B2B");
        assert_eq!(
            rule.rename,
            vec![
                ("inum".to_string(), "invoice_or_note_number".to_string()),
                ("idt".to_string(), "Date".to_string())
            ]
        );
        match &rule.strategy {
            ExtractionStrategy::PathMeta(path_meta) => {
                assert_eq!(
                    path_meta.record_path,
                    vec![
                        PathStep::EachElement,
                        PathStep::Key("inv".into()),
                        PathStep::EachElement
                    ]
                );
                assert_eq!(path_meta.meta[0], MetaField::new("recipient_gstin", vec![PathStep::Key("ctin".into())]));
                assert_eq!(path_meta.meta[1], MetaField::key("pos"));
                assert_eq!(path_meta.line_items.as_deref(), Some("itms"));
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_step_descriptor_forms() {
        let steps = parse_path(
            "t",
            Some(&json!(["[]", 2, {"key": "docs"}, {"index": 0}, {"each": true}])),
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                PathStep::EachElement,
                PathStep::Index(2),
                PathStep::Key("docs".into()),
                PathStep::Index(0),
                PathStep::EachElement
            ]
        );
        assert!(parse_path("t", Some(&json!([-1]))).is_err());
        assert!(parse_path("t", Some(&json!([{"other": 1}]))).is_err());
    }

    #[test]
    fn test_absent_fields_default_to_noop() {
        let config = SectionConfig::from_value(json!({"at": {}})).unwrap();
        let rule = config.get("at").unwrap();
        assert_eq!(rule.sheet_name, "at");
        assert!(rule.rename.is_empty());
        assert!(rule.column_order.is_empty());
        assert_eq!(rule.strategy, ExtractionStrategy::PathMeta(PathMetaRule::default()));
    }

    #[test]
    fn test_processor_aliases_and_args() {
        let config = SectionConfig::from_value(json!({
            "b2b": {"processor": "flatten_and_normalize", "args": {"record_key": "ctin", "item_key": "inv"}, "sheet_name": "B2B"},
            "cdn": {"processor": "party_documents", "args": {"item_key": "nt"}},
            "impg": {"processor": "simple_dataframe"},
            "hsn": {"processor": "hsn_summary"}
        }))
        .unwrap();

        assert_eq!(config.section_keys(), vec!["b2b", "cdn", "impg", "hsn"]);
        assert_eq!(
            config.get("cdn").unwrap().strategy,
            ExtractionStrategy::FixedShape(FixedShape::PartyDocuments {
                party_key: "ctin".into(),
                document_key: "nt".into()
            })
        );
        assert_eq!(config.get("impg").unwrap().strategy, ExtractionStrategy::SimpleTable);
        assert_eq!(config.get("hsn").unwrap().strategy.name(), "hsn_summary");
    }

    #[test]
    fn test_unknown_processor_is_load_time_error() {
        let err = SectionConfig::from_value(json!({"b2b": {"processor": "magic"}})).unwrap_err();
        assert!(matches!(err, GstError::ConfigError { .. }));
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_meta_cannot_expand_arrays() {
        let err = SectionConfig::from_value(json!({
            "b2b": {"meta": [{"name": "x", "path": ["inv", "*", "inum"]}]}
        }))
        .unwrap_err();
        assert!(matches!(err, GstError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_duplicate_column_order_rejected() {
        let err = SectionConfig::from_value(json!({
            "b2b": {"order_df": ["Date", "Date"]}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_select_only_and_skip() {
        let config = SectionConfig::from_value(json!({"b2b": {}, "b2cs": {}, "hsn": {}})).unwrap();

        let only = config.select(&["b2b".to_string(), "hsn".to_string()], &[]).unwrap();
        assert_eq!(only.section_keys(), vec!["b2b", "hsn"]);

        let skipped = config.select(&[], &["b2cs".to_string()]).unwrap();
        assert_eq!(skipped.section_keys(), vec!["b2b", "hsn"]);

        assert!(config.select(&["exp".to_string()], &[]).is_err());
    }
}
