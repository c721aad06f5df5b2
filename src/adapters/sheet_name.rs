use crate::domain::model::EXCEL_MAX_SHEET_NAME_LEN;
use std::collections::HashSet;

const EXCEL_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// 替換非法字元並截斷為合法的工作表名稱
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if EXCEL_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    // 工作表名稱不可以單引號開頭或結尾
    let trimmed = replaced.trim().trim_matches('\'').trim();
    if trimmed.is_empty() {
        return "Sheet".to_string();
    }
    trimmed.chars().take(EXCEL_MAX_SHEET_NAME_LEN).collect()
}

/// 同一活頁簿內的名稱不分大小寫必須唯一
#[derive(Debug, Default)]
pub struct SheetNames {
    existing: HashSet<String>,
}

impl SheetNames {
    pub fn unique(&mut self, name: &str) -> String {
        let name = sanitize_sheet_name(name);
        if self.existing.insert(name.to_lowercase()) {
            return name;
        }

        let base_name: String = name.chars().take(EXCEL_MAX_SHEET_NAME_LEN - 3).collect();
        let mut index = 2usize;
        loop {
            let candidate: String = format!("{base_name}_{index}")
                .chars()
                .take(EXCEL_MAX_SHEET_NAME_LEN)
                .collect();
            if self.existing.insert(candidate.to_lowercase()) {
                return candidate;
            }
            index += 1;
        }
    }
}
