//! 依紀錄路徑與 meta 路徑，把巢狀 JSON 攤平成一列一列的 [`FlatRecord`]。

use crate::config::section_config::{MetaField, PathMetaRule};
use crate::core::path::{lookup, resolve};
use crate::domain::model::FlatRecord;
use serde_json::{Map, Value};

/// 純量紀錄（非物件）使用的欄名
pub const SCALAR_COLUMN: &str = "value";

/// 展開 `rule.record_path`，每個終點（或終點陣列中的每個元素）為一筆紀錄。
///
/// - 物件欄位成為欄位，巢狀物件以點號展開（`itm_det.txval`），陣列不展開
/// - meta 依「紀錄本身 → 最近祖先 → … → 區段根」的順序查找，取第一個非 null 值
/// - 指定明細欄位時，每個明細各產生一列；明細為空則只產生一列
pub fn flatten(section_root: &Value, rule: &PathMetaRule) -> Vec<FlatRecord> {
    let mut records = Vec::new();

    for branch in resolve(section_root, &rule.record_path) {
        match branch.value {
            Value::Array(items) => {
                for item in items {
                    let mut ancestors = branch.ancestors.clone();
                    ancestors.push(item);
                    emit_record(item, &ancestors, section_root, rule, &mut records);
                }
            }
            record => emit_record(record, &branch.ancestors, section_root, rule, &mut records),
        }
    }

    records
}

fn emit_record(
    record: &Value,
    ancestors: &[&Value],
    section_root: &Value,
    rule: &PathMetaRule,
    out: &mut Vec<FlatRecord>,
) {
    let mut base = FlatRecord::new();
    match record {
        Value::Object(map) => flatten_object(None, map, rule.line_items.as_deref(), &mut base),
        // 陣列中的陣列不視為紀錄
        Value::Array(_) => return,
        scalar => base.insert(SCALAR_COLUMN, scalar.clone()),
    }

    for meta in &rule.meta {
        base.insert(meta.name.clone(), resolve_meta(meta, record, ancestors, section_root));
    }

    let items = rule
        .line_items
        .as_deref()
        .and_then(|key| record.get(key).map(|items| (key, items)));

    match items {
        Some((key, Value::Array(items))) if !items.is_empty() => {
            for item in items {
                let mut row = base.clone();
                for (column, value) in flatten_item(key, item).data {
                    // 紀錄層級的值優先
                    if !row.contains(&column) {
                        row.insert(column, value);
                    }
                }
                out.push(row);
            }
        }
        _ => out.push(base),
    }
}

fn resolve_meta(meta: &MetaField, record: &Value, ancestors: &[&Value], section_root: &Value) -> Value {
    std::iter::once(record)
        .chain(ancestors.iter().rev().copied())
        .chain(std::iter::once(section_root))
        .filter_map(|context| lookup(context, &meta.path))
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

fn flatten_item(key: &str, item: &Value) -> FlatRecord {
    let mut record = FlatRecord::new();
    match item {
        Value::Object(map) => flatten_object(None, map, None, &mut record),
        Value::Array(_) => {}
        scalar => record.insert(key, scalar.clone()),
    }
    record
}

/// 物件攤平：巢狀物件以 `parent.child` 命名，陣列略過
pub fn flatten_object(prefix: Option<&str>, map: &Map<String, Value>, skip: Option<&str>, out: &mut FlatRecord) {
    for (key, value) in map {
        if prefix.is_none() && skip == Some(key.as_str()) {
            continue;
        }
        let column = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_object(Some(column.as_str()), inner, None, out),
            Value::Array(_) => {}
            scalar => out.insert(column, scalar.clone()),
        }
    }
}
