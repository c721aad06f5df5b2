use crate::domain::model::{CellValue, FlatRecord, Table};
use crate::utils::error::Result;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// 未改名欄位的優先序，排在所有改名欄位之後
const PASS_THROUGH_RANK: usize = usize::MAX;

/// 改名 + 依欄位順序投影成表格。
/// `column_order` 為空時，標題為所有出現過的欄位（依首次出現順序）。
pub fn shape(
    records: &[FlatRecord],
    rename: &[(String, String)],
    column_order: &[String],
    sheet_name: &str,
) -> Result<Table> {
    let renamed: Vec<Map<String, Value>> = records
        .iter()
        .map(|record| rename_record(record, rename))
        .collect();

    let header = if column_order.is_empty() {
        observed_columns(&renamed)
    } else {
        column_order.to_vec()
    };

    let mut table = Table::new(sheet_name, header);
    for record in &renamed {
        let row = table
            .header
            .iter()
            .map(|column| record.get(column).map(CellValue::from_json).unwrap_or(CellValue::Empty))
            .collect();
        table.push_row(row)?;
    }

    Ok(table)
}

/// 多個來源欄位對應到同一目標時（例如 `inum`/`nt_num`），
/// 依改名表宣告順序取第一個非 null 值
pub fn rename_record(record: &FlatRecord, rename: &[(String, String)]) -> Map<String, Value> {
    let mut values: Map<String, Value> = Map::new();
    let mut ranks: HashMap<String, usize> = HashMap::new();

    for (column, value) in &record.data {
        let (target, rank) = rename
            .iter()
            .position(|(from, _)| from == column)
            .map(|i| (rename[i].1.clone(), i))
            .unwrap_or_else(|| (column.clone(), PASS_THROUGH_RANK));

        let replace = match (values.get(&target), ranks.get(&target)) {
            (Some(existing), Some(existing_rank)) => {
                if existing.is_null() {
                    !value.is_null() || rank < *existing_rank
                } else {
                    !value.is_null() && rank < *existing_rank
                }
            }
            _ => true,
        };

        if replace {
            ranks.insert(target.clone(), rank);
            values.insert(target, value.clone());
        }
    }

    values
}

fn observed_columns(records: &[Map<String, Value>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for record in records {
        for column in record.keys() {
            if seen.insert(column.as_str()) {
                header.push(column.clone());
            }
        }
    }
    header
}
