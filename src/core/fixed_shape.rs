//! 固定結構區段（HSN 彙總、免稅彙總、文件發行、交易對象文件）的攤平。

use crate::config::section_config::FixedShape;
use crate::core::flatten::{flatten_object, SCALAR_COLUMN};
use crate::domain::model::FlatRecord;
use serde_json::{json, Value};

/// 明細金額欄位：(來源鍵, 輸出欄名)，缺值時為 0
const ITEM_AMOUNTS: &[(&str, &str)] = &[
    ("txval", "taxable_value"),
    ("rt", "rate"),
    ("iamt", "igst"),
    ("camt", "cgst"),
    ("samt", "sgst"),
    ("csamt", "cess"),
];

pub fn extract(shape: &FixedShape, section: &Value) -> Vec<FlatRecord> {
    match shape {
        FixedShape::HsnSummary => hsn_summary(section),
        FixedShape::NilSummary => nil_summary(section),
        FixedShape::DocIssue => doc_issue(section),
        FixedShape::PartyDocuments {
            party_key,
            document_key,
        } => party_documents(section, party_key, document_key),
    }
}

/// 物件或純量攤平成一筆紀錄
pub fn to_record(value: &Value) -> Option<FlatRecord> {
    let mut record = FlatRecord::new();
    match value {
        Value::Object(map) => flatten_object(None, map, None, &mut record),
        Value::Array(_) => return None,
        scalar => record.insert(SCALAR_COLUMN, scalar.clone()),
    }
    Some(record)
}

fn elements(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// `data[*]`，有 `det` 時取 `det` 的內容
fn hsn_summary(section: &Value) -> Vec<FlatRecord> {
    let items = match section {
        Value::Array(items) => items.as_slice(),
        other => elements(other.get("data")),
    };

    items
        .iter()
        .flat_map(|item| match item.get("det") {
            Some(Value::Array(details)) => details.iter().collect::<Vec<_>>(),
            Some(detail @ Value::Object(_)) => vec![detail],
            _ => vec![item],
        })
        .filter_map(to_record)
        .collect()
}

/// 陣列形式取每個元素 `inv` 的第一筆；物件形式取 `inv` 的每一筆
fn nil_summary(section: &Value) -> Vec<FlatRecord> {
    match section {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item.get("inv") {
                Some(Value::Array(inv)) => inv.first(),
                Some(_) => None,
                None => Some(item),
            })
            .filter_map(to_record)
            .collect(),
        other => elements(other.get("inv")).iter().filter_map(to_record).collect(),
    }
}

/// `doc_det[*].docs[*]`
fn doc_issue(section: &Value) -> Vec<FlatRecord> {
    let summaries = match section {
        Value::Array(items) => items.as_slice(),
        other => elements(other.get("doc_det")),
    };

    summaries
        .iter()
        .flat_map(|summary| elements(summary.get("docs")).iter())
        .filter_map(to_record)
        .collect()
}

/// 取第一個有值（非 null、非空字串）的欄位
fn first_present<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
}

/// 交易對象 → 文件（發票或票據）→ 明細，每個明細一列；無明細的文件保留一列
fn party_documents(section: &Value, party_key: &str, document_key: &str) -> Vec<FlatRecord> {
    let mut records = Vec::new();

    for party in elements(Some(section)) {
        let party_id = party.get(party_key).cloned().unwrap_or(Value::Null);

        for document in elements(party.get(document_key)) {
            let mut base = FlatRecord::new();
            base.insert("recipient_gstin", party_id.clone());
            base.insert(
                "invoice_or_note_number",
                first_present(document, &["inum", "nt_num"]).cloned().unwrap_or(Value::Null),
            );
            base.insert(
                "date",
                first_present(document, &["idt", "nt_dt"]).cloned().unwrap_or(Value::Null),
            );
            base.insert("total_value", document.get("val").cloned().unwrap_or(Value::Null));

            let items = elements(document.get("itms"));
            if items.is_empty() {
                records.push(base);
                continue;
            }

            for item in items {
                let mut row = base.clone();
                row.insert("item_number", item.get("num").cloned().unwrap_or(Value::Null));
                let detail = item.get("itm_det");
                for (source, column) in ITEM_AMOUNTS {
                    let amount = detail
                        .and_then(|d| d.get(*source))
                        .filter(|v| !v.is_null())
                        .cloned()
                        .unwrap_or_else(|| json!(0));
                    row.insert(*column, amount);
                }
                records.push(row);
            }
        }
    }

    records
}
