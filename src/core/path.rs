use crate::config::section_config::PathStep;
use serde_json::Value;

/// 一個展開後的分支：沿途經過的陣列元素（由外到內）與終點值
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub ancestors: Vec<&'a Value>,
    pub value: &'a Value,
}

/// 依步驟走訪 JSON，對每個 `EachElement` 做笛卡兒展開，保持文件順序。
/// 鍵不存在或型別不符時該分支不產生結果。
pub fn resolve<'a>(root: &'a Value, path: &[PathStep]) -> Vec<Resolved<'a>> {
    let mut branches = vec![Resolved {
        ancestors: Vec::new(),
        value: root,
    }];

    for step in path {
        let mut next = Vec::with_capacity(branches.len());
        for branch in branches {
            match step {
                PathStep::Key(name) => {
                    if let Value::Object(map) = branch.value {
                        if let Some(child) = map.get(name) {
                            next.push(Resolved {
                                ancestors: branch.ancestors,
                                value: child,
                            });
                        }
                    }
                }
                PathStep::Index(index) => {
                    if let Value::Array(items) = branch.value {
                        if let Some(child) = items.get(*index) {
                            next.push(Resolved {
                                ancestors: branch.ancestors,
                                value: child,
                            });
                        }
                    }
                }
                PathStep::EachElement => {
                    if let Value::Array(items) = branch.value {
                        for item in items {
                            let mut ancestors = branch.ancestors.clone();
                            ancestors.push(item);
                            next.push(Resolved {
                                ancestors,
                                value: item,
                            });
                        }
                    }
                }
            }
        }
        branches = next;
        if branches.is_empty() {
            break;
        }
    }

    branches
}

/// 不含 `EachElement` 的路徑，最多解析出一個值
pub fn lookup<'a>(root: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    path.iter().try_fold(root, |current, step| match (step, current) {
        (PathStep::Key(name), Value::Object(map)) => map.get(name),
        (PathStep::Index(index), Value::Array(items)) => items.get(*index),
        _ => None,
    })
}
