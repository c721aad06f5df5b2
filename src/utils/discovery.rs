use std::path::{Path, PathBuf};

/// 展開來源路徑：檔案原樣保留，資料夾只取其直接底下的檔案（不遞迴）。
/// 不存在或無法讀取的路徑記錄警告後略過。
pub fn collect_source_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            match folder_files(input) {
                Ok(entries) => {
                    tracing::debug!("📂 {} contributes {} files", input.display(), entries.len());
                    files.extend(entries);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Skipping unreadable folder {}: {}", input.display(), e);
                }
            }
        } else {
            tracing::warn!("⚠️ Skipping unknown path: {}", input.display());
        }
    }

    files
}

fn folder_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// 輸出檔名 = 來源檔名主體 + 寫出器副檔名
pub fn derive_output_path(source: &Path, dest_dir: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "output".to_string());
    dest_dir.join(format!("{}.{}", stem, extension))
}
