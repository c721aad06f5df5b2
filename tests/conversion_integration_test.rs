use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use turbo_gst::app::batch::CANCELLED_MESSAGE;
use turbo_gst::domain::ports::Storage;
use turbo_gst::{
    AppConfig, BatchConverter, BatchProgress, ConversionOptions, CsvZipWorkbookWriter,
    DocumentConverter, LocalStorage, ProgressEvent, SectionConfig, XlsxWorkbookWriter,
};

fn b2b_sections() -> SectionConfig {
    SectionConfig::from_value(json!({
        "b2b": {
            "record_path": ["*", "inv", "*"],
            "meta": [{"name": "recipient_gstin", "path": "ctin"}],
            "line_items": "itms",
            "rename_dict": {
                "inum": "invoice_or_note_number",
                "nt_num": "invoice_or_note_number",
                "idt": "date",
                "nt_dt": "date",
                "val": "total_value",
                "num": "item_number",
                "itm_det.txval": "taxable_value",
                "itm_det.rt": "rate",
                "itm_det.iamt": "igst"
            },
            "order_df": [
                "recipient_gstin", "invoice_or_note_number", "date", "total_value",
                "item_number", "taxable_value", "rate", "igst"
            ],
            "sheet_name": "B2B"
        },
        "b2cs": {"sheet_name": "B2CS"}
    }))
    .unwrap()
}

fn csv_batch(sections: SectionConfig) -> BatchConverter<LocalStorage> {
    let converter = Arc::new(DocumentConverter::new(
        Arc::new(sections),
        &ConversionOptions::default(),
    ));
    BatchConverter::new(LocalStorage::new(), converter, Arc::new(CsvZipWorkbookWriter))
}

fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

fn read_entry(zip_path: &Path, entry: &str) -> anyhow::Result<String> {
    let data = std::fs::read(zip_path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
    let mut content = String::new();
    archive.by_name(entry)?.read_to_string(&mut content)?;
    Ok(content)
}

fn entry_names(zip_path: &Path) -> anyhow::Result<Vec<String>> {
    let data = std::fs::read(zip_path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
    let mut names = Vec::new();
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}

#[tokio::test]
async fn test_single_invoice_document_produces_one_row() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_json(
        temp_dir.path(),
        "gstr1.json",
        &json!({"gstin":"X","b2b":[{"ctin":"P1","inv":[{"inum":"I1","idt":"01-01-2024","val":100,"itms":[{"num":1,"itm_det":{"txval":100,"rt":18,"iamt":18}}]}]}]}),
    );
    let out_dir = temp_dir.path().join("out");

    let batch = csv_batch(b2b_sections());
    let destination = batch.output_path_for(&source, &out_dir);
    let result = batch.convert_document(&source, &destination).await;

    let (success, message) = result.outcome();
    assert!(success, "{}", message);
    assert_eq!(destination, out_dir.join("gstr1.zip"));

    let b2b = read_entry(&destination, "B2B.csv")?;
    assert_eq!(
        b2b,
        "recipient_gstin,invoice_or_note_number,date,total_value,item_number,taxable_value,rate,igst\n\
         P1,I1,01-01-2024,100,1,100,18,18\n"
    );

    let basic = read_entry(&destination, "Basic Info.csv")?;
    assert_eq!(basic, "Key,Value\ngstin,X\n");
    Ok(())
}

#[tokio::test]
async fn test_absent_section_is_skipped_not_failed() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_json(temp_dir.path(), "only_b2b.json", &json!({"gstin": "X", "b2b": []}));

    let batch = csv_batch(b2b_sections());
    let destination = batch.output_path_for(&source, temp_dir.path());
    let result = batch.convert_document(&source, &destination).await;

    assert!(result.success);
    assert!(result.warnings.is_empty());
    assert_eq!(entry_names(&destination)?, vec!["Basic Info.csv"]);
    Ok(())
}

#[tokio::test]
async fn test_batch_continues_after_broken_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let good_a = write_json(temp_dir.path(), "a.json", &json!({"gstin": "A", "b2cs": [{"rt": 5}]}));
    let broken = temp_dir.path().join("b.json");
    std::fs::write(&broken, "{\"gstin\": ")?;
    let good_c = write_json(temp_dir.path(), "c.json", &json!({"gstin": "C"}));
    let out_dir = temp_dir.path().join("out");

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<BatchProgress>();
    let batch = csv_batch(b2b_sections()).with_progress(progress_tx);
    let report = batch
        .convert_all(&[good_a, broken.clone(), good_c], &out_dir)
        .await;
    drop(batch);

    assert!(!report.success);
    assert_eq!(report.message, "2/3 converted");
    assert!(report.per_file[0].success);
    assert!(!report.per_file[1].success);
    assert!(report.per_file[2].success);
    assert!(out_dir.join("a.zip").exists());
    assert!(!out_dir.join("b.zip").exists());
    assert!(out_dir.join("c.zip").exists());

    let mut events = Vec::new();
    while let Some(progress) = progress_rx.recv().await {
        events.push(progress);
    }
    assert_eq!(events.len(), 6);
    assert_eq!(events[0].event, ProgressEvent::Started);
    assert_eq!((events[2].index, events[2].total), (2, 3));
    assert_eq!(events[2].source, broken);
    assert!(matches!(
        events[3].event,
        ProgressEvent::Finished { success: false, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_non_json_source_fails_without_output() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("notes.txt");
    std::fs::write(&source, "{}")?;

    let batch = csv_batch(b2b_sections());
    let destination = batch.output_path_for(&source, temp_dir.path());
    let result = batch.convert_document(&source, &destination).await;

    assert!(!result.success);
    assert!(result.message.contains("not a JSON file"));
    assert!(!destination.exists());
    Ok(())
}

/// 寫入第一個輸出後即觸發取消
#[derive(Clone)]
struct CancelAfterWrite {
    inner: LocalStorage,
    cancel: Arc<watch::Sender<bool>>,
}

impl Storage for CancelAfterWrite {
    async fn read_file(&self, path: &Path) -> turbo_gst::Result<Vec<u8>> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> turbo_gst::Result<()> {
        self.inner.write_file(path, data).await?;
        let _ = self.cancel.send(true);
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_takes_effect_between_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let first = write_json(temp_dir.path(), "first.json", &json!({"gstin": "A"}));
    let second = write_json(temp_dir.path(), "second.json", &json!({"gstin": "B"}));
    let third = write_json(temp_dir.path(), "third.json", &json!({"gstin": "C"}));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let storage = CancelAfterWrite {
        inner: LocalStorage::new(),
        cancel: Arc::new(cancel_tx),
    };
    let converter = Arc::new(DocumentConverter::new(
        Arc::new(b2b_sections()),
        &ConversionOptions::default(),
    ));
    let batch = BatchConverter::new(storage, converter, Arc::new(CsvZipWorkbookWriter))
        .with_cancellation(cancel_rx);

    let report = batch
        .convert_all(&[first, second, third], temp_dir.path())
        .await;

    assert_eq!(report.converted(), 1);
    assert_eq!(report.total(), 3);
    assert!(report.per_file[0].success);
    assert_eq!(report.per_file[1].message, CANCELLED_MESSAGE);
    assert_eq!(report.per_file[2].message, CANCELLED_MESSAGE);
    assert!(!temp_dir.path().join("second.zip").exists());
    Ok(())
}

#[tokio::test]
async fn test_shipped_gstr1_config_converts_sample_to_xlsx() -> anyhow::Result<()> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let app = AppConfig::from_file(root.join("configs/turbo-gst.toml"))?;
    let sections_file = app
        .sections_file(Some(&root.join("configs")))
        .expect("sections_file is configured");
    let sections = SectionConfig::from_file(sections_file)?;

    let converter = Arc::new(DocumentConverter::new(
        Arc::new(sections),
        &app.conversion_options(),
    ));
    let batch = BatchConverter::new(
        LocalStorage::new(),
        converter,
        Arc::new(XlsxWorkbookWriter::new(app.sheet_layout())),
    );

    let temp_dir = TempDir::new()?;
    let source = root.join("tests/fixtures/gstr1_sample.json");
    let report = batch.convert_all(&[source], temp_dir.path()).await;
    assert!(report.success, "{:?}", report.per_file);

    let output = temp_dir.path().join("gstr1_sample.xlsx");
    let workbook_xml = read_entry(&output, "xl/workbook.xml")?;
    let positions: Vec<usize> = ["Basic Info", "B2B", "B2CS", "HSN Summary", "Documents Issued"]
        .iter()
        .map(|name| {
            workbook_xml
                .find(&format!("name=\"{}\"", name))
                .unwrap_or_else(|| panic!("missing sheet {}", name))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    // cdnr 為空陣列：不產生工作表
    assert!(!workbook_xml.contains("name=\"CDNR\""));
    Ok(())
}

#[tokio::test]
async fn test_gstr2_party_documents_with_fixed_basic_info() -> anyhow::Result<()> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let app = AppConfig::from_file(root.join("configs/turbo-gst-gstr2.toml"))?;
    let sections =
        SectionConfig::from_file(app.sections_file(Some(&root.join("configs"))).unwrap())?;
    let converter = Arc::new(DocumentConverter::new(
        Arc::new(sections),
        &app.conversion_options(),
    ));
    let batch = BatchConverter::new(LocalStorage::new(), converter, Arc::new(CsvZipWorkbookWriter));

    let temp_dir = TempDir::new()?;
    let source = write_json(
        temp_dir.path(),
        "gstr2a.json",
        &json!({
            "gstin": "27AAAAA0000A1Z5",
            "fp": "052024",
            "version": "GST2.0",
            "cdn": [{
                "ctin": "29BBBBB1111B1Z3",
                "nt": [{"nt_num": "CN-9", "nt_dt": "10-05-2024", "val": 59,
                        "itms": [{"num": 1, "itm_det": {"txval": 50, "rt": 18, "iamt": 9}}]}]
            }]
        }),
    );

    let report = batch.convert_all(&[source], temp_dir.path()).await;
    assert!(report.success);

    let output = temp_dir.path().join("gstr2a.zip");
    assert_eq!(
        read_entry(&output, "Basic Info.csv")?,
        "Key,Value\ngstin,27AAAAA0000A1Z5\nfp,052024\n"
    );
    assert_eq!(
        read_entry(&output, "CDN.csv")?,
        "recipient_gstin,invoice_or_note_number,date,total_value,item_number,taxable_value,rate,igst,cgst,sgst,cess\n\
         29BBBBB1111B1Z3,CN-9,2024-05-10,59,1,50,18,9,0,0,0\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_section_over_limit_after_offset_keeps_other_sheets() -> anyhow::Result<()> {
    let app = AppConfig::from_toml_str("[output]\nstart_col = 16000\n")?;
    let wide_columns: Vec<String> = (0..500).map(|i| format!("c{}", i)).collect();
    let sections = SectionConfig::from_value(json!({
        "at": {"processor": "simple_table", "order_df": wide_columns, "sheet_name": "AT"},
        "b2cs": {"processor": "simple_table", "sheet_name": "B2CS"}
    }))?;

    let converter = Arc::new(DocumentConverter::new(
        Arc::new(sections),
        &app.conversion_options(),
    ));
    let batch = BatchConverter::new(
        LocalStorage::new(),
        converter,
        Arc::new(XlsxWorkbookWriter::new(app.sheet_layout())),
    );

    let temp_dir = TempDir::new()?;
    let source = write_json(
        temp_dir.path(),
        "offset.json",
        &json!({"gstin": "X", "at": [{"c0": 1}], "b2cs": [{"rt": 5, "txval": 100}]}),
    );
    let destination = batch.output_path_for(&source, temp_dir.path());
    let result = batch.convert_document(&source, &destination).await;

    let (success, message) = result.outcome();
    assert!(success, "{}", message);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("'at'"));

    let workbook_xml = read_entry(&destination, "xl/workbook.xml")?;
    assert!(workbook_xml.contains("name=\"B2CS\""));
    assert!(!workbook_xml.contains("name=\"AT\""));
    Ok(())
}
