// Adapters layer: concrete implementations of the domain ports (storage, workbook writers).

pub mod csv_zip;
pub mod sheet_name;
pub mod storage;
pub mod xlsx;

use crate::config::app_config::{OutputFormat, SheetLayout};
use crate::domain::ports::WorkbookWriter;
use std::sync::Arc;

pub use csv_zip::CsvZipWorkbookWriter;
pub use storage::LocalStorage;
pub use xlsx::XlsxWorkbookWriter;

pub fn writer_for(format: OutputFormat, layout: SheetLayout) -> Arc<dyn WorkbookWriter> {
    match format {
        OutputFormat::Xlsx => Arc::new(XlsxWorkbookWriter::new(layout)),
        OutputFormat::CsvZip => Arc::new(CsvZipWorkbookWriter),
    }
}
