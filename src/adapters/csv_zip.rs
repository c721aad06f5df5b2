use crate::adapters::sheet_name::SheetNames;
use crate::domain::model::{Table, Workbook};
use crate::domain::ports::WorkbookWriter;
use crate::utils::error::{GstError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// 每張表一個 CSV，打包成單一 zip
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvZipWorkbookWriter;

impl CsvZipWorkbookWriter {
    fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&table.header)?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_plain_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| GstError::IoError(e.into_error()))
    }
}

impl WorkbookWriter for CsvZipWorkbookWriter {
    fn extension(&self) -> &'static str {
        "zip"
    }

    fn render(&self, workbook: &Workbook) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let mut names = SheetNames::default();

        for table in workbook.sheets() {
            let file_name = format!("{}.csv", names.unique(&table.sheet_name));
            tracing::trace!("Adding {} ({} rows)", file_name, table.row_count());
            zip.start_file::<_, ()>(file_name, FileOptions::default())?;
            zip.write_all(&Self::table_to_csv(table)?)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CellValue;
    use std::io::{Cursor, Read};

    #[test]
    fn test_each_sheet_becomes_a_csv_entry() {
        let mut basic = Table::new("Basic Info", vec!["Key".to_string(), "Value".to_string()]);
        basic
            .push_row(vec![CellValue::Text("gstin".into()), CellValue::Text("X".into())])
            .unwrap();
        let mut hsn = Table::new("HSN/SAC", vec!["hsn_sc".to_string(), "txval".to_string()]);
        hsn.push_row(vec![CellValue::Text("1001".into()), CellValue::Number(10.5)])
            .unwrap();

        let mut workbook = Workbook::new();
        workbook.push(basic);
        workbook.push(hsn);

        let bytes = CsvZipWorkbookWriter.render(&workbook).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("HSN_SAC.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hsn_sc,txval\n1001,10.5\n");
    }
}
