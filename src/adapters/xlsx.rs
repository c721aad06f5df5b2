use crate::adapters::sheet_name::SheetNames;
use crate::config::app_config::SheetLayout;
use crate::domain::model::{CellValue, Table, Workbook};
use crate::domain::ports::WorkbookWriter;
use crate::utils::error::Result;
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Worksheet};

/// 以 rust_xlsxwriter 輸出 .xlsx，每張表一個工作表
#[derive(Debug, Clone, Default)]
pub struct XlsxWorkbookWriter {
    layout: SheetLayout,
}

impl XlsxWorkbookWriter {
    pub fn new(layout: SheetLayout) -> Self {
        Self { layout }
    }

    fn write_table(
        &self,
        worksheet: &mut Worksheet,
        table: &Table,
        header_format: &Format,
        date_format: &Format,
    ) -> Result<()> {
        let first_row = self.layout.start_row;
        let first_col = self.layout.start_col;

        for (col_idx, column) in table.header.iter().enumerate() {
            worksheet.write_string_with_format(
                first_row,
                first_col + col_idx as u16,
                column.as_str(),
                header_format,
            )?;
        }

        for (row_idx, row) in table.rows().iter().enumerate() {
            let excel_row = first_row + 1 + row_idx as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                let excel_col = first_col + col_idx as u16;
                match cell {
                    // 空值與無效日期留白
                    CellValue::Empty | CellValue::InvalidDate(_) => {}
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(excel_row, excel_col, *b)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(excel_row, excel_col, *n)?;
                    }
                    CellValue::Text(s) => {
                        worksheet.write_string(excel_row, excel_col, s.as_str())?;
                    }
                    CellValue::Date(date) => {
                        let excel_date = u16::try_from(date.year())
                            .ok()
                            .and_then(|year| {
                                ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
                            });
                        match excel_date {
                            Some(excel_date) => {
                                worksheet.write_datetime_with_format(
                                    excel_row,
                                    excel_col,
                                    &excel_date,
                                    date_format,
                                )?;
                            }
                            None => {
                                worksheet.write_string(
                                    excel_row,
                                    excel_col,
                                    date.format("%Y-%m-%d").to_string(),
                                )?;
                            }
                        }
                    }
                }
            }
        }

        if self.layout.freeze_header && !table.header.is_empty() {
            worksheet.set_freeze_panes(first_row + 1, 0)?;
        }

        Ok(())
    }
}

impl WorkbookWriter for XlsxWorkbookWriter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn render(&self, workbook: &Workbook) -> Result<Vec<u8>> {
        let mut book = rust_xlsxwriter::Workbook::new();
        let header_format = Format::new().set_bold();
        let date_format = Format::new().set_num_format("dd-mm-yyyy");
        let mut names = SheetNames::default();

        for table in workbook.sheets() {
            let name = names.unique(&table.sheet_name);
            let worksheet = book.add_worksheet();
            worksheet.set_name(&name)?;
            self.write_table(worksheet, table, &header_format, &date_format)?;
        }

        Ok(book.save_to_buffer()?)
    }
}
