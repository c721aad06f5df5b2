pub mod coerce;
pub mod document;
pub mod etl;
pub mod fixed_shape;
pub mod flatten;
pub mod path;
pub mod section;
pub mod shape;

pub use crate::domain::model::{ConversionSummary, ConvertedDocument, FlatRecord, Table, Workbook};
pub use crate::domain::ports::{Pipeline, Storage, WorkbookWriter};
pub use crate::utils::error::Result;
