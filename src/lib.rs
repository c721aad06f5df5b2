pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{writer_for, CsvZipWorkbookWriter, LocalStorage, XlsxWorkbookWriter};
pub use app::{BatchConverter, BatchProgress, ProgressEvent};
pub use config::{AppConfig, ConversionOptions, OutputFormat, SectionConfig, SheetLayout};
pub use core::{document::DocumentConverter, etl::ConversionEngine};
pub use domain::model::{ConversionReport, FileResult};
pub use utils::error::{GstError, Result};
