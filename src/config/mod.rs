pub mod app_config;
#[cfg(feature = "cli")]
pub mod cli;
pub mod section_config;

pub use app_config::{AppConfig, ConversionOptions, OutputFormat, SheetLayout};
pub use section_config::{SectionConfig, SectionRule};

#[cfg(feature = "cli")]
pub use cli::CliConfig;
