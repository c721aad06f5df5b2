use crate::config::app_config::OutputFormat;
use crate::utils::error::{GstError, Result};
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "turbo-gst")]
#[command(about = "Convert GSTR-1/GSTR-2 return JSON files into Excel workbooks")]
pub struct CliConfig {
    #[arg(
        required = true,
        help = "Source JSON files or folders (only files directly inside a folder are used)"
    )]
    pub sources: Vec<PathBuf>,

    #[arg(long, short = 'd', help = "Destination folder (defaults to [output] output_dir)")]
    pub dest: Option<PathBuf>,

    #[arg(long, short = 'c', help = "TOML application config")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 's', help = "Section configuration JSON (overrides converter.sections_file)")]
    pub sections: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', help = "Only convert these sections")]
    pub only: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Skip these sections")]
    pub skip: Vec<String>,

    #[arg(long, value_enum, help = "Output format (defaults to [output] format)")]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "List the planned conversions without writing anything")]
    pub dry_run: bool,

    #[arg(long, short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        for source in &self.sources {
            validate_path("sources", &source.to_string_lossy())?;
        }
        if let Some(dest) = &self.dest {
            validate_path("dest", &dest.to_string_lossy())?;
        }
        if let Some(name) = self.only.iter().find(|name| self.skip.contains(name)) {
            return Err(GstError::InvalidConfigValueError {
                field: "only/skip".to_string(),
                value: name.clone(),
                reason: "A section cannot be both selected and skipped".to_string(),
            });
        }
        Ok(())
    }
}
