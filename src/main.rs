use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use turbo_gst::app::batch::ProgressEvent;
use turbo_gst::utils::discovery::collect_source_files;
use turbo_gst::utils::error::{ErrorSeverity, GstError};
use turbo_gst::utils::{logger, validation::Validate};
use turbo_gst::{
    writer_for, AppConfig, BatchConverter, CliConfig, DocumentConverter, LocalStorage,
    SectionConfig,
};

/// 依錯誤嚴重程度決定退出碼
fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &GstError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

fn load_app_config(cli: &CliConfig) -> Result<(AppConfig, Option<PathBuf>), GstError> {
    match &cli.config {
        Some(path) => {
            let config = AppConfig::from_file(path)?;
            config.validate()?;
            Ok((config, path.parent().map(|p| p.to_path_buf())))
        }
        None => Ok((AppConfig::default(), None)),
    }
}

fn load_sections(cli: &CliConfig, app: &AppConfig, config_dir: Option<&Path>) -> Result<SectionConfig, GstError> {
    let path = cli
        .sections
        .clone()
        .or_else(|| app.sections_file(config_dir))
        .ok_or_else(|| GstError::MissingConfigError {
            field: "converter.sections_file (or --sections)".to_string(),
        })?;

    tracing::info!("🧩 Loading section configuration from {}", path.display());
    SectionConfig::from_file(&path)?.select(&cli.only, &cli.skip)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting turbo-gst");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    let (app, config_dir) = load_app_config(&cli).unwrap_or_else(|e| fail(&e));
    let sections = load_sections(&cli, &app, config_dir.as_deref()).unwrap_or_else(|e| fail(&e));
    let sources = collect_source_files(&cli.sources);

    let dest_dir = cli
        .dest
        .clone()
        .unwrap_or_else(|| PathBuf::from(&app.output.output_dir));
    let format = cli.format.unwrap_or(app.output.format);
    let writer = writer_for(format, app.sheet_layout());
    let converter = Arc::new(DocumentConverter::new(
        Arc::new(sections),
        &app.conversion_options(),
    ));

    if sources.is_empty() {
        eprintln!("⚠️ No source files found");
        std::process::exit(2);
    }

    let monitor_enabled = cli.monitor || app.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let batch = BatchConverter::new(LocalStorage::new(), Arc::clone(&converter), writer)
        .with_progress(progress_tx)
        .with_cancellation(cancel_rx)
        .with_monitoring(monitor_enabled);

    if cli.dry_run {
        println!(
            "🔎 Dry run: {} files, {} sections, format {}",
            sources.len(),
            converter.sections().len(),
            format
        );
        println!("   Sections: {}", converter.sections().section_keys().join(", "));
        for source in &sources {
            println!("   {} → {}", source.display(), batch.output_path_for(source, &dest_dir).display());
        }
        return Ok(());
    }

    // Ctrl-C：目前檔案完成後停止
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("⏹️ Cancellation requested, finishing current file");
            let _ = cancel_tx.send(true);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            match progress.event {
                ProgressEvent::Started => {
                    println!("[{}/{}] {}", progress.index, progress.total, progress.source.display());
                }
                ProgressEvent::Finished { success: true, .. } => {}
                ProgressEvent::Finished { success: false, message } => {
                    println!("   ❌ {}", message);
                }
            }
        }
    });

    let report = batch.convert_all(&sources, &dest_dir).await;
    drop(batch);
    let _ = printer.await;

    for result in &report.per_file {
        let status = if result.success { "✅" } else { "❌" };
        println!("{} {}: {}", status, result.source.display(), result.message);
        for warning in &result.warnings {
            println!("   ⚠️ {}", warning);
        }
    }
    println!("📊 {}", report.message);

    if !report.success {
        std::process::exit(1);
    }

    Ok(())
}
