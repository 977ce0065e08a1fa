use anyhow::Context;
use clap::Parser;
use site_geo::adapters::http::probe_health;
use site_geo::core::report::render_text;
use site_geo::utils::error::{ErrorSeverity, SiteGeoError};
use site_geo::utils::{logger, validation::Validate};
use site_geo::{
    CliConfig, CoordinateResolver, LocalStorage, MultiSourceAggregator, RegistryConfig,
    ReportEngine,
};
use std::sync::Arc;

fn exit_with(e: &SiteGeoError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 輸入錯誤可由使用者修正，其餘依嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 2,
        ErrorSeverity::Medium => 3,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 4,
    };
    std::process::exit(exit_code);
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

    tracing::info!("Starting site-geo");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        exit_with(&e);
    }

    // 載入來源登錄表
    let mut registry = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading source registry from: {}", path);
            RegistryConfig::from_file(path).unwrap_or_else(|e| exit_with(&e))
        }
        None => RegistryConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        registry.backend.base_url = base_url.clone();
    }
    if let Err(e) = registry.validate() {
        exit_with(&e);
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("site-geo/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    if cli.check_health {
        let healthy = probe_health(&client, &registry.backend.base_url, registry.timeout())
            .await
            .map_err(SiteGeoError::from)
            .unwrap_or_else(|e| exit_with(&e));
        println!(
            "{} {}",
            if healthy { "✅" } else { "❌" },
            registry.backend.base_url
        );
        if !healthy {
            std::process::exit(3);
        }
        return Ok(());
    }

    let point = cli
        .resolve_point(&CoordinateResolver::new())
        .unwrap_or_else(|e| exit_with(&e));
    tracing::info!("📍 Query point: {}", point);

    let sources = registry.build_registry(&client);
    let aggregator = Arc::new(MultiSourceAggregator::new(sources));
    let mut engine = ReportEngine::new(aggregator).with_monitoring(cli.monitor);

    let archive_dir = cli.archive.then(|| {
        cli.output_path
            .clone()
            .or_else(|| registry.output_path().map(str::to_string))
            .unwrap_or_else(|| "./output".to_string())
    });
    if let Some(dir) = &archive_dir {
        engine = engine.with_export(LocalStorage::new(dir.clone()), registry.archive_name());
    }

    let output = engine.run(point).await.unwrap_or_else(|e| exit_with(&e));

    println!("{}", render_text(&output.result));
    if let (Some(dir), Some(name)) = (&archive_dir, &output.archive_path) {
        println!("\n📁 Report archive saved to: {}/{}", dir.trim_end_matches('/'), name);
    }

    if !output.result.errors().is_empty() {
        tracing::warn!(
            "{} required source(s) failed for {}",
            output.result.errors().len(),
            output.run_id
        );
    }

    Ok(())
}
