use clap::Parser;
use corp_fetch::config::{AppConfig, CliConfig, Command};
use corp_fetch::utils::error::{AppError, ErrorSeverity};
use corp_fetch::utils::logger;
use corp_fetch::{CorporateService, HttpServer};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting corp-fetch");

    // 載入並驗證配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    if let Err(e) = run(cli.command(), &config).await {
        tracing::error!(
            "❌ corp-fetch failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        std::process::exit(exit_code(&e));
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<(), AppError> {
    let service = CorporateService::from_config(config)?;

    match command {
        Command::Serve { .. } => {
            HttpServer::new(service, config.server.bind.clone()).start().await?;
        }
        Command::Fetch { out } => {
            let summary = match service.fetch_to_completion().await {
                Ok(summary) => summary,
                Err(outcome) => {
                    tracing::warn!("⚠️ {}", outcome.message());
                    return Ok(());
                }
            };

            let location = service.export_collection(&out).await?;
            println!("✅ Fetched {} corporates from {} pages", summary.corporates, summary.pages);
            println!("📁 Output saved to: {}", location);

            if summary.aborted {
                eprintln!("⚠️ Fetch stopped early; the collection is partial");
                std::process::exit(2);
            }
        }
        Command::Cluster { input, .. } => {
            let loaded = service.import_collection(&input).await?;
            tracing::info!("📄 Loaded {} corporates from {}", loaded, input);

            // 寫檔失敗要讓指令失敗 (IoError → exit 3)
            let report = service.cluster_and_save().await?;
            println!(
                "✅ Clustered {} corporates into {} clusters",
                report.assigned_count(),
                report.clusters.len()
            );
            for (name, countries) in &report.sorted_countries {
                let top: Vec<String> = countries
                    .iter()
                    .map(|(country, count)| format!("{} ({})", country, count))
                    .collect();
                println!("   {}: {}", name, top.join(", "));
            }
            println!(
                "📁 Output saved to: {}",
                service.storage().describe(&config.clustering.output_file)
            );
        }
    }

    Ok(())
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &AppError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}
