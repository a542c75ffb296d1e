use clap::Parser;
use std::process::ExitCode;
use timer_sync::utils::error::ErrorSeverity;
use timer_sync::utils::{logger, validation::Validate};
use timer_sync::{
    display_from_config, CliConfig, ConfigProvider, HttpPageSource, PollError, Poller, SyncEngine,
    TomlConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting timer-sync");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let result = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(path) {
                Ok(mut config) => {
                    if cli.monitor {
                        config.monitoring = Some(timer_sync::config::toml_config::MonitoringConfig {
                            enabled: true,
                        });
                    }
                    run(config, cli.once).await
                }
                Err(e) => Err(e),
            }
        }
        None => run(cli.clone(), cli.once).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                "❌ timer-sync failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            match e.severity() {
                ErrorSeverity::Low => ExitCode::SUCCESS,
                ErrorSeverity::Medium => ExitCode::from(2),
                ErrorSeverity::High => ExitCode::from(1),
                ErrorSeverity::Critical => ExitCode::from(3),
            }
        }
    }
}

async fn run<C: ConfigProvider + Validate>(config: C, once: bool) -> Result<(), PollError> {
    config.validate()?;
    tracing::info!("✅ Configuration validated");
    tracing::info!(
        "📡 Source: {} (element #{}, every {:?}, ordering {:?})",
        config.page_url(),
        config.element_id(),
        config.interval(),
        config.ordering()
    );

    let source = HttpPageSource::from_config(&config)?;
    let display = display_from_config(&config);
    let poller = Poller::new(source, display, config.poll_settings());
    let engine = SyncEngine::new_with_monitoring(poller, config.monitoring_enabled());

    if once {
        let text = engine.run_once().await?;
        tracing::debug!("Single tick rendered '{}'", text);
        return Ok(());
    }

    let snapshot = engine.run_until(shutdown_signal()).await;
    if snapshot.applied == 0 && snapshot.ticks > 0 {
        tracing::warn!("No tick succeeded during this run");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
