use anyhow::Context;
use clap::Parser;
use dispatch_console::core::analysis::RiskLevel;
use dispatch_console::domain::ports::{NoTips, TipsProvider};
use dispatch_console::gateway::events::ServerEvent;
use dispatch_console::utils::error::ErrorSeverity;
use dispatch_console::utils::{logger, validation::Validate};
use dispatch_console::{serve, spawn_simulation, AppState, CliConfig, GeminiTipsClient, LogFormat};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting dispatch-console");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.load().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {} (severity {:?})", e, e.severity());
            eprintln!("❌ {}", e.user_friendly_message());
            let exit_code = match e.severity() {
                ErrorSeverity::Critical => 3,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    };

    let tips: Arc<dyn TipsProvider> = match GeminiTipsClient::new(&config.tips) {
        Ok(client) if client.is_configured() => {
            tracing::info!("💡 De-escalation tips enabled (model {})", config.tips.model);
            Arc::new(client)
        }
        Ok(_) => {
            tracing::warn!("💡 No text-completion API key, tips requests will return an empty list");
            Arc::new(NoTips)
        }
        Err(e) => {
            tracing::warn!("💡 Tips client unavailable: {}", e);
            Arc::new(NoTips)
        }
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("🛑 Shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::warn!("Ctrl-C handler unavailable: {}", e),
        }
    });

    let (sim, simulation_task) = spawn_simulation(&config, shutdown.clone());
    sim.bus().on(|outbound| {
        if let ServerEvent::CallAnalysis(analysis) = &outbound.event {
            if analysis.risk_level == RiskLevel::Critical {
                tracing::warn!("⚠️ Call {} assessed at CRITICAL risk", analysis.call_id);
            }
        }
    });
    let state = AppState::new(sim, tips);

    let served = serve(&config, state, shutdown.clone()).await;
    shutdown.cancel();
    simulation_task.await.context("simulation task panicked")?;

    served.context("HTTP server stopped with an error")?;
    tracing::info!("✅ Dispatch console stopped");
    Ok(())
}
