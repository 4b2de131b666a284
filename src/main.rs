use clap::Parser;
use melodiqa::core::devices;
use melodiqa::utils::logger::{self, LogFormat};
use melodiqa::{
    CliConfig, CpalCapture, DiscordVoice, MelodiqaError, RunMode, StreamEngine, TomlConfig,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 設定檔要先讀，日誌格式可能寫在裡面
    let file = match cli.config.as_ref().map(TomlConfig::from_file).transpose() {
        Ok(file) => file,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    let logging = file.as_ref().map(|f| &f.logging);
    logger::init_cli_logger(
        cli.verbose,
        logging.and_then(|l| l.level.as_deref()),
        cli.log_format
            .or_else(|| logging.and_then(|l| l.format))
            .unwrap_or(LogFormat::Compact),
    );

    tracing::info!("Starting melodiqa v{}", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli, file.as_ref()).await {
        tracing::error!(
            "❌ melodiqa failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: &CliConfig, file: Option<&TomlConfig>) -> Result<(), MelodiqaError> {
    match RunMode::resolve(cli, file)? {
        RunMode::ListDevices { audio_host, json } => {
            let capture = CpalCapture::new(audio_host);
            let listing = devices::list(&capture)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                devices::log_listing(&listing);
            }
        }
        RunMode::Stream(settings) => {
            let capture = CpalCapture::new(settings.audio_host.clone());
            let transport = DiscordVoice::new(&settings);
            let mut engine = StreamEngine::new_with_monitoring(capture, transport, settings.monitor);

            let stats = engine.run(&settings, shutdown_signal()).await?;
            tracing::info!("✅ Stream finished: {}", stats);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
