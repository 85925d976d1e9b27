use clap::Parser;
use tokio_util::sync::CancellationToken;
use wound_aid::app::report;
use wound_aid::utils::error::ErrorSeverity;
use wound_aid::utils::{logger, validation::Validate};
use wound_aid::{AidError, CliArgs, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting wound-aid");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let config = match args.load_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let submission = match args.submission().await {
        Ok(submission) => submission,
        Err(e) => exit_with(&e),
    };

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => exit_with(&e),
    };

    // Ctrl-C 取消進行中的請求
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupted, cancelling request");
            ctrl_c_token.cancel();
        }
    });

    let payload = orchestrator.run(submission, &cancel).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", report::render_text(&payload));
    }

    if payload.is_failed() {
        std::process::exit(1);
    }

    Ok(())
}

fn exit_with(error: &AidError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());

    let exit_code = match error.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
