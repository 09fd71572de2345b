use alejandria::AppState;
use alejandria::api::routes::app;
use alejandria::cli::{Cli, Commands, config_report, load_config_manager};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let (config_manager, from_file) = load_config_manager(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if let Some(Commands::Config { validate, strict }) = cli.command {
        let report = config_report(&config_manager.config(), validate, strict)?;
        println!("{report}");
        return Ok(());
    }

    let config = config_manager.config();
    init_tracing(&config.server.log_level, cli.verbose, cli.json_logs);

    let config_manager = Arc::new(config_manager);
    if from_file {
        if let Err(e) = config_manager.start_watching() {
            tracing::warn!(error = %e, "config hot-reload disabled");
        }
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found; using defaults");
    }

    let state = AppState::from_config_manager(Arc::clone(&config_manager))?;
    tracing::info!(
        dispatch = ?config.summarizer.dispatch,
        model = %config.llm.model,
        sources = ?state.supervisor.source_names(),
        "state initialized"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Alejandria server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    config_manager.stop_watching();
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(log_level: &str, verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
