//! Run command: start the dispatch engine

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::engine::Engine;

/// Execute the run command
pub async fn run_engine(args: &RunArgs) -> Result<()> {
    let config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        config = %args.config.display(),
        batch_size = config.batch_size,
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry run requested, configuration is valid, exiting");
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let engine = Engine::new(config);

    tokio::select! {
        result = engine.run() => {
            result.context("Engine terminated with an error")?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    engine.shutdown();
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
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
                warn!(error = %e, "failed to listen for SIGTERM");
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
