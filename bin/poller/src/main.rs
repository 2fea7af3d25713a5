use openmic_integration::{Connector, HttpFetcher, OpenMicConnector};
use openmic_poller::{config::PollerConfig, runner::run_once};
use openmic_trigger::{CallPoller, FileWatermarkStore};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration from environment
    let config = match PollerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let trigger_id = config.trigger_id();
    tracing::info!(
        %trigger_id,
        base_url = %config.api.base_url,
        watermark_path = %config.watermark_path.display(),
        "Loaded configuration"
    );

    let fetcher = match HttpFetcher::new(&config.api, config.api_key.clone()) {
        Ok(fetcher) => fetcher,
        Err(report) => {
            tracing::error!(error = %report, "Failed to build API client");
            return ExitCode::FAILURE;
        }
    };

    // Reject a bad key up front; an unreachable API is retried by the loop
    let connector = OpenMicConnector::new(fetcher.clone(), config.api.base_url.clone());
    match connector.health_check().await {
        Ok(true) => tracing::info!("API key accepted"),
        Ok(false) => {
            tracing::error!("API key was rejected");
            return ExitCode::FAILURE;
        }
        Err(report) => {
            tracing::warn!(error = %report, "Could not verify API key");
        }
    }

    let poller = CallPoller::new(
        trigger_id,
        fetcher,
        FileWatermarkStore::new(&config.watermark_path),
    );
    let poll_config = config.poll.trigger_config();
    let mut interval = tokio::time::interval(config.poll.interval());
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(report) = run_once(&poller, &poll_config, &mut stdout).await {
                    if report.current_context().is_fatal() {
                        tracing::error!(error = %report, "Poll failed, stopping");
                        return ExitCode::FAILURE;
                    }
                    tracing::error!(error = %report, "Poll failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
