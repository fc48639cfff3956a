use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokenring::cli::{self, LogFormat};
use tokenring::node::{NodeOutcome, RingNode};
use tokenring::settings::{APP_NAME, APP_VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args and env vars
    let args = cli::Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tokenring=info".into());
    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    let settings = args.into_settings()?;
    info!(
        "Starting {} {} as node {} on {}",
        APP_NAME, APP_VERSION, settings.node_id, settings.listen
    );

    let node = RingNode::bind(settings).await?;
    let handle = node.spawn();
    let node_id = handle.node_id();
    let status_rx = handle.subscribe();

    match handle.wait().await? {
        NodeOutcome::Stopped { final_balance } => {
            info!(
                "[Node<{}>] Terminated, final balance {}",
                node_id, final_balance
            );
        }
    }
    let summary = serde_json::to_string(&*status_rx.borrow())?;
    info!("[Node<{}>] Final status {}", node_id, summary);
    Ok(())
}
