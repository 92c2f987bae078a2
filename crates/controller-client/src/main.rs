//! Headless controller client
//!
//! Connects to a controller server with the configured session cookies,
//! keeps the synchronized state current and logs server notifications.

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::Parser;
    use controller_client::config::{Cli, ClientConfig};
    use controller_client::runtime::{ClientRuntime, RunOutcome};
    use tracing_subscriber::EnvFilter;

    let cli = Cli::parse();
    let config = ClientConfig::from_cli(&cli).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(origin = %config.origin, "starting controller client");

    let mut runtime = ClientRuntime::new(config)?;
    let outcome = runtime
        .run(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!(?outcome, status = %runtime.engine().status(), "controller client stopped");
    if outcome == RunOutcome::Anonymous {
        anyhow::bail!("no authenticated session; pass --session-cookie or set [cookies] in the config file");
    }
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
