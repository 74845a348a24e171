use comanda_agent::{Config, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    setup_environment();

    tracing::info!("Comanda print agent starting");

    // 2. Configuration (read once)
    let config = Config::from_env();

    // 3. Run until shutdown; only a startup error is fatal
    if let Err(e) = comanda_agent::run(config).await {
        tracing::error!("Agent error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
