use anyhow::{Context, Result};
use octowatt::config::Config;
use octowatt::logging::{get_logger, init_logging};
use octowatt::octopus::OctopusClient;
use octowatt::service::EnergyService;
use octowatt::store::open_store;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let logger = get_logger("main");
    logger.info(&format!("Octowatt {} starting up", env!("APP_VERSION")));

    let store = open_store(&config.store)
        .await
        .context("Failed to open user store")?;
    let client = OctopusClient::new(&config.provider).context("Failed to create API client")?;
    let service = Arc::new(
        EnergyService::new(store, Arc::new(client), &config)
            .context("Failed to create energy service")?,
    );

    run(service, &config).await
}

#[cfg(feature = "web")]
async fn run(service: Arc<EnergyService>, config: &Config) -> Result<()> {
    octowatt::web::serve(service, &config.web.host, config.web.port).await
}

#[cfg(not(feature = "web"))]
async fn run(_service: Arc<EnergyService>, _config: &Config) -> Result<()> {
    get_logger("main").warn("Built without the web feature; nothing to serve");
    Ok(())
}
