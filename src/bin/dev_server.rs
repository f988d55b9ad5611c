use authgate::dev_server::{self, DevBackend};
use authgate::logger::*;
use authgate::settings::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let dev = &project_settings.dev_server;
    let address: SocketAddr = dev.address.parse()?;
    let backend = DevBackend::new(
        dev.signing_key.as_bytes(),
        chrono::Duration::seconds(dev.access_ttl_secs),
    )?
    .with_demo_accounts()?;
    info!("demo accounts: <role>@example.com / password");

    dev_server::serve(Arc::new(backend), address, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not listen for SIGINT: {}", e);
        }
    })
    .await;

    info!("dev server stopped");
    Ok(())
}
