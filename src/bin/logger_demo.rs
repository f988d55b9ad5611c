use authgate::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "authgate=trace,debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("token served from memory");
    debug!("access token served from cookie");
    info!("access token refreshed");
    warn!("cookie write failed");
    error!("session terminated");

    let is_err = logger
        .reload_from_config(&LogConfig {
            filter: "authgate=nonsense=1".to_string(),
        })
        .is_err();
    println!("Error on invalid filter: {:?}", is_err);

    Ok(())
}
