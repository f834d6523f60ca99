use market_server::{Config, Server, ServerState, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (.env is optional)
    dotenv::dotenv().ok();

    // 2. Configuration
    let config = Config::from_env();

    // 3. Logging (the log dir must exist before the appender starts)
    config.ensure_work_dir_structure()?;
    let log_dir = config.log_dir();
    market_server::init_logger_with_file(
        Some(&config.log_level),
        log_dir.to_str(),
    );

    print_banner();
    tracing::info!(
        environment = %config.environment,
        port = config.http_port,
        "AgriMarket server starting..."
    );

    // 4. State (database, lifecycle service, publish client)
    let state = ServerState::initialize(&config).await?;

    // 5. HTTP server with graceful shutdown
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
