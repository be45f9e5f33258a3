use nengoo_server::{Config, Server, ServerState, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load environment (.env is optional)
    let _ = dotenv::dotenv();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging (file output only in production)
    let log_dir = format!("{}/logs", config.work_dir);
    if config.is_production() {
        init_logger_with_file("info", true, Some(&log_dir))?;
    } else {
        init_logger_with_file("debug", false, None)?;
    }

    tracing::info!("Nengoo core starting...");

    // 4. Initialize server state (storage, services)
    let state = ServerState::initialize(&config)?;

    // 5. Run the HTTP server until shutdown
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e);
    }

    Ok(())
}
