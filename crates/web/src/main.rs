use std::{process::ExitCode, sync::Arc};

use database::{DatabaseSeedInfo, MemoryDatabase};
use directory::client::Client;
use log::{error, info, warn};
use web::{config::WebConfig, start_web_server, WebState};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = match WebConfig::from_env() {
        Ok(config) => config,
        Err(why) => {
            error!("Invalid configuration: {}", why);
            return ExitCode::FAILURE;
        }
    };

    // database
    let database = match DatabaseSeedInfo::from_env() {
        Some(seed_info) => match MemoryDatabase::load(seed_info).await {
            Ok(database) => database,
            Err(why) => {
                error!("Could not load the database seed: {}", why);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("DATABASE_SEED_FILE is not set, starting with an empty store directory");
            MemoryDatabase::new()
        }
    };

    if config.api_tokens.is_empty() {
        info!("No api tokens configured, all callers are anonymous");
    }

    // web server
    let state = WebState {
        store_client: Client::new(database).with_rate_limits(config.rate_limits),
        identity_provider: Arc::new(config.api_tokens.clone()),
    };

    match start_web_server(config, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            error!("Web server failed: {}", why);
            ExitCode::FAILURE
        }
    }
}
