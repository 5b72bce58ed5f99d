use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use opcua_web_access::api::{self, ApiState};
use opcua_web_access::comm::{OpcUaConnectionParams, OpcUaGateway};
use opcua_web_access::common::config::Settings;
use opcua_web_access::common::logging::init_logger;
use opcua_web_access::data::NodeStore;
use opcua_web_access::policy::SyncPolicy;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Couldn't listen for ctrl-c: {}", err);
    }
}

#[tokio::main]
async fn main() {
    let settings = Settings::parse();

    //We have to keep the worker_guard alive
    let _worker_guard = init_logger(settings.log_level, &settings.log_file).unwrap_or_else(|e| {
        eprintln!("Couldn't init logger: {e}");
        std::process::exit(1);
    });

    if let Err(err) = settings.validate() {
        error!("Wrong config:\n{}", err);
        std::process::exit(1);
    }

    let store = NodeStore::open(settings.database_path()).unwrap_or_else(|e| {
        error!("Couldn't init db: {}", e);
        std::process::exit(1);
    });

    let gateway = OpcUaGateway::new(OpcUaConnectionParams {
        url: settings.opc_url.clone(),
        username: settings.opc_username.clone(),
        password: settings.opc_password.clone(),
        namespace: settings.opc_namespace,
    });

    let policy = SyncPolicy::new(store, Arc::new(gateway));

    let state = ApiState::new(policy, &settings.api_key, &settings.api_key_name)
        .unwrap_or_else(|e| {
            error!("Couldn't build api state: {}", e);
            std::process::exit(1);
        });

    api::serve_api(
        state,
        &settings.origins(),
        settings.api_port,
        shutdown_signal(),
    )
    .await
    .unwrap_or_else(|e| {
        error!("Couldn't serve api: {}", e);
        std::process::exit(1);
    });

    info!("API interrupted by user, stopping process");
}
