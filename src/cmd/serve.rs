//! Service commands: `taskboard serve` and `taskboard init`.

use std::path::PathBuf;

use anyhow::Result;
use taskboard::board::server::{self, ServerConfig};
use taskboard::config::TaskboardConfig;

pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub no_cors: bool,
}

pub async fn cmd_serve(config: &TaskboardConfig, overrides: ServeOverrides) -> Result<()> {
    let mut server_config = ServerConfig::from(config);
    if let Some(host) = overrides.host {
        server_config.host = host;
    }
    if let Some(port) = overrides.port {
        server_config.port = port;
    }
    if let Some(db_path) = overrides.db_path {
        server_config.db_path = db_path;
    }
    if overrides.no_cors {
        server_config.cors = false;
    }
    server::start_server(server_config).await
}

pub fn cmd_init(config: &TaskboardConfig, db_path: Option<PathBuf>) -> Result<()> {
    let db_path = db_path.unwrap_or_else(|| config.storage.db_path.clone());
    server::open_store(&db_path)?;
    println!("Board database initialized at {}", db_path.display());
    Ok(())
}
