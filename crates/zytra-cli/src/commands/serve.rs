//! Server command implementation

use std::path::PathBuf;

use anyhow::Result;
use zytra_core::Config;

pub async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
    no_seed: bool,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if static_dir.is_some() {
        config.server.static_dir = static_dir;
    }

    println!("🚀 Starting Zytra web server...");
    println!(
        "   Listening: http://{}:{}",
        config.server.host, config.server.port
    );
    if let Some(dir) = &config.server.static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!("   Upload limit: {} MB", config.server.max_upload_mb);
    if config.auth.seed_admin && !no_seed {
        println!("   ⚠️  Default admin account enabled ({})", config.auth.admin_email);
    }
    println!();
    println!("   Press Ctrl+C to stop");

    zytra_server::serve(&config, !no_seed).await
}
