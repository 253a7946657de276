//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

/// Comma-separated environment list, blanks dropped
fn env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_networks<T: ToString>(networks: &[T]) -> String {
    networks
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Shuma web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let api_keys = env_list("SHUMA_API_KEYS");

    // Trusted networks bypass auth (local network access)
    let trusted_networks_str = std::env::var("SHUMA_TRUSTED_NETWORKS").unwrap_or_default();
    let trusted_networks = shuma_server::parse_trusted_networks(&trusted_networks_str);

    // Trusted proxies (real client IP behind reverse proxies)
    let trusted_proxies_str = std::env::var("SHUMA_TRUSTED_PROXIES").unwrap_or_default();
    let trusted_proxies = shuma_server::parse_trusted_networks(&trusted_proxies_str);

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        if api_keys.is_empty() && trusted_networks.is_empty() {
            println!("   🔒 Authentication: no API keys or trusted networks configured");
            println!("      Set SHUMA_API_KEYS or SHUMA_TRUSTED_NETWORKS, or use --no-auth locally");
        }
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (SHUMA_API_KEYS)",
                api_keys.len()
            );
        }
        if !trusted_networks.is_empty() {
            println!(
                "   🏠 Trusted networks: {} (SHUMA_TRUSTED_NETWORKS)",
                join_networks(&trusted_networks)
            );
        }
        if !trusted_proxies.is_empty() {
            println!(
                "   🔀 Trusted proxies: {} (SHUMA_TRUSTED_PROXIES)",
                join_networks(&trusted_proxies)
            );
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = shuma_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: env_list("SHUMA_ALLOWED_ORIGINS"),
        api_keys,
        trusted_networks,
        trusted_proxies,
    };

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    shuma_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
