//! Remote provider commands

use std::path::Path;

use anyhow::{Context, Result};
use recon_core::{ProviderClient, ReconConfig, RemoteMatcher};

pub async fn cmd_provider_check(config_path: Option<&Path>) -> Result<()> {
    let config = ReconConfig::load(config_path).context("Failed to load config")?;

    let Some(client) = ProviderClient::from_config(&config.provider)? else {
        println!("No provider configured; reconciliation runs locally.");
        println!("\nTo use a reconciliation agent:");
        println!("  set [provider] kind = \"agent\" and host in the config, or");
        println!("  export RECON_AGENT_HOST=http://localhost:8080");
        return Ok(());
    };

    println!("🔍 Checking provider '{}' at {}...", client.name(), client.host());
    println!("   Timeout: {}s", config.provider.timeout.as_secs());

    if client.health_check().await {
        println!("   ✅ Reachable");
    } else {
        println!("   ❌ Not reachable");
        println!("\n⚠️  Reconciliation will fall back to local heuristic matching.");
    }

    Ok(())
}
