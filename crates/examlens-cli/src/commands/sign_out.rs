//! The `examlens sign-out` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use examlens_core::sync::SessionEvent;

use super::sync::{explain, open};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (config, sync) = open(config_path.as_deref())?;
    sync.handle(SessionEvent::SignedOut, Utc::now())
        .await
        .map_err(explain)?;
    println!("Cleared attempt cache at {}", config.cache_path.display());
    Ok(())
}
