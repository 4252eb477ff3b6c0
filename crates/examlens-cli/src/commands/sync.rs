//! The `examlens sync` command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use examlens_client::{create_transport, load_config_from, ClientConfig, HttpTransport};
use examlens_core::error::SyncError;
use examlens_core::store::FileStore;
use examlens_core::sync::{AttemptIndexSync, SessionEvent};

use super::render;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (_, sync) = open(config_path.as_deref())?;
    let index = sync
        .handle(SessionEvent::SignedIn, Utc::now())
        .await
        .map_err(explain)?
        .unwrap_or_default();
    render::print_index(&index, "text")
}

/// Config plus a sync service over the configured backend and cache file.
pub(crate) fn open(
    config_path: Option<&Path>,
) -> Result<(ClientConfig, AttemptIndexSync<HttpTransport, FileStore>)> {
    let config = load_config_from(config_path)?;
    debug!(?config, "loaded config");
    let transport = create_transport(&config)?;
    let sync = AttemptIndexSync::new(transport, config.store()).with_reconciler(config.reconciler());
    Ok((config, sync))
}

/// Attach the learner-facing message to a sync failure.
pub(crate) fn explain(e: SyncError) -> anyhow::Error {
    match &e {
        SyncError::Fetch(fetch) => {
            let message = fetch.user_message();
            anyhow::Error::new(e).context(message)
        }
        SyncError::Store(_) => anyhow::Error::new(e).context("attempt cache unavailable"),
    }
}
