//! The `examlens results` command.

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use examlens_client::{create_transport, load_config_from};
use examlens_core::ids::AttemptId;
use examlens_core::loader::{ResultsLoader, ViewSession};
use examlens_core::partition::SolutionFilter;

use super::render;

pub async fn execute(
    attempt_id: String,
    filter: SolutionFilter,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    debug!(?config, "loaded config");
    let mut loader = ResultsLoader::new(create_transport(&config)?);
    if let Some(language) = &config.language {
        loader = loader.with_language(language.clone());
    }

    let session = ViewSession::new();
    let token = session.token().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = session.load(&loader, &AttemptId::new(attempt_id)).await;
    interrupt.abort();

    let view = result.map_err(|e| {
        let message = e.user_message();
        anyhow::Error::new(e).context(message)
    })?;
    render::print_results(&view, filter, &format)
}
