//! Keeps the cached attempt index in step with the backend.
//!
//! Refreshes are serialized and always write the whole index. A refresh
//! that cannot reach a usable user-attempts route clears the cache instead
//! of leaving a possibly different user's attempts behind. Auth failures
//! leave the cache alone and are handed back for re-authentication.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::api::{AttemptsRoute, ExamApi};
use crate::attempt::{AttemptIndex, AttemptRecord, AttemptStatus, ReattemptTicket};
use crate::error::{FetchError, SyncError};
use crate::ids::ExamSetId;
use crate::normalize::RawAttempt;
use crate::reconcile::Reconciler;
use crate::store::{read_or_reset, AttemptIndexStore};
use crate::transport::Transport;

/// Session lifecycle signals that affect the attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    VisibilityRegained,
    SignedIn,
    SignedOut,
}

pub struct AttemptIndexSync<T, S> {
    api: ExamApi<T>,
    store: S,
    reconciler: Reconciler,
    gate: Mutex<()>,
}

impl<T: Transport, S: AttemptIndexStore> AttemptIndexSync<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self {
            api: ExamApi::new(transport),
            store,
            reconciler: Reconciler::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn api(&self) -> &ExamApi<T> {
        &self.api
    }

    /// The cached index as it stands.
    pub fn cached(&self) -> Result<AttemptIndex, SyncError> {
        Ok(read_or_reset(&self.store)?)
    }

    /// Fetch the user's attempts, reconcile them with the cache and write
    /// the result back.
    #[instrument(skip(self))]
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<AttemptIndex, SyncError> {
        let _gate = self.gate.lock().await;

        let remote = match self.fetch_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                if e.clears_cache() {
                    warn!("attempt refresh failed, clearing cache: {e}");
                    self.discard_cache();
                } else {
                    warn!("attempt refresh failed, cache kept: {e}");
                }
                return Err(e.into());
            }
        };

        let cached = read_or_reset(&self.store)?;
        let merged = self.reconciler.reconcile(&remote, &cached, now);
        if let Err(e) = self.store.overwrite(&merged) {
            warn!("writing refreshed attempt index failed, clearing cache: {e}");
            self.discard_cache();
            return Err(e.into());
        }
        info!(
            remote = remote.len(),
            entries = merged.len(),
            "attempt index refreshed"
        );
        Ok(merged)
    }

    fn discard_cache(&self) {
        if let Err(e) = self.store.clear() {
            warn!("clearing attempt cache failed: {e}");
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<RawAttempt>, FetchError> {
        match self.api.user_attempts(AttemptsRoute::Primary).await {
            Ok(remote) => Ok(remote),
            Err(e) if e.is_not_found() || matches!(e, FetchError::Shape { .. }) => {
                info!("primary attempts route unusable ({e}), trying fallback");
                self.api.user_attempts(AttemptsRoute::Fallback).await
            }
            Err(e) => Err(e),
        }
    }

    /// React to a session event. Returns the refreshed index when one was
    /// fetched.
    pub async fn handle(
        &self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<AttemptIndex>, SyncError> {
        match event {
            SessionEvent::VisibilityRegained | SessionEvent::SignedIn => {
                self.refresh(now).await.map(Some)
            }
            SessionEvent::SignedOut => {
                self.sign_out().await?;
                Ok(None)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), SyncError> {
        let _gate = self.gate.lock().await;
        self.store.clear()?;
        info!("attempt cache cleared on sign-out");
        Ok(())
    }

    /// Start a new attempt and record it locally before the backend's
    /// attempt list reflects it.
    #[instrument(skip_all, fields(exam_set_id = %exam_set_id))]
    pub async fn reattempt(
        &self,
        exam_set_id: &ExamSetId,
        now: DateTime<Utc>,
    ) -> Result<ReattemptTicket, SyncError> {
        let _gate = self.gate.lock().await;
        let ticket = self.api.reattempt(exam_set_id).await?;

        let mut index = read_or_reset(&self.store)?;
        index.insert(
            AttemptRecord::new(
                exam_set_id.clone(),
                ticket.attempt_id.clone(),
                AttemptStatus::InProgress,
            )
            .created(now),
        );
        self.store.overwrite(&index)?;
        info!(attempt_id = %ticket.attempt_id, "reattempt recorded");
        Ok(ticket)
    }
}
