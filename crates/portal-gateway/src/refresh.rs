//! Coalesced token refresh
//!
//! At most one refresh is in flight. Callers arriving while it runs receive a
//! clone of the same shared future and observe the same outcome. The slot is
//! cleared when the refresh settles, whatever the result.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portal_auth::{IdentityProvider, Session};

use crate::error::RefreshError;

type SharedOutcome = Shared<BoxFuture<'static, Result<Session, RefreshError>>>;

#[derive(Clone)]
struct PendingRefresh {
    outcome: SharedOutcome,
    // One per refresh, shared by everyone who waited on it
    redirect_claimed: Arc<AtomicBool>,
}

/// What one waiter saw of a coalesced refresh
pub struct RefreshAttempt {
    pub result: Result<Session, RefreshError>,
    redirect_claimed: Arc<AtomicBool>,
}

impl RefreshAttempt {
    /// True for exactly one waiter of a given refresh
    pub fn claim_redirect(&self) -> bool {
        !self.redirect_claimed.swap(true, Ordering::SeqCst)
    }
}

pub struct RefreshCoordinator {
    provider: Arc<dyn IdentityProvider>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Start a refresh, or join the one already in flight
    pub async fn refresh(&self) -> Result<Session, RefreshError> {
        self.attempt().await.result
    }

    /// Like [`refresh`](Self::refresh), keeping the per-refresh redirect claim
    pub async fn attempt(&self) -> RefreshAttempt {
        let pending = self.join_or_start();
        RefreshAttempt {
            result: pending.outcome.await,
            redirect_claimed: pending.redirect_claimed,
        }
    }

    fn join_or_start(&self) -> PendingRefresh {
        let mut slot = self.pending.lock();
        if let Some(pending) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        tracing::debug!("Starting token refresh");

        let provider = Arc::clone(&self.provider);
        let pending = Arc::clone(&self.pending);

        // Spawned so that dropping every waiter does not abort the network call
        let task = tokio::spawn(async move {
            let result = match provider.signin_silent().await {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(RefreshError::NoSession),
                Err(e) => Err(RefreshError::from(e)),
            };
            pending.lock().take();

            match &result {
                Ok(session) => {
                    tracing::info!(expires_at = ?session.expires_at, "Token refresh succeeded")
                }
                Err(e) => tracing::warn!(error = %e, "Token refresh failed"),
            }

            result
        });

        let outcome = async move {
            task.await
                .unwrap_or_else(|e| Err(RefreshError::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        let pending = PendingRefresh {
            outcome,
            redirect_claimed: Arc::new(AtomicBool::new(false)),
        };
        *slot = Some(pending.clone());
        pending
    }
}

impl Clone for RefreshCoordinator {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            pending: Arc::clone(&self.pending),
        }
    }
}
