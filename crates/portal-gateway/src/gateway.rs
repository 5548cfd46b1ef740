//! Authorized request pipeline
//!
//! Constructed once per session and passed to every API consumer. Holds the
//! transport, the identity provider and the shared refresh state.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use portal_auth::{IdentityProvider, Session};

use crate::error::{GatewayError, RefreshError};
use crate::refresh::RefreshCoordinator;
use crate::request::OutgoingRequest;
use crate::transport::{Response, Transport};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Refresh when the token expires within this many seconds
    pub refresh_margin_secs: i64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: 60,
        }
    }
}

pub struct Gateway {
    transport: Arc<dyn Transport>,
    provider: Arc<dyn IdentityProvider>,
    refresher: RefreshCoordinator,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        provider: Arc<dyn IdentityProvider>,
        config: GatewayConfig,
    ) -> Self {
        let refresher = RefreshCoordinator::new(Arc::clone(&provider));
        Self {
            transport,
            provider,
            refresher,
            config,
        }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// True when the held token expires inside the safety margin
    pub fn needs_refresh(&self) -> bool {
        if self.provider.is_loading() {
            return false;
        }
        self.provider
            .session()
            .map(|s| s.expires_within(self.config.refresh_margin_secs, Utc::now().timestamp()))
            .unwrap_or(false)
    }

    /// Resolve immediately when the token is still good, otherwise start or
    /// join the single in-flight refresh.
    pub async fn refresh_token_if_needed(
        &self,
    ) -> std::result::Result<Option<Session>, RefreshError> {
        if !self.needs_refresh() {
            return Ok(None);
        }
        self.refresher.refresh().await.map(Some)
    }

    /// Attach the bearer token, refreshing first if it is about to expire.
    ///
    /// A failed refresh is not fatal here: the request goes out with whatever
    /// token is held and a rejection is handled on the response path.
    pub async fn issue(&self, request: &mut OutgoingRequest) -> Result<()> {
        let session = match self.refresh_token_if_needed().await {
            Ok(Some(renewed)) => Some(renewed),
            Ok(None) => self.provider.session(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %request.path,
                    "Proactive token refresh failed, sending with current token"
                );
                self.provider.session()
            }
        };

        if let Some(session) = session {
            request.set_bearer(&session.access_token)?;
        }

        Ok(())
    }

    /// Recover from a 401: refresh once, reattach, resubmit.
    pub async fn on_unauthorized(
        &self,
        mut request: OutgoingRequest,
        response: Response,
    ) -> Result<Response> {
        if !request.mark_retried() {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "Request rejected again after token refresh"
            );
            return Err(unauthorized(&request));
        }

        tracing::info!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "Authorization failed, refreshing token and retrying"
        );

        let attempt = self.refresher.attempt().await;
        match &attempt.result {
            Ok(session) => {
                request.set_bearer(&session.access_token)?;
                let response = self.transport.send(&request).await?;
                classify(&request, response)
            }
            Err(e) => {
                // Every waiter on this refresh fails; only one redirects
                if attempt.claim_redirect() {
                    tracing::error!(error = %e, path = %request.path, "Token refresh failed, signing in again");
                    if let Err(redirect_err) = self.provider.signin_redirect(None).await {
                        tracing::error!(error = %redirect_err, "Sign-in redirect failed");
                    }
                } else {
                    tracing::debug!(path = %request.path, "Sign-in redirect already issued for this refresh");
                }
                Err(GatewayError::Authentication(e.clone()))
            }
        }
    }

    /// Full pipeline: authorize, send, and handle authorization failure
    pub async fn execute(&self, mut request: OutgoingRequest) -> Result<Response> {
        self.issue(&mut request).await?;

        let response = self.transport.send(&request).await?;
        if response.is_unauthorized() && !request.is_retried() {
            return self.on_unauthorized(request, response).await;
        }

        classify(&request, response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(OutgoingRequest::get(path)).await?;
        Ok(response.json()?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = OutgoingRequest::post(path).json(body)?;
        let response = self.execute(request).await?;
        Ok(response.json()?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(OutgoingRequest::delete(path)).await?;
        Ok(())
    }
}

impl Clone for Gateway {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            provider: Arc::clone(&self.provider),
            refresher: self.refresher.clone(),
            config: self.config.clone(),
        }
    }
}

fn unauthorized(request: &OutgoingRequest) -> GatewayError {
    GatewayError::Unauthorized {
        method: request.method.to_string(),
        path: request.path.clone(),
    }
}

fn classify(request: &OutgoingRequest, response: Response) -> Result<Response> {
    if response.is_unauthorized() {
        return Err(unauthorized(request));
    }
    if !response.status.is_success() {
        return Err(GatewayError::Status {
            status: response.status.as_u16(),
            body: response.text(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use parking_lot::Mutex;
    use portal_auth::{AuthError, SigninState};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    enum Renewal {
        Issue(&'static str),
        Fail,
        Nothing,
    }

    struct FakeProvider {
        session: Mutex<Option<Session>>,
        renewal: Mutex<Renewal>,
        delay: Duration,
        loading: AtomicBool,
        // Off for providers that hand back a renewal without holding it
        stores_renewal: AtomicBool,
        silent_calls: AtomicUsize,
        redirects: AtomicUsize,
    }

    impl FakeProvider {
        fn with_token(token: &str, expires_in: i64, renewal: Renewal) -> Arc<Self> {
            Arc::new(Self {
                session: Mutex::new(Some(Session::expiring_in(token, expires_in))),
                renewal: Mutex::new(renewal),
                delay: Duration::from_millis(30),
                loading: AtomicBool::new(false),
                stores_renewal: AtomicBool::new(true),
                silent_calls: AtomicUsize::new(0),
                redirects: AtomicUsize::new(0),
            })
        }

        fn silent_calls(&self) -> usize {
            self.silent_calls.load(Ordering::SeqCst)
        }

        fn redirects(&self) -> usize {
            self.redirects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn session(&self) -> Option<Session> {
            self.session.lock().clone()
        }

        fn is_loading(&self) -> bool {
            self.loading.load(Ordering::SeqCst)
        }

        async fn signin_silent(&self) -> portal_auth::Result<Option<Session>> {
            self.silent_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            let issued = match &*self.renewal.lock() {
                Renewal::Issue(token) => Some(Session::expiring_in(*token, 300)),
                Renewal::Fail => return Err(AuthError::LoginRequired),
                Renewal::Nothing => None,
            };
            if let Some(session) = &issued {
                if self.stores_renewal.load(Ordering::SeqCst) {
                    *self.session.lock() = Some(session.clone());
                }
            }
            Ok(issued)
        }

        async fn signin_redirect(&self, _state: Option<SigninState>) -> portal_auth::Result<()> {
            self.redirects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn signout_redirect(&self) -> portal_auth::Result<()> {
            Ok(())
        }

        async fn remove_user(&self) {
            self.session.lock().take();
        }
    }

    /// Backend that accepts exactly one bearer token
    struct FakeBackend {
        accepted: Option<&'static str>,
        status: StatusCode,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl FakeBackend {
        fn accepting(token: &'static str) -> Arc<Self> {
            Arc::new(Self {
                accepted: Some(token),
                status: StatusCode::OK,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn rejecting_everything() -> Arc<Self> {
            Arc::new(Self {
                accepted: None,
                status: StatusCode::OK,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing_with(token: &'static str, status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                accepted: Some(token),
                status,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Option<String>> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeBackend {
        async fn send(
            &self,
            request: &OutgoingRequest,
        ) -> std::result::Result<Response, TransportError> {
            let bearer = request.bearer().map(str::to_string);
            self.seen.lock().push(bearer.clone());

            if bearer.as_deref() != self.accepted || self.accepted.is_none() {
                return Ok(Response::new(StatusCode::UNAUTHORIZED, Vec::new()));
            }
            Ok(Response::new(self.status, br#"["a","b"]"#.to_vec()))
        }
    }

    struct BrokenTransport;

    #[async_trait]
    impl Transport for BrokenTransport {
        async fn send(
            &self,
            _request: &OutgoingRequest,
        ) -> std::result::Result<Response, TransportError> {
            Err(TransportError::Connection("connection refused".into()))
        }
    }

    fn gateway(backend: Arc<dyn Transport>, provider: Arc<FakeProvider>) -> Gateway {
        Gateway::new(backend, provider, GatewayConfig::default())
    }

    #[tokio::test]
    async fn test_fresh_token_attached_without_refresh() {
        let provider = FakeProvider::with_token("current", 120, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("current");
        let gateway = gateway(backend.clone(), provider.clone());

        let items: Vec<String> = gateway.get_json("/list").await.unwrap();

        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(provider.silent_calls(), 0);
        assert_eq!(backend.seen(), vec![Some("current".to_string())]);
    }

    #[tokio::test]
    async fn test_expiring_token_refreshed_before_attach() {
        let provider = FakeProvider::with_token("current", 30, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let mut request = OutgoingRequest::get("/list");
        gateway.issue(&mut request).await.unwrap();
        assert_eq!(request.bearer(), Some("fresh"));
        assert_eq!(provider.silent_calls(), 1);

        gateway.execute(OutgoingRequest::get("/list")).await.unwrap();
        assert_eq!(provider.silent_calls(), 1);
        assert_eq!(backend.seen(), vec![Some("fresh".to_string())]);
    }

    #[tokio::test]
    async fn test_issue_attaches_returned_renewal() {
        let provider = FakeProvider::with_token("current", 30, Renewal::Issue("fresh"));
        provider.stores_renewal.store(false, Ordering::SeqCst);
        let gateway = gateway(FakeBackend::accepting("fresh"), provider.clone());

        let mut request = OutgoingRequest::get("/list");
        gateway.issue(&mut request).await.unwrap();

        assert_eq!(request.bearer(), Some("fresh"));
        assert_eq!(provider.session().unwrap().access_token, "current");
    }

    #[tokio::test]
    async fn test_huge_margin_does_not_overflow() {
        let provider = FakeProvider::with_token("current", 3600, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = Gateway::new(
            backend.clone(),
            provider.clone(),
            GatewayConfig {
                refresh_margin_secs: i64::MAX,
            },
        );

        assert!(gateway.needs_refresh());
        gateway.execute(OutgoingRequest::get("/list")).await.unwrap();
        assert_eq!(provider.silent_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let provider = FakeProvider::with_token("expired", -5, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let calls = (0..10).map(|_| gateway.execute(OutgoingRequest::get("/list")));
        let results = join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.silent_calls(), 1);
        assert_eq!(backend.seen().len(), 10);
        assert!(backend
            .seen()
            .iter()
            .all(|b| b.as_deref() == Some("fresh")));
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        // Token looks valid locally but was revoked server side
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let calls = (0..5).map(|_| gateway.execute(OutgoingRequest::get("/list")));
        let results = join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.silent_calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_carries_new_token() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let response = gateway.execute(OutgoingRequest::get("/list")).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(provider.silent_calls(), 1);
        assert_eq!(
            backend.seen(),
            vec![Some("revoked".to_string()), Some("fresh".to_string())]
        );
        assert_eq!(provider.redirects(), 0);
    }

    #[tokio::test]
    async fn test_persistent_401_retried_only_once() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Issue("fresh"));
        let backend = FakeBackend::rejecting_everything();
        let gateway = gateway(backend.clone(), provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Unauthorized { .. }));
        assert!(err.is_auth_failure());
        assert_eq!(backend.seen().len(), 2);
        assert_eq!(provider.silent_calls(), 1);
        assert_eq!(provider.redirects(), 0);
    }

    #[tokio::test]
    async fn test_on_unauthorized_ignores_retried_request() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Issue("fresh"));
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let mut request = OutgoingRequest::get("/list");
        request.mark_retried();
        let response = Response::new(StatusCode::UNAUTHORIZED, Vec::new());

        let err = gateway.on_unauthorized(request, response).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized { .. }));
        assert_eq!(provider.silent_calls(), 0);
        assert!(backend.seen().is_empty());
    }

    #[tokio::test]
    async fn test_reactive_refresh_failure_redirects_once() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Fail);
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Authentication(RefreshError::SigninFailed(_))
        ));
        assert_eq!(provider.redirects(), 1);
        assert_eq!(backend.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_failure_redirects_once() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Fail);
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let calls = (0..5).map(|_| gateway.execute(OutgoingRequest::get("/list")));
        let results = join_all(calls).await;

        assert!(results.iter().all(|r| matches!(
            r,
            Err(GatewayError::Authentication(RefreshError::SigninFailed(_)))
        )));
        assert_eq!(provider.silent_calls(), 1);
        assert_eq!(provider.redirects(), 1);

        // A later, separate failure gets its own redirect
        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(provider.silent_calls(), 2);
        assert_eq!(provider.redirects(), 2);
    }

    #[tokio::test]
    async fn test_redirect_claimed_by_one_waiter() {
        let provider = FakeProvider::with_token("current", 10, Renewal::Fail);
        let coordinator = RefreshCoordinator::new(provider.clone());

        let (first, second) = tokio::join!(coordinator.attempt(), coordinator.attempt());
        assert!(first.result.is_err());
        assert_eq!(first.result, second.result);
        assert!(first.claim_redirect());
        assert!(!second.claim_redirect());
        assert!(!first.claim_redirect());
        assert_eq!(provider.silent_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_terminal() {
        let provider = FakeProvider::with_token("revoked", 300, Renewal::Nothing);
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Authentication(RefreshError::NoSession)
        ));
        assert_eq!(provider.redirects(), 1);
    }

    #[tokio::test]
    async fn test_proactive_failure_falls_through_to_reactive_path() {
        let provider = FakeProvider::with_token("stale", 10, Renewal::Fail);
        let backend = FakeBackend::accepting("fresh");
        let gateway = gateway(backend.clone(), provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        // Stale token still sent; the pending slot was cleared so the 401 path
        // could start a second attempt
        assert_eq!(backend.seen(), vec![Some("stale".to_string())]);
        assert_eq!(provider.silent_calls(), 2);
        assert_eq!(provider.redirects(), 1);
    }

    #[tokio::test]
    async fn test_refresh_if_needed_is_noop_for_valid_token() {
        let provider = FakeProvider::with_token("current", 3600, Renewal::Issue("fresh"));
        let gateway = gateway(FakeBackend::accepting("current"), provider.clone());

        assert_eq!(gateway.refresh_token_if_needed().await, Ok(None));
        assert_eq!(provider.silent_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_proactive_refresh_while_loading() {
        let provider = FakeProvider::with_token("current", 10, Renewal::Issue("fresh"));
        provider.loading.store(true, Ordering::SeqCst);
        let gateway = gateway(FakeBackend::accepting("current"), provider.clone());

        let mut request = OutgoingRequest::get("/list");
        gateway.issue(&mut request).await.unwrap();

        assert_eq!(request.bearer(), Some("current"));
        assert_eq!(provider.silent_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_session_sends_without_header() {
        let provider = FakeProvider::with_token("current", 120, Renewal::Fail);
        provider.session.lock().take();
        let backend = FakeBackend::accepting("current");
        let gateway = gateway(backend.clone(), provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(backend.seen(), vec![None]);
    }

    #[tokio::test]
    async fn test_non_auth_errors_pass_through() {
        let provider = FakeProvider::with_token("current", 120, Renewal::Issue("fresh"));
        let backend = FakeBackend::failing_with("current", StatusCode::INTERNAL_SERVER_ERROR);
        let gateway = gateway(backend, provider.clone());

        let err = gateway
            .execute(OutgoingRequest::get("/list"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 500, .. }));
        assert_eq!(provider.silent_calls(), 0);

        let gateway = Gateway::new(
            Arc::new(BrokenTransport),
            provider.clone(),
            GatewayConfig::default(),
        );
        let err = gateway.delete("/users/1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert_eq!(provider.redirects(), 0);
    }

    #[tokio::test]
    async fn test_pending_refresh_cleared_on_settle() {
        let provider = FakeProvider::with_token("current", 10, Renewal::Fail);
        let coordinator = RefreshCoordinator::new(provider.clone());

        assert!(coordinator.refresh().await.is_err());
        assert!(!coordinator.is_pending());

        *provider.renewal.lock() = Renewal::Issue("fresh");
        let session = coordinator.refresh().await.unwrap();
        assert_eq!(session.access_token, "fresh");
        assert!(!coordinator.is_pending());
        assert_eq!(provider.silent_calls(), 2);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_abort_refresh() {
        let provider = FakeProvider::with_token("current", 10, Renewal::Issue("fresh"));
        let coordinator = RefreshCoordinator::new(provider.clone());

        let waited =
            tokio::time::timeout(Duration::from_millis(5), coordinator.refresh()).await;
        assert!(waited.is_err());
        assert!(coordinator.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!coordinator.is_pending());
        assert_eq!(provider.session().unwrap().access_token, "fresh");
        assert_eq!(provider.silent_calls(), 1);
    }
}
