//! Authenticated API client
//!
//! Every call goes through [`SessionClient::request`], which attaches the bearer token,
//! recovers from an expired access token with a single coordinated refresh, and sends
//! the user to the right view when the session or the backend is gone.

mod request;

pub use request::ApiRequest;

use crate::dto::{LoginRequest, RefreshRequest, TokenResponse};
use crate::navigation::{LogNavigator, Navigator, Route};
use crate::refresh::{LeaderGuard, RefreshCoordinator, Ticket};
use crate::store::{FileRefreshTokenStore, MemoryRefreshTokenStore, RefreshTokenStore, TokenStore};
use consult_common::{
    ApiConfig, ClientConfig, ClientError, ClientResult, RefreshError, RouteConfig,
};
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

struct Inner {
    http: Client,
    api: ApiConfig,
    routes: RouteConfig,
    tokens: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
}

/// Session-aware HTTP client
///
/// Cheap to clone; all clones share tokens and refresh state.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    /// Create a client from full configuration with a logging navigator
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Self::builder(config.api.clone())
            .routes(config.routes.clone())
            .refresh_token_path(config.storage.refresh_token_path.clone())
            .build()
    }

    /// Create a client builder
    #[must_use]
    pub fn builder(api: ApiConfig) -> SessionClientBuilder {
        SessionClientBuilder::new(api)
    }

    /// Shared token store (also an `AccessTokenSource` for the realtime layer)
    #[must_use]
    pub fn tokens(&self) -> Arc<TokenStore> {
        Arc::clone(&self.inner.tokens)
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.tokens.access()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.has_access()
    }

    /// Store tokens obtained outside [`login`](Self::login)
    pub fn set_tokens(&self, access: impl Into<String>, refresh: Option<String>) -> ClientResult<()> {
        self.inner.tokens.set_tokens(access, refresh)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing()
    }

    /// Number of calls waiting on the in-flight refresh
    pub fn pending_refresh_waiters(&self) -> usize {
        self.inner.coordinator.pending()
    }

    /// Issue an API call
    ///
    /// On a 401 the call is retried once after a coordinated token refresh.
    #[tracing::instrument(skip_all, fields(method = %req.method, path = %req.path))]
    pub async fn request(&self, req: ApiRequest) -> ClientResult<Response> {
        let mut retried = false;

        loop {
            let sent_token = if req.requires_auth {
                self.inner.tokens.access()
            } else {
                None
            };

            let response = match self.send(&req, sent_token.as_deref()).await {
                Ok(response) => response,
                Err(err) => return Err(self.fail(err)),
            };

            let status = response.status();
            if status != StatusCode::UNAUTHORIZED {
                if status.is_success() || status.is_redirection() {
                    return Ok(response);
                }
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| status.to_string());
                return Err(self.fail(ClientError::from_status(status.as_u16(), message)));
            }

            if self.is_refresh_call(&req) {
                tracing::warn!("Refresh endpoint rejected the session");
                return Err(self.end_session(RefreshError::Rejected {
                    status: status.as_u16(),
                }));
            }

            if !req.requires_auth || retried {
                return Err(ClientError::Unauthorized);
            }
            retried = true;

            // Someone else already swapped the token while this call was in flight.
            let current = self.inner.tokens.access();
            if current.is_some() && current != sent_token {
                tracing::debug!("Access token already refreshed, replaying");
                continue;
            }

            self.refresh_access_token(true).await?;
            tracing::debug!("Replaying request with refreshed token");
        }
    }

    /// Try to resume a previous session at startup
    ///
    /// Returns `true` when a new access token was obtained. Never navigates; on failure
    /// all tokens are cleared and the caller should show the signed-out state.
    pub async fn silent_restore(&self) -> bool {
        if self.inner.tokens.refresh().is_none() {
            tracing::debug!("No refresh token stored, skipping silent restore");
            self.inner.tokens.clear();
            return false;
        }

        match self.refresh_access_token(false).await {
            Ok(_) => {
                tracing::info!("Session restored");
                true
            }
            Err(e) => {
                tracing::info!(error = %e, "Silent restore failed");
                self.inner.tokens.clear();
                false
            }
        }
    }

    /// Reject every caller waiting on a refresh and forget the in-flight one
    ///
    /// Called during logout. Returns the number of callers rejected.
    pub fn reset_state(&self) -> usize {
        self.inner.coordinator.reset()
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, credentials: &LoginRequest) -> ClientResult<()> {
        let req = ApiRequest::post(self.inner.api.login_path.clone())
            .without_auth()
            .try_json(credentials)?;

        let tokens: TokenResponse = self.decode(self.request(req).await?).await?;
        self.inner.tokens.set_tokens(tokens.access, tokens.refresh)?;

        tracing::info!(email = %credentials.email, "Logged in");
        Ok(())
    }

    /// End the session locally
    pub fn logout(&self) {
        let rejected = self.reset_state();
        self.inner.tokens.clear();
        tracing::info!(rejected, "Logged out");
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.decode(self.request(ApiRequest::get(path)).await?).await
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = ApiRequest::post(path).try_json(body)?;
        self.decode(self.request(req).await?).await
    }

    /// PUT a JSON body and decode the JSON response
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = ApiRequest::put(path).try_json(body)?;
        self.decode(self.request(req).await?).await
    }

    /// PATCH a JSON body and decode the JSON response
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = ApiRequest::patch(path).try_json(body)?;
        self.decode(self.request(req).await?).await
    }

    /// DELETE, ignoring any response body
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.request(ApiRequest::delete(path)).await.map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> ClientResult<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send(&self, req: &ApiRequest, token: Option<&str>) -> ClientResult<Response> {
        let mut builder = self
            .inner
            .http
            .request(req.method.clone(), self.inner.api.url(&req.path));

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            if e.is_builder() {
                ClientError::Config(e.to_string())
            } else {
                ClientError::NetworkUnavailable(e.to_string())
            }
        })
    }

    /// Obtain a new access token, joining a refresh already in flight
    ///
    /// The exchange runs on its own task, so a caller that stops waiting (timeout,
    /// `select!`) neither cancels it nor loses a rotated refresh token.
    async fn refresh_access_token(&self, navigate_on_failure: bool) -> Result<String, RefreshError> {
        let waiting = match self.inner.coordinator.begin() {
            Ticket::Follower(waiting) => waiting,
            Ticket::Leader(guard, waiting) => {
                let client = self.clone();
                tokio::spawn(
                    async move { client.run_refresh(guard, navigate_on_failure).await }
                        .in_current_span(),
                );
                waiting
            }
        };
        waiting.wait().await
    }

    async fn run_refresh(self, guard: LeaderGuard, navigate_on_failure: bool) {
        let fetched = match self.inner.tokens.refresh() {
            Some(refresh) => self.call_refresh_endpoint(&refresh).await,
            None => Err(RefreshError::NoRefreshToken),
        };

        let (outcome, rotated) = match fetched {
            Ok(tokens) => (Ok(tokens.access), tokens.refresh),
            Err(e) => (Err(e), None),
        };

        let tokens = &self.inner.tokens;
        let outcome = guard.settle(outcome, |outcome| match outcome {
            Ok(access) => {
                tokens.set_access(access.clone());
                if let Some(refresh) = rotated {
                    if let Err(e) = tokens.set_refresh(refresh) {
                        tracing::warn!(error = %e, "Failed to store rotated refresh token");
                    }
                }
            }
            Err(_) => tokens.clear(),
        });

        match &outcome {
            Ok(_) => tracing::debug!("Access token refreshed"),
            Err(RefreshError::SessionEnded) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                if navigate_on_failure {
                    self.navigate(Route::Login);
                }
            }
        }
    }

    async fn call_refresh_endpoint(&self, refresh: &str) -> Result<TokenResponse, RefreshError> {
        let exchange = async {
            let response = self
                .inner
                .http
                .post(self.inner.api.refresh_url())
                .json(&RefreshRequest { refresh })
                .send()
                .await
                .map_err(|e| RefreshError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RefreshError::Rejected {
                    status: status.as_u16(),
                });
            }

            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| RefreshError::InvalidResponse(e.to_string()))
        };

        tokio::time::timeout(self.inner.api.refresh_timeout(), exchange)
            .await
            .unwrap_or(Err(RefreshError::TimedOut))
    }

    fn is_refresh_call(&self, req: &ApiRequest) -> bool {
        let url = self.inner.api.url(&req.path);
        let url = url.split('?').next().unwrap_or_default();
        url == self.inner.api.refresh_url()
    }

    /// Terminal auth failure: drop tokens, reject the queue, go to login
    fn end_session(&self, reason: RefreshError) -> ClientError {
        self.inner.tokens.clear();
        self.inner.coordinator.abort(&reason);
        self.navigate(Route::Login);
        ClientError::RefreshFailed(reason)
    }

    /// Redirect on outages before handing the error back
    fn fail(&self, err: ClientError) -> ClientError {
        if err.is_outage() {
            tracing::warn!(error = %err, "Backend unreachable");
            self.navigate(Route::ServiceDown);
        }
        err
    }

    fn navigate(&self, route: Route) {
        self.inner
            .navigator
            .navigate_to(route.path(&self.inner.routes));
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.inner.api.base_url)
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SessionClient`]
pub struct SessionClientBuilder {
    api: ApiConfig,
    routes: RouteConfig,
    navigator: Option<Arc<dyn Navigator>>,
    refresh_store: Option<Arc<dyn RefreshTokenStore>>,
    http: Option<Client>,
    user_agent: Option<String>,
}

impl SessionClientBuilder {
    fn new(api: ApiConfig) -> Self {
        Self {
            api,
            routes: RouteConfig::default(),
            navigator: None,
            refresh_store: None,
            http: None,
            user_agent: None,
        }
    }

    /// Set the redirect paths
    pub fn routes(mut self, routes: RouteConfig) -> Self {
        self.routes = routes;
        self
    }

    /// Set the host navigation hook
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the refresh token backend
    pub fn refresh_store(mut self, store: Arc<dyn RefreshTokenStore>) -> Self {
        self.refresh_store = Some(store);
        self
    }

    /// Persist the refresh token at `path`, or keep it in memory when `None`
    pub fn refresh_token_path(mut self, path: Option<std::path::PathBuf>) -> Self {
        self.refresh_store = Some(match path {
            Some(path) => Arc::new(FileRefreshTokenStore::new(path)),
            None => Arc::new(MemoryRefreshTokenStore::new()),
        });
        self
    }

    /// Use a preconfigured `reqwest` client
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> ClientResult<SessionClient> {
        reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base_url: {e}")))?;

        let http = match self.http {
            Some(client) => client,
            None => Client::builder()
                .timeout(Duration::from_secs(self.api.request_timeout_secs))
                .user_agent(
                    self.user_agent
                        .unwrap_or_else(|| format!("consult-session/{}", env!("CARGO_PKG_VERSION"))),
                )
                .build()
                .map_err(|e| ClientError::Config(e.to_string()))?,
        };

        let refresh_store = self
            .refresh_store
            .unwrap_or_else(|| Arc::new(MemoryRefreshTokenStore::new()));

        Ok(SessionClient {
            inner: Arc::new(Inner {
                http,
                api: self.api,
                routes: self.routes,
                tokens: Arc::new(TokenStore::new(refresh_store)),
                coordinator: Arc::new(RefreshCoordinator::new()),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(LogNavigator)),
            }),
        })
    }
}
