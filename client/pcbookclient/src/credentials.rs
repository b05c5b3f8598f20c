//! Outbound credentials.
//!
//! One access token is cached per client. [`TokenRefresher`] logs in once up
//! front and then replaces the token on a fixed interval from a background
//! task; [`CredentialService`] stamps the cached token onto every protected
//! call without waiting on that task.

use crate::protocol::{catalog, stream};
use crate::ClientError;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tonic::codegen::http::{header::AUTHORIZATION, HeaderValue, Request};

/// Whether calls to `method` are sent with the cached token
pub fn is_protected(method: &str) -> bool {
    [
        catalog::METHOD_CREATE_LAPTOP,
        stream::METHOD_UPLOAD_IMAGE,
        stream::METHOD_RATE_LAPTOP,
    ]
    .contains(&method)
}

/// Something that can trade stored credentials for a fresh access token
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn login(&self) -> Result<String, ClientError>;
}

/// The cached access token, shared by every outbound call and the refresh task
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<String>>,
}

impl Credentials {
    pub fn new(token: String) -> Credentials {
        Credentials {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn token(&self) -> String {
        self.token.read().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn set_token(&self, token: String) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(_) => error!("token cache lock is poisoned"),
        }
    }
}

/// Owns the background refresh loop. Dropping it stops the loop.
pub struct TokenRefresher {
    credentials: Credentials,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TokenRefresher {
    /// Logs in once, then re-authenticates every `interval` until shut down.
    /// A failed refresh keeps the previous token. Shutting down abandons a
    /// login that is still in flight.
    pub async fn start<A>(authenticator: A, interval: Duration) -> Result<TokenRefresher, ClientError>
    where
        A: Authenticator,
    {
        let credentials = Credentials::new(authenticator.login().await?);
        info!("logged in, refreshing token every {:?}", interval);

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let cache = credentials.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.cancelled() => break,
                }
                tokio::select! {
                    result = authenticator.login() => match result {
                        Ok(token) => {
                            cache.set_token(token);
                            debug!("token refreshed");
                        }
                        Err(e) => warn!("cannot refresh token: {}", e),
                    },
                    _ = stop.cancelled() => break,
                }
            }
            debug!("token refresh stopped");
        });

        Ok(TokenRefresher {
            credentials,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    /// Stops the refresh loop and waits for it to exit
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("token refresh task failed: {}", e);
            }
        }
    }
}

impl Drop for TokenRefresher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct CredentialLayer {
    credentials: Credentials,
}

impl CredentialLayer {
    pub fn new(credentials: Credentials) -> CredentialLayer {
        CredentialLayer { credentials }
    }
}

impl<S> tower::Layer<S> for CredentialLayer {
    type Service = CredentialService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CredentialService {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Adds `authorization: Bearer <token>` to calls of protected methods
#[derive(Debug, Clone)]
pub struct CredentialService<S> {
    inner: S,
    credentials: Credentials,
}

impl<S, B> tower::Service<Request<B>> for CredentialService<S>
where
    S: tower::Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if is_protected(request.uri().path()) {
            match HeaderValue::from_str(&format!("Bearer {}", self.credentials.token())) {
                Ok(value) => {
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(e) => warn!("cached token is not a valid header value: {}", e),
            }
        }
        self.inner.call(request)
    }
}
