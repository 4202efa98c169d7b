//! Google SSO: credential loading and the installed-app consent flow.
//!
//! Credentials are obtained at most once per [`Config`]: first from the token
//! persisted in the credential folder, then, if there is none or it cannot be
//! refreshed, through the browser consent page. The token file itself is
//! owned by `yup-oauth2`.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tracing::{debug, info, warn};
use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::memo::Memo;

// Define a trait for access token retrieval to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token for `scopes`, refreshed if needed.
    async fn access_token(&self, scopes: &[String]) -> Result<String>;
}

/// A token that never changes, for callers that manage tokens themselves.
struct StaticToken(String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _scopes: &[String]) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct FnTokenSource<F>(F);

#[async_trait]
impl<F> TokenSource for FnTokenSource<F>
where
    F: Fn(Vec<String>) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    async fn access_token(&self, scopes: &[String]) -> Result<String> {
        (self.0)(scopes.to_vec()).await
    }
}

/// Authorization shared by every service handle.
#[derive(Clone)]
pub struct Credentials {
    source: Arc<dyn TokenSource>,
    scopes: Arc<[String]>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(source: Arc<dyn TokenSource>, scopes: Vec<String>) -> Self {
        Self {
            source,
            scopes: scopes.into(),
        }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticToken(token.into())), Vec::new())
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub async fn access_token(&self) -> Result<String> {
        self.source.access_token(&self.scopes).await
    }
}

// Define a trait for OAuth flow operations to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthFlow: Send + Sync {
    /// Credentials from the persisted token, without user interaction.
    /// `Ok(None)` when no token has been persisted yet.
    async fn load_stored(&self, config: &Config) -> Result<Option<Credentials>>;

    /// Runs the consent flow and persists the new token.
    async fn authorize(&self, config: &Config) -> Result<Credentials>;
}

/// The installed-app flow backed by `yup-oauth2`, redirecting to a loopback
/// port.
pub struct InstalledFlow;

/// Refuses to prompt: a stored token either works as is or the lookup fails.
/// Only effective with [`InstalledFlowReturnMethod::Interactive`], where the
/// delegate's error ends the flow.
struct NoPrompt;

impl InstalledFlowDelegate for NoPrompt {
    fn present_user_url<'a>(
        &'a self,
        _url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + 'a>> {
        Box::pin(async { Err("stored token missing or expired".to_string()) })
    }
}

/// Opens the consent page in the default browser.
struct BrowserPrompt;

impl InstalledFlowDelegate for BrowserPrompt {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            if let Err(e) = open::that(url) {
                warn!("Failed to open a browser: {}", e);
            }
            eprintln!("Please authorize this application by visiting:\n\n{}\n", url);
            // The code arrives on the redirect, nothing to read here.
            Ok(String::new())
        })
    }
}

/// One entry of the token file persisted by `yup-oauth2`.
#[derive(Deserialize)]
struct StoredToken {
    scopes: Vec<String>,
    token: StoredTokenInfo,
}

#[derive(Deserialize)]
struct StoredTokenInfo {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Whether the token file holds a token covering every scope of `config`.
async fn stored_token_covers(config: &Config) -> Result<bool> {
    let token_path = config.token_path();
    let raw = match tokio::fs::read(&token_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No token at {}", token_path.display());
            return Ok(false);
        }
        Err(e) => return Err(Error::local_io(&token_path, e)),
    };
    let stored: Vec<StoredToken> = serde_json::from_slice(&raw).map_err(|e| {
        Error::authentication(format!(
            "unreadable token file {}: {}",
            token_path.display(),
            e
        ))
    })?;

    Ok(stored.iter().any(|entry| {
        config.scopes.iter().all(|scope| entry.scopes.contains(scope))
            && (entry.token.access_token.is_some() || entry.token.refresh_token.is_some())
    }))
}

impl InstalledFlow {
    async fn build(
        config: &Config,
        return_method: InstalledFlowReturnMethod,
        delegate: Box<dyn InstalledFlowDelegate>,
    ) -> Result<Credentials> {
        let secret_path = config.client_secret_path();
        let secret = yup_oauth2::read_application_secret(&secret_path)
            .await
            .map_err(|e| {
                Error::authentication(format!(
                    "failed to read client secret {}: {}",
                    secret_path.display(),
                    e
                ))
            })?;

        let auth =
            InstalledFlowAuthenticator::builder(secret, return_method)
                .persist_tokens_to_disk(config.token_path())
                .flow_delegate(delegate)
                .build()
                .await
                .map_err(|e| Error::authentication(format!("failed to build authenticator: {}", e)))?;
        let auth = Arc::new(auth);

        let source = FnTokenSource(move |scopes: Vec<String>| {
            let auth = Arc::clone(&auth);
            async move {
                let token = auth
                    .token(&scopes)
                    .await
                    .map_err(|e| Error::authentication(e.to_string()))?;
                token
                    .token()
                    .map(str::to_string)
                    .ok_or_else(|| Error::authentication("token response carried no access token"))
            }
            .boxed()
        });
        let credentials = Credentials::new(Arc::new(source), config.scopes.clone());

        // Fetching the first token is what reads, refreshes or obtains it.
        credentials.access_token().await?;
        Ok(credentials)
    }
}

#[async_trait]
impl AuthFlow for InstalledFlow {
    async fn load_stored(&self, config: &Config) -> Result<Option<Credentials>> {
        if !stored_token_covers(config).await? {
            return Ok(None);
        }
        // A token that can no longer be refreshed fails here instead of
        // waiting for a consent redirect.
        Self::build(config, InstalledFlowReturnMethod::Interactive, Box::new(NoPrompt)).await?;

        // The refreshed token is on disk now. The handle kept for later calls
        // goes back to consent once the refresh token stops working.
        Self::build(config, InstalledFlowReturnMethod::HTTPRedirect, Box::new(BrowserPrompt))
            .await
            .map(Some)
    }

    async fn authorize(&self, config: &Config) -> Result<Credentials> {
        Self::build(config, InstalledFlowReturnMethod::HTTPRedirect, Box::new(BrowserPrompt)).await
    }
}

/// Hands out one set of credentials per configuration.
pub struct CredentialProvider {
    flow: Arc<dyn AuthFlow>,
    cache: Memo<Config, Credentials>,
}

impl CredentialProvider {
    pub fn new(flow: Arc<dyn AuthFlow>) -> Self {
        Self {
            flow,
            cache: Memo::new(),
        }
    }

    pub fn installed() -> Self {
        Self::new(Arc::new(InstalledFlow))
    }

    /// Stored token if valid, consent flow otherwise. Failures are not
    /// cached: the next call tries again.
    pub async fn credentials(&self, config: &Config) -> Result<Credentials> {
        self.cache
            .get_or_try_init(config, || authenticate(self.flow.as_ref(), config))
            .await
    }

    pub fn is_authorized(&self, config: &Config) -> bool {
        self.cache.contains(config)
    }

    /// Drops the cached credentials for `config`.
    pub fn invalidate(&self, config: &Config) -> bool {
        self.cache.invalidate(config)
    }

    pub fn reset(&self) {
        self.cache.reset();
    }
}

async fn authenticate(flow: &dyn AuthFlow, config: &Config) -> Result<Credentials> {
    info!("Loading token");
    debug!("Credential path: {}", config.credential_dir().display());
    config.validate()?;

    match flow.load_stored(config).await {
        Ok(Some(credentials)) => return Ok(credentials),
        Ok(None) => {}
        Err(e) => warn!("Stored token unusable: {}", e),
    }

    info!("Loading credentials");
    flow.authorize(config).await.map_err(|e| match e {
        Error::Authentication(_) | Error::Configuration(_) => e,
        other => Error::authentication(other.to_string()),
    })
}
