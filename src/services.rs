//! Authenticated service handles.
//!
//! A [`GoogleServices`] client owns the credential cache and one lazily built
//! handle per API family. The [`Drive`] and [`Gmail`] facades it hands out
//! fall back to those handles whenever a call does not bring its own.

use std::sync::Arc;

use tracing::debug;

use crate::auth::{AuthFlow, CredentialProvider, Credentials, InstalledFlow};
use crate::config::{ApiOptions, Config};
use crate::defaults::DeferredDefault;
use crate::drive_api::{Drive, DriveHandle, DriveService};
use crate::error::{Error, Result};
use crate::gmail_api::{Gmail, GmailHandle, GmailService};
use crate::http::ApiClient;
use crate::memo::Lazy;

struct Inner {
    config: Config,
    options: ApiOptions,
    http: reqwest::Client,
    credentials: CredentialProvider,
    drive: Lazy<DriveHandle>,
    gmail: Lazy<GmailHandle>,
}

#[derive(Clone)]
pub struct GoogleServices {
    inner: Arc<Inner>,
}

impl GoogleServices {
    /// A client using the installed-app consent flow and the public endpoints.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_auth_flow(config, ApiOptions::default(), Arc::new(InstalledFlow))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env())
    }

    pub fn with_auth_flow(
        config: Config,
        options: ApiOptions,
        flow: Arc<dyn AuthFlow>,
    ) -> Result<Self> {
        let http = ApiClient::build_http_client(&options)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                options,
                http,
                credentials: CredentialProvider::new(flow),
                drive: Lazy::new(),
                gmail: Lazy::new(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn options(&self) -> &ApiOptions {
        &self.inner.options
    }

    /// Credentials for the client's own configuration, authorized once.
    pub async fn credentials(&self) -> Result<Credentials> {
        self.credentials_for(&self.inner.config).await
    }

    /// Credentials for another configuration. Each distinct configuration
    /// is authorized once and cached separately.
    pub async fn credentials_for(&self, config: &Config) -> Result<Credentials> {
        self.inner.credentials.credentials(config).await
    }

    /// The client's Drive handle, built on first use.
    pub async fn drive_service(&self) -> Result<DriveHandle> {
        self.inner
            .drive
            .get_or_try_init(|| async {
                let credentials = self.credentials().await?;
                let service: DriveHandle = Arc::new(DriveService::new(
                    self.inner.http.clone(),
                    credentials,
                    &self.inner.options,
                ));
                Ok::<_, Error>(service)
            })
            .await
    }

    /// The client's Gmail handle, built on first use.
    pub async fn gmail_service(&self) -> Result<GmailHandle> {
        self.inner
            .gmail
            .get_or_try_init(|| async {
                let credentials = self.credentials().await?;
                let service: GmailHandle = Arc::new(GmailService::new(
                    self.inner.http.clone(),
                    credentials,
                    &self.inner.options,
                ));
                Ok::<_, Error>(service)
            })
            .await
    }

    /// Drive operations defaulting to [`Self::drive_service`].
    pub fn drive(&self) -> Drive {
        let services = self.clone();
        Drive::new(DeferredDefault::new("service", move || {
            let services = services.clone();
            async move { services.drive_service().await }
        }))
    }

    /// Gmail operations defaulting to [`Self::gmail_service`].
    pub fn gmail(&self) -> Gmail {
        let services = self.clone();
        Gmail::new(DeferredDefault::new("service", move || {
            let services = services.clone();
            async move { services.gmail_service().await }
        }))
    }

    /// Forgets credentials and service handles; the next call
    /// re-authenticates.
    pub fn reset(&self) {
        debug!("Resetting cached credentials and services");
        self.inner.credentials.reset();
        self.inner.drive.reset();
        self.inner.gmail.reset();
    }
}
