#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use google_services::{ApiOptions, AuthFlow, Config, Credentials, GoogleServices, Result, RetryPolicy};
use std::time::Duration;

pub const TEST_TOKEN: &str = "test_token";

/// Hands out a fixed bearer token and counts how often it was asked to.
#[derive(Default)]
pub struct StaticFlow {
    pub loads: AtomicUsize,
}

#[async_trait]
impl AuthFlow for StaticFlow {
    async fn load_stored(&self, _config: &Config) -> Result<Option<Credentials>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Credentials::from_token(TEST_TOKEN)))
    }

    async fn authorize(&self, _config: &Config) -> Result<Credentials> {
        panic!("consent flow must not run in tests");
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
    }
}

/// A client whose Drive and Gmail endpoints all point at `root`.
pub fn services_at(root: &str) -> (GoogleServices, Arc<StaticFlow>) {
    let flow = Arc::new(StaticFlow::default());
    let config = Config::default().with_credential_path("/nonexistent/google_services_test");
    let options = ApiOptions::default()
        .with_root_url(root)
        .with_retry(fast_retry());
    let services = GoogleServices::with_auth_flow(config, options, flow.clone())
        .expect("Failed to build client");
    (services, flow)
}
