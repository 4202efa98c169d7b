//! Deferred default arguments.
//!
//! A [`DeferredDefault`] stands for a parameter whose default value is only
//! known at run time, typically a service handle that needs credentials. The
//! provider is not called when the default is declared, only when a call
//! leaves the parameter unset. Backing the provider with a [`crate::memo::Lazy`]
//! builds the expensive value once and injects it everywhere.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::error::{Error, Result};

type Provider<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

pub struct DeferredDefault<T> {
    name: &'static str,
    provider: Provider<T>,
}

impl<T> Clone for DeferredDefault<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<T> fmt::Debug for DeferredDefault<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredDefault")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> DeferredDefault<T> {
    pub fn new<F, Fut>(name: &'static str, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            name,
            provider: Arc::new(move || provider().boxed()),
        }
    }

    /// A default that is already known.
    pub fn value(name: &'static str, value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(name, move || {
            let value = value.clone();
            async move { Ok::<T, Error>(value) }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `supplied` if present, otherwise the provider's value.
    pub async fn resolve(&self, supplied: Option<T>) -> Result<T> {
        match supplied {
            Some(value) => Ok(value),
            None => {
                debug!(parameter = self.name, "injecting default");
                (self.provider)().await
            }
        }
    }

    /// Resolves the parameter, then runs `f` with it.
    pub async fn apply<F, Fut, R>(&self, supplied: Option<T>, f: F) -> Result<R>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let value = self.resolve(supplied).await?;
        f(value).await
    }
}
