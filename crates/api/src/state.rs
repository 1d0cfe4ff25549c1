//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::services::auth::TokenSigner;
use crate::services::checkout::{CheckoutClient, CheckoutError};
use crate::services::printful::{PrintfulClient, PrintfulError};
use crate::services::rss::FeedProxy;

/// Errors raised while bringing up configured integrations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("printful client: {0}")]
    Printful(#[from] PrintfulError),

    #[error("checkout client: {0}")]
    Checkout(#[from] CheckoutError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenSigner,
    printful: Option<PrintfulClient>,
    checkout: Option<CheckoutClient>,
    feed: FeedProxy,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations (Printful, hosted checkout) come up only when
    /// their credentials are configured; the routes that need them return
    /// 502 otherwise. Configured credentials that cannot produce a working
    /// client are a startup error, not a silent downgrade.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured integration client cannot be
    /// built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenSigner::new(&config.jwt_secret);
        let printful = config
            .printful_api_key
            .as_ref()
            .map(PrintfulClient::new)
            .transpose()?;
        let checkout = config
            .checkout
            .as_ref()
            .map(CheckoutClient::new)
            .transpose()?;
        let feed = FeedProxy::new(config.feed_allowed_hosts.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                printful,
                checkout,
                feed,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the bearer-token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Get the Printful client, if configured.
    #[must_use]
    pub fn printful(&self) -> Option<&PrintfulClient> {
        self.inner.printful.as_ref()
    }

    /// Get the hosted-checkout client, if configured.
    #[must_use]
    pub fn checkout(&self) -> Option<&CheckoutClient> {
        self.inner.checkout.as_ref()
    }

    /// Get the RSS feed proxy.
    #[must_use]
    pub fn feed(&self) -> &FeedProxy {
        &self.inner.feed
    }
}
