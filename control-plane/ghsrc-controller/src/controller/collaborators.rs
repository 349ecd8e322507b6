//! Interfaces to the systems a GitHubSource depends on. The controller only
//! consumes these; secret storage, sink addressing and the GitHub API live
//! behind them.

use std::sync::Arc;

use async_trait::async_trait;
use http::Uri;

use crate::crd::github_source::{Destination, SecretValueFromSource};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret reference is not set")]
    MissingReference,

    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("key {key} not found in secret {namespace}/{name}")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("secret backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink has neither ref nor uri")]
    MissingDestination,

    #[error("sink {kind}/{name} could not be resolved: {reason}")]
    Unresolvable {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("sink uri {0:?} is invalid")]
    InvalidUri(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook target url {0:?} is invalid")]
    InvalidTarget(String),

    #[error("github request failed: {0}")]
    Request(String),

    #[error("webhook {0} not found")]
    NotFound(String),
}

#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Value of the referenced secret key.
    async fn resolve(
        &self,
        namespace: &str,
        source: &SecretValueFromSource,
    ) -> Result<String, SecretError>;
}

#[async_trait]
pub trait SinkResolver: Send + Sync {
    /// `Ok(None)` when the sink exists but has no address yet.
    async fn resolve(
        &self,
        namespace: &str,
        sink: &Destination,
    ) -> Result<Option<Uri>, SinkError>;
}

/// Everything needed to register or remove one repository webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookOptions {
    pub owner: String,
    pub repository: Option<String>,
    pub event_types: Vec<String>,
    pub target_url: String,
    pub access_token: String,
    pub secret_token: String,
    pub api_url: String,
}

#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    /// Register the hook and return its id.
    async fn create(&self, hook: &WebhookOptions) -> Result<String, WebhookError>;

    async fn delete(
        &self,
        hook: &WebhookOptions,
        id: &str,
    ) -> Result<(), WebhookError>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub secrets: Arc<dyn SecretResolver>,
    pub sinks: Arc<dyn SinkResolver>,
    pub webhooks: Arc<dyn WebhookRegistrar>,
}
