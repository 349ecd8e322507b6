use std::fmt;

use ghsrc_conditions::{
    Condition, ConditionCause, ConditionError, ConditionSet, ConditionType,
    Conditions, ConditionsAccessor,
};
use http::Uri;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Prefix of every CloudEvent type emitted for a GitHub event.
pub const GITHUB_EVENT_TYPE_PREFIX: &str = "dev.knative.source.github";
/// Prefix of every CloudEvent source emitted for a GitHub event.
pub const GITHUB_EVENT_SOURCE_PREFIX: &str = "https://github.com";

pub const REASON_SINK_EMPTY: &str = "SinkEmpty";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "sources.knative.dev",
    version = "v1alpha1",
    kind = "GitHubSource",
    plural = "githubsources",
    shortname = "ghsrc",
    namespaced,
    status = "GitHubSourceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSourceSpec {
    /// Service account the receive side runs as; "default" when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// `owner/repository`, or just `owner` to receive events for a whole
    /// organization.
    pub owner_and_repository: String,
    /// GitHub webhook event names, e.g. `pull_request`.
    pub event_types: Vec<String>,
    pub access_token: SecretValueFromSource,
    pub secret_token: SecretValueFromSource,
    /// GitHub Enterprise API URL.
    #[serde(
        rename = "githubAPIURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub github_api_url: Option<String>,
    /// Force the webhook target scheme to https (true) or http (false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    pub sink: Destination,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretValueFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Where events are delivered: an addressable object, a URI, or both (the
/// URI is then resolved relative to the object's address).
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct Destination {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<KReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions<GitHubSourceConditionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<String>,
    /// ID of the webhook registered with GitHub.
    #[serde(
        rename = "webhookIDKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub webhook_id_key: Option<String>,
}

#[derive(
    Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq, Hash,
)]
pub enum GitHubSourceConditionType {
    /// Aggregate: True when the source is ready to send events.
    Ready,
    SecretsProvided,
    SinkProvided,
    WebhookConfigured,
}

impl ConditionType for GitHubSourceConditionType {
    fn as_str(&self) -> &'static str {
        match self {
            GitHubSourceConditionType::Ready => "Ready",
            GitHubSourceConditionType::SecretsProvided => "SecretsProvided",
            GitHubSourceConditionType::SinkProvided => "SinkProvided",
            GitHubSourceConditionType::WebhookConfigured => "WebhookConfigured",
        }
    }
}

impl fmt::Display for GitHubSourceConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type GitHubSourceConditionSet = ConditionSet<GitHubSourceConditionType>;

/// Build the condition set for GitHubSource. Call once at startup and share.
pub fn github_source_condition_set()
-> Result<GitHubSourceConditionSet, ConditionError> {
    use GitHubSourceConditionType::*;
    ConditionSet::new(Ready, [SecretsProvided, SinkProvided, WebhookConfigured])
}

impl ConditionsAccessor<GitHubSourceConditionType> for GitHubSourceStatus {
    fn conditions(&self) -> &[Condition<GitHubSourceConditionType>] {
        self.conditions.conditions()
    }

    fn conditions_mut(
        &mut self,
    ) -> &mut Vec<Condition<GitHubSourceConditionType>> {
        self.conditions.conditions_mut()
    }
}

impl GitHubSourceStatus {
    pub fn initialize_conditions(&mut self, set: &GitHubSourceConditionSet) {
        set.manage(self).initialize_conditions();
    }

    pub fn get_condition(
        &self,
        set: &GitHubSourceConditionSet,
        t: GitHubSourceConditionType,
    ) -> Option<&Condition<GitHubSourceConditionType>> {
        set.get_condition(self, t)
    }

    pub fn is_ready(&self, set: &GitHubSourceConditionSet) -> bool {
        set.is_happy(self)
    }

    pub fn mark_secrets(
        &mut self,
        set: &GitHubSourceConditionSet,
    ) -> Result<(), ConditionError> {
        set.manage(self)
            .mark_true(GitHubSourceConditionType::SecretsProvided)
    }

    pub fn mark_no_secrets(
        &mut self,
        set: &GitHubSourceConditionSet,
        cause: ConditionCause,
    ) -> Result<(), ConditionError> {
        set.manage(self)
            .mark_false(GitHubSourceConditionType::SecretsProvided, cause)
    }

    /// Record the resolved sink. An absent URI leaves the sink Unknown.
    pub fn mark_sink(
        &mut self,
        set: &GitHubSourceConditionSet,
        uri: Option<&Uri>,
    ) -> Result<(), ConditionError> {
        self.sink_uri = uri.map(|u| u.to_string());
        let mut cm = set.manage(self);
        match uri {
            Some(_) => cm.mark_true(GitHubSourceConditionType::SinkProvided),
            None => cm.mark_unknown(
                GitHubSourceConditionType::SinkProvided,
                ConditionCause::new(
                    REASON_SINK_EMPTY,
                    "Sink has resolved to empty.",
                ),
            ),
        }
    }

    pub fn mark_no_sink(
        &mut self,
        set: &GitHubSourceConditionSet,
        cause: ConditionCause,
    ) -> Result<(), ConditionError> {
        set.manage(self)
            .mark_false(GitHubSourceConditionType::SinkProvided, cause)
    }

    pub fn mark_webhook_configured(
        &mut self,
        set: &GitHubSourceConditionSet,
    ) -> Result<(), ConditionError> {
        set.manage(self)
            .mark_true(GitHubSourceConditionType::WebhookConfigured)
    }

    pub fn mark_webhook_not_configured(
        &mut self,
        set: &GitHubSourceConditionSet,
        cause: ConditionCause,
    ) -> Result<(), ConditionError> {
        set.manage(self)
            .mark_false(GitHubSourceConditionType::WebhookConfigured, cause)
    }
}

/// CloudEvent `type` for a GitHub webhook event name.
pub fn github_event_type(gh_event_type: &str) -> String {
    format!("{}.{}", GITHUB_EVENT_TYPE_PREFIX, gh_event_type)
}

/// CloudEvent `source` for a repository or organization.
pub fn github_event_source(owner_and_repo: &str) -> String {
    format!("{}/{}", GITHUB_EVENT_SOURCE_PREFIX, owner_and_repo)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnerRepoError {
    #[error("owner must not be empty in {0:?}")]
    EmptyOwner(String),
    #[error("repository must not be empty in {0:?}")]
    EmptyRepository(String),
    #[error("expected owner or owner/repository, got {0:?}")]
    TooManySegments(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerAndRepository {
    pub owner: String,
    /// None for an organization-wide hook.
    pub repository: Option<String>,
}

impl OwnerAndRepository {
    pub fn parse(value: &str) -> Result<Self, OwnerRepoError> {
        let mut parts = value.split('/');
        let owner = parts.next().unwrap_or_default();
        let repository = parts.next();
        if parts.next().is_some() {
            return Err(OwnerRepoError::TooManySegments(value.to_string()));
        }
        if owner.is_empty() {
            return Err(OwnerRepoError::EmptyOwner(value.to_string()));
        }
        match repository {
            Some("") => Err(OwnerRepoError::EmptyRepository(value.to_string())),
            _ => Ok(Self {
                owner: owner.to_string(),
                repository: repository.map(str::to_string),
            }),
        }
    }
}
