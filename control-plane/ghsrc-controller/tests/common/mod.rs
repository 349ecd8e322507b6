#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghsrc_controller::config::ControllerConfig;
use ghsrc_controller::controller::{
    Collaborators, SecretError, SecretResolver, SinkError, SinkResolver,
    SourceReconciler, WebhookError, WebhookOptions, WebhookRegistrar,
};
use ghsrc_controller::crd::github_source::{
    Destination, SecretKeySelector, SecretValueFromSource,
};
use ghsrc_controller::crd::{
    GitHubSource, GitHubSourceSpec, github_source_condition_set,
};
use http::Uri;

pub const NS: &str = "default";
pub const NAME: &str = "gh-events";
pub const SINK_URI: &str = "http://event-display.default.svc.cluster.local/events";

/// Secrets keyed by `(secret name, key)`.
#[derive(Default)]
pub struct MapSecrets {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MapSecrets {
    pub fn with(entries: &[(&str, &str, &str)]) -> Self {
        let s = Self::default();
        for (name, key, value) in entries {
            s.insert(name, key, value);
        }
        s
    }

    pub fn insert(&self, name: &str, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((name.into(), key.into()), value.into());
    }
}

#[async_trait]
impl SecretResolver for MapSecrets {
    async fn resolve(
        &self,
        namespace: &str,
        source: &SecretValueFromSource,
    ) -> Result<String, SecretError> {
        let sel = source
            .secret_key_ref
            .as_ref()
            .ok_or(SecretError::MissingReference)?;
        self.values
            .lock()
            .unwrap()
            .get(&(sel.name.clone(), sel.key.clone()))
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                namespace: namespace.into(),
                name: sel.name.clone(),
            })
    }
}

pub enum SinkAnswer {
    Uri(&'static str),
    Empty,
    Fail,
}

pub struct ScriptedSink {
    answer: Mutex<SinkAnswer>,
}

impl ScriptedSink {
    pub fn new(answer: SinkAnswer) -> Self {
        Self {
            answer: Mutex::new(answer),
        }
    }

    pub fn set(&self, answer: SinkAnswer) {
        *self.answer.lock().unwrap() = answer;
    }
}

#[async_trait]
impl SinkResolver for ScriptedSink {
    async fn resolve(
        &self,
        _namespace: &str,
        sink: &Destination,
    ) -> Result<Option<Uri>, SinkError> {
        match &*self.answer.lock().unwrap() {
            SinkAnswer::Uri(u) => Ok(Some(
                u.parse().map_err(|_| SinkError::InvalidUri(u.to_string()))?,
            )),
            SinkAnswer::Empty => Ok(None),
            SinkAnswer::Fail => {
                let r = sink.ref_.clone().unwrap_or_default();
                Err(SinkError::Unresolvable {
                    kind: r.kind,
                    name: r.name,
                    reason: "not addressable".into(),
                })
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingRegistrar {
    next_id: AtomicU64,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub created: Mutex<Vec<WebhookOptions>>,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl WebhookRegistrar for RecordingRegistrar {
    async fn create(&self, hook: &WebhookOptions) -> Result<String, WebhookError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WebhookError::Request("502 Bad Gateway".into()));
        }
        self.created.lock().unwrap().push(hook.clone());
        Ok((self.next_id.fetch_add(1, Ordering::SeqCst) + 100).to_string())
    }

    async fn delete(
        &self,
        _hook: &WebhookOptions,
        id: &str,
    ) -> Result<(), WebhookError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(WebhookError::Request("timeout".into()));
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub secrets: Arc<MapSecrets>,
    pub sink: Arc<ScriptedSink>,
    pub webhooks: Arc<RecordingRegistrar>,
    pub collaborators: Collaborators,
    pub reconciler: SourceReconciler,
}

impl Harness {
    pub fn new(secrets: MapSecrets, sink: SinkAnswer) -> Self {
        let secrets = Arc::new(secrets);
        let sink = Arc::new(ScriptedSink::new(sink));
        let webhooks = Arc::new(RecordingRegistrar::default());
        let collaborators = Collaborators {
            secrets: secrets.clone(),
            sinks: sink.clone(),
            webhooks: webhooks.clone(),
        };
        let cfg = ControllerConfig {
            receive_adapter_url: "http://adapter.knative-sources.svc".into(),
            ..Default::default()
        };
        let set = Arc::new(github_source_condition_set().unwrap());
        Self {
            secrets,
            sink,
            webhooks,
            collaborators: collaborators.clone(),
            reconciler: SourceReconciler::new(set, collaborators, cfg),
        }
    }

    pub fn healthy() -> Self {
        Self::new(
            MapSecrets::with(&[
                ("gh-secret", "accessToken", "ghp_token"),
                ("gh-secret", "secretToken", "s3cr3t"),
            ]),
            SinkAnswer::Uri(SINK_URI),
        )
    }
}

fn key_ref(name: &str, key: &str) -> SecretValueFromSource {
    SecretValueFromSource {
        secret_key_ref: Some(SecretKeySelector {
            name: name.into(),
            key: key.into(),
            optional: None,
        }),
    }
}

pub fn source(owner_and_repository: &str) -> GitHubSource {
    let mut src = GitHubSource::new(
        NAME,
        GitHubSourceSpec {
            owner_and_repository: owner_and_repository.into(),
            event_types: vec!["pull_request".into(), "push".into()],
            access_token: key_ref("gh-secret", "accessToken"),
            secret_token: key_ref("gh-secret", "secretToken"),
            sink: Destination {
                uri: Some("http://event-display".into()),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    src.metadata.namespace = Some(NS.into());
    src.metadata.generation = Some(1);
    src
}
