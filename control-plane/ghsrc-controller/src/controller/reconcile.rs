use std::sync::Arc;

use ghsrc_conditions::ConditionCause;
use http::Uri;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::json;
use tracing::{debug, info, instrument, trace, warn};

use super::collaborators::{
    Collaborators, SecretError, WebhookError, WebhookOptions,
};
use super::events::{REASON_WEBHOOK_CREATED, REASON_WEBHOOK_DELETED, emit_event};
use super::status::{should_patch_status, status_patch};
use super::{ControllerContext, ReconcileErr};
use crate::config::ControllerConfig;
use crate::crd::github_source::OwnerAndRepository;
use crate::crd::{
    GitHubSource, GitHubSourceConditionSet, GitHubSourceSpec,
    GitHubSourceStatus,
};

pub const FINALIZER: &str = "sources.knative.dev/github-webhook";

pub const REASON_SECRETS_NOT_FOUND: &str = "SecretsNotFound";
pub const REASON_SINK_NOT_FOUND: &str = "SinkNotFound";
pub const REASON_INVALID_OWNER_REPO: &str = "InvalidOwnerAndRepository";
pub const REASON_INVALID_WEBHOOK_TARGET: &str = "InvalidWebhookTarget";
pub const REASON_WEBHOOK_CREATE_FAILED: &str = "WebhookCreateFailed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Aggregate readiness after the pass.
    pub ready: bool,
    /// Id of a webhook registered during this pass.
    pub webhook_created: Option<String>,
}

struct Tokens {
    access: String,
    secret: String,
}

/// Drives one GitHubSource through its prerequisites and records the result
/// as conditions. Holds no per-resource state.
pub struct SourceReconciler {
    set: Arc<GitHubSourceConditionSet>,
    collaborators: Collaborators,
    cfg: ControllerConfig,
}

impl SourceReconciler {
    pub fn new(
        set: Arc<GitHubSourceConditionSet>,
        collaborators: Collaborators,
        cfg: ControllerConfig,
    ) -> Self {
        Self {
            set,
            collaborators,
            cfg,
        }
    }

    pub fn condition_set(&self) -> &GitHubSourceConditionSet {
        &self.set
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    /// One pass over `status`. Collaborator failures end up in conditions;
    /// only misuse of the condition set is returned as an error.
    pub async fn reconcile_status(
        &self,
        source: &GitHubSource,
        status: &mut GitHubSourceStatus,
    ) -> Result<ReconcileOutcome, ReconcileErr> {
        let ns = source.namespace().unwrap_or_else(|| "default".to_string());
        let name = source.name_any();
        let set = self.set.as_ref();

        status.initialize_conditions(set);
        status.observed_generation = source.meta().generation;

        let tokens = match self.resolve_tokens(&ns, &source.spec).await {
            Ok(tokens) => {
                status.mark_secrets(set)?;
                Some(tokens)
            }
            Err(e) => {
                warn!(%ns, %name, error = %e, "secrets not resolved");
                status.mark_no_secrets(
                    set,
                    ConditionCause::new(REASON_SECRETS_NOT_FOUND, e.to_string()),
                )?;
                None
            }
        };

        match self
            .collaborators
            .sinks
            .resolve(&ns, &source.spec.sink)
            .await
        {
            Ok(uri) => {
                debug!(%ns, %name, sink = ?uri, "sink resolved");
                status.mark_sink(set, uri.as_ref())?;
            }
            Err(e) => {
                warn!(%ns, %name, error = %e, "sink not resolved");
                status.mark_no_sink(
                    set,
                    ConditionCause::new(REASON_SINK_NOT_FOUND, e.to_string()),
                )?;
            }
        }

        // Without tokens the webhook cannot be checked; its condition keeps
        // whatever the last pass recorded.
        let webhook_created = match tokens {
            Some(tokens) => {
                self.reconcile_webhook(source, &ns, &name, &tokens, status)
                    .await?
            }
            None => None,
        };

        let ready = status.is_ready(set);
        trace!(%ns, %name, ready, "reconcile pass complete");
        Ok(ReconcileOutcome {
            ready,
            webhook_created,
        })
    }

    async fn reconcile_webhook(
        &self,
        source: &GitHubSource,
        ns: &str,
        name: &str,
        tokens: &Tokens,
        status: &mut GitHubSourceStatus,
    ) -> Result<Option<String>, ReconcileErr> {
        let set = self.set.as_ref();
        if status.webhook_id_key.is_some() {
            status.mark_webhook_configured(set)?;
            return Ok(None);
        }

        let hook = match self.webhook_options(&source.spec, ns, name, tokens) {
            Ok(hook) => hook,
            Err(cause) => {
                warn!(%ns, %name, %cause, "cannot build webhook request");
                status.mark_webhook_not_configured(set, cause)?;
                return Ok(None);
            }
        };

        match self.collaborators.webhooks.create(&hook).await {
            Ok(id) => {
                info!(%ns, %name, webhook_id = %id, "webhook created");
                status.webhook_id_key = Some(id.clone());
                status.mark_webhook_configured(set)?;
                Ok(Some(id))
            }
            Err(e) => {
                warn!(%ns, %name, error = %e, "webhook creation failed");
                status.mark_webhook_not_configured(
                    set,
                    ConditionCause::new(
                        REASON_WEBHOOK_CREATE_FAILED,
                        e.to_string(),
                    ),
                )?;
                Ok(None)
            }
        }
    }

    /// Remove the registered webhook, if any, ahead of deletion. Returns the
    /// id that was removed.
    pub async fn finalize(
        &self,
        source: &GitHubSource,
    ) -> Result<Option<String>, ReconcileErr> {
        let ns = source.namespace().unwrap_or_else(|| "default".to_string());
        let name = source.name_any();
        let Some(id) = source
            .status
            .as_ref()
            .and_then(|s| s.webhook_id_key.clone())
        else {
            return Ok(None);
        };

        let tokens = match self.resolve_tokens(&ns, &source.spec).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(%ns, %name, webhook_id = %id, error = %e, "secrets unavailable; leaving webhook in place");
                return Ok(None);
            }
        };
        let hook = match self.webhook_options(&source.spec, &ns, &name, &tokens) {
            Ok(hook) => hook,
            Err(cause) => {
                warn!(%ns, %name, webhook_id = %id, %cause, "cannot address webhook; leaving it in place");
                return Ok(None);
            }
        };

        match self.collaborators.webhooks.delete(&hook, &id).await {
            Ok(()) => {
                info!(%ns, %name, webhook_id = %id, "webhook deleted");
                Ok(Some(id))
            }
            Err(WebhookError::NotFound(_)) => {
                debug!(%ns, %name, webhook_id = %id, "webhook already gone");
                Ok(Some(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn webhook_options(
        &self,
        spec: &GitHubSourceSpec,
        ns: &str,
        name: &str,
        tokens: &Tokens,
    ) -> Result<WebhookOptions, ConditionCause> {
        let repo = OwnerAndRepository::parse(&spec.owner_and_repository)
            .map_err(|e| {
                ConditionCause::new(REASON_INVALID_OWNER_REPO, e.to_string())
            })?;
        let target_url = target_url(
            &self.cfg.receive_adapter_url,
            ns,
            name,
            spec.secure,
        )
        .map_err(|e| {
            ConditionCause::new(REASON_INVALID_WEBHOOK_TARGET, e.to_string())
        })?;
        Ok(WebhookOptions {
            owner: repo.owner,
            repository: repo.repository,
            event_types: spec.event_types.clone(),
            target_url,
            access_token: tokens.access.clone(),
            secret_token: tokens.secret.clone(),
            api_url: spec
                .github_api_url
                .clone()
                .unwrap_or_else(|| self.cfg.github_api_url.clone()),
        })
    }

    async fn resolve_tokens(
        &self,
        ns: &str,
        spec: &GitHubSourceSpec,
    ) -> Result<Tokens, SecretError> {
        let secrets = &self.collaborators.secrets;
        let access = secrets.resolve(ns, &spec.access_token).await?;
        let secret = secrets.resolve(ns, &spec.secret_token).await?;
        Ok(Tokens { access, secret })
    }
}

/// Address GitHub delivers to: `<adapter>/<namespace>/<name>`, with the
/// scheme forced when `secure` is set.
pub fn target_url(
    adapter: &str,
    ns: &str,
    name: &str,
    secure: Option<bool>,
) -> Result<String, WebhookError> {
    let invalid = || WebhookError::InvalidTarget(adapter.to_string());
    let base: Uri = adapter.parse().map_err(|_| invalid())?;
    let authority = base.authority().ok_or_else(invalid)?;
    let scheme = match secure {
        Some(true) => "https",
        Some(false) => "http",
        None => base.scheme_str().unwrap_or("http"),
    };
    let path = format!("{}/{}/{}", base.path().trim_end_matches('/'), ns, name);
    Uri::builder()
        .scheme(scheme)
        .authority(authority.as_str())
        .path_and_query(path)
        .build()
        .map(|u| u.to_string())
        .map_err(|_| invalid())
}

fn has_finalizer(obj: &GitHubSource) -> bool {
    obj.meta()
        .finalizers
        .as_ref()
        .map(|f| f.iter().any(|x| x == FINALIZER))
        .unwrap_or(false)
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<GitHubSource>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let api: Api<GitHubSource> = Api::namespaced(ctx.client.clone(), &ns);
    let obj_ref = obj.object_ref(&());

    if obj.meta().deletion_timestamp.is_some() {
        if has_finalizer(&obj) {
            info!(%ns, %name, "reconcile: deletion timestamp detected; removing webhook");
            if let Some(id) = ctx.reconciler.finalize(&obj).await? {
                emit_event(
                    &ctx.recorder,
                    &obj_ref,
                    REASON_WEBHOOK_DELETED,
                    "Finalize",
                    Some(format!("Deleted webhook {}", id)),
                )
                .await;
            }
            let finals = obj
                .meta()
                .finalizers
                .clone()
                .unwrap_or_default()
                .into_iter()
                .filter(|f| f != FINALIZER)
                .collect::<Vec<_>>();
            let patch = json!({"metadata": {"finalizers": finals}});
            api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        return Ok(Action::await_change());
    }

    if !has_finalizer(&obj) {
        info!(%ns, %name, "reconcile: adding finalizer");
        let mut finals = obj.meta().finalizers.clone().unwrap_or_default();
        finals.push(FINALIZER.to_string());
        let patch = json!({"metadata": {"finalizers": finals}});
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
    }

    let mut status = obj.status.clone().unwrap_or_default();
    let outcome = ctx.reconciler.reconcile_status(&obj, &mut status).await?;

    if let Some(id) = outcome.webhook_created.as_ref() {
        emit_event(
            &ctx.recorder,
            &obj_ref,
            REASON_WEBHOOK_CREATED,
            "Reconcile",
            Some(format!("Created webhook {}", id)),
        )
        .await;
    }

    if should_patch_status(obj.status.as_ref(), &status) {
        let patch = status_patch(&status);
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
    }

    info!(%ns, %name, ready = outcome.ready, "reconcile: done");
    Ok(Action::requeue(
        ctx.reconciler.config().requeue_after(outcome.ready),
    ))
}
