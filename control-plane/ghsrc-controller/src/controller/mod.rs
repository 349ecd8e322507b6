use std::sync::Arc;

use futures_util::StreamExt;
use ghsrc_conditions::ConditionError;
use kube::{
    Client,
    api::Api,
    runtime::{
        Controller,
        controller::Action,
        events::{Recorder, Reporter},
        watcher::Config,
    },
};
use tracing::{error, info, warn};

use crate::config::ControllerConfig;
use crate::crd::{GitHubSource, github_source_condition_set};

pub mod collaborators;
pub mod events;
pub mod reconcile;
pub mod status;

pub use collaborators::{
    Collaborators, SecretError, SecretResolver, SinkError, SinkResolver,
    WebhookError, WebhookOptions, WebhookRegistrar,
};
pub use reconcile::{ReconcileOutcome, SourceReconciler};

const CONTROLLER_NAME: &str = "ghsrc-controller";

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("condition error: {0}")]
    Conditions(#[from] ConditionError),

    #[error("webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
}

pub struct ControllerContext {
    pub client: Client,
    pub recorder: Recorder,
    pub reconciler: SourceReconciler,
}

/// Watch GitHubSources and reconcile each one. The runtime's work queue
/// never runs two passes for the same object at once, which is what the
/// condition manager relies on.
pub async fn run_controller(
    client: Client,
    cfg: ControllerConfig,
    collaborators: Collaborators,
) -> anyhow::Result<()> {
    let set = Arc::new(github_source_condition_set()?);
    let api: Api<GitHubSource> = match cfg.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    info!(namespace = ?cfg.watch_namespace(), "starting GitHubSource controller");

    let reporter = Reporter {
        controller: CONTROLLER_NAME.into(),
        instance: std::env::var("POD_NAME").ok(),
    };
    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        recorder: Recorder::new(client, reporter),
        reconciler: SourceReconciler::new(set, collaborators, cfg),
    });

    Controller::new(api, Config::default())
        .run(reconcile::reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref.name, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    obj: Arc<GitHubSource>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(name = ?obj.metadata.name, %error, "reconcile failed; requeueing");
    Action::requeue(ctx.reconciler.config().error_requeue())
}
