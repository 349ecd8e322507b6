use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    /// Namespace to watch; empty watches every namespace.
    /// Env: GHSRC_NAMESPACE
    #[envconfig(from = "GHSRC_NAMESPACE", default = "")]
    pub namespace: String,

    /// Base URL of the receive adapter that GitHub delivers webhooks to.
    /// Each source is addressed as `<base>/<namespace>/<name>`.
    #[envconfig(
        from = "GHSRC_RECEIVE_ADAPTER_URL",
        default = "http://github-adapter.knative-sources.svc.cluster.local"
    )]
    pub receive_adapter_url: String,

    /// Used when a source does not set `githubAPIURL`.
    #[envconfig(
        from = "GHSRC_GITHUB_API_URL",
        default = "https://api.github.com/"
    )]
    pub github_api_url: String,

    #[envconfig(from = "GHSRC_RESYNC_SECS", default = "300")]
    pub resync_secs: u64,

    #[envconfig(from = "GHSRC_NOT_READY_REQUEUE_SECS", default = "10")]
    pub not_ready_requeue_secs: u64,

    #[envconfig(from = "GHSRC_ERROR_REQUEUE_SECS", default = "60")]
    pub error_requeue_secs: u64,
}

impl ControllerConfig {
    pub fn watch_namespace(&self) -> Option<&str> {
        let ns = self.namespace.trim();
        if ns.is_empty() { None } else { Some(ns) }
    }

    /// Requeue delay after a pass, chosen by the aggregate readiness.
    pub fn requeue_after(&self, ready: bool) -> Duration {
        if ready {
            Duration::from_secs(self.resync_secs)
        } else {
            Duration::from_secs(self.not_ready_requeue_secs)
        }
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            receive_adapter_url:
                "http://github-adapter.knative-sources.svc.cluster.local"
                    .into(),
            github_api_url: "https://api.github.com/".into(),
            resync_secs: 300,
            not_ready_requeue_secs: 10,
            error_requeue_secs: 60,
        }
    }
}
