//! Runs notification actions from the command line.
//!
//! `ha_service` actions call the hub REST API, `url` actions hand the link
//! to the platform opener.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use hanotify_api::HubRestClient;
use hanotify_api::rest::split_service;
use hanotify_core::{Action, ActionExecutor, ActionKind, ActionOutcome};

#[cfg(target_os = "macos")]
const OPENER: &[&str] = &["open"];
#[cfg(target_os = "windows")]
const OPENER: &[&str] = &["cmd", "/C", "start", ""];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: &[&str] = &["xdg-open"];

pub struct HubActionExecutor {
    rest: Option<HubRestClient>,
}

impl HubActionExecutor {
    /// `rest` is `None` when the profile has no usable hub address or token;
    /// service actions then fail.
    pub fn new(rest: Option<HubRestClient>) -> Self {
        Self { rest }
    }

    async fn call_service(&self, action: &Action) -> ActionOutcome {
        let Some(call) = action.service_call() else {
            return ActionOutcome::failed("service action has no domain.service target");
        };
        let Some((domain, service)) = split_service(&call.service) else {
            return ActionOutcome::failed(format!("malformed service '{}'", call.service));
        };
        let Some(rest) = &self.rest else {
            return ActionOutcome::failed("no hub address and token configured for service calls");
        };

        match rest.call_service(domain, service, &call.data).await {
            Ok(_) => {
                info!(service = %call.service, "service called");
                ActionOutcome::ok()
            }
            Err(e) => {
                warn!(service = %call.service, error = %e, "service call failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for HubActionExecutor {
    async fn execute(&self, action: &Action) -> ActionOutcome {
        match &action.kind {
            ActionKind::Url => match action.link() {
                Some(link) => self.open_link(link).await,
                None => ActionOutcome::failed("url action has no link"),
            },
            ActionKind::HaService => self.call_service(action).await,
            ActionKind::Other(kind) => ActionOutcome::failed(format!("unsupported action type '{kind}'")),
            ActionKind::Unspecified => ActionOutcome::failed("action has no type"),
        }
    }

    async fn open_link(&self, link: &str) -> ActionOutcome {
        let url = match url::Url::parse(link) {
            Ok(url) => url,
            Err(e) => return ActionOutcome::failed(format!("invalid link '{link}': {e}")),
        };
        let Some((program, args)) = OPENER.split_first() else {
            return ActionOutcome::failed("no platform opener");
        };

        debug!(%url, opener = program, "opening link");
        let status = tokio::process::Command::new(program)
            .args(args)
            .arg(url.as_str())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => ActionOutcome::ok(),
            Ok(s) => ActionOutcome::failed(format!("{program} exited with {s}")),
            Err(e) => ActionOutcome::failed(format!("could not run {program}: {e}")),
        }
    }
}
