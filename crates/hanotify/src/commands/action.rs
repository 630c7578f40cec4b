//! `hanotify action`: render a payload, then trigger one of its buttons.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use hanotify_core::{ActionKind, ActionRouter};

use crate::cli::{ActionArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::executor::HubActionExecutor;
use crate::output;
use crate::presenter::ConsoleNotifier;

use super::render::{print_notification, render_file};
use super::{load, network_type, rest_client, select_profile, transport};

#[derive(Debug, Serialize)]
struct Outcome<'a> {
    notification_id: i32,
    index: usize,
    title: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

pub async fn handle(args: &ActionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let notification = render_file(&args.payload, global).await?;
    if global.output == OutputFormat::Table {
        print_notification(&notification, global);
    }

    let Some(button) = notification.actions.get(args.index) else {
        return Err(CliError::NotFound {
            resource_type: "action".into(),
            identifier: args.index.to_string(),
        });
    };

    // Only service calls need the hub; a missing address or token is an
    // error for those and irrelevant for everything else.
    let rest = if button.action.kind == ActionKind::HaService {
        let cfg = load(global)?;
        let (name, profile) = select_profile(&cfg, global)?;
        let http = transport(Some(profile), &cfg.defaults).build_client()?;
        Some(rest_client(&name, profile, network_type(args.network), http)?)
    } else {
        None
    };

    // The outcome report below covers the dismissal.
    let notifier = Arc::new(ConsoleNotifier::new(global.output, false, true));
    let router = ActionRouter::new(Arc::new(HubActionExecutor::new(rest)), notifier);

    debug!(id = %button.notification_id, index = button.index, "triggering action");
    let outcome = router.trigger(button).await;

    let report = Outcome {
        notification_id: button.notification_id.0,
        index: button.index,
        title: &button.title,
        success: outcome.success,
        message: outcome.message.as_deref(),
    };
    let out = output::render_single(
        global.output,
        &report,
        |r| {
            if r.success {
                format!("✓ {} triggered", r.title)
            } else {
                format!("✗ {} failed", r.title)
            }
        },
        |r| if r.success { "ok".into() } else { "failed".into() },
    );
    output::print_output(&out, global.quiet);

    if outcome.success {
        Ok(())
    } else {
        Err(CliError::ActionFailed {
            message: outcome.message.unwrap_or_else(|| "action failed".into()),
        })
    }
}
