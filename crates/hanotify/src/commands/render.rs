//! `hanotify render`: run one payload through the dispatcher offline.

use std::sync::Arc;

use hanotify_config::ConfigTemplateStore;
use hanotify_core::RenderedNotification;

use crate::cli::{GlobalOpts, RenderArgs};
use crate::error::CliError;
use crate::output;
use crate::presenter::ConsoleNotifier;

use super::{dispatcher, load, read_payload, transport};

pub async fn handle(args: &RenderArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let notification = render_file(&args.payload, global).await?;
    print_notification(&notification, global);
    Ok(())
}

/// Load the config and render the payload at `path`.
pub(super) async fn render_file(
    path: &std::path::Path,
    global: &GlobalOpts,
) -> Result<RenderedNotification, CliError> {
    let cfg = load(global)?;
    let payload = read_payload(path)?;

    // A missing profile only means default TLS settings for images.
    let profile = cfg
        .profile(global.profile.as_deref())
        .ok()
        .map(|(_, p)| p);
    let http = transport(profile, &cfg.defaults).build_client()?;

    let notifier = Arc::new(ConsoleNotifier::new(
        global.output,
        output::should_color(global.color),
        global.quiet,
    ));
    let templates = Arc::new(ConfigTemplateStore::new(cfg.templates.clone()));
    let dispatcher = dispatcher(&cfg, templates, notifier, http);

    let ctx = dispatcher.next_context();
    Ok(dispatcher.render(&ctx, &payload).await)
}

pub(super) fn print_notification(notification: &RenderedNotification, global: &GlobalOpts) {
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        notification,
        |n| output::notification_detail(n, color),
        output::notification_plain,
    );
    output::print_output(&out, global.quiet);
}
