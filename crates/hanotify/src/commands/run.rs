//! `hanotify run`: the long-running notification loop.
//!
//! Boots the supervisor from the active profile, re-reads the config file
//! on an interval and feeds the snapshots to the supervisor as its
//! configuration stream, and prints every notification until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hanotify_config::{Config, ConfigTemplateStore};
use hanotify_core::{ConnectionConfig, ConnectionSupervisor, NetworkType, NotificationDispatcher};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;
use crate::presenter::ConsoleNotifier;

use super::{config_file, dispatcher, network_type, select_profile, transport};

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_file(global);
    let cfg = hanotify_config::load_config_from(&path)?;
    let (name, profile) = select_profile(&cfg, global)?;
    let network = network_type(args.network);

    let notifier = Arc::new(ConsoleNotifier::new(
        global.output,
        output::should_color(global.color),
        global.quiet,
    ));
    let templates = Arc::new(ConfigTemplateStore::new(cfg.templates.clone()));
    let http = transport(Some(profile), &cfg.defaults).build_client()?;
    let dispatcher = dispatcher(&cfg, Arc::clone(&templates), notifier, http);

    let supervisor = ConnectionSupervisor::for_hub(cfg.defaults.reconnect());
    supervisor.set_network(network);
    let events = supervisor
        .take_events()
        .ok_or_else(|| CliError::Internal("event channel already taken".into()))?;

    let cancel = CancellationToken::new();
    let dispatch_task = tokio::spawn(dispatcher.clone().run(events, cancel.clone()));

    let initial = hanotify_config::profile_to_connection_config(profile, &name);
    report_target(&name, &initial, network)?;
    supervisor.start(initial.clone());

    let (config_tx, config_rx) = watch::channel(initial);
    let reloader = ConfigReloader {
        path,
        profile: global.profile.clone(),
        interval: cfg.defaults.reload_interval(),
        templates,
        dispatcher,
        snapshots: config_tx,
    };
    let reload_task = tokio::spawn(reloader.run(cfg, cancel.clone()));

    let follow_task = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .follow_config(WatchStream::from_changes(config_rx))
                .await;
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("interrupted, shutting down");

    cancel.cancel();
    let _ = reload_task.await;
    // The reloader owned the sender, so the config stream has ended.
    let _ = follow_task.await;
    supervisor.stop();
    let _ = dispatch_task.await;
    Ok(())
}

fn report_target(name: &str, config: &ConnectionConfig, network: NetworkType) -> Result<(), CliError> {
    if !config.enabled {
        warn!(profile = name, "profile is disabled; waiting for config changes");
        return Ok(());
    }
    match config.endpoint(network)? {
        Some(endpoint) => info!(
            profile = name,
            url = %endpoint.url,
            source = %endpoint.source,
            authenticated = config.token.is_some(),
            "starting"
        ),
        None => warn!(profile = name, "no hub address configured; waiting for config changes"),
    }
    Ok(())
}

// ── Config reloading ─────────────────────────────────────────────────

/// Polls the config file and publishes connection snapshots.
struct ConfigReloader {
    path: PathBuf,
    /// `--profile`, if given; otherwise the file's default is followed.
    profile: Option<String>,
    interval: Duration,
    templates: Arc<ConfigTemplateStore>,
    dispatcher: NotificationDispatcher,
    snapshots: watch::Sender<ConnectionConfig>,
}

impl ConfigReloader {
    async fn run(self, mut current: Config, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let cfg = match hanotify_config::load_config_from(&self.path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "config reload failed, keeping previous");
                    continue;
                }
            };

            if cfg.templates != current.templates {
                debug!(count = cfg.templates.len(), "templates reloaded");
                self.templates.replace(cfg.templates.clone());
            }
            if cfg.defaults.fallback_title != current.defaults.fallback_title {
                self.dispatcher.set_fallback_title(cfg.defaults.fallback_title.clone());
            }

            self.publish(&cfg);
            current = cfg;
        }
        debug!("config reloader stopped");
    }

    fn publish(&self, cfg: &Config) {
        let snapshot = match cfg.profile(self.profile.as_deref()) {
            Ok((name, profile)) => hanotify_config::profile_to_connection_config(profile, &name),
            Err(e) => {
                warn!(error = %e, "active profile vanished, disconnecting");
                ConnectionConfig::default()
            }
        };
        self.snapshots.send_if_modified(|previous| {
            if *previous == snapshot {
                false
            } else {
                info!("connection settings changed");
                *previous = snapshot;
                true
            }
        });
    }
}
