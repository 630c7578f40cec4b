//! Terminal presentation of notifications.
//!
//! Stands in for a platform notification surface: posting prints the
//! notification, full-screen alerts get a banner, cancelling prints a
//! dismissal line.

use std::io::{self, Write};

use owo_colors::OwoColorize;
use tracing::debug;

use hanotify_core::{CoreError, NotificationId, Notifier, RenderedNotification};

use crate::cli::OutputFormat;
use crate::output;

pub struct ConsoleNotifier {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(format: OutputFormat, color: bool, quiet: bool) -> Self {
        Self {
            format,
            color,
            quiet,
        }
    }

    fn emit(&self, text: &str) -> Result<(), CoreError> {
        if self.quiet {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{text}").map_err(|e| CoreError::Presentation {
            message: e.to_string(),
        })
    }
}

impl Notifier for ConsoleNotifier {
    fn post_notification(&self, notification: &RenderedNotification) -> Result<(), CoreError> {
        let text = match self.format {
            OutputFormat::Table => output::notification_detail(notification, self.color),
            OutputFormat::Json => output::render_json_compact(notification),
            OutputFormat::Plain => output::notification_plain(notification),
        };
        self.emit(&text)
    }

    fn present_full_screen(&self, notification: &RenderedNotification) -> Result<(), CoreError> {
        // JSON consumers already see `full_screen: true` on the record.
        if self.format == OutputFormat::Json {
            return Ok(());
        }
        let banner = format!("!!! {} !!!", notification.title.to_uppercase());
        if self.color {
            self.emit(&banner.on_red().white().bold().to_string())
        } else {
            self.emit(&banner)
        }
    }

    fn cancel_notification(&self, id: NotificationId) -> Result<(), CoreError> {
        debug!(%id, "notification dismissed");
        match self.format {
            OutputFormat::Json => self.emit(&format!("{{\"dismissed\":{id}}}")),
            OutputFormat::Table | OutputFormat::Plain => self.emit(&format!("dismissed {id}")),
        }
    }
}
