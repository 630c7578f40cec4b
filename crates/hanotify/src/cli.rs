//! Clap derive structures for the `hanotify` CLI.
//!
//! Also compiled by `build.rs` for man pages, so it must only depend on clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hanotify -- Home Assistant notifications on the desktop
#[derive(Debug, Parser)]
#[command(
    name = "hanotify",
    version,
    about = "Turn Home Assistant notification events into desktop notifications",
    long_about = "Keeps a WebSocket connection to a Home Assistant hub, subscribes to\n\
        app notification events, and presents each one as a notification.\n\n\
        LAN and WAN addresses are tried according to the profile and the\n\
        current network.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Hub profile to use
    #[arg(long, short = 'p', env = "HANOTIFY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HANOTIFY_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HANOTIFY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Network the machine is on; cellular skips the LAN address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Unknown,
    Wifi,
    Cellular,
    Other,
    Offline,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the hub and show notifications until interrupted
    Run(RunArgs),

    /// Print the WebSocket URL the profile resolves to
    Resolve(ResolveArgs),

    /// Render a payload file as a notification without connecting
    Render(RenderArgs),

    /// Render a payload file and trigger one of its actions
    Action(ActionArgs),

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Network type to assume for LAN/WAN selection
    #[arg(long, short = 'n', default_value = "unknown")]
    pub network: NetworkArg,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Network type to assume for LAN/WAN selection
    #[arg(long, short = 'n', default_value = "unknown")]
    pub network: NetworkArg,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// JSON file with the event data object ("-" reads stdin)
    pub payload: PathBuf,
}

#[derive(Debug, Args)]
pub struct ActionArgs {
    /// JSON file with the event data object ("-" reads stdin)
    pub payload: PathBuf,

    /// Zero-based index of the action to trigger
    #[arg(long, short = 'i')]
    pub index: usize,

    /// Network type to assume when picking the hub address
    #[arg(long, short = 'n', default_value = "unknown")]
    pub network: NetworkArg,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Create initial config file with guided setup
    Init,

    /// Store a hub access token in the system keyring for --profile
    SetToken,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
