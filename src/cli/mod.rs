//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod cache;
pub mod config;
pub mod context;
pub mod password;
pub mod queue;
pub mod worker;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

use crate::password::Preset;
use crate::worker::QueueKind;

/// Trademore offline runtime - drive the cache & sync controller and the
/// password engine from the command line
#[derive(Parser, Debug)]
#[command(name = "trademore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "TRADEMORE_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "TRADEMORE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the origin the worker serves
    #[arg(long, global = true, env = "TRADEMORE_ORIGIN", hide_env = true)]
    pub origin: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "TRADEMORE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check password strength
    #[command(subcommand)]
    Password(PasswordCommands),

    /// Drive the offline cache & sync controller
    #[command(subcommand)]
    Worker(WorkerCommands),

    /// Inspect the response cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Inspect and replay the offline queue
    #[command(subcommand)]
    Queue(QueueCommands),

    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Display version information
    Version,
}

/// Password subcommands
#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Score a password; exits 1 when it is not acceptable
    Check {
        /// Candidate password
        password: String,

        /// Use a built-in rule preset instead of the configured rules
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Account email the password must not contain
        #[arg(long)]
        email: Option<String>,

        /// First name the password must not contain
        #[arg(long)]
        first_name: Option<String>,

        /// Last name the password must not contain
        #[arg(long)]
        last_name: Option<String>,

        /// Username the password must not contain
        #[arg(long)]
        username: Option<String>,
    },

    /// Show the effective password rules
    Rules {
        /// Show a built-in preset instead of the configured rules
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },
}

/// Worker subcommands
#[derive(Subcommand, Debug)]
pub enum WorkerCommands {
    /// Open the cache namespaces and pre-cache the manifests
    Install,

    /// Evict caches from older versions and take control
    Activate,

    /// Answer a request the way the active worker would
    Fetch {
        /// Absolute URL or path relative to the origin
        url: String,

        /// Treat as a top-level navigation
        #[arg(long)]
        navigate: bool,

        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// Post a control message such as {"type":"SKIP_WAITING"}
    Message {
        /// JSON message
        json: String,
    },

    /// Render a push payload as a notification
    Push {
        /// Payload (JSON object or plain text)
        payload: Option<String>,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics per namespace
    Status,

    /// List cached entries
    List {
        /// Only this namespace
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Delete every namespace
    Clear,

    /// Print the cache directory
    Path,
}

/// Queue subcommands
#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List queued tasks, oldest first
    List {
        /// Only this queue
        #[arg(long, value_enum)]
        kind: Option<QueueKind>,
    },

    /// Queue a form submission (or send it now with --send)
    AddForm {
        /// Destination URL
        url: String,

        /// Request body
        body: String,

        /// Extra header as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// Try to deliver immediately before queuing
        #[arg(long)]
        send: bool,
    },

    /// Queue an analytics event (or send it now with --send)
    AddEvent {
        /// Event name
        event: String,

        /// Event data as JSON
        data: Option<String>,

        /// Try to deliver immediately before queuing
        #[arg(long)]
        send: bool,
    },

    /// Replay queued tasks now
    Sync {
        /// Only this queue
        #[arg(long, value_enum)]
        kind: Option<QueueKind>,
    },

    /// Drop queued tasks without sending them
    Clear {
        /// Only this queue
        #[arg(long, value_enum)]
        kind: Option<QueueKind>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Fail when no configuration file exists
        #[arg(long)]
        strict: bool,
    },

    /// Write a configuration file with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
