//! Command line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use finalpoint_core::DismissStrategy;

#[derive(Parser)]
#[command(
    name = "finalpoint",
    version,
    about = "Drive the FinalPoint offline/notification agent from a terminal",
    long_about = "Deliver lifecycle, fetch, push and click events to the FinalPoint agent,\n\
                  inspect its caches, and work with the notification prompt."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to daily-rolling files in this directory.
    #[arg(long = "log-dir", value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the agent and seed the application shell.
    Install,

    /// Activate an installed agent, clearing old caches.
    Activate,

    /// Install then activate.
    Boot,

    /// Fetch a URL through the agent.
    Fetch(FetchArgs),

    /// Deliver a push message.
    Push {
        /// JSON payload; omit to send a push without data.
        #[arg(long)]
        payload: Option<String>,
    },

    /// Click a displayed notification.
    Click {
        /// Notification tag.
        #[arg(long, default_value = "finalpoint-notification")]
        tag: String,

        /// Action button id (open, close); omit for a body click.
        #[arg(long)]
        action: Option<String>,
    },

    /// Post a message to the agent, e.g. '{"type":"SKIP_WAITING"}'.
    Message {
        #[arg(value_name = "JSON")]
        json: String,
    },

    /// Deliver a background sync event.
    Sync {
        #[arg(value_name = "TAG")]
        tag: String,
    },

    /// List cache buckets.
    Caches,

    /// Notification prompt state.
    #[command(subcommand)]
    Prompt(PromptCommand),

    /// Enable notifications and register a push subscription.
    Subscribe {
        /// Push subscription JSON as produced by `PushSubscription.toJSON()`.
        #[arg(long, value_name = "FILE")]
        subscription: PathBuf,
    },

    /// Re-register the stored push subscription.
    Refresh {
        /// Keep running and refresh on the default interval until Ctrl-C.
        #[arg(long)]
        watch: bool,
    },

    /// Store an API token in the OS keychain.
    Login {
        /// Keychain account name.
        #[arg(long)]
        account: Option<String>,
    },

    /// Remove the stored API token.
    Logout,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured origin.
    #[arg(value_name = "URL")]
    pub url: String,

    /// Treat the request as a page navigation.
    #[arg(long)]
    pub navigate: bool,

    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Print the response body.
    #[arg(long)]
    pub body: bool,
}

#[derive(Subcommand)]
pub enum PromptCommand {
    /// Show persisted prompt state.
    Status,

    /// Suppress the prompt.
    Dismiss {
        #[arg(value_name = "STRATEGY", default_value = "not-now")]
        strategy: DismissStrategy,
    },

    /// Evaluate the prompt for a route and a set of triggers.
    Enter(EnterArgs),

    /// Forget persisted prompt state.
    Reset,
}

#[derive(Args)]
pub struct EnterArgs {
    #[arg(value_name = "ROUTE")]
    pub route: String,

    #[arg(long)]
    pub joined_league: bool,

    #[arg(long)]
    pub score_update: bool,

    /// Days until the next race.
    #[arg(long, value_name = "DAYS")]
    pub race_in: Option<i64>,
}
