//! finalpoint - terminal host for the FinalPoint offline/notification agent.
//!
//! Each subcommand delivers one event (or one prompt operation) and exits.
//! Cache buckets and prompt state live on disk, so a sequence of commands
//! behaves like one long-lived agent.

mod cli;
mod commands;
mod host;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, PromptCommand};
use commands::Context;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = logging::init_logging(cli.verbose, cli.log_dir.as_deref())?;
    info!("finalpoint starting");

    let mut ctx = Context::load()?;

    match cli.command {
        Command::Install => commands::install(&ctx).await,
        Command::Activate => commands::activate(&ctx).await,
        Command::Boot => commands::boot(&ctx).await,
        Command::Fetch(args) => commands::fetch(&ctx, &args).await,
        Command::Push { payload } => commands::push(&ctx, payload).await,
        Command::Click { tag, action } => commands::click(&ctx, tag, action).await,
        Command::Message { json } => commands::message(&ctx, &json).await,
        Command::Sync { tag } => commands::sync(&ctx, tag).await,
        Command::Caches => commands::caches(&ctx).await,
        Command::Prompt(PromptCommand::Status) => commands::prompt_status(&ctx),
        Command::Prompt(PromptCommand::Dismiss { strategy }) => {
            commands::prompt_dismiss(&ctx, strategy)
        }
        Command::Prompt(PromptCommand::Enter(args)) => commands::prompt_enter(&ctx, &args),
        Command::Prompt(PromptCommand::Reset) => commands::prompt_reset(&ctx),
        Command::Subscribe { subscription } => commands::subscribe(&ctx, subscription).await,
        Command::Refresh { watch } => commands::refresh(&ctx, watch).await,
        Command::Login { account } => commands::login(&mut ctx, account),
        Command::Logout => commands::logout(&ctx),
    }
}
