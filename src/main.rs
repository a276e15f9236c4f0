//! Trademore CLI - operate the offline cache & sync controller and the
//! password engine

use clap::Parser;

use trademore::cli::{
    self, CacheCommands, Cli, CommandContext, Commands, ConfigCommands, GlobalOptions,
    PasswordCommands, QueueCommands, WorkerCommands,
};
use trademore::password::PasswordContext;
use trademore::Result;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Returns `Ok(false)` when the command ran but its verdict was negative.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    log::debug!("Debug mode enabled");

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Version => {
            println!("trademore version {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { strict } => cli::config::show(&opts, strict)?,
            ConfigCommands::Init { force } => cli::config::init(&opts, force)?,
        },
        Commands::Password(cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match cmd {
                PasswordCommands::Check {
                    password,
                    preset,
                    email,
                    first_name,
                    last_name,
                    username,
                } => {
                    let identity = PasswordContext {
                        email,
                        first_name,
                        last_name,
                        username,
                    };
                    return cli::password::check(&ctx, &password, preset, identity);
                }
                PasswordCommands::Rules { preset } => cli::password::rules(&ctx, preset)?,
            }
        }
        Commands::Worker(cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match cmd {
                WorkerCommands::Install => cli::worker::install(&ctx).await?,
                WorkerCommands::Activate => cli::worker::activate(&ctx).await?,
                WorkerCommands::Fetch {
                    url,
                    navigate,
                    method,
                } => cli::worker::fetch(&ctx, &url, navigate, &method).await?,
                WorkerCommands::Message { json } => cli::worker::message(&ctx, &json).await?,
                WorkerCommands::Push { payload } => {
                    cli::worker::push(&ctx, payload.as_deref()).await?
                }
            }
        }
        Commands::Cache(cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match cmd {
                CacheCommands::Status => cli::cache::status(&ctx)?,
                CacheCommands::List { namespace } => {
                    cli::cache::list(&ctx, namespace.as_deref())?
                }
                CacheCommands::Clear => cli::cache::clear(&ctx)?,
                CacheCommands::Path => cli::cache::path(&ctx)?,
            }
        }
        Commands::Queue(cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match cmd {
                QueueCommands::List { kind } => cli::queue::list(&ctx, kind).await?,
                QueueCommands::AddForm {
                    url,
                    body,
                    headers,
                    send,
                } => cli::queue::add_form(&ctx, &url, &body, &headers, send).await?,
                QueueCommands::AddEvent { event, data, send } => {
                    cli::queue::add_event(&ctx, &event, data.as_deref(), send).await?
                }
                QueueCommands::Sync { kind } => cli::queue::sync(&ctx, kind).await?,
                QueueCommands::Clear { kind } => cli::queue::clear(&ctx, kind)?,
            }
        }
    }

    Ok(true)
}
