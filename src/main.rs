#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::too_many_lines)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use snowcmd::channels::{Channel, ConsoleChannel, ConsoleReply, InboundMessage};
use snowcmd::commands::{CommandEngine, CommandNode, Origin, Registry};
use snowcmd::{CliCommands, Config};

/// `snowcmd` - text-command routing for chat bots.
#[derive(Parser, Debug)]
#[command(name = "snowcmd")]
#[command(version)]
#[command(about = "Tokenize, route and run bot commands from the terminal.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.snowcmd/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_init()?,
    };

    let engine = CommandEngine::with_builtins(&config, |builder| builder)
        .context("Failed to build command registry")?;

    match cli.command {
        CliCommands::Console => {
            run_console(Arc::new(engine), config.bot.owner_id).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommands::Exec {
            line,
            origin,
            user,
            guild,
        } => {
            let message = InboundMessage {
                id: uuid::Uuid::new_v4().to_string(),
                origin,
                author_id: user.unwrap_or(config.bot.owner_id),
                guild_id: (origin == Origin::Guild).then(|| guild.unwrap_or_default()),
                content: line,
                timestamp: 0,
            };
            match engine.handle(&message, Box::new(ConsoleReply)) {
                Some(status) => Ok(ExitCode::from(status.code())),
                None => {
                    eprintln!("not a command");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        CliCommands::Commands => {
            print_tree(engine.registry());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_console(engine: Arc<CommandEngine>, operator_id: u64) -> Result<()> {
    let channel = Arc::new(ConsoleChannel::new(operator_id));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<InboundMessage>(32);

    let listener = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.listen(tx).await })
    };

    info!(commands = engine.registry().len(), "console ready");

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(message) = received else { break };
                let surface = channel.surface_for(&message);
                engine.handle(&message, surface);
                if engine.shutdown_requested() {
                    info!("stop requested, leaving console");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    listener.abort();
    Ok(())
}

fn print_tree(registry: &Registry) {
    println!("{} commands", registry.len());
    for node in registry.top_level() {
        print_node(registry, node, 0);
    }
}

fn print_node(registry: &Registry, node: &CommandNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{indent}{}", node.name());
    if node.is_group() {
        line.push('/');
    }
    if let Some(alias) = node.alias() {
        line.push_str(&format!(" (alias {alias})"));
    }
    line.push_str(&format!(" [{}]", node.origin()));
    if !node.permissions().is_empty() {
        line.push_str(&format!(" perms: {}", node.permissions().join(", ")));
    }
    println!("{line}");

    for child in registry.children(node) {
        print_node(registry, child, depth + 1);
    }
}
