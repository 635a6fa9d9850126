//! canip command - SocketCAN interface configuration.

mod commands;

use std::time::Duration;

use canlink::netlink::SocketConfig;
use clap::{Parser, Subcommand};

/// Output format for show commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub format: OutputFormat,
    pub pretty: bool,
    pub stats: bool,
    pub socket: SocketConfig,
}

#[derive(Parser)]
#[command(name = "canip", version, about = "CAN interface configuration tool")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Show statistics.
    #[arg(short = 's', long, global = true)]
    stats: bool,

    /// How long to wait for the kernel to answer, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List CAN interfaces.
    #[command(visible_alias = "ls")]
    List,

    /// Show CAN interface details.
    #[command(visible_alias = "s")]
    Show(commands::show::ShowCmd),

    /// Change CAN interface settings.
    Set(commands::set::SetCmd),

    /// Bring an interface up.
    Up(commands::set::DevArg),

    /// Bring an interface down.
    Down(commands::set::DevArg),

    /// Restart a controller in BUS-OFF state.
    Restart(commands::set::DevArg),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let opts = Options {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        pretty: cli.pretty,
        stats: cli.stats,
        socket: SocketConfig::new().recv_timeout(Duration::from_millis(cli.timeout_ms)),
    };

    let result = match cli.command {
        Command::List => commands::show::list(&opts),
        Command::Show(cmd) => cmd.run(&opts).await,
        Command::Set(cmd) => cmd.run(&opts).await,
        Command::Up(dev) => commands::set::up(&dev, &opts).await,
        Command::Down(dev) => commands::set::down(&dev, &opts).await,
        Command::Restart(dev) => commands::set::restart(&dev, &opts).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
