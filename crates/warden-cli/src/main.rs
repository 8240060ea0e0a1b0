use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Warden audit filter tooling")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration file and build every audit device in it.
    Check {
        /// Path to the configuration file
        config: PathBuf,
    },

    /// Test a filter expression against envelopes (one JSON document per line).
    Eval {
        /// Filter expression
        #[arg(long)]
        filter: String,

        /// Namespace the envelopes are treated as coming from. Defaults to root.
        #[arg(long, default_value = "")]
        namespace: String,

        /// Envelopes file, JSON Lines
        envelopes: PathBuf,
    },

    /// Send envelopes through the devices of a configuration file.
    Replay {
        /// Path to the configuration file
        config: PathBuf,

        /// Namespace the envelopes are treated as coming from. Defaults to root.
        #[arg(long, default_value = "")]
        namespace: String,

        /// Envelopes file, JSON Lines
        envelopes: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Check { config } => commands::check::run(&config),
        Command::Eval {
            filter,
            namespace,
            envelopes,
        } => commands::eval::run(&filter, &namespace, &envelopes),
        Command::Replay {
            config,
            namespace,
            envelopes,
        } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, cancelling replay");
                    on_signal.cancel();
                }
            });
            commands::replay::run(&config, &namespace, &envelopes, cancel).await
        }
    }
}
