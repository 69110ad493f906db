use clap::{Parser, Subcommand};
use multisend_batch_tx::Address;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use config::{Direction, SubmissionArgs};
use error::CliResult;

#[derive(Parser)]
#[command(name = "multisend")]
#[command(about = "Multisend - Batch native and token transfers on EVM networks")]
#[command(version)]
struct Cli {
    /// Network list
    #[arg(long, global = true, default_value = "rpc.json")]
    rpc_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured networks
    Networks,

    /// Plan a batch, preview it, and send it with --yes
    Send {
        /// Network name or chain id from the network list
        #[arg(short, long)]
        network: String,

        /// Who sends to whom
        #[arg(short, long, value_enum)]
        direction: Direction,

        /// ERC-20 contract to transfer; the native coin when omitted
        #[arg(short, long, value_parser = parse_address)]
        token: Option<Address>,

        /// Amount per transfer in human units (e.g. 0.5)
        #[arg(short, long, conflicts_with = "all", required_unless_present = "all")]
        amount: Option<String>,

        /// Send everything spendable after fees
        #[arg(long)]
        all: bool,

        /// Smallest amount worth sending with --all, in asset units
        /// [default: 0.001 for the native coin, one raw unit for tokens]
        #[arg(long)]
        min_amount: Option<String>,

        /// Destination address; overrides the address file
        #[arg(long, value_parser = parse_address)]
        to: Option<Address>,

        /// Sender key for one-to-many; defaults to the first key in the key file
        #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,

        /// Private keys, one per line
        #[arg(long, default_value = "pk.txt")]
        keys_file: PathBuf,

        /// Destination addresses, one per line
        #[arg(long, default_value = "address.txt")]
        addresses_file: PathBuf,

        /// Broadcast the planned transfers; without it only a preview is printed
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        submission: SubmissionArgs,
    },
}

fn parse_address(value: &str) -> Result<Address, String> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|_| format!("'{}' is not a valid address", value))
}

#[tokio::main]
async fn main() -> CliResult<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,multisend=info,multisend_batch_tx=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Networks => commands::list_networks::execute(cli.rpc_file),

        Commands::Send {
            network,
            direction,
            token,
            amount,
            all,
            min_amount,
            to,
            private_key,
            keys_file,
            addresses_file,
            yes,
            submission,
        } => {
            let args = commands::send::SendArgs {
                rpc_file: cli.rpc_file,
                network,
                direction,
                token,
                amount,
                all,
                min_amount,
                to,
                private_key,
                keys_file,
                addresses_file,
                execute: yes,
                config: submission.to_config(),
            };
            commands::send::execute(args).await
        }
    }
}
