use crate::{
    commands::list_networks::network_emoji,
    config::Direction,
    error::{CliError, CliResult},
};
use multisend_batch_tx::{
    short_address, Address, AmountPolicy, Asset, BatchTxClient, Credential, PlanRequest,
    SubmissionConfig, SubmissionOutcome, SubmissionResult, TransferDirection, TransferPlan, U256,
};
use multisend_inputs::{
    find_network, format_amount, parse_amount, read_addresses, read_keys, read_networks,
};
use std::{path::PathBuf, sync::Arc};
use tracing::warn;

/// Native amounts below this are not worth sending with --all
pub const DEFAULT_NATIVE_MIN_AMOUNT: &str = "0.001";

pub struct SendArgs {
    pub rpc_file: PathBuf,
    pub network: String,
    pub direction: Direction,
    pub token: Option<Address>,
    pub amount: Option<String>,
    pub all: bool,
    pub min_amount: Option<String>,
    pub to: Option<Address>,
    pub private_key: Option<String>,
    pub keys_file: PathBuf,
    pub addresses_file: PathBuf,
    pub execute: bool,
    pub config: SubmissionConfig,
}

pub async fn execute(args: SendArgs) -> CliResult<()> {
    // Step 1: Network
    let networks = read_networks(&args.rpc_file)?;
    let network = find_network(&networks, &args.network)?.clone();
    println!(
        "{} Network: {} (Chain ID: {})",
        network_emoji(network.chain_id),
        network.name,
        network.chain_id
    );
    let chain_id = network.chain_id;
    let mut client = BatchTxClient::connect(network, args.config.clone())?;

    // Step 2: Asset and amount
    let asset = match args.token {
        Some(contract) => client.resolve_token(contract).await?,
        None => client.native_asset(),
    };
    let amount = match (&args.amount, args.all) {
        (_, true) => AmountPolicy::All,
        (Some(text), false) => AmountPolicy::Fixed(parse_amount(text, asset.decimals())?),
        (None, false) => {
            return Err(CliError::InvalidArguments(
                "either --amount or --all is required".to_string(),
            ))
        }
    };
    println!("💰 Asset: {}", describe_asset(&asset));
    let dust_threshold = min_amount(args.min_amount.as_deref(), &asset)?;
    client.set_dust_threshold(dust_threshold);

    // Step 3: Who sends to whom
    let direction = build_direction(&args, chain_id)?;
    let request = PlanRequest {
        direction,
        asset: asset.clone(),
        amount,
    };

    // Step 4: Plan and preview
    println!("\n📋 Reading balances...");
    let plan = client.plan(&request).await?;
    print_preview(&client, &plan, &asset);

    if plan.is_empty() {
        println!("\n⚠️  Nothing to send");
        return Ok(());
    }
    if !args.execute {
        println!("\n🔎 Preview only. Re-run with --yes to broadcast.");
        return Ok(());
    }

    // Step 5: Execute
    println!("\n🚀 Sending {} transfers...", plan.intents.len());
    let total = plan.intents.len();
    let mut done = 0usize;
    let report = client
        .execute(plan, |result| {
            done += 1;
            print_result(done, total, result, &asset);
        })
        .await;

    let summary = report.summary();
    println!("\n📊 Summary:");
    println!("  - {} accepted", summary.accepted);
    println!("  - {} failed", summary.failed);
    println!("  - {} skipped", summary.skipped);

    if summary.failed > 0 {
        return Err(CliError::BatchIncomplete {
            failed: summary.failed,
            total: report.results.len(),
        });
    }
    println!("\n🎉 Batch completed successfully!");
    Ok(())
}

fn build_direction(args: &SendArgs, chain_id: u64) -> CliResult<TransferDirection> {
    match args.direction {
        Direction::ManyToOne => {
            let destination = args.to.ok_or_else(|| {
                CliError::InvalidArguments("many-to-one requires --to".to_string())
            })?;
            let signers = read_keys(&args.keys_file, chain_id)?;
            println!(
                "🔑 {} signers from {} → {}",
                signers.len(),
                args.keys_file.display(),
                short_address(&destination)
            );
            Ok(TransferDirection::ManyToOne {
                signers,
                destination,
            })
        }

        Direction::OneToMany => {
            let signer = match &args.private_key {
                Some(key) => Arc::new(Credential::from_private_key(key, chain_id)?),
                None => read_keys(&args.keys_file, chain_id)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        CliError::InvalidArguments("no sender key available".to_string())
                    })?,
            };
            let destinations = match args.to {
                Some(destination) => vec![destination],
                None => read_addresses(&args.addresses_file)?,
            };
            println!(
                "🔑 Sender {} → {} recipients",
                short_address(&signer.address()),
                destinations.len()
            );
            Ok(TransferDirection::OneToMany {
                signer,
                destinations,
            })
        }

        Direction::Pairwise => {
            let signers = read_keys(&args.keys_file, chain_id)?;
            let destinations = read_addresses(&args.addresses_file)?;
            if signers.len() != destinations.len() {
                warn!(
                    "{} keys but {} addresses; pairing the first {}",
                    signers.len(),
                    destinations.len(),
                    signers.len().min(destinations.len())
                );
            }
            let pairs: Vec<_> = signers.into_iter().zip(destinations).collect();
            println!("🔑 {} signer/destination pairs", pairs.len());
            Ok(TransferDirection::Pairwise { pairs })
        }
    }
}

/// Dust threshold in raw units of `asset`
fn min_amount(input: Option<&str>, asset: &Asset) -> CliResult<U256> {
    match (input, asset) {
        (Some(text), _) => Ok(parse_amount(text, asset.decimals())?),
        (None, Asset::Native { decimals, .. }) => {
            Ok(parse_amount(DEFAULT_NATIVE_MIN_AMOUNT, *decimals).unwrap_or_else(|_| U256::one()))
        }
        (None, Asset::Token { .. }) => Ok(U256::one()),
    }
}

fn describe_asset(asset: &Asset) -> String {
    match asset {
        Asset::Native { symbol, .. } => format!("{} (native)", symbol),
        Asset::Token {
            contract, symbol, ..
        } => format!("{} ({})", symbol, short_address(contract)),
    }
}

fn print_preview(client: &BatchTxClient, plan: &TransferPlan, asset: &Asset) {
    let native = client.native_asset();
    let estimate = client.estimate_cost(plan);

    println!("\n📝 Planned transfers:");
    for (index, intent) in plan.intents.iter().enumerate() {
        println!(
            "  {}. {} → {}: {} {} (fee ≤ {} {})",
            index + 1,
            short_address(&intent.source()),
            short_address(&intent.destination),
            format_amount(intent.amount, asset.decimals()),
            asset.symbol(),
            format_amount(intent.planned_fee.fee(), native.decimals()),
            native.symbol()
        );
    }

    if !plan.skipped.is_empty() {
        println!("\n⏭️  Skipped:");
        for skipped in &plan.skipped {
            println!("  - {}: {}", short_address(&skipped.signer), skipped.reason);
        }
    }

    println!("\n💵 Totals:");
    println!("  - {} transactions", estimate.transaction_count);
    println!(
        "  - {} {} to transfer",
        format_amount(estimate.total_amount, asset.decimals()),
        asset.symbol()
    );
    println!(
        "  - up to {} {} in fees",
        format_amount(estimate.total_fee, native.decimals()),
        native.symbol()
    );
}

fn print_result(done: usize, total: usize, result: &SubmissionResult, asset: &Asset) {
    let route = format!(
        "{} → {}",
        short_address(&result.intent.source()),
        short_address(&result.intent.destination)
    );
    match &result.outcome {
        SubmissionOutcome::Accepted {
            tx_hash,
            explorer_url,
        } => {
            println!(
                "✅ [{}/{}] {} {} {}",
                done,
                total,
                format_amount(result.amount, asset.decimals()),
                asset.symbol(),
                route
            );
            println!("   🔗 {:#x}", tx_hash);
            println!("   🌐 {}", explorer_url);
        }
        SubmissionOutcome::Failed { reason } => {
            println!(
                "❌ [{}/{}] {} after {} attempts: {}",
                done,
                total,
                route,
                result.attempt_count(),
                reason
            );
        }
    }
}
