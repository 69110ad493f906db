use crate::error::CliResult;
use multisend_inputs::read_networks;
use std::path::PathBuf;

pub fn execute(rpc_file: PathBuf) -> CliResult<()> {
    let networks = read_networks(&rpc_file)?;

    println!("🌐 {} networks in {}", networks.len(), rpc_file.display());
    for (index, network) in networks.iter().enumerate() {
        println!(
            "   {}. {} {} (Chain ID: {}, {} endpoints, {})",
            index + 1,
            network_emoji(network.chain_id),
            network.name,
            network.chain_id,
            network.rpc_urls.len(),
            network.native_symbol
        );
    }
    Ok(())
}

pub fn network_emoji(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "💎",
        10 => "🔴",
        56 => "🟡",
        100 => "🟢",
        137 => "🟣",
        250 => "👻",
        8453 => "🔵",
        33139 => "🐒",
        42161 => "🔷",
        43114 => "❄️",
        _ => "💾",
    }
}
