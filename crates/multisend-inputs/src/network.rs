use crate::errors::{InputError, InputResult};
use ethers::{types::U256, utils::parse_units};
use multisend_batch_tx::NetworkConfig;
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::debug;
use url::Url;

/// Native symbol used when an entry does not name one
pub const DEFAULT_NATIVE_SYMBOL: &str = "BNB";

/// Native decimals used when an entry does not give them
pub const DEFAULT_NATIVE_DECIMALS: u8 = 18;

// ================================================================================================
// rpc.json schema
// ================================================================================================

/// Gas price written either as a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GweiValue {
    Number(f64),
    Text(String),
}

impl GweiValue {
    fn to_wei(&self) -> Result<U256, String> {
        let text = match self {
            GweiValue::Number(n) => n.to_string(),
            GweiValue::Text(s) => s.trim().to_string(),
        };
        if text.starts_with('-') {
            return Err(format!("gas price {} is negative", text));
        }
        parse_units(&text, "gwei")
            .map(U256::from)
            .map_err(|e| format!("gas price {}: {}", text, e))
    }
}

/// One network entry as written in `rpc.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub name: String,
    pub chain_id: u64,
    #[serde(default)]
    pub rpc_urls: Option<Vec<String>>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub explorer: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub min_gas_price_gwei: Option<GweiValue>,
    #[serde(default)]
    pub base_gas_price_gwei: Option<GweiValue>,
}

impl NetworkEntry {
    /// Endpoints in fallback order: `rpcUrls` wins, then `rpcUrl`, then `endpoint`
    pub fn endpoints(&self) -> Vec<String> {
        match (&self.rpc_urls, &self.rpc_url, &self.endpoint) {
            (Some(urls), _, _) if !urls.is_empty() => urls.clone(),
            (_, Some(url), _) => vec![url.clone()],
            (_, _, Some(url)) => vec![url.clone()],
            _ => Vec::new(),
        }
    }

    /// Validate the entry and convert it into the engine's network description
    pub fn into_config(self) -> InputResult<NetworkConfig> {
        let invalid = |reason: String| InputError::InvalidNetwork {
            name: self.name.clone(),
            reason,
        };

        let rpc_urls: Vec<String> = self
            .endpoints()
            .into_iter()
            .map(|url| url.trim().to_string())
            .collect();
        if rpc_urls.is_empty() {
            return Err(invalid("no RPC endpoints configured".to_string()));
        }
        for url in &rpc_urls {
            validate_url(url)?;
        }
        validate_url(&self.explorer)?;

        let min_fee_per_unit = self
            .min_gas_price_gwei
            .as_ref()
            .map(GweiValue::to_wei)
            .transpose()
            .map_err(invalid)?;
        let base_fee_per_unit = self
            .base_gas_price_gwei
            .as_ref()
            .map(GweiValue::to_wei)
            .transpose()
            .map_err(invalid)?;

        Ok(NetworkConfig {
            name: self.name.clone(),
            chain_id: self.chain_id,
            rpc_urls,
            explorer_url: self.explorer.trim().trim_end_matches('/').to_string(),
            native_symbol: self
                .symbol
                .clone()
                .unwrap_or_else(|| DEFAULT_NATIVE_SYMBOL.to_string()),
            native_decimals: self.decimals.unwrap_or(DEFAULT_NATIVE_DECIMALS),
            min_fee_per_unit,
            base_fee_per_unit,
        })
    }
}

fn validate_url(url: &str) -> InputResult<()> {
    let parsed = Url::parse(url).map_err(|e| InputError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(InputError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

// ================================================================================================
// Loading
// ================================================================================================

/// Parse the contents of an `rpc.json` file
pub fn parse_networks(json: &str) -> InputResult<Vec<NetworkConfig>> {
    let entries: Vec<NetworkEntry> = serde_json::from_str(json)?;
    if entries.is_empty() {
        return Err(InputError::Empty("network list".to_string()));
    }

    let networks = entries
        .into_iter()
        .map(NetworkEntry::into_config)
        .collect::<InputResult<Vec<_>>>()?;
    debug!("Loaded {} networks", networks.len());
    Ok(networks)
}

/// Read networks from an `rpc.json` file
pub fn read_networks<P: AsRef<Path>>(path: P) -> InputResult<Vec<NetworkConfig>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    parse_networks(&json).map_err(|e| match e {
        InputError::Empty(_) => InputError::Empty(path.display().to_string()),
        other => other,
    })
}

/// Select a network by chain id or by case-insensitive name
pub fn find_network<'a>(
    networks: &'a [NetworkConfig],
    selector: &str,
) -> InputResult<&'a NetworkConfig> {
    let selector = selector.trim();
    let by_chain_id = selector
        .parse::<u64>()
        .ok()
        .and_then(|id| networks.iter().find(|n| n.chain_id == id));

    by_chain_id
        .or_else(|| {
            networks
                .iter()
                .find(|n| n.name.eq_ignore_ascii_case(selector))
        })
        .ok_or_else(|| InputError::NetworkNotFound(selector.to_string()))
}
