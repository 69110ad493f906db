/*!
# Multisend Batch Transaction Client

Resilient batch submission of native-coin and ERC-20 transfers on nonce-ordered EVM networks.
Reads fall back across RPC endpoints, fees escalate on underpriced rejections, nonces are
refreshed after races, and a timed-out broadcast is never resubmitted blindly.

## Quick Start

```rust,no_run
use multisend_batch_tx::{
    AmountPolicy, BatchTxClient, Credential, NetworkConfig, PlanRequest, SubmissionConfig,
    TransferDirection,
};
use std::sync::Arc;

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let network = NetworkConfig {
    name: "BSC".to_string(),
    chain_id: 56,
    rpc_urls: vec!["https://bsc-dataseed.binance.org".to_string()],
    explorer_url: "https://bscscan.com".to_string(),
    native_symbol: "BNB".to_string(),
    native_decimals: 18,
    min_fee_per_unit: None,
    base_fee_per_unit: None,
};
let client = BatchTxClient::connect(network, SubmissionConfig::default())?;

let signer = Arc::new(Credential::from_private_key("0x...", 56)?);
let request = PlanRequest {
    direction: TransferDirection::ManyToOne {
        signers: vec![signer],
        destination: "0x000000000000000000000000000000000000dEaD".parse()?,
    },
    asset: client.native_asset(),
    amount: AmountPolicy::All,
};

// Read balances, reserve fees, skip accounts that cannot pay
let plan = client.plan(&request).await?;

// Submit sequentially; every transfer is reported, none aborts the batch
let report = client
    .execute(plan, |result| println!("{:?}", result.tx_hash()))
    .await;
println!("{:?}", report.summary());
# Ok(())
# }
```

## Custom Configuration

```rust
use multisend_batch_tx::{FeeConfig, SubmissionConfig};
use std::time::Duration;

let config = SubmissionConfig {
    max_attempts: 3,
    broadcast_timeout: Duration::from_secs(10),
    pacing: None,
    fees: FeeConfig {
        bump_percent: 20,
        ..Default::default()
    },
    ..Default::default()
};
# let _ = config;
```
*/

mod client;
mod config;
pub mod erc20;
mod endpoint_pool;
mod error;
mod executor;
mod fee_policy;
mod planner;
mod rpc;
mod submitter;
mod types;

pub use client::{BatchTxClient, CostEstimate};
pub use config::{
    FeeConfig, PacingWindow, SubmissionConfig, NATIVE_TRANSFER_GAS_LIMIT,
    TOKEN_TRANSFER_FALLBACK_GAS_LIMIT,
};
pub use endpoint_pool::EndpointPool;
pub use error::{
    BroadcastError, FailureKind, FailureReason, PlanError, RpcError, RpcResult, SkipReason,
    TxBatchError, TxBatchResult,
};
pub use executor::{pacing_delay, BatchExecutor};
pub use fee_policy::FeePolicy;
pub use planner::{BatchPlanner, PlanRequest, TransferDirection};
pub use rpc::{ChainRpc, EthersEndpoint};
pub use submitter::TransferSubmitter;
pub use types::{
    short_address, AmountPolicy, Asset, AttemptOutcome, BatchReport, BatchSummary, Credential,
    FeeQuote, NetworkConfig, SkippedSigner, SubmissionAttempt, SubmissionOutcome,
    SubmissionResult, TransferIntent, TransferPlan,
};

// Re-export key ethers types for convenience
pub use ethers::types::{Address, Bytes, H256, U256};
