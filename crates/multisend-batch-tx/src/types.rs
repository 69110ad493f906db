/*!
# Batch Transfer Data Types

Networks, credentials, transfer intents and the records produced while submitting them.
*/

use crate::error::{FailureKind, FailureReason, SkipReason, TxBatchError, TxBatchResult};
use ethers::{
    signers::{LocalWallet, Signer, WalletError},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, H256, U256},
    utils::{keccak256, to_checksum},
};
use std::{fmt, str::FromStr, sync::Arc};

/// A single network the batch runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    /// Endpoints in fallback order
    pub rpc_urls: Vec<String>,
    pub explorer_url: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    /// Lowest gas price the network accepts, when known
    pub min_fee_per_unit: Option<U256>,
    /// Operator-chosen gas price for every transfer on this network
    pub base_fee_per_unit: Option<U256>,
}

impl NetworkConfig {
    pub fn explorer_tx_url(&self, tx_hash: H256) -> String {
        format!("{}/tx/{:#x}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    pub fn native_asset(&self) -> Asset {
        Asset::Native {
            symbol: self.native_symbol.clone(),
            decimals: self.native_decimals,
        }
    }
}

/// A signing key and its derived address
///
/// The key never leaves this type; `Debug` and `Display` only show the address.
#[derive(Clone)]
pub struct Credential {
    wallet: LocalWallet,
}

impl Credential {
    /// Parse a hex private key (with or without `0x`) bound to `chain_id`
    pub fn from_private_key(key: &str, chain_id: u64) -> TxBatchResult<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let wallet = LocalWallet::from_str(key)
            .map_err(|e| TxBatchError::InvalidCredential(e.to_string()))?
            .with_chain_id(chain_id);
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    /// Sign a transaction and return its raw RLP bytes and hash
    pub async fn sign(&self, tx: &TypedTransaction) -> Result<(Bytes, H256), WalletError> {
        let signature = self.wallet.sign_transaction(tx).await?;
        let raw = tx.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));
        Ok((raw, hash))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_address(&self.address()))
    }
}

/// `0x1234...abcd` form of a checksummed address
pub fn short_address(address: &Address) -> String {
    let full = to_checksum(address, None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// What is being transferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Native { symbol: String, decimals: u8 },
    Token {
        contract: Address,
        symbol: String,
        decimals: u8,
    },
}

impl Asset {
    pub fn symbol(&self) -> &str {
        match self {
            Asset::Native { symbol, .. } | Asset::Token { symbol, .. } => symbol,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Native { decimals, .. } | Asset::Token { decimals, .. } => *decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native { .. })
    }

    pub fn token_contract(&self) -> Option<Address> {
        match self {
            Asset::Native { .. } => None,
            Asset::Token { contract, .. } => Some(*contract),
        }
    }
}

/// How much each transfer moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPolicy {
    /// A fixed raw amount per transfer
    Fixed(U256),
    /// Everything spendable after the fee reserve
    All,
}

/// Gas price and limit for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub gas_price: U256,
    pub gas_limit: U256,
}

impl FeeQuote {
    pub fn new(gas_price: U256, gas_limit: U256) -> Self {
        Self {
            gas_price,
            gas_limit,
        }
    }

    pub fn fee(&self) -> U256 {
        self.gas_price.saturating_mul(self.gas_limit)
    }
}

/// One planned transfer, consumed exactly once by the executor
#[derive(Debug, Clone)]
pub struct TransferIntent {
    pub signer: Arc<Credential>,
    pub destination: Address,
    pub asset: Asset,
    /// Raw amount in the asset's smallest unit
    pub amount: U256,
    /// Whether the submitter may shrink the amount to fit the balance
    pub adjustable: bool,
    /// Fee quote used when planning
    pub planned_fee: FeeQuote,
}

impl TransferIntent {
    pub fn source(&self) -> Address {
        self.signer.address()
    }
}

/// A signer excluded at planning time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSigner {
    pub signer: Address,
    pub destination: Option<Address>,
    pub reason: SkipReason,
}

/// Output of the planner
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    pub intents: Vec<TransferIntent>,
    pub skipped: Vec<SkippedSigner>,
}

impl TransferPlan {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Sum of planned amounts
    pub fn total_amount(&self) -> U256 {
        self.intents
            .iter()
            .fold(U256::zero(), |acc, intent| acc.saturating_add(intent.amount))
    }

    /// Sum of planned worst-case fees
    pub fn total_fee(&self) -> U256 {
        self.intents.iter().fold(U256::zero(), |acc, intent| {
            acc.saturating_add(intent.planned_fee.fee())
        })
    }
}

/// What happened on one broadcast attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Accepted(H256),
    Failed { kind: FailureKind, message: String },
    /// The broadcast timed out and the network nonce did not prove acceptance
    TimedOut,
}

/// Record of one attempt inside the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAttempt {
    /// 1-based attempt index
    pub index: usize,
    pub nonce: Option<U256>,
    pub fee: Option<FeeQuote>,
    pub outcome: AttemptOutcome,
}

/// Terminal outcome of one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { tx_hash: H256, explorer_url: String },
    Failed { reason: FailureReason },
}

/// Result of submitting one intent
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub intent: TransferIntent,
    /// Amount actually sent (may be lower than planned for adjustable intents)
    pub amount: U256,
    pub outcome: SubmissionOutcome,
    pub attempts: Vec<SubmissionAttempt>,
}

impl SubmissionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::Accepted { .. })
    }

    pub fn tx_hash(&self) -> Option<H256> {
        match &self.outcome {
            SubmissionOutcome::Accepted { tx_hash, .. } => Some(*tx_hash),
            SubmissionOutcome::Failed { .. } => None,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// Full accounting of an executed batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<SubmissionResult>,
    pub skipped: Vec<SkippedSigner>,
}

impl BatchReport {
    pub fn accepted(&self) -> impl Iterator<Item = &SubmissionResult> {
        self.results.iter().filter(|r| r.is_accepted())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SubmissionResult> {
        self.results.iter().filter(|r| !r.is_accepted())
    }

    pub fn summary(&self) -> BatchSummary {
        let accepted = self.accepted().count();
        BatchSummary {
            accepted,
            failed: self.results.len() - accepted,
            skipped: self.skipped.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub failed: usize,
    pub skipped: usize,
}
