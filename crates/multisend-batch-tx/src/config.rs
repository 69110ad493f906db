use crate::types::NetworkConfig;
use ethers::types::U256;
use std::time::Duration;

/// Gas limit of a plain value transfer, fixed by the protocol
pub const NATIVE_TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit used for token transfers when estimation fails
pub const TOKEN_TRANSFER_FALLBACK_GAS_LIMIT: u64 = 100_000;

/// Configuration for batch transfer submission
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Maximum number of broadcast attempts per transfer
    pub max_attempts: usize,

    /// Fixed delay between attempts
    pub retry_delay: Duration,

    /// Delay after a connection-level failure before refreshing nonce and fee
    pub transient_delay: Duration,

    /// Hard timeout for a single broadcast; the outcome is unknown after it elapses
    pub broadcast_timeout: Duration,

    /// Maximum number of signers evaluated concurrently while planning
    pub max_parallel_reads: usize,

    /// Randomized delay inserted between consecutive transfers
    pub pacing: Option<PacingWindow>,

    /// Smallest amount, in raw units of the asset being sent, worth sending under the
    /// "entire balance" policy; also the floor for an amount shrunk to fit the balance
    pub dust_threshold: U256,

    /// Fee and gas settings
    pub fees: FeeConfig,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(3),
            transient_delay: Duration::from_secs(5),
            broadcast_timeout: Duration::from_secs(30),
            max_parallel_reads: 15,
            pacing: Some(PacingWindow {
                min: Duration::from_secs(3),
                max: Duration::from_secs(7),
            }),
            dust_threshold: U256::one(),
            fees: FeeConfig::default(),
        }
    }
}

/// Bounds of the randomized pause between transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingWindow {
    pub min: Duration,
    pub max: Duration,
}

/// Fee and gas policy settings
#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Lowest fee per gas unit the network will accept
    pub floor_fee_per_unit: U256,

    /// Operator-chosen fee per gas unit for native transfers
    pub native_base_fee_per_unit: U256,

    /// Operator-chosen fee per gas unit for token transfers
    pub token_base_fee_per_unit: U256,

    /// Blend the node's live gas price quote into the base fee (higher wins)
    pub use_live_quote: bool,

    /// Escalation applied after an underpriced-fee rejection
    pub bump_percent: u64,

    /// Gas limit for native transfers
    pub native_gas_limit: U256,

    /// Safety margin applied to estimated token transfer gas
    pub token_gas_margin_percent: u64,

    /// Gas limit used when token transfer estimation fails
    pub token_gas_fallback: U256,

    /// Gas limit escalation after an intrinsic-gas rejection
    pub intrinsic_gas_margin_percent: u64,

    /// Reserve twice the worst-case fee when planning native transfers
    pub double_native_reserve: bool,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            floor_fee_per_unit: U256::zero(),
            native_base_fee_per_unit: U256::zero(),
            token_base_fee_per_unit: U256::zero(),
            use_live_quote: true,
            bump_percent: 10,
            native_gas_limit: U256::from(NATIVE_TRANSFER_GAS_LIMIT),
            token_gas_margin_percent: 130,
            token_gas_fallback: U256::from(TOKEN_TRANSFER_FALLBACK_GAS_LIMIT),
            intrinsic_gas_margin_percent: 130,
            double_native_reserve: true,
        }
    }
}

impl FeeConfig {
    /// Apply the per-network floor and base fee on top of these settings
    pub fn with_network(mut self, network: &NetworkConfig) -> Self {
        if let Some(floor) = network.min_fee_per_unit {
            self.floor_fee_per_unit = self.floor_fee_per_unit.max(floor);
        }
        if let Some(base) = network.base_fee_per_unit {
            self.native_base_fee_per_unit = base;
            self.token_base_fee_per_unit = base;
        }
        self
    }
}
