use crate::{
    config::FeeConfig,
    endpoint_pool::EndpointPool,
    erc20,
    rpc::ChainRpc,
    types::{Asset, FeeQuote},
};
use ethers::types::{transaction::eip2718::TypedTransaction, Address, TransactionRequest, U256};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Gas price and gas limit decisions for one network
#[derive(Debug)]
pub struct FeePolicy {
    config: FeeConfig,
    /// Last live gas price seen; zero until the first successful quote
    last_live_quote: AtomicU64,
}

impl FeePolicy {
    pub fn new(config: FeeConfig) -> Self {
        Self {
            config,
            last_live_quote: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Operator-chosen fee per gas unit for the asset's transfer class
    pub fn base_fee(&self, asset: &Asset) -> U256 {
        if asset.is_native() {
            self.config.native_base_fee_per_unit
        } else {
            self.config.token_base_fee_per_unit
        }
    }

    /// Higher of the base fee and the live quote, never below the network floor
    pub fn quote(&self, base: U256, live: U256) -> U256 {
        base.max(live).max(self.config.floor_fee_per_unit)
    }

    /// Escalate an underpriced fee, rounding half up
    pub fn bump(&self, fee: U256) -> U256 {
        let scaled = fee.saturating_mul(U256::from(100 + self.config.bump_percent));
        let bumped = scaled.saturating_add(U256::from(50u64)) / U256::from(100u64);
        // Tiny fees would round back to themselves
        bumped.max(fee.saturating_add(U256::one()))
    }

    pub fn bump_gas_limit(&self, limit: U256) -> U256 {
        let scaled = with_margin(limit, self.config.intrinsic_gas_margin_percent);
        scaled.max(limit.saturating_add(U256::one()))
    }

    /// Cached live quote, if any was seen
    pub fn last_live_quote(&self) -> Option<U256> {
        match self.last_live_quote.load(Ordering::Relaxed) {
            0 => None,
            quote => Some(U256::from(quote)),
        }
    }

    /// Fee per gas unit for the next transfer of `asset`
    ///
    /// A failed live read falls back to the cached quote, then to the base fee alone.
    pub async fn fee_per_unit<R: ChainRpc>(&self, pool: &EndpointPool<R>, asset: &Asset) -> U256 {
        let base = self.base_fee(asset);
        if !self.config.use_live_quote {
            return self.quote(base, U256::zero());
        }

        let live = match pool.get_fee_estimate().await {
            Ok(live) => {
                let cached = live.min(U256::from(u64::MAX)).as_u64();
                self.last_live_quote.store(cached, Ordering::Relaxed);
                live
            }
            Err(e) => {
                let cached = self.last_live_quote();
                warn!(
                    "Live gas price unavailable ({}), using {}",
                    e,
                    if cached.is_some() { "cached quote" } else { "base fee" }
                );
                cached.unwrap_or_default()
            }
        };

        let fee = self.quote(base, live);
        debug!("Gas price for {}: {} (base {}, live {})", asset.symbol(), fee, base, live);
        fee
    }

    pub fn native_gas_limit(&self) -> U256 {
        self.config.native_gas_limit
    }

    /// Estimated gas for `transfer(to, amount)` plus margin, or the fallback limit
    pub async fn token_gas_limit<R: ChainRpc>(
        &self,
        pool: &EndpointPool<R>,
        from: Address,
        contract: Address,
        to: Address,
        amount: U256,
    ) -> U256 {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from)
            .to(contract)
            .data(erc20::encode_transfer(to, amount))
            .into();

        match pool.estimate_gas(&tx).await {
            Ok(estimate) => with_margin(estimate, self.config.token_gas_margin_percent),
            Err(e) => {
                warn!(
                    "Gas estimation failed ({}), using fallback limit {}",
                    e, self.config.token_gas_fallback
                );
                self.config.token_gas_fallback
            }
        }
    }

    pub async fn gas_limit<R: ChainRpc>(
        &self,
        pool: &EndpointPool<R>,
        from: Address,
        asset: &Asset,
        to: Address,
        amount: U256,
    ) -> U256 {
        match asset.token_contract() {
            None => self.native_gas_limit(),
            Some(contract) => self.token_gas_limit(pool, from, contract, to, amount).await,
        }
    }

    /// Worst-case fee the planner holds back per transfer
    pub fn reserve(&self, asset: &Asset, quote: &FeeQuote) -> U256 {
        let fee = quote.fee();
        if asset.is_native() && self.config.double_native_reserve {
            fee.saturating_mul(U256::from(2u64))
        } else {
            fee
        }
    }
}

fn with_margin(value: U256, percent: u64) -> U256 {
    value.saturating_mul(U256::from(percent)) / U256::from(100u64)
}
