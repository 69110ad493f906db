use crate::{
    config::SubmissionConfig,
    endpoint_pool::EndpointPool,
    error::{TxBatchError, TxBatchResult},
    executor::BatchExecutor,
    fee_policy::FeePolicy,
    planner::{BatchPlanner, PlanRequest},
    rpc::{ChainRpc, EthersEndpoint},
    submitter::TransferSubmitter,
    types::{Asset, BatchReport, NetworkConfig, SubmissionResult, TransferIntent, TransferPlan},
};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::info;

/// Cost estimation for a planned batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEstimate {
    /// Worst-case fees across all transfers, in native units
    pub total_fee: U256,
    /// Sum of planned transfer amounts, in the asset's units
    pub total_amount: U256,
    /// Number of transactions that will be broadcast
    pub transaction_count: usize,
}

/// High-level client for planning and executing batch transfers on one network
pub struct BatchTxClient<R = EthersEndpoint> {
    network: Arc<NetworkConfig>,
    pool: Arc<EndpointPool<R>>,
    fees: Arc<FeePolicy>,
    config: SubmissionConfig,
}

impl BatchTxClient<EthersEndpoint> {
    /// Connect to every RPC endpoint of the network
    pub fn connect(network: NetworkConfig, config: SubmissionConfig) -> TxBatchResult<Self> {
        let pool = EndpointPool::connect(&network)?;
        info!(
            "Connected to {} (chain {}) via {} endpoints",
            network.name,
            network.chain_id,
            pool.len()
        );
        Ok(Self::with_pool(network, pool, config))
    }
}

impl<R: ChainRpc> BatchTxClient<R> {
    /// Create a client over an existing endpoint pool
    pub fn with_pool(
        network: NetworkConfig,
        pool: EndpointPool<R>,
        config: SubmissionConfig,
    ) -> Self {
        let fees = FeePolicy::new(config.fees.clone().with_network(&network));
        Self {
            network: Arc::new(network),
            pool: Arc::new(pool),
            fees: Arc::new(fees),
            config,
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn pool(&self) -> &EndpointPool<R> {
        &self.pool
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Minimum raw amount for "entire balance" transfers, once the asset's decimals are known
    pub fn set_dust_threshold(&mut self, threshold: U256) {
        self.config.dust_threshold = threshold;
    }

    pub fn native_asset(&self) -> Asset {
        self.network.native_asset()
    }

    /// Read a token's symbol and decimals from its contract
    pub async fn resolve_token(&self, contract: Address) -> TxBatchResult<Asset> {
        let decimals = self
            .pool
            .token_decimals(contract)
            .await
            .map_err(|e| TxBatchError::InvalidToken(format!("{:#x}: {}", contract, e)))?;
        let symbol = self
            .pool
            .token_symbol(contract)
            .await
            .map_err(|e| TxBatchError::InvalidToken(format!("{:#x}: {}", contract, e)))?;

        info!("Resolved token {} ({} decimals) at {:#x}", symbol, decimals, contract);
        Ok(Asset::Token {
            contract,
            symbol,
            decimals,
        })
    }

    pub fn planner(&self) -> BatchPlanner<R> {
        BatchPlanner::new(self.pool.clone(), self.fees.clone(), self.config.clone())
    }

    pub fn submitter(&self) -> TransferSubmitter<R> {
        TransferSubmitter::new(
            self.pool.clone(),
            self.fees.clone(),
            self.network.clone(),
            self.config.clone(),
        )
    }

    pub fn executor(&self) -> BatchExecutor<R> {
        BatchExecutor::new(self.submitter())
    }

    pub async fn plan(&self, request: &PlanRequest) -> TxBatchResult<TransferPlan> {
        Ok(self.planner().plan(request).await?)
    }

    /// Submit a single intent outside of a batch
    pub async fn submit(&self, intent: &TransferIntent) -> SubmissionResult {
        self.submitter().submit(intent).await
    }

    pub async fn execute<F>(&self, plan: TransferPlan, on_result: F) -> BatchReport
    where
        F: FnMut(&SubmissionResult),
    {
        self.executor().execute(plan, on_result).await
    }

    /// Estimate the cost of a plan without sending anything
    pub fn estimate_cost(&self, plan: &TransferPlan) -> CostEstimate {
        CostEstimate {
            total_fee: plan.total_fee(),
            total_amount: plan.total_amount(),
            transaction_count: plan.intents.len(),
        }
    }
}
