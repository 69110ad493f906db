/*!
# RPC Seam

`ChainRpc` is the single-endpoint interface the engine talks to. `EthersEndpoint` is the
production implementation backed by an `ethers` HTTP provider.
*/

use crate::error::{RpcError, RpcResult};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider, ProviderError, RpcError as _},
    types::{
        transaction::eip2718::TypedTransaction, Address, BlockId, BlockNumber, Bytes, H256, U256,
    },
};

/// One JSON-RPC endpoint of one network
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Human-readable endpoint name for logs
    fn label(&self) -> &str;

    async fn get_balance(&self, address: Address) -> RpcResult<U256>;

    /// Current gas price quote
    async fn get_gas_price(&self) -> RpcResult<U256>;

    /// Next nonce including transactions still in the mempool
    async fn get_pending_nonce(&self, address: Address) -> RpcResult<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> RpcResult<U256>;

    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>) -> RpcResult<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<H256>;
}

/// `ChainRpc` over an `ethers` HTTP provider
#[derive(Debug, Clone)]
pub struct EthersEndpoint {
    url: String,
    provider: Provider<Http>,
}

impl EthersEndpoint {
    pub fn new(url: &str) -> RpcResult<Self> {
        let provider = Provider::<Http>::try_from(url).map_err(|e| RpcError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            url: url.to_string(),
            provider,
        })
    }
}

impl From<ProviderError> for RpcError {
    fn from(error: ProviderError) -> Self {
        match error.as_error_response() {
            Some(response) => RpcError::Rejected {
                code: response.code,
                message: response.message.clone(),
            },
            None => RpcError::Transport(error.to_string()),
        }
    }
}

#[async_trait]
impl ChainRpc for EthersEndpoint {
    fn label(&self) -> &str {
        &self.url
    }

    async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        Ok(self.provider.get_balance(address, None).await?)
    }

    async fn get_gas_price(&self) -> RpcResult<U256> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn get_pending_nonce(&self, address: Address) -> RpcResult<U256> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> RpcResult<U256> {
        Ok(self.provider.estimate_gas(tx, None).await?)
    }

    async fn call(&self, tx: &TypedTransaction, block: Option<BlockId>) -> RpcResult<Bytes> {
        Ok(self.provider.call(tx, block).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<H256> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }
}
