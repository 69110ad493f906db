/*!
# Endpoint Pool

Ordered fallback over the RPC endpoints of one network. Every read walks the endpoints in
order and returns the first success; broadcasts only move on when the endpoint could not be
reached at all.
*/

use crate::{
    erc20,
    error::{BroadcastError, RpcError, RpcResult, TxBatchError, TxBatchResult},
    rpc::{ChainRpc, EthersEndpoint},
    types::NetworkConfig,
};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, BlockId, Bytes, TransactionRequest, H256,
    U256,
};
use std::future::Future;
use tracing::{debug, warn};

pub struct EndpointPool<R = EthersEndpoint> {
    endpoints: Vec<R>,
}

impl EndpointPool<EthersEndpoint> {
    /// Build HTTP endpoints for every RPC URL of the network, in configured order
    pub fn connect(network: &NetworkConfig) -> TxBatchResult<Self> {
        let endpoints = network
            .rpc_urls
            .iter()
            .map(|url| EthersEndpoint::new(url))
            .collect::<RpcResult<Vec<_>>>()?;
        Self::new(endpoints)
    }
}

impl<R: ChainRpc> EndpointPool<R> {
    pub fn new(endpoints: Vec<R>) -> TxBatchResult<Self> {
        if endpoints.is_empty() {
            return Err(TxBatchError::Config(
                "at least one RPC endpoint is required".to_string(),
            ));
        }
        Ok(Self { endpoints })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.label()).collect()
    }

    /// Walk the endpoints in order until one succeeds
    async fn first_success<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        call: F,
    ) -> RpcResult<T>
    where
        F: Fn(&'a R) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            match call(endpoint).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "{} failed on {}: {}, trying next endpoint",
                        operation,
                        endpoint.label(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(RpcError::AllEndpointsUnavailable {
            operation,
            attempts: self.endpoints.len(),
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    pub async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        self.first_success("get_balance", |rpc| rpc.get_balance(address))
            .await
    }

    /// Live gas price quote
    pub async fn get_fee_estimate(&self) -> RpcResult<U256> {
        self.first_success("get_fee_estimate", |rpc| rpc.get_gas_price())
            .await
    }

    pub async fn get_pending_nonce(&self, address: Address) -> RpcResult<U256> {
        self.first_success("get_pending_nonce", |rpc| rpc.get_pending_nonce(address))
            .await
    }

    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> RpcResult<U256> {
        self.first_success("estimate_gas", |rpc| rpc.estimate_gas(tx))
            .await
    }

    pub async fn raw_call(
        &self,
        tx: &TypedTransaction,
        block: Option<BlockId>,
    ) -> RpcResult<Bytes> {
        self.first_success("raw_call", |rpc| rpc.call(tx, block))
            .await
    }

    /// Broadcast signed bytes
    ///
    /// Only transport failures advance to the next endpoint. A node that answered with an
    /// error has evaluated the transaction, so its rejection is returned as is. Once any
    /// endpoint failed at the transport level the error is marked `maybe_delivered`: that
    /// node may hold the transaction even though its reply was lost.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, BroadcastError> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            match endpoint.send_raw_transaction(raw.clone()).await {
                Ok(hash) => {
                    debug!("Broadcast {:#x} via {}", hash, endpoint.label());
                    return Ok(hash);
                }
                Err(e) if e.is_transport() => {
                    warn!(
                        "Broadcast could not reach {}: {}, trying next endpoint",
                        endpoint.label(),
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    return Err(BroadcastError {
                        error: e,
                        maybe_delivered: last_error.is_some(),
                    })
                }
            }
        }

        Err(BroadcastError {
            error: RpcError::AllEndpointsUnavailable {
                operation: "send_raw_transaction",
                attempts: self.endpoints.len(),
                last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            },
            maybe_delivered: true,
        })
    }

    async fn call_contract(&self, contract: Address, data: Bytes) -> RpcResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(contract).data(data).into();
        self.raw_call(&tx, None).await
    }

    pub async fn token_balance(&self, contract: Address, owner: Address) -> RpcResult<U256> {
        let output = self
            .call_contract(contract, erc20::encode_balance_of(owner))
            .await?;
        erc20::decode_uint(&output).map_err(RpcError::Decode)
    }

    pub async fn token_decimals(&self, contract: Address) -> RpcResult<u8> {
        let output = self.call_contract(contract, erc20::encode_decimals()).await?;
        let decimals = erc20::decode_uint(&output).map_err(RpcError::Decode)?;
        u8::try_from(decimals)
            .map_err(|_| RpcError::Decode(format!("decimals out of range: {}", decimals)))
    }

    pub async fn token_symbol(&self, contract: Address) -> RpcResult<String> {
        let output = self.call_contract(contract, erc20::encode_symbol()).await?;
        erc20::decode_string(&output).map_err(RpcError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok, block_on};

    /// Endpoint answering every read with a fixed value, or failing every call
    struct StaticRpc {
        label: String,
        balance: Option<U256>,
        rejects_broadcast: bool,
    }

    impl StaticRpc {
        fn up(label: &str, balance: u64) -> Self {
            Self {
                label: label.to_string(),
                balance: Some(U256::from(balance)),
                rejects_broadcast: false,
            }
        }

        fn down(label: &str) -> Self {
            Self {
                label: label.to_string(),
                balance: None,
                rejects_broadcast: false,
            }
        }

        fn read(&self) -> RpcResult<U256> {
            self.balance
                .ok_or_else(|| RpcError::Transport(format!("{} unreachable", self.label)))
        }
    }

    #[async_trait]
    impl ChainRpc for StaticRpc {
        fn label(&self) -> &str {
            &self.label
        }

        async fn get_balance(&self, _address: Address) -> RpcResult<U256> {
            self.read()
        }

        async fn get_gas_price(&self) -> RpcResult<U256> {
            self.read()
        }

        async fn get_pending_nonce(&self, _address: Address) -> RpcResult<U256> {
            self.read()
        }

        async fn estimate_gas(&self, _tx: &TypedTransaction) -> RpcResult<U256> {
            self.read()
        }

        async fn call(&self, _tx: &TypedTransaction, _block: Option<BlockId>) -> RpcResult<Bytes> {
            self.read().map(|_| Bytes::default())
        }

        async fn send_raw_transaction(&self, _raw: Bytes) -> RpcResult<H256> {
            if self.rejects_broadcast {
                return Err(RpcError::Rejected {
                    code: -32000,
                    message: "nonce too low".to_string(),
                });
            }
            self.read().map(|_| H256::repeat_byte(0x01))
        }
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let result = EndpointPool::<StaticRpc>::new(vec![]);
        assert!(matches!(result, Err(TxBatchError::Config(_))));
    }

    #[test]
    fn test_reads_fall_back_in_order() {
        let pool = EndpointPool::new(vec![
            StaticRpc::down("a"),
            StaticRpc::up("b", 7),
            StaticRpc::up("c", 9),
        ])
        .unwrap();

        let balance = assert_ok!(block_on(pool.get_balance(Address::zero())));
        assert_eq!(balance, U256::from(7u64));
        assert_eq!(pool.labels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_all_endpoints_down() {
        let pool = EndpointPool::new(vec![StaticRpc::down("a"), StaticRpc::down("b")]).unwrap();

        let error = assert_err!(block_on(pool.get_pending_nonce(Address::zero())));
        match error {
            RpcError::AllEndpointsUnavailable {
                operation,
                attempts,
                last_error,
            } => {
                assert_eq!(operation, "get_pending_nonce");
                assert_eq!(attempts, 2);
                assert!(last_error.contains("b unreachable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_stops_on_rejection() {
        let mut rejecting = StaticRpc::up("a", 1);
        rejecting.rejects_broadcast = true;
        let pool = EndpointPool::new(vec![rejecting, StaticRpc::up("b", 1)]).unwrap();

        let error = assert_err!(block_on(pool.send_raw_transaction(Bytes::default())));
        assert!(matches!(error.error, RpcError::Rejected { .. }));
        assert!(!error.maybe_delivered);
    }

    #[test]
    fn test_rejection_after_lost_reply_may_be_delivered() {
        let mut rejecting = StaticRpc::up("b", 1);
        rejecting.rejects_broadcast = true;
        let pool = EndpointPool::new(vec![StaticRpc::down("a"), rejecting]).unwrap();

        let error = assert_err!(block_on(pool.send_raw_transaction(Bytes::default())));
        assert!(matches!(error.error, RpcError::Rejected { .. }));
        assert!(error.maybe_delivered);
    }

    #[test]
    fn test_broadcast_unreachable_everywhere_may_be_delivered() {
        let pool = EndpointPool::new(vec![StaticRpc::down("a"), StaticRpc::down("b")]).unwrap();

        let error = assert_err!(block_on(pool.send_raw_transaction(Bytes::default())));
        assert!(matches!(error.error, RpcError::AllEndpointsUnavailable { .. }));
        assert!(error.maybe_delivered);
    }

    #[test]
    fn test_broadcast_skips_unreachable() {
        let pool = EndpointPool::new(vec![StaticRpc::down("a"), StaticRpc::up("b", 1)]).unwrap();

        let hash = assert_ok!(block_on(pool.send_raw_transaction(Bytes::default())));
        assert_eq!(hash, H256::repeat_byte(0x01));
    }
}
