use {
    crate::MockChain,
    async_trait::async_trait,
    ethers::types::{transaction::eip2718::TypedTransaction, Address, BlockId, Bytes, H256, U256},
    multisend_batch_tx::{ChainRpc, RpcError, RpcResult},
    std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

/// One RPC endpoint in front of a `MockChain`
///
/// Clones share the call counter and the up/down switch, so a test can keep a handle after
/// moving the endpoint into a pool.
#[derive(Debug, Clone)]
pub struct MockEndpoint {
    label: String,
    chain: MockChain,
    down: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockEndpoint {
    pub fn new(label: &str, chain: MockChain) -> Self {
        Self {
            label: label.to_string(),
            chain,
            down: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An endpoint that fails every request at the transport level
    pub fn unreachable(label: &str, chain: MockChain) -> Self {
        let endpoint = Self::new(label, chain);
        endpoint.set_down(true);
        endpoint
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of requests this endpoint has received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn enter(&self) -> RpcResult<&MockChain> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(RpcError::Transport(format!(
                "error sending request for url ({}): connection refused",
                self.label
            )));
        }
        Ok(&self.chain)
    }
}

#[async_trait]
impl ChainRpc for MockEndpoint {
    fn label(&self) -> &str {
        &self.label
    }

    async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        self.enter()?.read_balance(address)
    }

    async fn get_gas_price(&self) -> RpcResult<U256> {
        self.enter()?.get_gas_price()
    }

    async fn get_pending_nonce(&self, address: Address) -> RpcResult<U256> {
        Ok(self.enter()?.nonce(address))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> RpcResult<U256> {
        self.enter()?.estimate_gas(tx)
    }

    async fn call(&self, tx: &TypedTransaction, _block: Option<BlockId>) -> RpcResult<Bytes> {
        self.enter()?.call(tx)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<H256> {
        self.enter()?.send_raw_transaction(raw).await
    }
}
