use {
    crate::{MockChain, MockEndpoint},
    ethers::types::{Address, U256},
    multisend_batch_tx::{
        Asset, BatchTxClient, Credential, EndpointPool, FeeConfig, NetworkConfig,
        SubmissionConfig,
    },
    std::{sync::Arc, time::Duration},
};

pub const TEST_CHAIN_ID: u64 = 31337;

/// 1 gwei in wei
pub const GWEI: u64 = 1_000_000_000;

/// Well-known development keys; never funded on a real network
pub const TEST_KEYS: [&str; 5] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "0x47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
];

pub fn test_signer(index: usize) -> Arc<Credential> {
    Arc::new(
        Credential::from_private_key(TEST_KEYS[index], TEST_CHAIN_ID)
            .expect("test key should parse"),
    )
}

pub fn test_address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn test_network() -> NetworkConfig {
    NetworkConfig {
        name: "Mocknet".to_string(),
        chain_id: TEST_CHAIN_ID,
        rpc_urls: vec!["mock://primary".to_string()],
        explorer_url: "https://explorer.mocknet".to_string(),
        native_symbol: "MOCK".to_string(),
        native_decimals: 18,
        min_fee_per_unit: None,
        base_fee_per_unit: None,
    }
}

pub fn native_asset() -> Asset {
    test_network().native_asset()
}

/// Submission settings with every delay removed
pub fn fast_config() -> SubmissionConfig {
    SubmissionConfig {
        retry_delay: Duration::ZERO,
        transient_delay: Duration::ZERO,
        broadcast_timeout: Duration::from_millis(100),
        pacing: None,
        fees: FeeConfig {
            double_native_reserve: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A mock chain, its endpoints, and a client wired to them
pub struct TestFixture {
    pub chain: MockChain,
    pub endpoints: Vec<MockEndpoint>,
    pub client: BatchTxClient<MockEndpoint>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: SubmissionConfig) -> Self {
        Self::with_endpoints(1, config)
    }

    pub fn with_endpoints(count: usize, config: SubmissionConfig) -> Self {
        let chain = MockChain::new(TEST_CHAIN_ID);
        let endpoints: Vec<_> = (0..count)
            .map(|i| MockEndpoint::new(&format!("mock-{}", i + 1), chain.clone()))
            .collect();
        let pool = EndpointPool::new(endpoints.clone()).expect("at least one endpoint");
        let client = BatchTxClient::with_pool(test_network(), pool, config);

        Self {
            chain,
            endpoints,
            client,
        }
    }

    /// Fund a test signer and return it
    pub fn funded_signer(&self, index: usize, balance: U256) -> Arc<Credential> {
        let signer = test_signer(index);
        self.chain.fund(signer.address(), balance);
        signer
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
