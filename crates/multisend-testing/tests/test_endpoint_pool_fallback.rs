use {
    multisend_batch_tx::{
        AmountPolicy, PlanRequest, RpcError, SubmissionConfig, TransferDirection, U256,
    },
    multisend_testing::{fast_config, native_asset, test_address, BroadcastBehavior, TestFixture},
};

fn single_attempt() -> SubmissionConfig {
    SubmissionConfig {
        max_attempts: 1,
        ..fast_config()
    }
}

/// Test reads walking past failing endpoints
///
/// - Three endpoints, the first two unreachable
/// - Every read returns the third endpoint's answer
/// - Each endpoint is asked exactly once per read
#[tokio::test]
async fn test_reads_fall_back_to_third_endpoint() {
    let test = TestFixture::with_endpoints(3, fast_config());
    let owner = test_address(0x11);
    test.chain.fund(owner, U256::from(1_234u64));
    test.chain.set_nonce(owner, U256::from(9u64));
    test.endpoints[0].set_down(true);
    test.endpoints[1].set_down(true);

    let pool = test.client.pool();
    assert_eq!(pool.get_balance(owner).await.unwrap(), U256::from(1_234u64));
    assert_eq!(pool.get_pending_nonce(owner).await.unwrap(), U256::from(9u64));
    assert_eq!(pool.get_fee_estimate().await.unwrap(), U256::one());

    for endpoint in &test.endpoints {
        assert_eq!(endpoint.calls(), 3, "{:?} call count", endpoint);
    }
}

/// Test that a successful read stops the walk
#[tokio::test]
async fn test_no_endpoint_consulted_after_success() {
    let test = TestFixture::with_endpoints(3, fast_config());
    let owner = test_address(0x12);
    test.chain.fund(owner, U256::from(5u64));
    test.endpoints[0].set_down(true);

    let balance = test.client.pool().get_balance(owner).await.unwrap();

    assert_eq!(balance, U256::from(5u64));
    assert_eq!(test.endpoints[0].calls(), 1);
    assert_eq!(test.endpoints[1].calls(), 1);
    assert_eq!(test.endpoints[2].calls(), 0);
}

/// Test a read failing on every endpoint → AllEndpointsUnavailable
#[tokio::test]
async fn test_all_endpoints_unavailable() {
    let test = TestFixture::with_endpoints(2, fast_config());
    for endpoint in &test.endpoints {
        endpoint.set_down(true);
    }

    let error = test
        .client
        .pool()
        .get_balance(test_address(0x13))
        .await
        .unwrap_err();

    match error {
        RpcError::AllEndpointsUnavailable {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "get_balance");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected AllEndpointsUnavailable, got {:?}", other),
    }
}

/// Test that a node rejection is not retried on the next endpoint
///
/// The first endpoint evaluated the signed transaction; sending it elsewhere would only get
/// the same answer.
#[tokio::test]
async fn test_broadcast_does_not_fall_back_on_rejection() {
    let test = TestFixture::with_endpoints(2, single_attempt());
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain
        .script([BroadcastBehavior::reject("replacement transaction underpriced")]);

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x14),
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();
    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().failed, 1);
    assert_eq!(test.chain.broadcasts().len(), 1);
    assert_eq!(test.endpoints[1].calls(), 0);
}

/// Test that an unreachable broadcast endpoint hands the same bytes to the next one
#[tokio::test]
async fn test_broadcast_falls_back_on_transport_error() {
    let test = TestFixture::with_endpoints(2, single_attempt());
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain
        .script([BroadcastBehavior::Transport("connection reset by peer".to_string())]);

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x15),
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();
    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().accepted, 1);
    let broadcasts = test.chain.broadcasts();
    assert_eq!(broadcasts.len(), 2);
    assert_eq!(broadcasts[0].hash, broadcasts[1].hash);
    assert_eq!(test.chain.sent().len(), 1);
}
