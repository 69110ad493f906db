use {
    multisend_batch_tx::{
        AmountPolicy, AttemptOutcome, FailureKind, PlanRequest, TransferDirection, TransferPlan,
        U256,
    },
    multisend_testing::{native_asset, test_address, BroadcastBehavior, TestFixture},
};

async fn plan_single_transfer(test: &TestFixture) -> TransferPlan {
    let signer = test.funded_signer(0, U256::exp10(18));
    test.client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x21),
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap()
}

/// Test a nonce race followed by success
///
/// - Another transaction takes the signer's nonce before the first broadcast lands
/// - The retry uses a strictly greater nonce and the same fee
#[tokio::test]
async fn test_nonce_too_low_then_accepted() {
    let test = TestFixture::new();
    let plan = plan_single_transfer(&test).await;
    test.chain.script([BroadcastBehavior::NonceRace]);

    let report = test.client.execute(plan, |_| {}).await;
    let result = &report.results[0];

    assert!(result.is_accepted());
    assert_eq!(result.attempt_count(), 2);
    assert!(matches!(
        result.attempts[0].outcome,
        AttemptOutcome::Failed {
            kind: FailureKind::NonceTooLow,
            ..
        }
    ));
    assert!(result.attempts[1].nonce > result.attempts[0].nonce);
    assert_eq!(result.attempts[1].fee, result.attempts[0].fee);
    assert_eq!(test.chain.sent()[0].nonce, U256::one());
}

/// Test that a lagging pending-nonce view still produces a strictly greater nonce
///
/// The node rejects with "nonce too low" but its pending nonce has not moved yet.
#[tokio::test]
async fn test_nonce_too_low_with_stale_pending_view() {
    let test = TestFixture::new();
    let plan = plan_single_transfer(&test).await;
    test.chain
        .script([BroadcastBehavior::reject("nonce too low: next nonce 1, tx nonce 0")]);

    let report = test.client.execute(plan, |_| {}).await;
    let result = &report.results[0];

    assert!(result.is_accepted());
    assert_eq!(result.attempts[0].nonce, Some(U256::zero()));
    assert_eq!(result.attempts[1].nonce, Some(U256::one()));
}

/// Test that a new intent always starts from the network's pending nonce
#[tokio::test]
async fn test_each_intent_reads_pending_nonce() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.set_nonce(signer.address(), U256::from(41u64));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::OneToMany {
                signer,
                destinations: vec![test_address(0x22), test_address(0x23)],
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();
    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().accepted, 2);
    let nonces: Vec<_> = test.chain.sent().iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![U256::from(41u64), U256::from(42u64)]);
}
