use {
    multisend_batch_tx::{
        AmountPolicy, FailureReason, PlanRequest, SubmissionOutcome, TransferDirection, U256,
    },
    multisend_testing::{native_asset, test_address, TestFixture, GWEI},
};

/// Test a node that rejects every fee as underpriced → RetriesExhausted
///
/// - Exactly `max_attempts` broadcasts
/// - Each retry bumps the previous gas price by 10%, rounded half up
#[tokio::test]
async fn test_fee_too_low_exhausts_retries() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.set_gas_price(Some(U256::from(GWEI)));
    test.chain.set_min_gas_price(U256::from(100 * GWEI));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x31),
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();
    let report = test.client.execute(plan, |_| {}).await;
    let result = &report.results[0];

    let max_attempts = test.client.config().max_attempts;
    assert_eq!(test.chain.broadcasts().len(), max_attempts);
    assert_eq!(result.attempt_count(), max_attempts);
    match &result.outcome {
        SubmissionOutcome::Failed {
            reason: FailureReason::RetriesExhausted { attempts, last_error },
        } => {
            assert_eq!(*attempts, max_attempts);
            assert!(last_error.contains("underpriced"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }

    let prices: Vec<U256> = result
        .attempts
        .iter()
        .map(|attempt| attempt.fee.unwrap().gas_price)
        .collect();
    assert_eq!(prices[0], U256::from(GWEI));
    for pair in prices.windows(2) {
        let expected = (pair[0] * U256::from(110u64) + U256::from(50u64)) / U256::from(100u64);
        assert_eq!(pair[1], expected);
    }
    assert_eq!(prices[4], U256::from(1_464_100_000u64));
    assert!(test.chain.sent().is_empty());
}

/// Test that a bumped fee is accepted once it clears the node's minimum
#[tokio::test]
async fn test_fee_bump_until_accepted() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.set_gas_price(Some(U256::from(GWEI)));
    test.chain.set_min_gas_price(U256::from(1_200_000_000u64));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x32),
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();
    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().accepted, 1);
    let sent = test.chain.sent();
    assert_eq!(sent.len(), 1);
    // 1.0 -> 1.1 -> 1.21 gwei
    assert_eq!(sent[0].gas_price, U256::from(1_210_000_000u64));
    assert_eq!(report.results[0].attempt_count(), 3);
}
