use {
    multisend_batch_tx::{
        AmountPolicy, PlanError, PlanRequest, SkipReason, TransferDirection, TxBatchError, U256,
    },
    multisend_testing::{native_asset, test_address, TestFixture},
};

const FEE: u64 = 21_000;

/// Test splitting one signer's entire balance over several recipients
///
/// - A full fee is reserved per recipient
/// - The signer's own address among the destinations is skipped
/// - Every recipient receives the same share and the signer keeps only dust
#[tokio::test]
async fn test_split_entire_balance() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::from(10 * FEE));
    let recipients = vec![test_address(0xa1), test_address(0xa2), test_address(0xa3)];
    let mut destinations = recipients.clone();
    destinations.insert(1, signer.address());

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::OneToMany {
                signer: signer.clone(),
                destinations,
            },
            asset: native_asset(),
            amount: AmountPolicy::All,
        })
        .await
        .unwrap();

    let share = U256::from((10 * FEE - 3 * FEE) / 3);
    assert_eq!(plan.intents.len(), 3);
    assert!(plan.intents.iter().all(|intent| intent.amount == share));
    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.skipped[0].reason, SkipReason::SelfTransfer);
    assert_eq!(plan.skipped[0].destination, Some(signer.address()));

    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().accepted, 3);
    for recipient in recipients {
        assert_eq!(test.chain.balance(recipient), share);
    }
    assert!(test.chain.balance(signer.address()) < U256::from(3u64));
}

/// Test a fixed amount per recipient the signer cannot cover → InsufficientBalance
#[tokio::test]
async fn test_split_fixed_amount_insufficient() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::from(3 * (1_000 + FEE) - 1));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::OneToMany {
                signer,
                destinations: vec![test_address(0xa4), test_address(0xa5), test_address(0xa6)],
            },
            asset: native_asset(),
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert_eq!(
        plan.skipped[0].reason,
        SkipReason::InsufficientBalance {
            required: U256::from(3 * (1_000 + FEE)),
            available: U256::from(3 * (1_000 + FEE) - 1),
        }
    );
}

/// Test an empty destination list → NoDestinations
#[tokio::test]
async fn test_split_without_destinations() {
    let test = TestFixture::new();
    let signer = test.funded_signer(0, U256::exp10(18));

    let result = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::OneToMany {
                signer,
                destinations: vec![],
            },
            asset: native_asset(),
            amount: AmountPolicy::All,
        })
        .await;

    assert!(matches!(
        result,
        Err(TxBatchError::Plan(PlanError::NoDestinations))
    ));
}
