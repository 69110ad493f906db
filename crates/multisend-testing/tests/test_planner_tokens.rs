use {
    multisend_batch_tx::{
        Address, AmountPolicy, Asset, PlanRequest, SkipReason, SubmissionConfig,
        TransferDirection, TxBatchError, U256,
    },
    multisend_testing::{fast_config, test_address, TestFixture},
};

const TOKEN_DECIMALS: u8 = 6;

fn usdt(test: &TestFixture) -> Address {
    let contract = test_address(0x77);
    test.chain.deploy_token(contract, "USDT", TOKEN_DECIMALS);
    test.chain.set_token_gas_estimate(Some(U256::from(50_000u64)));
    contract
}

/// Test reading a token's symbol and decimals from its contract
#[tokio::test]
async fn test_resolve_token() {
    let test = TestFixture::new();
    let contract = usdt(&test);

    let asset = test.client.resolve_token(contract).await.unwrap();

    assert_eq!(
        asset,
        Asset::Token {
            contract,
            symbol: "USDT".to_string(),
            decimals: TOKEN_DECIMALS,
        }
    );
}

/// Test an address that is not a token contract → InvalidToken
#[tokio::test]
async fn test_resolve_missing_token() {
    let test = TestFixture::new();

    let result = test.client.resolve_token(test_address(0x78)).await;

    assert!(matches!(result, Err(TxBatchError::InvalidToken(_))));
}

/// Test planning and sending entire token balances
///
/// - Signer with tokens and gas → transfers its whole token balance
/// - Signer with no tokens → DustBalance
/// - Signer with tokens but no gas → InsufficientGas
#[tokio::test]
async fn test_token_entire_balance() {
    let test = TestFixture::new();
    let contract = usdt(&test);
    let asset = test.client.resolve_token(contract).await.unwrap();

    let rich = test.funded_signer(0, U256::exp10(18));
    let empty = test.funded_signer(1, U256::exp10(18));
    let no_gas = test.funded_signer(2, U256::zero());
    test.chain.mint(contract, rich.address(), U256::from(2_500_000u64));
    test.chain.mint(contract, no_gas.address(), U256::from(7_000_000u64));

    let destination = test_address(0x79);
    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![rich.clone(), empty, no_gas],
                destination,
            },
            asset,
            amount: AmountPolicy::All,
        })
        .await
        .unwrap();

    assert_eq!(plan.intents.len(), 1);
    assert_eq!(plan.intents[0].amount, U256::from(2_500_000u64));
    assert_eq!(plan.intents[0].planned_fee.gas_limit, U256::from(65_000u64));
    assert!(matches!(plan.skipped[0].reason, SkipReason::DustBalance { .. }));
    assert_eq!(
        plan.skipped[1].reason,
        SkipReason::InsufficientGas {
            required: U256::from(65_000u64),
            available: U256::zero(),
        }
    );

    let report = test.client.execute(plan, |_| {}).await;

    assert_eq!(report.summary().accepted, 1);
    assert_eq!(test.chain.token_balance(contract, rich.address()), U256::zero());
    assert_eq!(
        test.chain.token_balance(contract, destination),
        U256::from(2_500_000u64)
    );
    let sent = test.chain.sent();
    assert_eq!(sent[0].value, U256::zero());
    assert_eq!(sent[0].to, destination);
    assert_eq!(
        sent[0].token_transfer,
        Some((contract, U256::from(2_500_000u64)))
    );
}

/// Test a token balance below the minimum worth sending → DustBalance
#[tokio::test]
async fn test_token_balance_below_threshold_is_dust() {
    let test = TestFixture::with_config(SubmissionConfig {
        dust_threshold: U256::from(10_000u64),
        ..fast_config()
    });
    let contract = usdt(&test);
    let asset = test.client.resolve_token(contract).await.unwrap();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.mint(contract, signer.address(), U256::from(9_999u64));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x7a),
            },
            asset,
            amount: AmountPolicy::All,
        })
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert_eq!(
        plan.skipped[0].reason,
        SkipReason::DustBalance {
            balance: U256::from(9_999u64),
            reserve: U256::zero(),
        }
    );
}

/// Test a fixed token amount larger than the signer's holdings → InsufficientBalance
#[tokio::test]
async fn test_token_fixed_amount_insufficient() {
    let test = TestFixture::new();
    let contract = usdt(&test);
    let asset = test.client.resolve_token(contract).await.unwrap();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.mint(contract, signer.address(), U256::from(999u64));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x7a),
            },
            asset,
            amount: AmountPolicy::Fixed(U256::from(1_000u64)),
        })
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert_eq!(
        plan.skipped[0].reason,
        SkipReason::InsufficientBalance {
            required: U256::from(1_000u64),
            available: U256::from(999u64),
        }
    );
}

/// Test the fallback gas limit when token gas estimation fails
#[tokio::test]
async fn test_token_gas_fallback_when_estimation_fails() {
    let test = TestFixture::new();
    let contract = usdt(&test);
    test.chain.set_token_gas_estimate(None);
    let asset = test.client.resolve_token(contract).await.unwrap();
    let signer = test.funded_signer(0, U256::exp10(18));
    test.chain.mint(contract, signer.address(), U256::from(10u64));

    let plan = test
        .client
        .plan(&PlanRequest {
            direction: TransferDirection::ManyToOne {
                signers: vec![signer],
                destination: test_address(0x7b),
            },
            asset,
            amount: AmountPolicy::Fixed(U256::from(10u64)),
        })
        .await
        .unwrap();

    assert_eq!(plan.intents[0].planned_fee.gas_limit, U256::from(100_000u64));
}
