/*!
# Single-Transfer Submission

Drives one `TransferIntent` from nonce acquisition to an accepted broadcast, escalating the
fee, refreshing the nonce or shrinking the amount as the node's rejections demand.

```text
Init -> Estimating -> Signing -> Broadcasting -> Accepted
            ^                        |
            +------- Retrying <------+-> Failed
```
*/

use crate::{
    config::SubmissionConfig,
    endpoint_pool::EndpointPool,
    erc20,
    error::{FailureKind, FailureReason, RpcError},
    fee_policy::FeePolicy,
    rpc::{ChainRpc, EthersEndpoint},
    types::{
        AttemptOutcome, FeeQuote, NetworkConfig, SubmissionAttempt, SubmissionOutcome,
        SubmissionResult, TransferIntent,
    },
};
use backoff::backoff::{Backoff, Constant};
use ethers::types::{transaction::eip2718::TypedTransaction, TransactionRequest, H256, U256};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmissionState {
    Init,
    Estimating,
    Signing,
    Broadcasting,
    Retrying,
    Accepted,
    Failed,
}

/// Which waiting period precedes the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Retry,
    Transient,
}

/// Mutable state of one intent's retry sequence
struct Run<'a> {
    intent: &'a TransferIntent,
    state: SubmissionState,
    amount: U256,
    nonce: Option<U256>,
    /// Lower bound for the next nonce after a `NonceTooLow`
    min_nonce: U256,
    gas_price: Option<U256>,
    /// Fee refreshes never go below the last price used
    price_floor: U256,
    gas_limit: Option<U256>,
    funds_checked: bool,
    shrunk: bool,
    /// Broadcast whose outcome is unknown after a timeout
    unresolved: Option<(U256, H256)>,
    attempts: Vec<SubmissionAttempt>,
    last_error: Option<RpcError>,
    retry_backoff: Constant,
    transient_backoff: Constant,
}

impl<'a> Run<'a> {
    fn new(intent: &'a TransferIntent, config: &SubmissionConfig) -> Self {
        Self {
            intent,
            state: SubmissionState::Init,
            amount: intent.amount,
            nonce: None,
            min_nonce: U256::zero(),
            gas_price: None,
            price_floor: U256::zero(),
            gas_limit: None,
            funds_checked: false,
            shrunk: false,
            unresolved: None,
            attempts: Vec::new(),
            last_error: None,
            retry_backoff: Constant::new(config.retry_delay),
            transient_backoff: Constant::new(config.transient_delay),
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        debug!(
            "{} -> {}: {:?} -> {:?}",
            self.intent.signer, self.intent.destination, self.state, next
        );
        self.state = next;
    }

    fn record(&mut self, nonce: Option<U256>, fee: Option<FeeQuote>, outcome: AttemptOutcome) {
        let index = self.attempts.len() + 1;
        self.attempts.push(SubmissionAttempt {
            index,
            nonce,
            fee,
            outcome,
        });
    }

    fn record_failure(&mut self, nonce: Option<U256>, fee: Option<FeeQuote>, error: RpcError) {
        let kind = FailureKind::classify(&error);
        self.record(
            nonce,
            fee,
            AttemptOutcome::Failed {
                kind,
                message: error.to_string(),
            },
        );
        self.last_error = Some(error);
    }

    /// Drop the cached nonce and fee so the next attempt reads both again
    fn refresh(&mut self) {
        self.nonce = None;
        self.gas_price = None;
    }
}

enum NonceRead {
    Ready(U256),
    /// A timed-out broadcast has since consumed its nonce
    AlreadyAccepted(H256),
}

/// Outcome of the pre-broadcast funds check
enum Funds {
    Sufficient,
    Insufficient { required: U256, available: U256 },
    Unreadable(RpcError),
}

/// Submits transfer intents one at a time
pub struct TransferSubmitter<R = EthersEndpoint> {
    pool: Arc<EndpointPool<R>>,
    fees: Arc<FeePolicy>,
    network: Arc<NetworkConfig>,
    config: SubmissionConfig,
}

impl<R: ChainRpc> TransferSubmitter<R> {
    pub fn new(
        pool: Arc<EndpointPool<R>>,
        fees: Arc<FeePolicy>,
        network: Arc<NetworkConfig>,
        config: SubmissionConfig,
    ) -> Self {
        Self {
            pool,
            fees,
            network,
            config,
        }
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Submit one intent until it is accepted, fails permanently or runs out of attempts
    ///
    /// Never returns an error: every failure is captured in the result.
    pub async fn submit(&self, intent: &TransferIntent) -> SubmissionResult {
        let mut run = Run::new(intent, &self.config);
        let source = intent.source();
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            run.advance(SubmissionState::Estimating);

            let nonce = match self.current_nonce(&mut run).await {
                Ok(NonceRead::Ready(nonce)) => nonce,
                Ok(NonceRead::AlreadyAccepted(tx_hash)) => return self.accept(run, tx_hash),
                Err(e) => {
                    warn!("{}: could not read pending nonce: {}", intent.signer, e);
                    run.record_failure(None, None, e);
                    self.wait(&mut run, attempt, max_attempts, Wait::Transient).await;
                    continue;
                }
            };

            let gas_price = match run.gas_price {
                Some(price) => price,
                None => {
                    let fresh = self.fees.fee_per_unit(&self.pool, &intent.asset).await;
                    let price = fresh.max(run.price_floor);
                    run.gas_price = Some(price);
                    price
                }
            };

            let gas_limit = match run.gas_limit {
                Some(limit) => limit,
                None => {
                    let limit = self
                        .fees
                        .gas_limit(
                            &self.pool,
                            source,
                            &intent.asset,
                            intent.destination,
                            run.amount,
                        )
                        .await;
                    run.gas_limit = Some(limit);
                    limit
                }
            };

            let quote = FeeQuote::new(gas_price, gas_limit);
            run.price_floor = gas_price;

            if !run.funds_checked {
                match self.check_funds(&mut run, &quote).await {
                    Funds::Sufficient => run.funds_checked = true,
                    Funds::Insufficient {
                        required,
                        available,
                    } => {
                        let reason = FailureReason::InsufficientFunds {
                            required,
                            available,
                        };
                        return self.fail(run, reason);
                    }
                    Funds::Unreadable(e) => {
                        warn!("{}: could not read balance: {}", intent.signer, e);
                        run.record_failure(Some(nonce), Some(quote), e);
                        self.wait(&mut run, attempt, max_attempts, Wait::Transient).await;
                        continue;
                    }
                }
            }

            run.advance(SubmissionState::Signing);
            let tx = self.build_transaction(intent, run.amount, nonce, &quote);
            let (raw, local_hash) = match intent.signer.sign(&tx).await {
                Ok(signed) => signed,
                Err(e) => return self.fail(run, FailureReason::Signing(e.to_string())),
            };

            run.advance(SubmissionState::Broadcasting);
            debug!(
                "{}: attempt {} nonce {} gas price {} gas limit {}",
                intent.signer, attempt, nonce, gas_price, gas_limit
            );

            let broadcast = self.pool.send_raw_transaction(raw);
            let error = match timeout(self.config.broadcast_timeout, broadcast).await {
                Ok(Ok(tx_hash)) => {
                    run.record(Some(nonce), Some(quote), AttemptOutcome::Accepted(tx_hash));
                    return self.accept(run, tx_hash);
                }
                Ok(Err(failure)) if failure.maybe_delivered => {
                    warn!(
                        "{}: broadcast reply lost ({}), checking nonce",
                        intent.signer, failure.error
                    );
                    if self.settle_unknown(&mut run, nonce, local_hash).await {
                        let outcome = AttemptOutcome::Accepted(local_hash);
                        run.record(Some(nonce), Some(quote), outcome);
                        return self.accept(run, local_hash);
                    }
                    failure.error
                }
                Ok(Err(failure)) => failure.error,
                Err(_) => {
                    warn!(
                        "{}: broadcast timed out after {:?}, checking nonce",
                        intent.signer, self.config.broadcast_timeout
                    );
                    if self.settle_unknown(&mut run, nonce, local_hash).await {
                        let outcome = AttemptOutcome::Accepted(local_hash);
                        run.record(Some(nonce), Some(quote), outcome);
                        return self.accept(run, local_hash);
                    }
                    run.record(Some(nonce), Some(quote), AttemptOutcome::TimedOut);
                    run.last_error = Some(RpcError::Transport(format!(
                        "broadcast timed out after {:?}",
                        self.config.broadcast_timeout
                    )));
                    run.refresh();
                    self.wait(&mut run, attempt, max_attempts, Wait::Transient).await;
                    continue;
                }
            };

            let kind = FailureKind::classify(&error);
            warn!(
                "{}: attempt {} of {} rejected ({:?}): {}",
                intent.signer, attempt, max_attempts, kind, error
            );
            run.record_failure(Some(nonce), Some(quote), error);

            let wait = match kind {
                FailureKind::AlreadyKnown => return self.accept(run, local_hash),
                FailureKind::NonceTooLow => {
                    run.min_nonce = nonce.saturating_add(U256::one());
                    run.nonce = None;
                    Wait::Retry
                }
                FailureKind::FeeTooLow => {
                    run.gas_price = Some(self.fees.bump(gas_price));
                    Wait::Retry
                }
                FailureKind::IntrinsicGasTooLow => {
                    run.gas_limit = Some(self.fees.bump_gas_limit(gas_limit));
                    run.refresh();
                    Wait::Retry
                }
                FailureKind::TransientRpcError => {
                    run.refresh();
                    Wait::Transient
                }
                FailureKind::InsufficientFunds => {
                    match self.shrink_after_rejection(&mut run, &quote).await {
                        Ok(()) => Wait::Retry,
                        Err(reason) => return self.fail(run, reason),
                    }
                }
                FailureKind::Unknown => Wait::Retry,
            };

            self.wait(&mut run, attempt, max_attempts, wait).await;
        }

        let last_error = run
            .last_error
            .take()
            .unwrap_or_else(|| RpcError::Transport("no attempt completed".to_string()));
        let reason = match last_error {
            RpcError::AllEndpointsUnavailable { .. } => {
                FailureReason::EndpointUnavailable(last_error.to_string())
            }
            other => FailureReason::RetriesExhausted {
                attempts: run.attempts.len(),
                last_error: other.to_string(),
            },
        };
        self.fail(run, reason)
    }

    /// Remember a broadcast whose outcome is unknown and check whether its nonce was consumed
    async fn settle_unknown(&self, run: &mut Run<'_>, nonce: U256, tx_hash: H256) -> bool {
        run.unresolved = Some((nonce, tx_hash));
        match self.pool.get_pending_nonce(run.intent.source()).await {
            Ok(pending) if pending > nonce => {
                info!(
                    "{}: nonce {} consumed, treating {:#x} as accepted",
                    run.intent.signer, nonce, tx_hash
                );
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("{}: nonce check failed: {}", run.intent.signer, e);
                false
            }
        }
    }

    /// Cached nonce, or a fresh pending read
    ///
    /// While a broadcast is unresolved its nonce is reused, so a second transfer is never
    /// signed behind a first one that may still land.
    async fn current_nonce(&self, run: &mut Run<'_>) -> Result<NonceRead, RpcError> {
        if let Some(nonce) = run.nonce {
            return Ok(NonceRead::Ready(nonce));
        }

        let pending = self.pool.get_pending_nonce(run.intent.source()).await?;
        let nonce = match run.unresolved {
            Some((used, tx_hash)) if pending > used => {
                info!(
                    "{}: nonce {} consumed, treating unanswered {:#x} as accepted",
                    run.intent.signer, used, tx_hash
                );
                return Ok(NonceRead::AlreadyAccepted(tx_hash));
            }
            Some((used, _)) => used,
            None => pending.max(run.min_nonce),
        };
        run.nonce = Some(nonce);
        Ok(NonceRead::Ready(nonce))
    }

    async fn check_funds(&self, run: &mut Run<'_>, quote: &FeeQuote) -> Funds {
        let intent = run.intent;
        let source = intent.source();
        let fee = quote.fee();

        let native = match self.pool.get_balance(source).await {
            Ok(balance) => balance,
            Err(e) => return Funds::Unreadable(e),
        };

        match intent.asset.token_contract() {
            None => {
                let required = run.amount.saturating_add(fee);
                if native >= required {
                    return Funds::Sufficient;
                }
                if intent.adjustable
                    && native > fee
                    && native - fee >= self.config.dust_threshold
                {
                    let reduced = native - fee;
                    info!(
                        "{}: reducing amount from {} to {} to cover fees",
                        intent.signer, run.amount, reduced
                    );
                    run.amount = reduced;
                    return Funds::Sufficient;
                }
                Funds::Insufficient {
                    required,
                    available: native,
                }
            }
            Some(contract) => {
                if native < fee {
                    return Funds::Insufficient {
                        required: fee,
                        available: native,
                    };
                }
                let balance = match self.pool.token_balance(contract, source).await {
                    Ok(balance) => balance,
                    Err(e) => return Funds::Unreadable(e),
                };
                if balance >= run.amount {
                    return Funds::Sufficient;
                }
                if intent.adjustable
                    && !balance.is_zero()
                    && balance >= self.config.dust_threshold
                {
                    info!(
                        "{}: reducing amount from {} to token balance {}",
                        intent.signer, run.amount, balance
                    );
                    run.amount = balance;
                    return Funds::Sufficient;
                }
                Funds::Insufficient {
                    required: run.amount,
                    available: balance,
                }
            }
        }
    }

    /// After an "insufficient funds" rejection, shrink an adjustable native intent once
    async fn shrink_after_rejection(
        &self,
        run: &mut Run<'_>,
        quote: &FeeQuote,
    ) -> Result<(), FailureReason> {
        let intent = run.intent;
        let fee = quote.fee();
        let required = if intent.asset.is_native() {
            run.amount.saturating_add(fee)
        } else {
            fee
        };
        let available = match self.pool.get_balance(intent.source()).await {
            Ok(balance) => balance,
            Err(e) => {
                return Err(FailureReason::InsufficientFundsUnverified {
                    required,
                    read_error: e.to_string(),
                })
            }
        };

        if intent.adjustable && intent.asset.is_native() && !run.shrunk && available > fee {
            let reduced = available - fee;
            if reduced < run.amount && reduced >= self.config.dust_threshold {
                info!(
                    "{}: rejected for insufficient funds, reducing amount from {} to {}",
                    intent.signer, run.amount, reduced
                );
                run.amount = reduced;
                run.shrunk = true;
                return Ok(());
            }
        }

        Err(FailureReason::InsufficientFunds {
            required,
            available,
        })
    }

    fn build_transaction(
        &self,
        intent: &TransferIntent,
        amount: U256,
        nonce: U256,
        quote: &FeeQuote,
    ) -> TypedTransaction {
        let request = TransactionRequest::new()
            .from(intent.source())
            .nonce(nonce)
            .gas_price(quote.gas_price)
            .gas(quote.gas_limit)
            .chain_id(self.network.chain_id);

        let request = match intent.asset.token_contract() {
            None => request.to(intent.destination).value(amount),
            Some(contract) => request
                .to(contract)
                .value(U256::zero())
                .data(erc20::encode_transfer(intent.destination, amount)),
        };

        request.into()
    }

    async fn wait(
        &self,
        run: &mut Run<'_>,
        attempt: usize,
        max_attempts: usize,
        wait: Wait,
    ) {
        if attempt >= max_attempts {
            return;
        }
        run.advance(SubmissionState::Retrying);

        let delay = match wait {
            Wait::Retry => run.retry_backoff.next_backoff(),
            Wait::Transient => run.transient_backoff.next_backoff(),
        };
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            debug!("{}: waiting {:?} before next attempt", run.intent.signer, delay);
            sleep(delay).await;
        }
    }

    fn accept(&self, mut run: Run<'_>, tx_hash: H256) -> SubmissionResult {
        run.advance(SubmissionState::Accepted);
        let explorer_url = self.network.explorer_tx_url(tx_hash);
        info!(
            "{} -> {}: accepted {} ({} attempts)",
            run.intent.signer,
            run.intent.destination,
            explorer_url,
            run.attempts.len()
        );

        SubmissionResult {
            intent: run.intent.clone(),
            amount: run.amount,
            outcome: SubmissionOutcome::Accepted {
                tx_hash,
                explorer_url,
            },
            attempts: run.attempts,
        }
    }

    fn fail(&self, mut run: Run<'_>, reason: FailureReason) -> SubmissionResult {
        run.advance(SubmissionState::Failed);
        warn!(
            "{} -> {}: failed: {}",
            run.intent.signer, run.intent.destination, reason
        );

        SubmissionResult {
            intent: run.intent.clone(),
            amount: run.amount,
            outcome: SubmissionOutcome::Failed { reason },
            attempts: run.attempts,
        }
    }
}
