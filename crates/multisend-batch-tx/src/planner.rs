use crate::{
    config::SubmissionConfig,
    endpoint_pool::EndpointPool,
    error::{PlanError, RpcError, SkipReason},
    fee_policy::FeePolicy,
    rpc::{ChainRpc, EthersEndpoint},
    types::{
        AmountPolicy, Asset, Credential, FeeQuote, SkippedSigner, TransferIntent, TransferPlan,
    },
};
use ethers::types::{Address, U256};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Who sends to whom
#[derive(Debug, Clone)]
pub enum TransferDirection {
    /// Every signer sends to the same destination
    ManyToOne {
        signers: Vec<Arc<Credential>>,
        destination: Address,
    },
    /// One signer splits its funds over many destinations
    OneToMany {
        signer: Arc<Credential>,
        destinations: Vec<Address>,
    },
    /// Signer `i` sends to destination `i`
    Pairwise { pairs: Vec<(Arc<Credential>, Address)> },
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub direction: TransferDirection,
    pub asset: Asset,
    pub amount: AmountPolicy,
}

/// Result of evaluating one signer
enum Evaluation {
    Intent(TransferIntent),
    Skipped(SkippedSigner),
    /// Reads failed on every endpoint
    Unreachable(SkippedSigner, RpcError),
}

impl Evaluation {
    fn skip(signer: &Credential, destination: Option<Address>, reason: SkipReason) -> Self {
        Evaluation::Skipped(SkippedSigner {
            signer: signer.address(),
            destination,
            reason,
        })
    }

    fn read_failed(signer: &Credential, destination: Option<Address>, error: RpcError) -> Self {
        let skipped = SkippedSigner {
            signer: signer.address(),
            destination,
            reason: SkipReason::ReadFailed(error.to_string()),
        };
        match error {
            RpcError::AllEndpointsUnavailable { .. } => Evaluation::Unreachable(skipped, error),
            _ => Evaluation::Skipped(skipped),
        }
    }
}

/// Turns a `PlanRequest` into transfer intents, reading balances concurrently
pub struct BatchPlanner<R = EthersEndpoint> {
    pool: Arc<EndpointPool<R>>,
    fees: Arc<FeePolicy>,
    config: SubmissionConfig,
}

impl<R: ChainRpc> BatchPlanner<R> {
    pub fn new(pool: Arc<EndpointPool<R>>, fees: Arc<FeePolicy>, config: SubmissionConfig) -> Self {
        Self { pool, fees, config }
    }

    pub async fn plan(&self, request: &PlanRequest) -> Result<TransferPlan, PlanError> {
        let gas_price = self.fees.fee_per_unit(&self.pool, &request.asset).await;
        debug!("Planning with gas price {}", gas_price);

        let evaluations = match &request.direction {
            TransferDirection::ManyToOne {
                signers,
                destination,
            } => {
                let pairs: Vec<_> = signers
                    .iter()
                    .map(|signer| (signer.clone(), *destination))
                    .collect();
                self.evaluate_pairs(&pairs, request, gas_price).await
            }
            TransferDirection::Pairwise { pairs } => {
                self.evaluate_pairs(pairs, request, gas_price).await
            }
            TransferDirection::OneToMany {
                signer,
                destinations,
            } => {
                if destinations.is_empty() {
                    return Err(PlanError::NoDestinations);
                }
                self.evaluate_split(signer, destinations, request, gas_price)
                    .await
            }
        };

        let plan = collect_plan(evaluations)?;
        info!(
            "Planned {} transfers ({} {}), skipped {}",
            plan.intents.len(),
            plan.total_amount(),
            request.asset.symbol(),
            plan.skipped.len()
        );
        Ok(plan)
    }

    /// Evaluate signer/destination pairs in bounded concurrent chunks, preserving order
    async fn evaluate_pairs(
        &self,
        pairs: &[(Arc<Credential>, Address)],
        request: &PlanRequest,
        gas_price: U256,
    ) -> Vec<Evaluation> {
        let chunk_size = self.config.max_parallel_reads.max(1);
        let mut evaluations = Vec::with_capacity(pairs.len());

        for (chunk_idx, chunk) in pairs.chunks(chunk_size).enumerate() {
            debug!(
                "Reading balances for chunk {} of {} ({} signers)",
                chunk_idx + 1,
                pairs.len().div_ceil(chunk_size),
                chunk.len()
            );

            let chunk_futures = chunk.iter().map(|(signer, destination)| {
                self.evaluate(signer, *destination, request, gas_price)
            });
            evaluations.extend(join_all(chunk_futures).await);
        }

        evaluations
    }

    async fn evaluate(
        &self,
        signer: &Arc<Credential>,
        destination: Address,
        request: &PlanRequest,
        gas_price: U256,
    ) -> Evaluation {
        let source = signer.address();
        if source == destination {
            return Evaluation::skip(signer, Some(destination), SkipReason::SelfTransfer);
        }

        let native_balance = match self.pool.get_balance(source).await {
            Ok(balance) => balance,
            Err(e) => return Evaluation::read_failed(signer, Some(destination), e),
        };

        let (amount, adjustable, gas_limit) = match &request.asset {
            Asset::Native { .. } => {
                let gas_limit = self.fees.native_gas_limit();
                let reserve = self
                    .fees
                    .reserve(&request.asset, &FeeQuote::new(gas_price, gas_limit));

                match request.amount {
                    AmountPolicy::All => {
                        if native_balance <= reserve
                            || native_balance - reserve < self.config.dust_threshold
                        {
                            let reason = SkipReason::DustBalance {
                                balance: native_balance,
                                reserve,
                            };
                            return Evaluation::skip(signer, Some(destination), reason);
                        }
                        (native_balance - reserve, true, gas_limit)
                    }
                    AmountPolicy::Fixed(amount) => {
                        let required = amount.saturating_add(reserve);
                        if native_balance < required {
                            let reason = SkipReason::InsufficientBalance {
                                required,
                                available: native_balance,
                            };
                            return Evaluation::skip(signer, Some(destination), reason);
                        }
                        (amount, false, gas_limit)
                    }
                }
            }
            Asset::Token { contract, .. } => {
                let token_balance = match self.pool.token_balance(*contract, source).await {
                    Ok(balance) => balance,
                    Err(e) => return Evaluation::read_failed(signer, Some(destination), e),
                };

                let (amount, adjustable) = match request.amount {
                    AmountPolicy::All => {
                        if token_balance.is_zero()
                            || token_balance < self.config.dust_threshold
                        {
                            let reason = SkipReason::DustBalance {
                                balance: token_balance,
                                reserve: U256::zero(),
                            };
                            return Evaluation::skip(signer, Some(destination), reason);
                        }
                        (token_balance, true)
                    }
                    AmountPolicy::Fixed(amount) => {
                        if token_balance < amount {
                            let reason = SkipReason::InsufficientBalance {
                                required: amount,
                                available: token_balance,
                            };
                            return Evaluation::skip(signer, Some(destination), reason);
                        }
                        (amount, false)
                    }
                };

                let gas_limit = self
                    .fees
                    .token_gas_limit(&self.pool, source, *contract, destination, amount)
                    .await;
                let reserve = self
                    .fees
                    .reserve(&request.asset, &FeeQuote::new(gas_price, gas_limit));
                if native_balance < reserve {
                    let reason = SkipReason::InsufficientGas {
                        required: reserve,
                        available: native_balance,
                    };
                    return Evaluation::skip(signer, Some(destination), reason);
                }
                (amount, adjustable, gas_limit)
            }
        };

        Evaluation::Intent(TransferIntent {
            signer: signer.clone(),
            destination,
            asset: request.asset.clone(),
            amount,
            adjustable,
            planned_fee: FeeQuote::new(gas_price, gas_limit),
        })
    }

    /// Split one signer's funds across destinations, reserving a full fee per recipient
    async fn evaluate_split(
        &self,
        signer: &Arc<Credential>,
        destinations: &[Address],
        request: &PlanRequest,
        gas_price: U256,
    ) -> Vec<Evaluation> {
        let source = signer.address();
        let mut evaluations = Vec::new();
        let mut recipients = Vec::new();

        for destination in destinations {
            if *destination == source {
                evaluations.push(Evaluation::skip(
                    signer,
                    Some(*destination),
                    SkipReason::SelfTransfer,
                ));
            } else {
                recipients.push(*destination);
            }
        }

        let Some(first_recipient) = recipients.first().copied() else {
            return evaluations;
        };
        let count = U256::from(recipients.len());

        let native_balance = match self.pool.get_balance(source).await {
            Ok(balance) => balance,
            Err(e) => {
                evaluations.push(Evaluation::read_failed(signer, None, e));
                return evaluations;
            }
        };

        let (per_recipient, gas_limit) = match &request.asset {
            Asset::Native { .. } => {
                let gas_limit = self.fees.native_gas_limit();
                let reserve = self
                    .fees
                    .reserve(&request.asset, &FeeQuote::new(gas_price, gas_limit))
                    .saturating_mul(count);

                match request.amount {
                    AmountPolicy::All => {
                        let per_recipient = native_balance.saturating_sub(reserve) / count;
                        if native_balance <= reserve
                            || per_recipient < self.config.dust_threshold
                            || per_recipient.is_zero()
                        {
                            let reason = SkipReason::DustBalance {
                                balance: native_balance,
                                reserve,
                            };
                            evaluations.push(Evaluation::skip(signer, None, reason));
                            return evaluations;
                        }
                        (per_recipient, gas_limit)
                    }
                    AmountPolicy::Fixed(amount) => {
                        let required = amount.saturating_mul(count).saturating_add(reserve);
                        if native_balance < required {
                            let reason = SkipReason::InsufficientBalance {
                                required,
                                available: native_balance,
                            };
                            evaluations.push(Evaluation::skip(signer, None, reason));
                            return evaluations;
                        }
                        (amount, gas_limit)
                    }
                }
            }
            Asset::Token { contract, .. } => {
                let token_balance = match self.pool.token_balance(*contract, source).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        evaluations.push(Evaluation::read_failed(signer, None, e));
                        return evaluations;
                    }
                };

                let per_recipient = match request.amount {
                    AmountPolicy::All => {
                        let per_recipient = token_balance / count;
                        if per_recipient.is_zero()
                            || per_recipient < self.config.dust_threshold
                        {
                            let reason = SkipReason::DustBalance {
                                balance: token_balance,
                                reserve: U256::zero(),
                            };
                            evaluations.push(Evaluation::skip(signer, None, reason));
                            return evaluations;
                        }
                        per_recipient
                    }
                    AmountPolicy::Fixed(amount) => {
                        let required = amount.saturating_mul(count);
                        if token_balance < required {
                            let reason = SkipReason::InsufficientBalance {
                                required,
                                available: token_balance,
                            };
                            evaluations.push(Evaluation::skip(signer, None, reason));
                            return evaluations;
                        }
                        amount
                    }
                };

                let gas_limit = self
                    .fees
                    .token_gas_limit(&self.pool, source, *contract, first_recipient, per_recipient)
                    .await;
                let reserve = self
                    .fees
                    .reserve(&request.asset, &FeeQuote::new(gas_price, gas_limit))
                    .saturating_mul(count);
                if native_balance < reserve {
                    let reason = SkipReason::InsufficientGas {
                        required: reserve,
                        available: native_balance,
                    };
                    evaluations.push(Evaluation::skip(signer, None, reason));
                    return evaluations;
                }
                (per_recipient, gas_limit)
            }
        };

        evaluations.extend(recipients.into_iter().map(|destination| {
            Evaluation::Intent(TransferIntent {
                signer: signer.clone(),
                destination,
                asset: request.asset.clone(),
                amount: per_recipient,
                adjustable: false,
                planned_fee: FeeQuote::new(gas_price, gas_limit),
            })
        }));
        evaluations
    }
}

/// Split evaluations into a plan, escalating only a pool-wide outage
fn collect_plan(evaluations: Vec<Evaluation>) -> Result<TransferPlan, PlanError> {
    let mut plan = TransferPlan::default();
    let mut reads = 0usize;
    let mut outage = None;
    let mut unreachable = 0usize;

    for evaluation in evaluations {
        match evaluation {
            Evaluation::Intent(intent) => {
                reads += 1;
                plan.intents.push(intent);
            }
            Evaluation::Skipped(skipped) => {
                if skipped.reason != SkipReason::SelfTransfer {
                    reads += 1;
                }
                plan.skipped.push(skipped);
            }
            Evaluation::Unreachable(skipped, error) => {
                reads += 1;
                unreachable += 1;
                outage.get_or_insert(error);
                plan.skipped.push(skipped);
            }
        }
    }

    match outage {
        Some(error) if unreachable == reads => Err(PlanError::EndpointsUnavailable(error)),
        _ => Ok(plan),
    }
}
