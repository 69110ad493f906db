use crate::{
    config::PacingWindow,
    rpc::{ChainRpc, EthersEndpoint},
    submitter::TransferSubmitter,
    types::{BatchReport, SubmissionResult, TransferPlan},
};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Runs a plan's intents one after another
pub struct BatchExecutor<R = EthersEndpoint> {
    submitter: TransferSubmitter<R>,
    pacing: Option<PacingWindow>,
}

impl<R: ChainRpc> BatchExecutor<R> {
    pub fn new(submitter: TransferSubmitter<R>) -> Self {
        let pacing = submitter.config().pacing;
        Self { submitter, pacing }
    }

    /// Submit every intent in order, reporting each result as it completes
    ///
    /// A failed transfer never stops the batch.
    pub async fn execute<F>(&self, plan: TransferPlan, mut on_result: F) -> BatchReport
    where
        F: FnMut(&SubmissionResult),
    {
        let total = plan.intents.len();
        let mut results = Vec::with_capacity(total);

        for (idx, intent) in plan.intents.iter().enumerate() {
            if idx > 0 {
                if let Some(window) = self.pacing {
                    let delay = pacing_delay(window);
                    if !delay.is_zero() {
                        debug!("Pausing {:?} before next transfer", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            info!(
                "Transfer {} of {}: {} -> {}",
                idx + 1,
                total,
                intent.signer,
                intent.destination
            );
            let result = self.submitter.submit(intent).await;
            on_result(&result);
            results.push(result);
        }

        let report = BatchReport {
            results,
            skipped: plan.skipped,
        };
        let summary = report.summary();
        info!(
            "Batch complete: {} accepted, {} failed, {} skipped",
            summary.accepted, summary.failed, summary.skipped
        );
        report
    }
}

/// Uniformly random pause within the window
pub fn pacing_delay(window: PacingWindow) -> Duration {
    if window.max <= window.min {
        return window.min;
    }
    rand::thread_rng().gen_range(window.min..=window.max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_delay_within_window() {
        let window = PacingWindow {
            min: Duration::from_millis(10),
            max: Duration::from_millis(20),
        };
        for _ in 0..100 {
            let delay = pacing_delay(window);
            assert!(delay >= window.min && delay <= window.max);
        }
    }

    #[test]
    fn test_degenerate_pacing_window() {
        let window = PacingWindow {
            min: Duration::from_secs(2),
            max: Duration::from_secs(1),
        };
        assert_eq!(pacing_delay(window), Duration::from_secs(2));
    }
}
