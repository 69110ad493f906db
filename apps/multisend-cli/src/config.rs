use clap::{Args, ValueEnum};
use multisend_batch_tx::{FeeConfig, PacingWindow, SubmissionConfig};
use std::time::Duration;

/// How signers and destinations are paired
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Every key in the key file sends to one destination
    ManyToOne,
    /// One key sends to every address in the address file
    OneToMany,
    /// Key on line N sends to the address on line N
    Pairwise,
}

/// Submission tuning shared by every sending command
#[derive(Debug, Clone, Args)]
pub struct SubmissionArgs {
    /// Broadcast attempts per transfer
    #[arg(long, default_value_t = 5)]
    pub max_attempts: usize,

    /// Seconds to wait for a broadcast before checking the nonce
    #[arg(long, default_value_t = 30)]
    pub broadcast_timeout_secs: u64,

    /// Seconds between attempts
    #[arg(long, default_value_t = 3)]
    pub retry_delay_secs: u64,

    /// Accounts read concurrently while planning
    #[arg(long, default_value_t = 15)]
    pub parallel_reads: usize,

    /// Minimum pause between transfers, in seconds
    #[arg(long, default_value_t = 3)]
    pub pacing_min_secs: u64,

    /// Maximum pause between transfers, in seconds
    #[arg(long, default_value_t = 7)]
    pub pacing_max_secs: u64,

    /// Send transfers back to back
    #[arg(long)]
    pub no_pacing: bool,

    /// Gas price increase after an underpriced rejection, in percent
    #[arg(long, default_value_t = 10)]
    pub bump_percent: u64,
}

impl SubmissionArgs {
    pub fn to_config(&self) -> SubmissionConfig {
        let pacing = (!self.no_pacing).then(|| PacingWindow {
            min: Duration::from_secs(self.pacing_min_secs),
            max: Duration::from_secs(self.pacing_max_secs.max(self.pacing_min_secs)),
        });

        SubmissionConfig {
            max_attempts: self.max_attempts.max(1),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            broadcast_timeout: Duration::from_secs(self.broadcast_timeout_secs),
            max_parallel_reads: self.parallel_reads.max(1),
            pacing,
            fees: FeeConfig {
                bump_percent: self.bump_percent,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        submission: SubmissionArgs,
    }

    #[test]
    fn test_defaults_match_library_defaults() {
        let cli = TestCli::parse_from(["multisend"]);
        let config = cli.submission.to_config();
        let defaults = SubmissionConfig::default();

        assert_eq!(config.max_attempts, defaults.max_attempts);
        assert_eq!(config.broadcast_timeout, defaults.broadcast_timeout);
        assert_eq!(config.retry_delay, defaults.retry_delay);
        assert_eq!(config.max_parallel_reads, defaults.max_parallel_reads);
        assert_eq!(config.pacing, defaults.pacing);
        assert_eq!(config.fees.bump_percent, defaults.fees.bump_percent);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = TestCli::parse_from([
            "multisend",
            "--max-attempts",
            "0",
            "--no-pacing",
            "--bump-percent",
            "25",
        ]);
        let config = cli.submission.to_config();

        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.pacing, None);
        assert_eq!(config.fees.bump_percent, 25);
    }
}
