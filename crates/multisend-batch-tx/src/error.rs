use ethers::types::U256;
use thiserror::Error;

pub type TxBatchResult<T> = Result<T, TxBatchError>;
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while setting up or planning a batch
#[derive(Error, Debug)]
pub enum TxBatchError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid token contract: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors surfaced by a single endpoint or by the endpoint pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("node rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("all {attempts} endpoints failed for {operation}: {last_error}")]
    AllEndpointsUnavailable {
        operation: &'static str,
        attempts: usize,
        last_error: String,
    },
}

impl RpcError {
    /// True when the endpoint never evaluated the request (connection, timeout, rate limit).
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

/// A broadcast that did not end with a transaction hash
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct BroadcastError {
    pub error: RpcError,
    /// An endpoint failed at the transport level first, so the payload may have reached a node
    pub maybe_delivered: bool,
}

/// Classification of a failed broadcast, driving the retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NonceTooLow,
    FeeTooLow,
    IntrinsicGasTooLow,
    TransientRpcError,
    InsufficientFunds,
    /// The node already holds this exact signed transaction
    AlreadyKnown,
    Unknown,
}

// Generic server error code used by geth-style nodes for "could not process right now".
const SERVER_ERROR_CODE: i64 = -32000;

impl FailureKind {
    /// Classify a broadcast error by inspecting the node's message
    pub fn classify(error: &RpcError) -> Self {
        let message = error.to_string().to_lowercase();

        if message.contains("already known") || message.contains("known transaction") {
            FailureKind::AlreadyKnown
        } else if message.contains("nonce too low")
            || message.contains("nonce has already been used")
            || message.contains("invalid nonce")
        {
            FailureKind::NonceTooLow
        } else if message.contains("replacement fee too low")
            || message.contains("replacement transaction underpriced")
            || message.contains("transaction underpriced")
            || message.contains("gas price too low")
            || message.contains("fee too low")
            || message.contains("less than block base fee")
        {
            FailureKind::FeeTooLow
        } else if message.contains("insufficient funds") {
            FailureKind::InsufficientFunds
        } else if message.contains("intrinsic gas") {
            FailureKind::IntrinsicGasTooLow
        } else if error.is_transport()
            || matches!(error, RpcError::AllEndpointsUnavailable { .. })
            || matches!(error, RpcError::Rejected { code, .. } if *code == SERVER_ERROR_CODE)
            || message.contains("could not coalesce")
            || message.contains("timeout")
            || message.contains("rate limit")
        {
            FailureKind::TransientRpcError
        } else {
            FailureKind::Unknown
        }
    }

    /// Failures that no amount of retrying can fix
    pub fn is_permanent(&self) -> bool {
        matches!(self, FailureKind::InsufficientFunds)
    }
}

/// Terminal reason a transfer intent was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("transaction failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error("insufficient funds (need {required}), balance unreadable: {read_error}")]
    InsufficientFundsUnverified { required: U256, read_error: String },

    #[error("endpoints unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

/// Planning-time exclusion of a signer (not an error)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("sender and destination are the same account")]
    SelfTransfer,

    #[error("balance {balance} too small after reserving {reserve} for fees")]
    DustBalance { balance: U256, reserve: U256 },

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("native balance {available} cannot cover gas reserve {required}")]
    InsufficientGas { required: U256, available: U256 },

    #[error("could not read account state: {0}")]
    ReadFailed(String),
}

/// Errors that abort planning as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("no endpoint could serve planning reads: {0}")]
    EndpointsUnavailable(RpcError),

    #[error("no destination addresses provided")]
    NoDestinations,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(message: &str) -> RpcError {
        RpcError::Rejected {
            code: -32003,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_node_messages() {
        assert_eq!(
            FailureKind::classify(&rejected("nonce too low: next nonce 7, tx nonce 6")),
            FailureKind::NonceTooLow
        );
        assert_eq!(
            FailureKind::classify(&rejected("replacement transaction underpriced")),
            FailureKind::FeeTooLow
        );
        assert_eq!(
            FailureKind::classify(&rejected("transaction underpriced")),
            FailureKind::FeeTooLow
        );
        assert_eq!(
            FailureKind::classify(&rejected(
                "insufficient funds for gas * price + value"
            )),
            FailureKind::InsufficientFunds
        );
        assert_eq!(
            FailureKind::classify(&rejected("intrinsic gas too low")),
            FailureKind::IntrinsicGasTooLow
        );
        assert_eq!(
            FailureKind::classify(&rejected("already known")),
            FailureKind::AlreadyKnown
        );
        assert_eq!(
            FailureKind::classify(&rejected("execution reverted")),
            FailureKind::Unknown
        );
    }

    #[test]
    fn test_classify_transient_errors() {
        assert_eq!(
            FailureKind::classify(&RpcError::Transport("connection reset".to_string())),
            FailureKind::TransientRpcError
        );
        assert_eq!(
            FailureKind::classify(&RpcError::Rejected {
                code: SERVER_ERROR_CODE,
                message: "header not found".to_string(),
            }),
            FailureKind::TransientRpcError
        );
        assert_eq!(
            FailureKind::classify(&RpcError::AllEndpointsUnavailable {
                operation: "send_raw_transaction",
                attempts: 2,
                last_error: "503".to_string(),
            }),
            FailureKind::TransientRpcError
        );
    }

    #[test]
    fn test_server_error_code_does_not_mask_specific_messages() {
        // geth reports nonce and fee problems under -32000 as well
        let error = RpcError::Rejected {
            code: SERVER_ERROR_CODE,
            message: "nonce too low".to_string(),
        };
        assert_eq!(FailureKind::classify(&error), FailureKind::NonceTooLow);
    }

    #[test]
    fn test_only_insufficient_funds_is_permanent() {
        assert!(FailureKind::InsufficientFunds.is_permanent());
        assert!(!FailureKind::FeeTooLow.is_permanent());
        assert!(!FailureKind::Unknown.is_permanent());
    }
}
