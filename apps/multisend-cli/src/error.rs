use multisend_batch_tx::TxBatchError;
use multisend_inputs::InputError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Batch error: {0}")]
    Batch(#[from] TxBatchError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{failed} of {total} transfers failed")]
    BatchIncomplete { failed: usize, total: usize },
}
