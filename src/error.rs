use stakeflow::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("interrupted")]
    Cancelled,
}
