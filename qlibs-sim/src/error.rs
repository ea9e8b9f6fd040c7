use qlibs_core::error::{FisError, SetupError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Fis(#[from] FisError),
    #[error("plant order {0} is not supported (expected 1..=8)")]
    UnsupportedOrder(usize),
    #[error("invalid simulation setting: {0}")]
    InvalidConfig(&'static str),
}
