use mvsw_smi::SmiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounded register poll ran out of iterations.
    #[error("management bus timeout")]
    Timeout,
    /// A VLAN id, slot or port index outside the valid range.
    #[error("argument out of range")]
    InvalidArgument,
    /// Apply attempted before the device was attached to its host.
    #[error("switch not attached")]
    NotReady,
}

impl From<SmiError> for Error {
    fn from(err: SmiError) -> Self {
        match err {
            SmiError::Timeout => Error::Timeout,
        }
    }
}
