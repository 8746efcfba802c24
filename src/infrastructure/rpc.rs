//! Status model of the directory's RPC channel and its classification into
//! `DirectoryError`.
//!
//! Only two answers are read as "the key does not exist": a `NotFound` code,
//! or the directory's literal `no key was found` detail (which it sends with
//! whatever code its server framework picked). Everything else stays an error.

use crate::error::DirectoryError;
use std::fmt;

/// Detail string the directory uses when a lookup matches no key.
pub const NO_KEY_FOUND: &str = "no key was found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    Internal,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub details: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, details: impl Into<String>) -> Self {
        Self {
            code,
            details: details.into(),
        }
    }

    fn is_not_found(&self) -> bool {
        self.code == RpcCode::NotFound || self.details == NO_KEY_FOUND
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.details)
    }
}

impl From<RpcStatus> for DirectoryError {
    fn from(status: RpcStatus) -> Self {
        match status.code {
            RpcCode::DeadlineExceeded => DirectoryError::Timeout,
            RpcCode::Unavailable | RpcCode::Cancelled | RpcCode::ResourceExhausted => {
                DirectoryError::Unavailable(status.to_string())
            }
            RpcCode::AlreadyExists => DirectoryError::AlreadyExists,
            _ => DirectoryError::Unknown(status.to_string()),
        }
    }
}

/// Classifies the outcome of a find call. The not-found answer becomes
/// `Ok(None)`.
pub fn classify_find<T>(result: Result<T, RpcStatus>) -> Result<Option<T>, DirectoryError> {
    match result {
        Ok(record) => Ok(Some(record)),
        Err(status) if status.is_not_found() => Ok(None),
        Err(status) => Err(status.into()),
    }
}

/// Classifies the outcome of a register call. A not-found answer here is
/// meaningless and stays an unknown error.
pub fn classify_register<T>(result: Result<T, RpcStatus>) -> Result<T, DirectoryError> {
    result.map_err(DirectoryError::from)
}
