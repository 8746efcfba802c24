use crate::domain::account::AccountId;
use thiserror::Error;

/// Errors returned to callers of the registration coordinator.
///
/// Messages are fixed strings built only from caller-supplied values. Raw
/// directory or storage diagnostics never appear here; they go to the
/// coordinator's diagnostics sink instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Bank account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Bank account {0} is locked")]
    AccountLocked(AccountId),
    #[error("Caller is not allowed to act on bank account {0}")]
    Unauthorized(AccountId),
    #[error("Invalid pix key: {0}")]
    InvalidDescriptor(#[from] ValidationError),
    #[error("Pix key directory is unavailable")]
    DirectoryUnavailable,
    #[error("Pix key directory returned an unexpected error")]
    DirectoryUnknownError,
    #[error("Pix key {key} already exists")]
    KeyAlreadyOwnedLocally { key: String },
    #[error("Pix key {key} is already registered in the directory")]
    RemoteRegistrationConflict { key: String },
    #[error("Local key storage is unavailable")]
    StorageUnavailable,
}

impl RegistrationError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::AccountLocked(_) => "account_locked",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidDescriptor(_) => "invalid_descriptor",
            Self::DirectoryUnavailable => "directory_unavailable",
            Self::DirectoryUnknownError => "directory_unknown_error",
            Self::KeyAlreadyOwnedLocally { .. } => "key_already_owned_locally",
            Self::RemoteRegistrationConflict { .. } => "remote_registration_conflict",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }

    /// Transient failures the caller may retry with backoff. Conflicts and
    /// caller errors need a different request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable | Self::DirectoryUnknownError | Self::StorageUnavailable
        )
    }
}

/// Classified failure of a call to the remote key directory.
///
/// "Key not found" is deliberately absent: `find` reports it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory call timed out")]
    Timeout,
    #[error("directory unreachable: {0}")]
    Unavailable(String),
    #[error("key already registered in directory")]
    AlreadyExists,
    #[error("unclassified directory failure: {0}")]
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated for key {0}")]
    UniqueConstraintViolation(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("key must not be empty")]
    EmptyKey,
    #[error("{0} is not a valid {1} key")]
    Malformed(String, &'static str),
    #[error("unknown key kind {0}")]
    UnknownKind(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("authorization denied: {0}")]
pub struct AuthorizationError(pub String);

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegistrationError>;
