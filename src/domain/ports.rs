use super::account::{AccountId, BankAccount};
use super::pix_key::{KeyDescriptor, PixKey, RemoteKeyRecord};
use crate::error::{AuthorizationError, DirectoryError, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Client for the authoritative key directory.
#[async_trait]
pub trait RemoteDirectoryClient: Send + Sync {
    /// Looks a key up. `Ok(None)` is the directory's "not found" answer and is
    /// the only outcome that allows a fresh registration.
    async fn find(
        &self,
        descriptor: &KeyDescriptor,
    ) -> Result<Option<RemoteKeyRecord>, DirectoryError>;

    /// Registers a key for `account_id`. A key registered meanwhile by someone
    /// else yields `DirectoryError::AlreadyExists`.
    async fn register(
        &self,
        descriptor: &KeyDescriptor,
        account_id: AccountId,
    ) -> Result<RemoteKeyRecord, DirectoryError>;
}

/// Local mirror of owned keys, unique on key value.
#[async_trait]
pub trait LocalKeyStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    /// Fails with `StoreError::UniqueConstraintViolation` if the key is taken.
    async fn insert(&self, pix_key: PixKey) -> Result<PixKey, StoreError>;
    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<PixKey>, StoreError>;
}

#[async_trait]
pub trait BankAccountLookup: Send + Sync {
    async fn resolve(&self, account_id: AccountId) -> Result<Option<BankAccount>, StoreError>;
}

/// Proves the caller controls an account before anything is written on its
/// behalf.
#[async_trait]
pub trait AccountAuthorizer: Send + Sync {
    async fn authorize(&self, account: &BankAccount) -> Result<(), AuthorizationError>;
}

/// Coordinator stage a diagnostic was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveAccount,
    Authorize,
    LookupRemote,
    RegisterRemote,
    ClaimLocally,
    ListKeys,
}

/// Internal detail captured while serving one coordinator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub request_id: Uuid,
    pub stage: Stage,
    pub detail: String,
}

/// Receives internal diagnostics. Nothing recorded here is returned to the
/// caller.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

pub type DirectoryClientBox = Box<dyn RemoteDirectoryClient>;
pub type LocalKeyStoreBox = Box<dyn LocalKeyStore>;
pub type BankAccountLookupBox = Box<dyn BankAccountLookup>;
pub type AccountAuthorizerBox = Box<dyn AccountAuthorizer>;
pub type DiagnosticsSinkRef = Arc<dyn DiagnosticsSink>;
