use super::rpc::{self, NO_KEY_FOUND, RpcCode, RpcStatus};
use crate::domain::account::{AccountId, BankAccount};
use crate::domain::pix_key::{KeyDescriptor, PixKey, RemoteKeyRecord};
use crate::domain::ports::{
    BankAccountLookup, Diagnostic, DiagnosticsSink, LocalKeyStore, RemoteDirectoryClient,
};
use crate::error::{DirectoryError, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory mirror of owned pix keys.
///
/// Uses `Arc<RwLock<HashMap<String, PixKey>>>` keyed by key value. `insert`
/// checks and writes under a single write guard, which makes it the unique
/// constraint.
#[derive(Default, Clone)]
pub struct InMemoryPixKeyStore {
    keys: Arc<RwLock<HashMap<String, PixKey>>>,
}

impl InMemoryPixKeyStore {
    /// Creates a new, empty in-memory key store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

#[async_trait]
impl LocalKeyStore for InMemoryPixKeyStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let keys = self.keys.read().await;
        Ok(keys.contains_key(key))
    }

    async fn insert(&self, pix_key: PixKey) -> Result<PixKey, StoreError> {
        let mut keys = self.keys.write().await;
        if keys.contains_key(&pix_key.key) {
            return Err(StoreError::UniqueConstraintViolation(pix_key.key));
        }
        keys.insert(pix_key.key.clone(), pix_key.clone());
        Ok(pix_key)
    }

    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<PixKey>, StoreError> {
        let keys = self.keys.read().await;
        let mut owned: Vec<PixKey> = keys
            .values()
            .filter(|k| k.account_id == account_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }
}

/// In-memory bank account registry.
#[derive(Default, Clone)]
pub struct InMemoryBankAccounts {
    accounts: Arc<std::sync::RwLock<HashMap<AccountId, BankAccount>>>,
}

impl InMemoryBankAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = BankAccount>) -> Self {
        let registry = Self::new();
        for account in accounts {
            registry.add(account);
        }
        registry
    }

    pub fn add(&self, account: BankAccount) {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(account.id, account);
    }
}

#[async_trait]
impl BankAccountLookup for InMemoryBankAccounts {
    async fn resolve(&self, account_id: AccountId) -> Result<Option<BankAccount>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|e| StoreError::Backend(format!("account registry poisoned: {}", e)))?;
        Ok(accounts.get(&account_id).cloned())
    }
}

/// Simulated authoritative key directory.
///
/// Answers in the directory's RPC status model and classifies through
/// `infrastructure::rpc`, the way a networked client would. Latency and a
/// sticky fault can be injected to exercise the coordinator's failure paths.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    records: Arc<RwLock<HashMap<String, RemoteKeyRecord>>>,
    fault: Arc<RwLock<Option<RpcStatus>>>,
    latency: Option<Duration>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`. Clones share the same records.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every following call fail with `status` until cleared.
    pub async fn inject_fault(&self, status: RpcStatus) {
        *self.fault.write().await = Some(status);
    }

    pub async fn clear_fault(&self) {
        *self.fault.write().await = None;
    }

    /// Number of keys registered in the directory.
    pub async fn registrations(&self) -> usize {
        self.records.read().await.len()
    }

    async fn prelude(&self) -> Result<(), RpcStatus> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.fault.read().await.as_ref() {
            Some(status) => Err(status.clone()),
            None => Ok(()),
        }
    }

    async fn find_rpc(&self, descriptor: &KeyDescriptor) -> Result<RemoteKeyRecord, RpcStatus> {
        self.prelude().await?;
        let records = self.records.read().await;
        records
            .get(descriptor.key())
            .cloned()
            .ok_or_else(|| RpcStatus::new(RpcCode::Unknown, NO_KEY_FOUND))
    }

    async fn register_rpc(
        &self,
        descriptor: &KeyDescriptor,
        account_id: AccountId,
    ) -> Result<RemoteKeyRecord, RpcStatus> {
        self.prelude().await?;
        let mut records = self.records.write().await;
        if records.contains_key(descriptor.key()) {
            return Err(RpcStatus::new(
                RpcCode::AlreadyExists,
                format!("key {} already exists", descriptor.key()),
            ));
        }
        let record = RemoteKeyRecord {
            id: Uuid::new_v4().to_string(),
            key: descriptor.key().to_string(),
            kind: descriptor.kind(),
            account_id,
            created_at: Utc::now(),
        };
        records.insert(record.key.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl RemoteDirectoryClient for InMemoryDirectory {
    async fn find(
        &self,
        descriptor: &KeyDescriptor,
    ) -> Result<Option<RemoteKeyRecord>, DirectoryError> {
        rpc::classify_find(self.find_rpc(descriptor).await)
    }

    async fn register(
        &self,
        descriptor: &KeyDescriptor,
        account_id: AccountId,
    ) -> Result<RemoteKeyRecord, DirectoryError> {
        rpc::classify_register(self.register_rpc(descriptor, account_id).await)
    }
}

/// Collects diagnostics in memory so they can be inspected.
#[derive(Default)]
pub struct InMemoryDiagnostics {
    recorded: Mutex<Vec<Diagnostic>>,
}

impl InMemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains everything recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *recorded)
    }
}

impl DiagnosticsSink for InMemoryDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
