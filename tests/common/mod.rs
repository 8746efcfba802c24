#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use pixkeys::PixKeyRegistrationCoordinator;
use pixkeys::config::CoordinatorConfig;
use pixkeys::domain::account::{AccountId, BankAccount};
use pixkeys::domain::pix_key::{KeyDescriptor, PixKey, PixKeyKind, RemoteKeyRecord};
use pixkeys::domain::ports::{LocalKeyStore, RemoteDirectoryClient};
use pixkeys::error::{DirectoryError, StoreError};
use pixkeys::infrastructure::in_memory::{
    InMemoryBankAccounts, InMemoryDiagnostics, InMemoryPixKeyStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// How a `ScriptedDirectory` answers `find`.
#[derive(Clone)]
pub enum FindScript {
    Absent,
    Existing(RemoteKeyRecord),
    Fail(DirectoryError),
    Hang,
    Panic(&'static str),
}

/// How a `ScriptedDirectory` answers `register`.
#[derive(Clone)]
pub enum RegisterScript {
    Accept,
    Fail(DirectoryError),
    Hang,
}

#[derive(Default)]
pub struct Calls {
    find: AtomicUsize,
    register: AtomicUsize,
}

/// Directory stub with fixed answers and call counters shared by its clones.
#[derive(Clone)]
pub struct ScriptedDirectory {
    find: FindScript,
    register: RegisterScript,
    delay: Option<Duration>,
    calls: Arc<Calls>,
}

impl ScriptedDirectory {
    pub fn new(find: FindScript, register: RegisterScript) -> Self {
        Self {
            find,
            register,
            delay: None,
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn find_calls(&self) -> usize {
        self.calls.find.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.calls.register.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDirectoryClient for ScriptedDirectory {
    async fn find(
        &self,
        _descriptor: &KeyDescriptor,
    ) -> Result<Option<RemoteKeyRecord>, DirectoryError> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.find {
            FindScript::Absent => Ok(None),
            FindScript::Existing(record) => Ok(Some(record.clone())),
            FindScript::Fail(e) => Err(e.clone()),
            FindScript::Hang => std::future::pending().await,
            FindScript::Panic(message) => panic!("{}", message),
        }
    }

    async fn register(
        &self,
        descriptor: &KeyDescriptor,
        account_id: AccountId,
    ) -> Result<RemoteKeyRecord, DirectoryError> {
        self.calls.register.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.register {
            RegisterScript::Accept => Ok(remote_record(
                descriptor.key(),
                descriptor.kind(),
                account_id,
            )),
            RegisterScript::Fail(e) => Err(e.clone()),
            RegisterScript::Hang => std::future::pending().await,
        }
    }
}

/// Key store whose backend is always down.
pub struct BrokenKeyStore;

#[async_trait]
impl LocalKeyStore for BrokenKeyStore {
    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("connection reset by peer 10.1.2.3:5432".into()))
    }

    async fn insert(&self, _pix_key: PixKey) -> Result<PixKey, StoreError> {
        Err(StoreError::Backend("connection reset by peer 10.1.2.3:5432".into()))
    }

    async fn list_for_account(&self, _account_id: AccountId) -> Result<Vec<PixKey>, StoreError> {
        Err(StoreError::Backend("connection reset by peer 10.1.2.3:5432".into()))
    }
}

pub fn remote_record(key: &str, kind: PixKeyKind, account_id: AccountId) -> RemoteKeyRecord {
    RemoteKeyRecord {
        id: Uuid::new_v4().to_string(),
        key: key.to_string(),
        kind,
        account_id,
        created_at: Utc::now(),
    }
}

pub fn email(key: &str) -> KeyDescriptor {
    KeyDescriptor::new(key, PixKeyKind::Email).unwrap()
}

/// Accounts, local store and diagnostics wired around a directory stub.
pub struct Harness {
    pub account: AccountId,
    pub accounts: InMemoryBankAccounts,
    pub keys: InMemoryPixKeyStore,
    pub diagnostics: Arc<InMemoryDiagnostics>,
}

impl Harness {
    pub fn new() -> Self {
        let account = AccountId::new();
        Self {
            account,
            accounts: InMemoryBankAccounts::with_accounts([BankAccount::new(account)]),
            keys: InMemoryPixKeyStore::new(),
            diagnostics: Arc::new(InMemoryDiagnostics::new()),
        }
    }

    pub fn coordinator(
        &self,
        directory: impl RemoteDirectoryClient + 'static,
    ) -> PixKeyRegistrationCoordinator {
        PixKeyRegistrationCoordinator::new(
            Box::new(self.accounts.clone()),
            Box::new(directory),
            Box::new(self.keys.clone()),
        )
        .with_diagnostics(self.diagnostics.clone())
        .with_config(CoordinatorConfig::default().with_directory_timeout(Duration::from_millis(100)))
    }
}
