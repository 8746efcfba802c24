use crate::config::CoordinatorConfig;
use crate::domain::account::{AccountId, BankAccount};
use crate::domain::pix_key::{KeyDescriptor, PixKey, PixKeyKind, RemoteKeyRecord};
use crate::domain::ports::{
    AccountAuthorizerBox, BankAccountLookupBox, Diagnostic, DiagnosticsSinkRef,
    DirectoryClientBox, LocalKeyStoreBox, Stage,
};
use crate::error::{DirectoryError, RegistrationError, Result, StoreError};
use crate::infrastructure::authorization::TrustUpstreamGate;
use crate::infrastructure::diagnostics::{TracingDiagnostics, panic_payload};
use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

/// What the directory said about a key before we decided how to claim it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    Existing(RemoteKeyRecord),
    Absent,
}

/// Per-call state threaded through the protocol stages.
#[derive(Debug, Clone, Copy)]
struct Call {
    request_id: Uuid,
}

impl Call {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
        }
    }
}

/// Creates pix keys consistently across the remote directory and the local
/// mirror.
///
/// The directory is always written before the local store, so an interrupted
/// call can leave a remote-only registration but never a local record without
/// a remote one. The local store's uniqueness constraint is the authoritative
/// de-duplication point; `exists` checks only save wasted remote calls.
///
/// All collaborators are shared handles, so one coordinator can serve many
/// concurrent calls (wrap it in an `Arc`).
pub struct PixKeyRegistrationCoordinator {
    accounts: BankAccountLookupBox,
    directory: DirectoryClientBox,
    keys: LocalKeyStoreBox,
    authorizer: AccountAuthorizerBox,
    diagnostics: DiagnosticsSinkRef,
    config: CoordinatorConfig,
}

impl PixKeyRegistrationCoordinator {
    /// Creates a coordinator with the default configuration, tracing
    /// diagnostics and an authorizer that trusts the upstream gate.
    pub fn new(
        accounts: BankAccountLookupBox,
        directory: DirectoryClientBox,
        keys: LocalKeyStoreBox,
    ) -> Self {
        Self {
            accounts,
            directory,
            keys,
            authorizer: Box::new(TrustUpstreamGate),
            diagnostics: Arc::new(TracingDiagnostics),
            config: CoordinatorConfig::default(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: AccountAuthorizerBox) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsSinkRef) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Claims `descriptor` for `account_id`.
    ///
    /// Adopts the directory's record when the key is already registered
    /// there for this account, otherwise registers it first. Either way the
    /// key is then inserted into the local store.
    pub async fn create_key(
        &self,
        account_id: AccountId,
        descriptor: KeyDescriptor,
    ) -> Result<PixKey> {
        let call = Call::new();
        let span = info_span!(
            "create_key",
            request_id = %call.request_id,
            account = %account_id,
            kind = %descriptor.kind()
        );

        self.run_create(call, account_id, &descriptor)
            .instrument(span)
            .await
    }

    /// Validates raw request fields, then runs `create_key`.
    pub async fn create_key_raw(
        &self,
        account_id: AccountId,
        key: &str,
        kind: &str,
    ) -> Result<PixKey> {
        let kind: PixKeyKind = kind.parse()?;
        let descriptor = KeyDescriptor::new(key, kind)?;
        self.create_key(account_id, descriptor).await
    }

    /// Returns the locally mirrored keys of an account.
    pub async fn list_keys(&self, account_id: AccountId) -> Result<Vec<PixKey>> {
        let call = Call::new();
        let account = self.resolve_account(call, account_id).await?;
        self.keys
            .list_for_account(account.id)
            .await
            .map_err(|e| self.storage_failure(call, Stage::ListKeys, e))
    }

    async fn run_create(
        &self,
        call: Call,
        account_id: AccountId,
        descriptor: &KeyDescriptor,
    ) -> Result<PixKey> {
        let account = self.resolve_account(call, account_id).await?;
        if !account.accepts_new_keys() {
            return Err(RegistrationError::AccountLocked(account.id));
        }
        self.authorize(call, &account).await?;

        let pix_key = match self.lookup_remote(call, descriptor).await? {
            RemoteLookup::Existing(record) => self.adopt_remote(call, &account, record).await?,
            RemoteLookup::Absent => self.register_remote(call, &account, descriptor).await?,
        };

        info!(key_id = %pix_key.id, "pix key created");
        Ok(pix_key)
    }

    async fn resolve_account(&self, call: Call, account_id: AccountId) -> Result<BankAccount> {
        match self.accounts.resolve(account_id).await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(RegistrationError::AccountNotFound(account_id)),
            Err(e) => Err(self.storage_failure(call, Stage::ResolveAccount, e)),
        }
    }

    async fn authorize(&self, call: Call, account: &BankAccount) -> Result<()> {
        self.authorizer.authorize(account).await.map_err(|e| {
            self.report(call, Stage::Authorize, e);
            RegistrationError::Unauthorized(account.id)
        })
    }

    async fn lookup_remote(&self, call: Call, descriptor: &KeyDescriptor) -> Result<RemoteLookup> {
        match self.bounded(self.directory.find(descriptor)).await {
            Ok(Some(record)) => Ok(RemoteLookup::Existing(record)),
            Ok(None) => Ok(RemoteLookup::Absent),
            Err(e) => Err(self.directory_failure(call, Stage::LookupRemote, e)),
        }
    }

    async fn adopt_remote(
        &self,
        call: Call,
        account: &BankAccount,
        record: RemoteKeyRecord,
    ) -> Result<PixKey> {
        if self.key_exists(call, &record.key).await? {
            return Err(RegistrationError::KeyAlreadyOwnedLocally { key: record.key });
        }
        if record.account_id != account.id {
            self.report(
                call,
                Stage::LookupRemote,
                format_args!(
                    "directory record {} belongs to account {}",
                    record.id, record.account_id
                ),
            );
            return Err(RegistrationError::RemoteRegistrationConflict { key: record.key });
        }
        debug!(remote_id = %record.id, "adopting existing directory record");
        self.claim_locally(call, PixKey::from_remote(&record, account.id))
            .await
    }

    async fn register_remote(
        &self,
        call: Call,
        account: &BankAccount,
        descriptor: &KeyDescriptor,
    ) -> Result<PixKey> {
        if self.key_exists(call, descriptor.key()).await? {
            return Err(RegistrationError::KeyAlreadyOwnedLocally {
                key: descriptor.key().to_string(),
            });
        }

        let record = match self
            .bounded(self.directory.register(descriptor, account.id))
            .await
        {
            Ok(record) => record,
            Err(DirectoryError::AlreadyExists) => {
                self.report(call, Stage::RegisterRemote, DirectoryError::AlreadyExists);
                return Err(RegistrationError::RemoteRegistrationConflict {
                    key: descriptor.key().to_string(),
                });
            }
            Err(e) => return Err(self.directory_failure(call, Stage::RegisterRemote, e)),
        };
        debug!(remote_id = %record.id, "registered key in directory");

        let remote_id = record.id.clone();
        self.claim_locally(call, PixKey::from_remote(&record, account.id))
            .await
            .inspect_err(|_| {
                self.report(
                    call,
                    Stage::ClaimLocally,
                    format_args!("directory record {remote_id} left without a local record"),
                );
            })
    }

    async fn claim_locally(&self, call: Call, pix_key: PixKey) -> Result<PixKey> {
        let key = pix_key.key.clone();
        match self.keys.insert(pix_key).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::UniqueConstraintViolation(_)) => {
                debug!("lost insert race on unique key constraint");
                Err(RegistrationError::KeyAlreadyOwnedLocally { key })
            }
            Err(e) => Err(self.storage_failure(call, Stage::ClaimLocally, e)),
        }
    }

    async fn key_exists(&self, call: Call, key: &str) -> Result<bool> {
        self.keys
            .exists(key)
            .await
            .map_err(|e| self.storage_failure(call, Stage::ClaimLocally, e))
    }

    /// Runs a directory call under the configured timeout, turning expiry
    /// and adapter panics into classified errors.
    async fn bounded<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, DirectoryError>>,
    ) -> std::result::Result<T, DirectoryError> {
        let guarded = AssertUnwindSafe(request).catch_unwind();
        match tokio::time::timeout(self.config.directory_timeout, guarded).await {
            Err(_) => Err(DirectoryError::Timeout),
            Ok(Err(panic)) => Err(DirectoryError::Unknown(panic_message(&*panic))),
            Ok(Ok(result)) => result,
        }
    }

    fn directory_failure(&self, call: Call, stage: Stage, e: DirectoryError) -> RegistrationError {
        let error = match e {
            DirectoryError::Timeout | DirectoryError::Unavailable(_) => {
                RegistrationError::DirectoryUnavailable
            }
            DirectoryError::AlreadyExists | DirectoryError::Unknown(_) => {
                RegistrationError::DirectoryUnknownError
            }
        };
        self.report(call, stage, e);
        error
    }

    fn storage_failure(&self, call: Call, stage: Stage, e: StoreError) -> RegistrationError {
        self.report(call, stage, e);
        RegistrationError::StorageUnavailable
    }

    fn report(&self, call: Call, stage: Stage, detail: impl Display) {
        self.diagnostics.record(Diagnostic {
            request_id: call.request_id,
            stage,
            detail: detail.to_string(),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    match panic_payload(payload) {
        Some(text) => format!("directory client panicked: {text}"),
        None => "directory client panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{LocalKeyStore, RemoteDirectoryClient};
    use crate::infrastructure::in_memory::{
        InMemoryBankAccounts, InMemoryDiagnostics, InMemoryDirectory, InMemoryPixKeyStore,
    };
    use crate::infrastructure::rpc::{RpcCode, RpcStatus};
    use std::time::Duration;

    struct Fixture {
        accounts: InMemoryBankAccounts,
        directory: InMemoryDirectory,
        keys: InMemoryPixKeyStore,
        diagnostics: Arc<InMemoryDiagnostics>,
        account: AccountId,
    }

    impl Fixture {
        fn new() -> Self {
            let account = AccountId::new();
            let accounts = InMemoryBankAccounts::new();
            accounts.add(BankAccount::new(account));
            Self {
                accounts,
                directory: InMemoryDirectory::new(),
                keys: InMemoryPixKeyStore::new(),
                diagnostics: Arc::new(InMemoryDiagnostics::new()),
                account,
            }
        }

        fn coordinator(&self) -> PixKeyRegistrationCoordinator {
            PixKeyRegistrationCoordinator::new(
                Box::new(self.accounts.clone()),
                Box::new(self.directory.clone()),
                Box::new(self.keys.clone()),
            )
            .with_diagnostics(self.diagnostics.clone())
            .with_config(
                CoordinatorConfig::default().with_directory_timeout(Duration::from_millis(200)),
            )
        }
    }

    fn email(key: &str) -> KeyDescriptor {
        KeyDescriptor::new(key, PixKeyKind::Email).unwrap()
    }

    #[tokio::test]
    async fn test_register_path_creates_remote_then_local() {
        let f = Fixture::new();
        let coordinator = f.coordinator();

        let created = coordinator
            .create_key(f.account, email("ana@example.com"))
            .await
            .unwrap();

        assert_eq!(created.account_id, f.account);
        assert_eq!(created.kind, PixKeyKind::Email);
        let remote = f.directory.find(&email("ana@example.com")).await.unwrap();
        assert_eq!(remote.map(|r| r.id), Some(created.id.clone()));
        assert!(f.keys.exists("ana@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_adopt_path_uses_remote_kind_and_id() {
        let f = Fixture::new();
        let record = f
            .directory
            .register(&email("bia@example.com"), f.account)
            .await
            .unwrap();

        let created = f
            .coordinator()
            .create_key(f.account, email("bia@example.com"))
            .await
            .unwrap();

        assert_eq!(created.id, record.id);
        assert_eq!(created.kind, record.kind);
        assert_eq!(f.directory.registrations().await, 1);
    }

    #[tokio::test]
    async fn test_second_call_observes_local_conflict() {
        let f = Fixture::new();
        let coordinator = f.coordinator();
        coordinator
            .create_key(f.account, email("caio@example.com"))
            .await
            .unwrap();

        let err = coordinator
            .create_key(f.account, email("caio@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::KeyAlreadyOwnedLocally { .. }));
        assert_eq!(f.keys.list_for_account(f.account).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_locked_account_is_rejected_before_directory() {
        let f = Fixture::new();
        let locked = AccountId::new();
        f.accounts.add(BankAccount::locked(locked));

        let err = f
            .coordinator()
            .create_key(locked, email("dora@example.com"))
            .await
            .unwrap_err();

        assert_eq!(err, RegistrationError::AccountLocked(locked));
        assert_eq!(f.directory.registrations().await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_directory_is_not_treated_as_absent() {
        let f = Fixture::new();
        f.directory
            .inject_fault(RpcStatus::new(RpcCode::Unavailable, "connection refused 10.0.0.7:50051"))
            .await;

        let err = f
            .coordinator()
            .create_key(f.account, email("edu@example.com"))
            .await
            .unwrap_err();

        assert_eq!(err, RegistrationError::DirectoryUnavailable);
        assert!(!err.to_string().contains("10.0.0.7"));
        assert!(!f.keys.exists("edu@example.com").await.unwrap());
        let recorded = f.diagnostics.take();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].stage, Stage::LookupRemote);
        assert!(recorded[0].detail.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_slow_directory_times_out() {
        let f = Fixture::new();
        let directory = f.directory.clone().with_latency(Duration::from_secs(2));
        let coordinator = PixKeyRegistrationCoordinator::new(
            Box::new(f.accounts.clone()),
            Box::new(directory),
            Box::new(f.keys.clone()),
        )
        .with_config(CoordinatorConfig::default().with_directory_timeout(Duration::from_millis(20)));

        let err = coordinator
            .create_key(f.account, email("flor@example.com"))
            .await
            .unwrap_err();

        assert_eq!(err, RegistrationError::DirectoryUnavailable);
    }

    #[tokio::test]
    async fn test_list_keys_for_account() {
        let f = Fixture::new();
        let coordinator = f.coordinator();
        coordinator
            .create_key(f.account, email("gil@example.com"))
            .await
            .unwrap();
        coordinator
            .create_key_raw(f.account, "+5511912345678", "phone")
            .await
            .unwrap();

        let keys = coordinator.list_keys(f.account).await.unwrap();
        assert_eq!(keys.len(), 2);

        let missing = AccountId::new();
        assert_eq!(
            coordinator.list_keys(missing).await.unwrap_err(),
            RegistrationError::AccountNotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_raw_request_validation() {
        let f = Fixture::new();
        let err = f
            .coordinator()
            .create_key_raw(f.account, "not an email", "email")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_descriptor");
        assert_eq!(f.directory.registrations().await, 0);
    }
}
