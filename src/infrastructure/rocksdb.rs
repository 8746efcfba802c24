use crate::domain::account::{AccountId, BankAccount};
use crate::domain::pix_key::PixKey;
use crate::domain::ports::{BankAccountLookup, LocalKeyStore};
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Column Family for the local pix key mirror, keyed by key value.
pub const CF_PIX_KEYS: &str = "pix_keys";
/// Column Family for bank accounts, keyed by account id.
pub const CF_BANK_ACCOUNTS: &str = "bank_accounts";

/// A persistent store implementation using RocksDB.
///
/// Serves both `LocalKeyStore` and `BankAccountLookup` from separate Column
/// Families. Key inserts go through a write mutex so the existence check and
/// the put form one atomic step, which is what enforces uniqueness on key
/// value.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("pix_keys" and
    /// "bank_accounts") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_keys = ColumnFamilyDescriptor::new(CF_PIX_KEYS, Options::default());
        let cf_accounts = ColumnFamilyDescriptor::new(CF_BANK_ACCOUNTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_keys, cf_accounts])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Adds or replaces a bank account.
    pub fn put_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let cf = self.cf(CF_BANK_ACCOUNTS)?;
        self.db
            .put_cf(cf, account.id.as_uuid().as_bytes(), encode(account)?)?;
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("{} column family not found", name)))
    }

    fn insert_unique(&self, pix_key: &PixKey) -> Result<(), StoreError> {
        let cf = self.cf(CF_PIX_KEYS)?;
        let value = encode(pix_key)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.db.get_pinned_cf(cf, pix_key.key.as_bytes())?.is_some() {
            return Err(StoreError::UniqueConstraintViolation(pix_key.key.clone()));
        }
        self.db.put_cf(cf, pix_key.key.as_bytes(), value)?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Backend(format!("Serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Backend(format!("Deserialization error: {}", e)))
}

#[async_trait]
impl LocalKeyStore for RocksDBStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let cf = self.cf(CF_PIX_KEYS)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }

    async fn insert(&self, pix_key: PixKey) -> Result<PixKey, StoreError> {
        self.insert_unique(&pix_key)?;
        Ok(pix_key)
    }

    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<PixKey>, StoreError> {
        let cf = self.cf(CF_PIX_KEYS)?;
        let mut owned = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) =
                item.map_err(|e| StoreError::Backend(format!("RocksDB iteration error: {}", e)))?;
            let pix_key: PixKey = decode(&value)?;
            if pix_key.account_id == account_id {
                owned.push(pix_key);
            }
        }
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }
}

#[async_trait]
impl BankAccountLookup for RocksDBStore {
    async fn resolve(&self, account_id: AccountId) -> Result<Option<BankAccount>, StoreError> {
        let cf = self.cf(CF_BANK_ACCOUNTS)?;
        match self.db.get_cf(cf, account_id.as_uuid().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}
