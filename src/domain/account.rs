use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a bank account that may own pix keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Locked,
}

/// A bank account as seen by the registration flow.
///
/// Pix keys hold a non-owning reference to it through `AccountId`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct BankAccount {
    #[serde(rename = "account")]
    pub id: AccountId,
    #[serde(default)]
    pub status: AccountStatus,
}

impl BankAccount {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            status: AccountStatus::Active,
        }
    }

    pub fn locked(id: AccountId) -> Self {
        Self {
            id,
            status: AccountStatus::Locked,
        }
    }

    /// Whether new keys may be bound to this account
    pub fn accepts_new_keys(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
