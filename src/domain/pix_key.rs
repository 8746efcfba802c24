use super::account::AccountId;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PixKeyKind {
    /// CPF or CNPJ
    Document,
    Email,
    Phone,
    RandomToken,
}

impl PixKeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::RandomToken => "random-token",
        }
    }
}

impl fmt::Display for PixKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixKeyKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "document" => Ok(Self::Document),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "random-token" => Ok(Self::RandomToken),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// A validated request to claim a key of a given kind.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeyDescriptor {
    key: String,
    kind: PixKeyKind,
}

impl KeyDescriptor {
    /// Trims `key` and checks it is well-formed for `kind`.
    pub fn new(key: impl AsRef<str>, kind: PixKeyKind) -> Result<Self, ValidationError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        let valid = match kind {
            PixKeyKind::Document => {
                matches!(key.len(), 11 | 14) && key.bytes().all(|b| b.is_ascii_digit())
            }
            PixKeyKind::Email => is_email(key),
            PixKeyKind::Phone => key.strip_prefix('+').is_some_and(|digits| {
                (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
            }),
            PixKeyKind::RandomToken => Uuid::parse_str(key).is_ok(),
        };
        if !valid {
            return Err(ValidationError::Malformed(key.to_string(), kind.as_str()));
        }
        Ok(Self {
            key: key.to_string(),
            kind,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> PixKeyKind {
        self.kind
    }
}

fn is_email(key: &str) -> bool {
    match key.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// The directory's view of a registered key. Fetched transiently, never
/// persisted as-is.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct RemoteKeyRecord {
    /// Identifier assigned by the directory
    pub id: String,
    pub key: String,
    pub kind: PixKeyKind,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

/// Local mirror of a key owned by one of our accounts.
///
/// The id is the directory-assigned id, so every local record points at its
/// remote registration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct PixKey {
    pub id: String,
    pub key: String,
    pub kind: PixKeyKind,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl PixKey {
    /// Links a remote registration to `account_id`, taking the remote kind.
    pub fn from_remote(record: &RemoteKeyRecord, account_id: AccountId) -> Self {
        Self {
            id: record.id.clone(),
            key: record.key.clone(),
            kind: record.kind,
            account_id,
            created_at: Utc::now(),
        }
    }
}
