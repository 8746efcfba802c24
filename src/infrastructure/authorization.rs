use crate::domain::account::{AccountId, BankAccount};
use crate::domain::ports::AccountAuthorizer;
use crate::error::AuthorizationError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Authorizer for deployments where caller ownership of the account is
/// proven by an upstream gate before the coordinator is reached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustUpstreamGate;

#[async_trait]
impl AccountAuthorizer for TrustUpstreamGate {
    async fn authorize(&self, _account: &BankAccount) -> Result<(), AuthorizationError> {
        Ok(())
    }
}

/// Permits only a fixed set of accounts, e.g. those a session was issued for.
#[derive(Debug, Default, Clone)]
pub struct AccountAllowList {
    allowed: HashSet<AccountId>,
}

impl AccountAllowList {
    pub fn new(allowed: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AccountAuthorizer for AccountAllowList {
    async fn authorize(&self, account: &BankAccount) -> Result<(), AuthorizationError> {
        if self.allowed.contains(&account.id) {
            Ok(())
        } else {
            Err(AuthorizationError(format!(
                "account {} is not in the caller's allow list",
                account.id
            )))
        }
    }
}
