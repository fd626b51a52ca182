use crate::error::RegistryError;
use crate::registry::{OwnershipRegistry, RegistryEvent, Transfer};
use landgrid_common::{AccountId, TokenId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, cloneable access to one [`OwnershipRegistry`].
///
/// Mutations hold the write lock for the whole operation, so callers on any
/// thread see one total order of complete operations and never a half-applied
/// one. Queries hold the read lock and run concurrently with each other.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<RwLock<OwnershipRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: OwnershipRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run a read-only closure against the registry.
    pub fn read<R>(&self, f: impl FnOnce(&OwnershipRegistry) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a closure with exclusive access, e.g. to drain events for
    /// persistence together with the state they describe.
    pub fn write<R>(&self, f: impl FnOnce(&mut OwnershipRegistry) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn owner(&self) -> AccountId {
        self.inner.read().owner()
    }

    pub fn create(&self, caller: AccountId, token_id: TokenId) -> Result<Transfer, RegistryError> {
        self.inner.write().create(caller, token_id)
    }

    pub fn create_and_transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        token_id: TokenId,
    ) -> Result<Transfer, RegistryError> {
        self.inner.write().create_and_transfer(caller, to, token_id)
    }

    pub fn transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        token_id: TokenId,
    ) -> Result<Transfer, RegistryError> {
        self.inner.write().transfer(caller, to, token_id)
    }

    pub fn expropriate(&self, caller: AccountId, token_id: TokenId) -> Result<Transfer, RegistryError> {
        self.inner.write().expropriate(caller, token_id)
    }

    pub fn approve(
        &self,
        caller: AccountId,
        approved: Option<AccountId>,
        token_id: TokenId,
    ) -> Result<RegistryEvent, RegistryError> {
        self.inner.write().approve(caller, approved, token_id)
    }

    pub fn set_approval_for_all(
        &self,
        caller: AccountId,
        operator: AccountId,
        approved: bool,
    ) -> Result<RegistryEvent, RegistryError> {
        self.inner.write().set_approval_for_all(caller, operator, approved)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<AccountId, RegistryError> {
        self.inner.read().owner_of(token_id)
    }

    pub fn balance_of(&self, account: AccountId) -> u64 {
        self.inner.read().balance_of(account)
    }

    pub fn exists(&self, token_id: TokenId) -> bool {
        self.inner.read().exists(token_id)
    }

    pub fn total_supply(&self) -> u64 {
        self.inner.read().total_supply()
    }
}
