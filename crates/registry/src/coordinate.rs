use crate::error::RegistryError;
use crate::handle::RegistryHandle;
use crate::registry::Transfer;
use landgrid_common::{AccountId, CoordLayout, ParcelCoord, TokenId};

/// Coordinate-addressed view of an [`OwnershipRegistry`](crate::OwnershipRegistry).
///
/// Owns no parcel state. Every call encodes `(world_id, x, y)` into a token id
/// and forwards to the referenced registry, returning its result unchanged.
#[derive(Debug, Clone)]
pub struct CoordinateRegistry {
    name: String,
    symbol: String,
    registry: RegistryHandle,
    layout: CoordLayout,
}

impl CoordinateRegistry {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, registry: RegistryHandle) -> Self {
        Self::with_layout(name, symbol, registry, CoordLayout::DEFAULT)
    }

    pub fn with_layout(
        name: impl Into<String>,
        symbol: impl Into<String>,
        registry: RegistryHandle,
        layout: CoordLayout,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            registry,
            layout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn layout(&self) -> CoordLayout {
        self.layout
    }

    /// The registry this veneer forwards to.
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn encode_token_id(&self, world_id: u64, x: i128, y: i128) -> TokenId {
        self.layout.encode(world_id, x, y)
    }

    pub fn decode_token_id(&self, token_id: TokenId) -> ParcelCoord {
        self.layout.decode(token_id)
    }

    pub fn create(
        &self,
        caller: AccountId,
        world_id: u64,
        x: i128,
        y: i128,
    ) -> Result<Transfer, RegistryError> {
        self.registry.create(caller, self.encode_token_id(world_id, x, y))
    }

    pub fn create_and_transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        world_id: u64,
        x: i128,
        y: i128,
    ) -> Result<Transfer, RegistryError> {
        self.registry
            .create_and_transfer(caller, to, self.encode_token_id(world_id, x, y))
    }

    pub fn transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        world_id: u64,
        x: i128,
        y: i128,
    ) -> Result<Transfer, RegistryError> {
        self.registry
            .transfer(caller, to, self.encode_token_id(world_id, x, y))
    }

    pub fn expropriate(
        &self,
        caller: AccountId,
        world_id: u64,
        x: i128,
        y: i128,
    ) -> Result<Transfer, RegistryError> {
        self.registry
            .expropriate(caller, self.encode_token_id(world_id, x, y))
    }

    pub fn owner_of(&self, world_id: u64, x: i128, y: i128) -> Result<AccountId, RegistryError> {
        self.registry.owner_of(self.encode_token_id(world_id, x, y))
    }

    pub fn exists(&self, world_id: u64, x: i128, y: i128) -> bool {
        self.registry.exists(self.encode_token_id(world_id, x, y))
    }

    pub fn balance_of(&self, account: AccountId) -> u64 {
        self.registry.balance_of(account)
    }
}
