use landgrid_common::{AccountId, TokenId};

/// Reasons a registry operation is rejected. A rejected operation never
/// changes state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("token {0} already created")]
    AlreadyCreated(TokenId),
    #[error("token {0} not found")]
    NotFound(TokenId),
    #[error("account {caller} is not allowed to transfer token {token_id}")]
    NotOwner { caller: AccountId, token_id: TokenId },
    #[error("account {caller} is not the registry owner")]
    Unauthorized { caller: AccountId },
    #[error("account {0} cannot be approved for its own parcels")]
    ApproveToOwner(AccountId),
}
