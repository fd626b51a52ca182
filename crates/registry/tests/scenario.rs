//! End-to-end ownership scenario across the registry and its coordinate veneer.

use landgrid_common::{AccountId, TokenId};
use landgrid_registry::{
    CoordinateRegistry, OwnershipRegistry, RegistryConfig, RegistryError, RegistryEvent,
    RegistryHandle, Transfer,
};

const A: AccountId = AccountId::from_u128(0xa);
const B: AccountId = AccountId::from_u128(0xb);
const C: AccountId = AccountId::from_u128(0xc);
const D: AccountId = AccountId::from_u128(0xd);

fn world() -> RegistryHandle {
    RegistryHandle::new(OwnershipRegistry::new(RegistryConfig::new(
        "Block42 World",
        "B42WD",
        A,
    )))
}

#[test]
fn create_transfer_expropriate() {
    let world = world();
    let (first, second) = (TokenId::from(0u128), TokenId::from(1u128));

    world.create(A, first).unwrap();
    assert_eq!(world.owner_of(first), Ok(A));
    assert_eq!(world.balance_of(A), 1);

    world.create_and_transfer(A, B, second).unwrap();
    assert_eq!(world.owner_of(second), Ok(B));
    assert_eq!(world.balance_of(B), 1);

    world.transfer(B, C, second).unwrap();
    assert_eq!(world.owner_of(second), Ok(C));
    assert_eq!(world.balance_of(B), 0);
    assert_eq!(world.balance_of(C), 1);

    for caller in [B, C, D] {
        assert_eq!(
            world.expropriate(caller, second),
            Err(RegistryError::Unauthorized { caller })
        );
    }
    assert_eq!(world.owner_of(second), Ok(C));

    world.expropriate(A, second).unwrap();
    assert_eq!(world.owner_of(second), Ok(A));
    assert_eq!(world.balance_of(C), 0);
    assert_eq!(world.balance_of(A), 2);

    let events = world.read(|r| r.events().to_vec());
    let transfers: Vec<Transfer> = events
        .iter()
        .filter_map(|e| match e {
            RegistryEvent::Transfer(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(
        transfers,
        vec![
            Transfer { from: None, to: A, token_id: first },
            Transfer { from: None, to: B, token_id: second },
            Transfer { from: Some(B), to: C, token_id: second },
            Transfer { from: Some(C), to: A, token_id: second },
        ]
    );
}

#[test]
fn coordinate_and_raw_views_agree() {
    let world = world();
    let land = CoordinateRegistry::new("Block42 Land", "B42LD", world.clone());

    land.create_and_transfer(A, B, 7, -12, 40).unwrap();
    let id = land.encode_token_id(7, -12, 40);
    assert_eq!(world.owner_of(id), Ok(B));

    world.transfer(B, C, id).unwrap();
    assert_eq!(land.owner_of(7, -12, 40), Ok(C));

    land.expropriate(A, 7, -12, 40).unwrap();
    assert_eq!(world.owner_of(id), Ok(A));

    let replayed = world.read(|r| OwnershipRegistry::replay(r.config().clone(), r.events()));
    assert_eq!(replayed.state_hash(), world.read(|r| r.state_hash()));
}
