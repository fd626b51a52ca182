//! Registry kernel: authoritative parcel ownership, balances, approvals, and the
//! coordinate-addressed veneer over them.
//!
//! # Invariants
//! - A parcel is created once and never destroyed.
//! - A balance always equals the number of parcels its account owns.
//! - Every mutation checks all preconditions before writing; a rejected call
//!   leaves the registry untouched.
//! - All state mutations flow through explicit operations and are recorded as
//!   events, so replaying the event log reproduces the state.

pub mod coordinate;
pub mod error;
pub mod handle;
pub mod registry;

pub use coordinate::CoordinateRegistry;
pub use error::RegistryError;
pub use handle::RegistryHandle;
pub use registry::{Ledger, OwnershipRegistry, RegistryConfig, RegistryEvent, Transfer};
