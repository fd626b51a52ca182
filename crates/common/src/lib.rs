//! Shared types for the landgrid registry: parcel identifiers, accounts, and
//! the coordinate codec that packs `(world, x, y)` into a parcel identifier.
//!
//! # Invariants
//! - `decode(encode(w, x, y)) == (w, x, y)` for every in-range triple.
//! - The codec never fails; out-of-range input wraps.

pub mod codec;
pub mod input;
pub mod types;

pub use codec::{CoordLayout, DEFAULT_FIELD_BITS, LayoutError, ParcelCoord};
pub use input::{CoordinateParseError, parse_coordinate};
pub use types::{AccountId, TokenId, TokenIdParseError};
