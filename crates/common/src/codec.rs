//! Coordinate token-id codec.
//!
//! A parcel id packs three fields, most significant first:
//!
//! ```text
//! [255 : 2F]   world id  (unsigned, 256 - 2F bits)
//! [2F-1 : F]   x         (two's complement, F bits)
//! [F-1 : 0]    y         (two's complement, F bits)
//! ```
//!
//! Packing is plain modular arithmetic. Inputs wider than their field are
//! truncated to the field's low bits and wrap without any signal; callers that
//! depend on particular wrap values rely on this.

use crate::types::TokenId;
use serde::{Deserialize, Serialize};

/// Width of each coordinate field in the default layout.
pub const DEFAULT_FIELD_BITS: u32 = 116;

/// Error building a [`CoordLayout`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error(
        "coordinate field width {0} is outside the supported range {min}..={max}",
        min = CoordLayout::MIN_FIELD_BITS,
        max = CoordLayout::MAX_FIELD_BITS
    )]
    UnsupportedFieldWidth(u32),
}

/// A decoded parcel address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelCoord {
    pub world_id: u64,
    pub x: i128,
    pub y: i128,
}

impl ParcelCoord {
    pub fn new(world_id: u64, x: i128, y: i128) -> Self {
        Self { world_id, x, y }
    }
}

/// Bit layout of a coordinate token id.
///
/// The field width is bounded so a decoded coordinate always fits `i128` and a
/// decoded world id always fits `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CoordLayout {
    field_bits: u32,
}

impl CoordLayout {
    pub const MIN_FIELD_BITS: u32 = 96;
    pub const MAX_FIELD_BITS: u32 = 127;

    pub const DEFAULT: Self = Self {
        field_bits: DEFAULT_FIELD_BITS,
    };

    pub fn new(field_bits: u32) -> Result<Self, LayoutError> {
        if (Self::MIN_FIELD_BITS..=Self::MAX_FIELD_BITS).contains(&field_bits) {
            Ok(Self { field_bits })
        } else {
            Err(LayoutError::UnsupportedFieldWidth(field_bits))
        }
    }

    /// Width F of each coordinate field.
    pub fn field_bits(self) -> u32 {
        self.field_bits
    }

    /// Width of the world id field, `256 - 2F`.
    pub fn world_bits(self) -> u32 {
        256 - 2 * self.field_bits
    }

    /// Smallest coordinate that survives a round trip, `-2^(F-1)`.
    pub fn min_coordinate(self) -> i128 {
        -(1i128 << (self.field_bits - 1))
    }

    /// Largest coordinate that survives a round trip, `2^(F-1) - 1`.
    pub fn max_coordinate(self) -> i128 {
        (1i128 << (self.field_bits - 1)) - 1
    }

    /// Largest world id that survives a round trip.
    pub fn max_world_id(self) -> u64 {
        u64::MAX >> (64 - self.world_bits())
    }

    fn field_mask(self) -> u128 {
        (1u128 << self.field_bits) - 1
    }

    /// Pack `(world_id, x, y)` into a token id.
    ///
    /// Only the low F bits of `x` and `y` and the low `256 - 2F` bits of
    /// `world_id` are kept.
    pub fn encode(self, world_id: u64, x: i128, y: i128) -> TokenId {
        let f = self.field_bits;
        let mask = self.field_mask();
        let x = TokenId::from(x as u128 & mask);
        let y = TokenId::from(y as u128 & mask);
        (TokenId::from(world_id) << (2 * f)) | (x << f) | y
    }

    pub fn encode_coord(self, coord: ParcelCoord) -> TokenId {
        self.encode(coord.world_id, coord.x, coord.y)
    }

    /// Unpack a token id. Total: every 256-bit value decodes to some triple.
    pub fn decode(self, id: TokenId) -> ParcelCoord {
        let f = self.field_bits;
        let mask = self.field_mask();
        let y_raw = id.low() & mask;
        let x_raw = (id >> f).low() & mask;
        // The world field is at most 64 bits wide for any supported layout.
        let world_id = (id >> (2 * f)).low() as u64;
        ParcelCoord {
            world_id,
            x: sign_extend(x_raw, f),
            y: sign_extend(y_raw, f),
        }
    }
}

impl Default for CoordLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for CoordLayout {
    type Error = LayoutError;

    fn try_from(field_bits: u32) -> Result<Self, Self::Error> {
        Self::new(field_bits)
    }
}

impl From<CoordLayout> for u32 {
    fn from(layout: CoordLayout) -> u32 {
        layout.field_bits
    }
}

/// Encode with the default layout.
pub fn encode(world_id: u64, x: i128, y: i128) -> TokenId {
    CoordLayout::DEFAULT.encode(world_id, x, y)
}

/// Decode with the default layout.
pub fn decode(id: TokenId) -> ParcelCoord {
    CoordLayout::DEFAULT.decode(id)
}

/// Interpret the low `bits` of `raw` as a two's-complement value.
fn sign_extend(raw: u128, bits: u32) -> i128 {
    let shift = 128 - bits;
    ((raw << shift) as i128) >> shift
}
