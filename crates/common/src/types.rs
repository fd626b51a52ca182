use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, Shl, Shr};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an account that can own parcels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// A fresh random account.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// A fixed account, mostly useful for fixtures and CLI shorthands.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
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

/// Errors from parsing a textual token identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenIdParseError {
    #[error("empty token id")]
    Empty,
    #[error("token id has {0} hex digits, at most 64 fit in 256 bits")]
    TooLong(usize),
    #[error("invalid hex digit {0:?} in token id")]
    InvalidDigit(char),
}

/// A 256-bit unsigned parcel identifier.
///
/// Stored as two 128-bit halves. All shifting and masking is modulo 2^256:
/// bits pushed past either end are dropped, never reported.
///
/// Renders as lower hex without zero padding (`0x0`, `0x1000...1`), so textual
/// consumers must not assume a fixed string length.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    hi: u128,
    lo: u128,
}

impl TokenId {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };
    pub const MAX: Self = Self {
        hi: u128::MAX,
        lo: u128::MAX,
    };

    /// Build from the high and low 128-bit halves.
    pub const fn from_halves(hi: u128, lo: u128) -> Self {
        Self { hi, lo }
    }

    /// Bits `[128, 256)`.
    pub const fn high(self) -> u128 {
        self.hi
    }

    /// Bits `[0, 128)`.
    pub const fn low(self) -> u128 {
        self.lo
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Big-endian byte representation.
    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.hi.to_be_bytes());
        out[16..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut hi = [0u8; 16];
        let mut lo = [0u8; 16];
        hi.copy_from_slice(&bytes[..16]);
        lo.copy_from_slice(&bytes[16..]);
        Self {
            hi: u128::from_be_bytes(hi),
            lo: u128::from_be_bytes(lo),
        }
    }
}

impl From<u128> for TokenId {
    fn from(lo: u128) -> Self {
        Self { hi: 0, lo }
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self::from(value as u128)
    }
}

impl From<u32> for TokenId {
    fn from(value: u32) -> Self {
        Self::from(value as u128)
    }
}

impl Shl<u32> for TokenId {
    type Output = Self;

    fn shl(self, n: u32) -> Self {
        match n {
            0 => self,
            1..=127 => Self {
                hi: (self.hi << n) | (self.lo >> (128 - n)),
                lo: self.lo << n,
            },
            128..=255 => Self {
                hi: self.lo << (n - 128),
                lo: 0,
            },
            _ => Self::ZERO,
        }
    }
}

impl Shr<u32> for TokenId {
    type Output = Self;

    fn shr(self, n: u32) -> Self {
        match n {
            0 => self,
            1..=127 => Self {
                hi: self.hi >> n,
                lo: (self.lo >> n) | (self.hi << (128 - n)),
            },
            128..=255 => Self {
                hi: 0,
                lo: self.hi >> (n - 128),
            },
            _ => Self::ZERO,
        }
    }
}

impl BitOr for TokenId {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            hi: self.hi | rhs.hi,
            lo: self.lo | rhs.lo,
        }
    }
}

impl BitAnd for TokenId {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            hi: self.hi & rhs.hi,
            lo: self.lo & rhs.lo,
        }
    }
}

impl fmt::LowerHex for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = if self.hi == 0 {
            format!("{:x}", self.lo)
        } else {
            format!("{:x}{:032x}", self.hi, self.lo)
        };
        f.pad_integral(true, "0x", &digits)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#x}")
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({self:#x})")
    }
}

impl FromStr for TokenId {
    type Err = TokenIdParseError;

    /// Parse lower- or upper-case hex, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() {
            return Err(TokenIdParseError::Empty);
        }
        let mut value = Self::ZERO;
        for c in digits.chars() {
            let digit = c
                .to_digit(16)
                .ok_or(TokenIdParseError::InvalidDigit(c))?;
            value = (value << 4) | Self::from(digit);
        }
        // Checked after the digit scan so a bad character is reported first.
        if digits.len() > 64 {
            return Err(TokenIdParseError::TooLong(digits.len()));
        }
        Ok(value)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
