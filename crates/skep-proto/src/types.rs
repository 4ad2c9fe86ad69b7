//! Core types for the skep protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// A five-letter site code identifying a physical bin cluster.
///
/// Locations are case-insensitive on input and normalized to uppercase
/// at construction, so two `Location`s compare equal regardless of the
/// casing they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Required length of a location code.
    pub const LEN: usize = 5;

    /// Parse a location code from a string.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::InvalidLocation` unless the input is exactly
    /// five ASCII letters.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        if s.len() == Self::LEN && s.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(ProtoError::InvalidLocation(s.to_string()))
        }
    }

    /// Get the normalized (uppercase) code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Location {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An integer waste class.
///
/// Codes 1..=4 denote real waste categories; code 5 is reserved as the
/// protocol's "no matching receptacle / unrecognized waste" sentinel and
/// never names a real category, though it remains routable as a
/// receptacle address in the single-phase variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(u8);

impl Category {
    /// The reserved "unresolved" sentinel code.
    pub const SENTINEL: Self = Self(5);

    /// Create a category from its numeric code.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::InvalidCategory` if the code is outside 1..=5.
    pub fn new(code: u8) -> Result<Self, ProtoError> {
        if (1..=5).contains(&code) {
            Ok(Self(code))
        } else {
            Err(ProtoError::InvalidCategory(code.to_string()))
        }
    }

    /// Parse a category from its wire representation (a digit string).
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::InvalidCategory` if the string is not a
    /// digit in 1..=5.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        let code: u8 = s
            .parse()
            .map_err(|_| ProtoError::InvalidCategory(s.to_string()))?;
        Self::new(code).map_err(|_| ProtoError::InvalidCategory(s.to_string()))
    }

    /// Get the numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Whether this is the reserved sentinel code.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::SENTINEL.0
    }

    /// Human-readable name of the waste kind, `None` for the sentinel.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("recyclable"),
            2 => Some("hazardous"),
            3 => Some("food waste"),
            4 => Some("other"),
            _ => None,
        }
    }
}

impl FromStr for Category {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of one physical waste receptacle: a location plus the waste
/// category it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceptacleKey {
    /// Site code of the bin cluster.
    pub location: Location,
    /// Waste category the receptacle accepts.
    pub category: Category,
}

impl ReceptacleKey {
    /// Create a key from its parts.
    #[must_use]
    pub const fn new(location: Location, category: Category) -> Self {
        Self { location, category }
    }

    /// The filename a second-phase bin image for this receptacle is
    /// expected to carry.
    #[must_use]
    pub fn expected_image_name(&self) -> String {
        format!("{}_{}.jpg", self.location, self.category)
    }
}

impl fmt::Display for ReceptacleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.location, self.category)
    }
}

/// Fill level of a receptacle as an integer percent in 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillPercent(u8);

impl FillPercent {
    /// An empty receptacle.
    pub const ZERO: Self = Self(0);

    /// Maximum representable fill level.
    pub const MAX: Self = Self(100);

    /// Create a fill percent from a raw value.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::InvalidPercent` if the value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ProtoError> {
        if value <= Self::MAX.0 {
            Ok(Self(value))
        } else {
            Err(ProtoError::InvalidPercent(value.to_string()))
        }
    }

    /// Parse a fill percent from its wire representation.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::InvalidPercent` if the string is not a
    /// decimal integer in 0..=100.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        let value: u8 = s
            .parse()
            .map_err(|_| ProtoError::InvalidPercent(s.to_string()))?;
        Self::new(value).map_err(|_| ProtoError::InvalidPercent(s.to_string()))
    }

    /// Get the raw percent value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl FromStr for FillPercent {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FillPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
