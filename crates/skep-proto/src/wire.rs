//! Wire messages and framing for the bin exchange protocol.
//!
//! Payloads are UTF-8 text, one logical message per newline-terminated
//! line (`tokio-util`'s [`LinesCodec`]). Earlier endpoint firmware
//! relied on one `send` arriving as one `recv`, which is not a
//! transport guarantee; explicit line framing replaces that assumption
//! while keeping the payload grammar unchanged:
//!
//! - single-phase request: `<imagePath>` e.g. `/trash/ABCDE_3.jpg`
//! - two-phase request 1:  `<outerImagePath>|<location>`
//! - category reply:       `"1".."4"`, or the sentinel `"5"`
//! - storage reply:        decimal percent `"0".."100"`

use std::fmt;
use std::str::FromStr;

use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::error::{ProtoError, ProtoResult};
use crate::ident::has_image_extension;
use crate::types::{Category, FillPercent, Location};

/// Field separator in the two-phase check-in request.
pub const CHECKIN_SEPARATOR: char = '|';

/// Default maximum accepted line length in bytes.
///
/// Matches the endpoints' receive buffer size; image paths are far
/// shorter in practice.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// A framed, line-delimited message stream over TCP.
pub type MessageStream = Framed<TcpStream, LinesCodec>;

/// Wrap a TCP stream in the protocol's line framing.
///
/// Lines longer than `max_line_len` fail the read with a codec error,
/// aborting that session only.
#[must_use]
pub fn message_stream(stream: TcpStream, max_line_len: usize) -> MessageStream {
    Framed::new(stream, LinesCodec::new_with_max_length(max_line_len))
}

/// Round-one request of the two-phase variant: an outer deposit image
/// plus the site the endpoint is mounted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRequest {
    /// Path of the outer (deposit) image; must end in `.jpg`.
    pub outer_path: String,
    /// Site code of the reporting endpoint.
    pub location: Location,
}

impl CheckinRequest {
    /// Build a validated check-in request.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::BadExtension` unless the outer path ends in
    /// `.jpg`.
    pub fn new(outer_path: impl Into<String>, location: Location) -> ProtoResult<Self> {
        let outer_path = outer_path.into();
        if !has_image_extension(&outer_path) {
            return Err(ProtoError::BadExtension(outer_path));
        }
        Ok(Self {
            outer_path,
            location,
        })
    }

    /// Parse a request line of the form `<outerImagePath>|<location>`.
    ///
    /// The line is split on the first `|` only; both fields are
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::MalformedRequest` when the separator is
    /// missing, otherwise the field-level error.
    pub fn parse(line: &str) -> ProtoResult<Self> {
        let (outer_path, location) = line.split_once(CHECKIN_SEPARATOR).ok_or_else(|| {
            ProtoError::MalformedRequest(line.to_string(), "expected <imagePath>|<location>")
        })?;
        Self::new(outer_path, Location::parse(location)?)
    }
}

impl fmt::Display for CheckinRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CHECKIN_SEPARATOR}{}", self.outer_path, self.location)
    }
}

/// First reply of either variant: the resolved waste category, or the
/// sentinel `"5"` when no receptacle or waste item matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryReply {
    /// Classification succeeded; carries a real category (1..=4).
    Resolved(Category),
    /// No matching receptacle or unrecognized waste item.
    Unrecognized,
}

impl CategoryReply {
    /// Build a reply from an optional classification result.
    ///
    /// `None` and the sentinel code both collapse to `Unrecognized`.
    #[must_use]
    pub fn from_classification(category: Option<Category>) -> Self {
        match category {
            Some(c) if !c.is_sentinel() => Self::Resolved(c),
            _ => Self::Unrecognized,
        }
    }

    /// The category carried by this reply, if any.
    #[must_use]
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::Resolved(c) => Some(c),
            Self::Unrecognized => None,
        }
    }
}

impl FromStr for CategoryReply {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = Category::parse(s)?;
        Ok(Self::from_classification(Some(category)))
    }
}

impl fmt::Display for CategoryReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(c) => write!(f, "{c}"),
            Self::Unrecognized => write!(f, "{}", Category::SENTINEL),
        }
    }
}

/// Final reply of either variant: the receptacle's storage percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageReply(pub FillPercent);

impl FromStr for StorageReply {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FillPercent::parse(s).map(Self)
    }
}

impl fmt::Display for StorageReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
