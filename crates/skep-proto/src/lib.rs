//! # skep-proto
//!
//! Protocol layer for the skep waste-receptacle exchange: core types,
//! the identifier codec for `LOCATION_CATEGORY` image names, the
//! fill-level alert policy, and the line-framed wire messages spoken
//! between bin endpoints and the backend.
//!
//! ## Exchange shapes
//!
//! ```text
//! single-phase                     two-phase
//! ────────────                     ─────────
//! client ── <imagePath> ──► server  client ── <outer>|<loc> ──► server
//! client ◄── category ──── server   client ◄── category ────── server
//! client ◄── storage ───── server   client ── <innerPath> ───► server
//!                                   client ◄── storage ─────── server
//! ```
//!
//! The category reply `"5"` is the sentinel for "no matching receptacle
//! or unrecognized waste item"; in the two-phase exchange it terminates
//! the session after round one.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ident;
pub mod policy;
pub mod types;
pub mod wire;

pub use error::{ProtoError, ProtoResult};
pub use ident::{parse_image_path, parse_inner_image_path, parse_token};
pub use policy::FillTier;
pub use types::{Category, FillPercent, Location, ReceptacleKey};
pub use wire::{
    message_stream, CategoryReply, CheckinRequest, MessageStream, StorageReply,
    DEFAULT_MAX_LINE_LEN,
};
