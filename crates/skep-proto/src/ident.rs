//! Identifier codec for `LOCATION_CATEGORY` tokens embedded in image
//! paths.
//!
//! Deposit images are addressed by path-like strings such as
//! `/trash/ABCDE_3.jpg`. Only the terminal filename carries meaning:
//! its stem must split into a five-letter location and a numeric
//! category. The single-phase protocol enforces the category range at
//! parse time; the two-phase protocol re-parses the second image's name
//! only for a consistency check and accepts any digit string there.
//!
//! Pure string handling: no I/O, and every failure is recoverable.

use crate::error::{ProtoError, ProtoResult};
use crate::types::{Category, Location, ReceptacleKey};

/// Required image extension, matched exactly (lowercase).
pub const IMAGE_EXTENSION: &str = ".jpg";

/// Whether a path carries the required `.jpg` extension.
#[must_use]
pub fn has_image_extension(path: &str) -> bool {
    path.ends_with(IMAGE_EXTENSION)
}

/// Extract the terminal filename of a path-like string.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip the `.jpg` extension off a filename.
///
/// # Errors
///
/// Returns `ProtoError::BadExtension` if the name does not end in
/// `.jpg`.
pub fn file_stem(name: &str) -> ProtoResult<&str> {
    name.strip_suffix(IMAGE_EXTENSION)
        .ok_or_else(|| ProtoError::BadExtension(name.to_string()))
}

/// Parse a `LOCATION_CATEGORY` token with the category range enforced.
///
/// This is the single-phase rule: the token must split into exactly two
/// `_`-separated parts, the location must be five letters, and the
/// category must be a digit in 1..=5.
///
/// # Errors
///
/// Returns a `ProtoError` describing the first rule the token breaks.
pub fn parse_token(token: &str) -> ProtoResult<ReceptacleKey> {
    let mut parts = token.split('_');
    let (Some(location), Some(category), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ProtoError::BadIdentifier(token.to_string()));
    };
    Ok(ReceptacleKey::new(
        Location::parse(location)?,
        Category::parse(category)?,
    ))
}

/// Parse a full image path into a receptacle key (single-phase rule).
///
/// Takes the last path segment, requires the exact `.jpg` suffix, then
/// applies [`parse_token`] to the stem.
///
/// # Errors
///
/// Returns a `ProtoError` for a bad extension or a malformed stem.
pub fn parse_image_path(path: &str) -> ProtoResult<ReceptacleKey> {
    let stem = file_stem(file_name(path))?;
    parse_token(stem)
}

/// Parse a second-phase (inner) image path without enforcing the
/// category range.
///
/// The two-phase protocol only compares the embedded identifier against
/// the values negotiated in round one, so any digit string is accepted
/// as the category and the stem is split on the first `_` only.
///
/// # Errors
///
/// Returns a `ProtoError` for a bad extension, a missing `_`, a bad
/// location, or a category that is not a digit string.
pub fn parse_inner_image_path(path: &str) -> ProtoResult<(Location, u8)> {
    let stem = file_stem(file_name(path))?;
    let (location, category) = stem
        .split_once('_')
        .ok_or_else(|| ProtoError::BadIdentifier(stem.to_string()))?;
    let code: u8 = category
        .parse()
        .map_err(|_| ProtoError::InvalidCategory(category.to_string()))?;
    Ok((Location::parse(location)?, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_canonical_path() {
        let key = parse_image_path("/trash/ABCDE_3.jpg").unwrap();
        assert_eq!(key.location.as_str(), "ABCDE");
        assert_eq!(key.category.code(), 3);
    }

    #[test]
    fn parses_bare_filename() {
        let key = parse_image_path("abcde_5.jpg").unwrap();
        assert_eq!(key.location.as_str(), "ABCDE");
        assert_eq!(key.category.code(), 5);
    }

    #[test]
    fn rejects_wrong_extension() {
        assert!(matches!(
            parse_image_path("/trash/ABCDE_3.png"),
            Err(ProtoError::BadExtension(_))
        ));
        // Extension match is exact lowercase.
        assert!(parse_image_path("/trash/ABCDE_3.JPG").is_err());
        assert!(parse_image_path("/trash/ABCDE_3").is_err());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            parse_image_path("/trash/ABCDE.jpg"),
            Err(ProtoError::BadIdentifier(_))
        ));
        assert!(matches!(
            parse_image_path("/trash/ABCDE_3_9.jpg"),
            Err(ProtoError::BadIdentifier(_))
        ));
    }

    #[test]
    fn rejects_bad_location() {
        assert!(parse_image_path("/trash/ABCD_3.jpg").is_err());
        assert!(parse_image_path("/trash/AB1DE_3.jpg").is_err());
    }

    #[test]
    fn rejects_category_out_of_range() {
        assert!(parse_image_path("/trash/ABCDE_0.jpg").is_err());
        assert!(parse_image_path("/trash/ABCDE_9.jpg").is_err());
        assert!(parse_image_path("/trash/ABCDE_x.jpg").is_err());
    }

    #[test]
    fn inner_path_accepts_out_of_range_category() {
        let (loc, code) = parse_inner_image_path("ABCDE_9.jpg").unwrap();
        assert_eq!(loc.as_str(), "ABCDE");
        assert_eq!(code, 9);
    }

    #[test]
    fn inner_path_splits_on_first_underscore_only() {
        // A trailing `_x` makes the category non-numeric rather than
        // changing the segment count, matching the lenient rule.
        assert!(matches!(
            parse_inner_image_path("ABCDE_3_x.jpg"),
            Err(ProtoError::InvalidCategory(_))
        ));
    }

    #[test]
    fn inner_path_still_requires_extension_and_location() {
        assert!(parse_inner_image_path("ABCDE_3.png").is_err());
        assert!(parse_inner_image_path("ABC_3.jpg").is_err());
        assert!(parse_inner_image_path("ABCDE3.jpg").is_err());
    }

    proptest! {
        #[test]
        fn round_trips_all_valid_tokens(loc in "[A-Za-z]{5}", cat in 1u8..=5) {
            let key = parse_image_path(&format!("/trash/{loc}_{cat}.jpg")).unwrap();
            prop_assert_eq!(key.location.as_str(), loc.to_ascii_uppercase());
            prop_assert_eq!(key.category.code(), cat);
        }

        #[test]
        fn never_panics_on_arbitrary_input(path in ".*") {
            let _ = parse_image_path(&path);
            let _ = parse_inner_image_path(&path);
        }
    }
}
