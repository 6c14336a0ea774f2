//! Label normalization for open-data place records.
//!
//! [`TextNormalizer`] cleans up names and categories; [`format_zone`] builds the
//! display address from a zone value.

pub mod dictionaries;
pub mod normalizer;
pub mod zone;

pub use normalizer::TextNormalizer;
pub use zone::{format_zone, ADDRESS_UNAVAILABLE, ZONE_PREFIX};
