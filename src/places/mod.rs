//! Retrieval and transformation of places from the backend and the open-data API.

pub mod client;
pub mod fetcher;
pub mod transform;
pub mod types;

pub use client::{create_http_client, OpenDataClient};
pub use fetcher::{fetch_with_deadline, should_skip_backend, PlaceFetcher, PlaceSource};
pub use transform::{extract_location, transform_records, CoordinateSource};
pub use types::{Location, Place};
