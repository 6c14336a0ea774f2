pub mod cache;
pub mod db;
pub mod environment;
pub mod error;
pub mod logging;
pub mod places;
pub mod server;
pub mod text;

pub use error::{FetchError, StoreError};
pub use places::{Location, Place};

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_CACHE: &str = "cache";
pub const TARGET_NORMALIZE: &str = "normalize";
