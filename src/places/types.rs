//! Type definitions for the places module.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// A validated, display-ready point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// 1-based position of the source record in the fetched batch.
    pub id: u64,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "categoria")]
    pub category: String,
    #[serde(alias = "ubicacion")]
    pub location: Location,
    #[serde(alias = "direccion")]
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Both values finite, non-zero and within the WGS84 ranges. Zero means "missing".
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat != 0.0
            && self.lng != 0.0
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Payload the primary backend sends when it refuses a request.
#[derive(Debug, Deserialize)]
pub struct BackendError {
    pub error: String,
}

// Placeholders
pub const UNNAMED_PLACE: &str = "Unnamed";
pub const OTHER_CATEGORY: &str = "Other";

// Constants
pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(3);
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);
pub const PAGE_LIMIT: u32 = 5000;
pub const APP_TOKEN_HEADER: &str = "X-App-Token";
