use super::normalizer::TextNormalizer;

pub const ZONE_PREFIX: &str = "Zone: ";
pub const ADDRESS_UNAVAILABLE: &str = "Address unavailable";

/// Renders a raw zone value (e.g. `URBANA`) as a display address (`Zone: Urbana`).
///
/// Missing or blank zones yield [`ADDRESS_UNAVAILABLE`].
pub fn format_zone(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(zone) if !zone.is_empty() => {
            format!("{}{}", ZONE_PREFIX, TextNormalizer::new().normalize(zone))
        }
        _ => ADDRESS_UNAVAILABLE.to_string(),
    }
}
