//! Conversion of raw open-data records into validated places.

use serde_json::Value;
use tracing::{debug, info};

use super::types::{Location, Place, OTHER_CATEGORY, UNNAMED_PLACE};
use crate::text::{format_zone, TextNormalizer};
use crate::TARGET_WEB_REQUEST;

const NAME_FIELD: &str = "infraestructura";
const CATEGORY_FIELD: &str = "categoria";
const ZONE_FIELD: &str = "zona";

/// The coordinate layouts found in source records, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSource {
    /// `latitud` and `longitud` fields, numbers or numeric strings.
    SeparateFields,
    /// A single `coordenadas` string, `"lat,lng"`.
    PairString,
    /// A GeoJSON point under `geo_loc`, `{"coordinates": [lng, lat]}`.
    GeoJson,
}

impl CoordinateSource {
    pub const PRIORITY: [CoordinateSource; 3] = [
        CoordinateSource::SeparateFields,
        CoordinateSource::PairString,
        CoordinateSource::GeoJson,
    ];

    /// Returns the raw `(lat, lng)` pair when the record carries this layout.
    ///
    /// A present-but-unparseable value comes back as `NaN` so it fails validation
    /// instead of letting a lower-priority layout win.
    fn extract(self, record: &Value) -> Option<(f64, f64)> {
        match self {
            CoordinateSource::SeparateFields => {
                let lat = present(record.get("latitud"))?;
                let lng = present(record.get("longitud"))?;
                Some((coerce_number(lat), coerce_number(lng)))
            }
            CoordinateSource::PairString => {
                let pair = present(record.get("coordenadas"))?
                    .as_str()
                    .filter(|pair| !pair.trim().is_empty())?;
                let mut parts = pair.split(',');
                let lat = parts.next().map(parse_number).unwrap_or(f64::NAN);
                let lng = parts.next().map(parse_number).unwrap_or(f64::NAN);
                Some((lat, lng))
            }
            CoordinateSource::GeoJson => {
                let coordinates = present(record.get("geo_loc"))?
                    .get("coordinates")?
                    .as_array()?;
                let lng = coordinates.first().map(coerce_number).unwrap_or(f64::NAN);
                let lat = coordinates.get(1).map(coerce_number).unwrap_or(f64::NAN);
                Some((lat, lng))
            }
        }
    }
}

/// Finds the first coordinate layout present on the record and returns its location.
pub fn extract_location(record: &Value) -> Option<(CoordinateSource, Location)> {
    CoordinateSource::PRIORITY.iter().find_map(|source| {
        source
            .extract(record)
            .map(|(lat, lng)| (*source, Location { lat, lng }))
    })
}

/// Maps raw API records to places, silently dropping records without a valid location.
///
/// Anything other than a JSON array yields an empty list. Ids are the 1-based input
/// position, so they skip over dropped records.
pub fn transform_records(records: &Value) -> Vec<Place> {
    let Some(items) = records.as_array() else {
        debug!(target: TARGET_WEB_REQUEST, "Records payload is not an array, nothing to transform");
        return Vec::new();
    };

    let normalizer = TextNormalizer::new();
    let mut places = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for (index, record) in items.iter().enumerate() {
        match transform_record(&normalizer, index, record) {
            Some(place) => places.push(place),
            None => dropped += 1,
        }
    }

    info!(
        target: TARGET_WEB_REQUEST,
        "Transformed {} records: {} valid, {} dropped",
        items.len(),
        places.len(),
        dropped
    );

    places
}

fn transform_record(normalizer: &TextNormalizer, index: usize, record: &Value) -> Option<Place> {
    let location = match extract_location(record) {
        Some((_, location)) if location.is_valid() => location,
        Some((source, location)) => {
            debug!(
                target: TARGET_WEB_REQUEST,
                "Dropping record {}: invalid {:?} coordinates ({}, {})",
                index + 1,
                source,
                location.lat,
                location.lng
            );
            return None;
        }
        None => {
            debug!(target: TARGET_WEB_REQUEST, "Dropping record {}: no coordinates", index + 1);
            return None;
        }
    };

    let name = text_field(record, NAME_FIELD)
        .map(|name| normalizer.normalize(name))
        .unwrap_or_else(|| UNNAMED_PLACE.to_string());
    let category = text_field(record, CATEGORY_FIELD)
        .map(|category| normalizer.normalize(category))
        .unwrap_or_else(|| OTHER_CATEGORY.to_string());

    Some(Place {
        id: index as u64 + 1,
        name,
        category,
        location,
        address: format_zone(text_field(record, ZONE_FIELD)),
    })
}

/// A non-blank string field.
fn text_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_number(text),
        _ => f64::NAN,
    }
}

fn parse_number(text: &str) -> f64 {
    text.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .parse()
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_end_to_end_record() {
        let records = json!([{
            "infraestructura": "CASA DE LA Cultura Municipal",
            "categoria": "CULTURA",
            "zona": "urbana",
            "latitud": "9.524",
            "longitud": "-75.582"
        }]);

        let places = transform_records(&records);
        assert_eq!(
            places,
            vec![Place {
                id: 1,
                name: "Casa de la Cultura Municipal".to_string(),
                category: "Cultura".to_string(),
                location: Location {
                    lat: 9.524,
                    lng: -75.582
                },
                address: "Zone: Urbana".to_string(),
            }]
        );
    }

    #[test]
    fn test_non_array_input_yields_nothing() {
        assert!(transform_records(&Value::Null).is_empty());
        assert!(transform_records(&json!([])).is_empty());
        assert!(transform_records(&json!("not-an-array")).is_empty());
        assert!(transform_records(&json!({"data": []})).is_empty());
    }

    #[test]
    fn test_coordinate_validation_boundaries() {
        let records = json!([
            {"infraestructura": "zero", "latitud": 0, "longitud": -75.5},
            {"infraestructura": "north", "latitud": 91, "longitud": -75.5},
            {"infraestructura": "west", "latitud": 9.5, "longitud": -180.5},
            {"infraestructura": "garbage", "latitud": "abc", "longitud": "-75.5"},
            {"infraestructura": "strings", "latitud": "9.52", "longitud": "-75.58"},
            {"infraestructura": "edge", "latitud": 90, "longitud": 180}
        ]);

        let places = transform_records(&records);
        let ids: Vec<u64> = places.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(places[0].location, Location { lat: 9.52, lng: -75.58 });
    }

    #[test]
    fn test_coordinate_shapes_in_priority_order() {
        let pair = json!({"coordenadas": "9.51, -75.57"});
        assert_eq!(
            extract_location(&pair),
            Some((CoordinateSource::PairString, Location { lat: 9.51, lng: -75.57 }))
        );

        let geo = json!({"geo_loc": {"type": "Point", "coordinates": [-75.56, 9.53]}});
        assert_eq!(
            extract_location(&geo),
            Some((CoordinateSource::GeoJson, Location { lat: 9.53, lng: -75.56 }))
        );

        // separate fields win over the other layouts
        let both = json!({
            "latitud": 9.5,
            "longitud": -75.5,
            "coordenadas": "1.0,1.0",
            "geo_loc": {"coordinates": [2.0, 2.0]}
        });
        assert_eq!(
            extract_location(&both).map(|(source, _)| source),
            Some(CoordinateSource::SeparateFields)
        );

        // a half-filled pair of fields does not count as present
        let partial = json!({"latitud": 9.5, "longitud": null, "coordenadas": "9.4,-75.4"});
        assert_eq!(
            extract_location(&partial).map(|(source, _)| source),
            Some(CoordinateSource::PairString)
        );

        assert_eq!(extract_location(&json!({"nombre": "x"})), None);
    }

    #[test]
    fn test_blank_pair_string_falls_through_to_geojson() {
        let records = json!([{
            "infraestructura": "muelle",
            "coordenadas": "",
            "geo_loc": {"type": "Point", "coordinates": [-75.58, 9.52]}
        }]);
        let places = transform_records(&records);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].location, Location { lat: 9.52, lng: -75.58 });

        let blank = json!({"coordenadas": "   ", "geo_loc": {"coordinates": [-75.5, 9.5]}});
        assert_eq!(
            extract_location(&blank).map(|(source, _)| source),
            Some(CoordinateSource::GeoJson)
        );
    }

    #[test]
    fn test_ids_follow_input_position() {
        let records = json!([
            {"latitud": 9.5, "longitud": -75.5},
            {"latitud": 0, "longitud": 0},
            {"latitud": 9.6, "longitud": -75.6}
        ]);
        let ids: Vec<u64> = transform_records(&records).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_placeholders_for_missing_text() {
        let records = json!([{"latitud": 9.5, "longitud": -75.5, "infraestructura": "  "}]);
        let places = transform_records(&records);
        assert_eq!(places[0].name, UNNAMED_PLACE);
        assert_eq!(places[0].category, OTHER_CATEGORY);
        assert_eq!(places[0].address, crate::text::ADDRESS_UNAVAILABLE);
    }
}
