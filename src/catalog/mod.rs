// Country catalog - Entity model and browsing helpers
//
// An `Entity` is the normalized snapshot of one country. It is what the
// catalog and detail fetches produce, what the bucket list stores and what the
// map correlates against. Only `code` is identity; every other field is a
// snapshot that may be stale until the next detail fetch.

pub mod filter;

use serde::{Deserialize, Serialize};

use crate::identity::CanonicalKey;

pub use filter::{regions, summarize_regions, CatalogQuery, RegionSummary};

/// Geographic center of a country (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a provider `[lat, lon]` pair; anything else is treated as absent
    pub fn from_pair(pair: &[f64]) -> Option<Self> {
        match pair {
            [lat, lon] if lat.is_finite() && lon.is_finite() => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }
}

/// A country snapshot
///
/// Serialized with camelCase keys. Deserialization also accepts the key names
/// older bucket-list blobs were written with (`alpha3Code`, `name`, `flag`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(alias = "alpha3Code")]
    pub code: CanonicalKey,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(alias = "flag", default)]
    pub flag_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subregion: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub currencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Entity {
    /// Minimal snapshot: identity and display name, everything else empty
    pub fn new(code: CanonicalKey, display_name: impl Into<String>) -> Self {
        Self {
            code,
            display_name: display_name.into(),
            flag_url: String::new(),
            capital: None,
            population: 0,
            region: String::new(),
            subregion: None,
            languages: Vec::new(),
            currencies: Vec::new(),
            coordinates: None,
        }
    }

    /// Population with thousands separators ("67,391,582")
    pub fn population_display(&self) -> String {
        format_thousands(self.population)
    }
}

/// Format an integer with comma thousands separators
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(67391582), "67,391,582");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut entity = Entity::new(normalize("FRA").unwrap(), "France");
        entity.population = 67391582;
        entity.coordinates = Some(Coordinates::new(46.0, 2.0));

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["code"], "FRA");
        assert_eq!(json["displayName"], "France");
        assert_eq!(json["population"], 67391582);
        assert_eq!(json["coordinates"]["lat"], 46.0);
        assert!(json.get("capital").is_none());
    }

    #[test]
    fn test_reads_legacy_snapshot_keys() {
        let legacy = r#"{
            "name": "France",
            "flag": "https://flagcdn.com/w320/fr.png",
            "capital": "Paris",
            "population": 67391582,
            "region": "Europe",
            "alpha3Code": "FRA"
        }"#;
        let entity: Entity = serde_json::from_str(legacy).unwrap();
        assert_eq!(entity.code.as_str(), "FRA");
        assert_eq!(entity.display_name, "France");
        assert_eq!(entity.flag_url, "https://flagcdn.com/w320/fr.png");
        assert_eq!(entity.capital.as_deref(), Some("Paris"));
        assert!(entity.languages.is_empty());
    }

    #[test]
    fn test_coordinates_from_pair() {
        assert_eq!(Coordinates::from_pair(&[46.0, 2.0]), Some(Coordinates::new(46.0, 2.0)));
        assert_eq!(Coordinates::from_pair(&[]), None);
        assert_eq!(Coordinates::from_pair(&[1.0]), None);
        assert_eq!(Coordinates::from_pair(&[f64::NAN, 2.0]), None);
    }
}
