// GeoJSON feature collection
//
// Country polygons come from a third-party GeoJSON dataset. The identity of a
// feature is the first of its top-level `id` and its identity properties that
// normalizes to a code (datasets disagree on the property name, and some put a
// -99 placeholder in one property while another holds the real code). A
// block-listed code ends the search. Features without a usable identity are
// kept for rendering but are not interactive.
//
// Geometry is carried through untouched for the renderer.

use std::collections::HashMap;

use serde_json::Value;

use crate::identity::{normalize, resolve_feature_identity, Blocklist, CanonicalKey};

/// Property names tried for a feature's identity, in order
pub const DEFAULT_IDENTITY_PROPERTIES: &[&str] = &["ISO_A3", "iso_a3", "ADM0_A3", "ISO3166-1-Alpha-3"];

/// Property names tried for a feature's display name, in order
pub const DEFAULT_NAME_PROPERTIES: &[&str] = &["name", "NAME", "ADMIN"];

/// How to read identity and name out of feature properties
#[derive(Debug, Clone)]
pub struct IdentityFields {
    pub identity_properties: Vec<String>,
    pub name_properties: Vec<String>,
    pub blocklist: Blocklist,
}

impl Default for IdentityFields {
    fn default() -> Self {
        Self::with_blocklist(Blocklist::default())
    }
}

impl IdentityFields {
    pub fn with_blocklist(blocklist: Blocklist) -> Self {
        Self {
            identity_properties: DEFAULT_IDENTITY_PROPERTIES.iter().map(|s| s.to_string()).collect(),
            name_properties: DEFAULT_NAME_PROPERTIES.iter().map(|s| s.to_string()).collect(),
            blocklist,
        }
    }
}

/// Index of a feature within its loaded collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub usize);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One country polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identity value as found in the dataset
    pub raw_identity: Option<String>,
    /// Normalized, non-block-listed key; `None` means not interactive
    pub key: Option<CanonicalKey>,
    pub name: Option<String>,
    pub geometry: Value,
}

impl Feature {
    pub fn is_interactive(&self) -> bool {
        self.key.is_some()
    }

    /// Tooltip text: name, else raw identity, else "Unknown"
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.raw_identity.as_deref())
            .unwrap_or("Unknown")
    }
}

/// The loaded feature collection with a key -> feature index
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    features: Vec<Feature>,
    by_key: HashMap<CanonicalKey, Vec<FeatureId>>,
}

impl FeatureCollection {
    /// Parse a GeoJSON `FeatureCollection` document
    pub fn parse(body: &str, fields: &IdentityFields) -> Result<Self, String> {
        let doc: Value = serde_json::from_str(body).map_err(|e| format!("invalid GeoJSON: {}", e))?;

        if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err("GeoJSON document is not a FeatureCollection".to_string());
        }
        let raw_features = doc
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| "FeatureCollection has no features array".to_string())?;

        let features = raw_features.iter().map(|f| read_feature(f, fields)).collect();
        Ok(Self::from_features(features))
    }

    /// Build a collection (and its index) from already-resolved features
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut by_key: HashMap<CanonicalKey, Vec<FeatureId>> = HashMap::new();
        for (i, feature) in features.iter().enumerate() {
            if let Some(key) = feature.key {
                by_key.entry(key).or_default().push(FeatureId(i));
            }
        }
        Self { features, by_key }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn interactive_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_interactive()).count()
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.iter().enumerate().map(|(i, f)| (FeatureId(i), f))
    }

    /// Features carrying this key (a country may be split over several polygons)
    pub fn features_for(&self, key: &CanonicalKey) -> &[FeatureId] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn read_feature(raw: &Value, fields: &IdentityFields) -> Feature {
    let properties = raw.get("properties");

    let candidates: Vec<String> = raw
        .get("id")
        .and_then(value_as_string)
        .into_iter()
        .chain(all_properties(properties, &fields.identity_properties))
        .collect();
    let name = first_property(properties, &fields.name_properties);

    let key = first_identity(&candidates, &fields.blocklist);
    let raw_identity = candidates.into_iter().next();
    if key.is_none() {
        log::trace!(
            "Feature '{}' is not interactive (identity {:?})",
            name.as_deref().unwrap_or("?"),
            raw_identity
        );
    }

    Feature {
        raw_identity,
        key,
        name,
        geometry: raw.get("geometry").cloned().unwrap_or(Value::Null),
    }
}

/// First candidate that normalizes; `None` if that one is block-listed
fn first_identity(candidates: &[String], blocklist: &Blocklist) -> Option<CanonicalKey> {
    let code = candidates.iter().find(|raw| normalize(raw).is_ok())?;
    resolve_feature_identity(Some(code.as_str()), blocklist)
}

fn first_property(properties: Option<&Value>, names: &[String]) -> Option<String> {
    all_properties(properties, names).into_iter().next()
}

fn all_properties(properties: Option<&Value>, names: &[String]) -> Vec<String> {
    let Some(properties) = properties else {
        return Vec::new();
    };
    names
        .iter()
        .filter_map(|name| properties.get(name.as_str()).and_then(value_as_string))
        .collect()
}

/// Strings are taken as-is, numbers (some datasets use -99) as their text
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "FRA", "properties": {"name": "France"},
             "geometry": {"type": "Polygon", "coordinates": [[[2.0, 46.0], [3.0, 46.0], [2.0, 47.0], [2.0, 46.0]]]}},
            {"type": "Feature", "properties": {"ADMIN": "Norway", "ISO_A3": "-99"}, "geometry": null},
            {"type": "Feature", "properties": {"NAME": "Antarctica", "iso_a3": "ATA"}, "geometry": null},
            {"type": "Feature", "properties": {"ISO_A3": "DEU"}, "geometry": null},
            {"type": "Feature", "id": -99, "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {"name": "Corsica", "ADM0_A3": "fra"}, "geometry": null}
        ]
    }"#;

    fn sample() -> FeatureCollection {
        FeatureCollection::parse(SAMPLE, &IdentityFields::default()).unwrap()
    }

    #[test]
    fn test_identity_resolution() {
        let features = sample();
        assert_eq!(features.len(), 6);

        let keys: Vec<Option<String>> = features.iter().map(|(_, f)| f.key.map(|k| k.to_string())).collect();
        assert_eq!(
            keys,
            vec![
                Some("FRA".to_string()),
                None, // placeholder
                None, // block-listed
                Some("DEU".to_string()),
                None, // numeric placeholder id
                Some("FRA".to_string()),
            ]
        );
        assert_eq!(features.interactive_count(), 3);
    }

    #[test]
    fn test_labels() {
        let features = sample();
        let labels: Vec<&str> = features.iter().map(|(_, f)| f.label()).collect();
        assert_eq!(labels, vec!["France", "Norway", "Antarctica", "DEU", "-99", "Corsica"]);
    }

    #[test]
    fn test_key_index_covers_split_countries() {
        let features = sample();
        let fra = normalize("FRA").unwrap();
        assert_eq!(features.features_for(&fra), &[FeatureId(0), FeatureId(5)]);
        assert!(features.features_for(&normalize("ATA").unwrap()).is_empty());
    }

    #[test]
    fn test_geometry_passes_through() {
        let features = sample();
        let france = features.get(FeatureId(0)).unwrap();
        assert_eq!(france.geometry["type"], "Polygon");
    }

    #[test]
    fn test_placeholder_falls_through_to_next_property() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ADMIN": "France", "ISO_A3": "-99", "ADM0_A3": "FRA"}, "geometry": null},
                {"type": "Feature", "id": -99, "properties": {"ISO_A3": "NOR"}, "geometry": null},
                {"type": "Feature", "properties": {"ISO_A3": "ATA", "ADM0_A3": "FRA"}, "geometry": null}
            ]
        }"#;
        let features = FeatureCollection::parse(body, &IdentityFields::default()).unwrap();

        let france = features.get(FeatureId(0)).unwrap();
        assert_eq!(france.key, Some(normalize("FRA").unwrap()));
        assert_eq!(france.raw_identity.as_deref(), Some("-99"));
        assert_eq!(france.label(), "France");

        let norway = features.get(FeatureId(1)).unwrap();
        assert_eq!(norway.key, Some(normalize("NOR").unwrap()));
        assert_eq!(norway.label(), "-99");

        // A block-listed code is not skipped over
        assert_eq!(features.get(FeatureId(2)).unwrap().key, None);
        assert_eq!(features.features_for(&normalize("FRA").unwrap()), &[FeatureId(0)]);
    }

    #[test]
    fn test_custom_blocklist() {
        let fields = IdentityFields::with_blocklist(Blocklist::empty());
        let features = FeatureCollection::parse(SAMPLE, &fields).unwrap();
        assert_eq!(features.interactive_count(), 4);
    }

    #[test]
    fn test_rejects_non_collections() {
        let fields = IdentityFields::default();
        assert!(FeatureCollection::parse("not json", &fields).is_err());
        assert!(FeatureCollection::parse(r#"{"type": "Feature"}"#, &fields).is_err());
        assert!(FeatureCollection::parse(r#"{"type": "FeatureCollection"}"#, &fields).is_err());
    }
}
