// Country provider wire format (REST Countries v3.1)
//
// Only the requested fields are modelled; everything else the provider sends is
// ignored. Conversion to `Entity` goes through the identity normalizer, so a
// record with an unusable code never reaches the rest of the system.
//
// Example record:
//   {"name": {"common": "France", "official": "French Republic"},
//    "flags": {"png": "https://flagcdn.com/w320/fr.png", "svg": "..."},
//    "capital": ["Paris"], "population": 67391582, "region": "Europe",
//    "subregion": "Western Europe", "cca2": "FR", "cca3": "FRA",
//    "latlng": [46.0, 2.0],
//    "languages": {"fra": "French"},
//    "currencies": {"EUR": {"name": "Euro", "symbol": "€"}}}

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::catalog::{Coordinates, Entity};
use crate::identity::normalize;

/// Fields requested from the catalog endpoint (the provider caps `/all` at 10)
pub const CATALOG_FIELDS: &str = "name,flags,capital,population,region,subregion,cca2,cca3,latlng";

/// Fields requested from the detail endpoint
pub const DETAIL_FIELDS: &str =
    "name,flags,capital,population,region,subregion,languages,currencies,cca3,latlng";

#[derive(Debug, Deserialize)]
pub struct RawName {
    pub common: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawFlags {
    pub png: Option<String>,
    pub svg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCurrency {
    pub name: Option<String>,
}

/// One provider record, every field optional so a gap is reported per record
#[derive(Debug, Deserialize)]
pub struct RawCountry {
    pub name: Option<RawName>,
    pub flags: Option<RawFlags>,
    #[serde(default)]
    pub capital: Vec<String>,
    pub population: Option<u64>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub cca2: Option<String>,
    pub cca3: Option<String>,
    #[serde(default)]
    pub latlng: Vec<f64>,
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    #[serde(default)]
    pub currencies: BTreeMap<String, RawCurrency>,
}

impl RawCountry {
    /// Convert to an Entity; the error names the first problem found
    pub fn into_entity(self) -> Result<Entity, String> {
        let raw_code = self
            .cca3
            .as_deref()
            .or(self.cca2.as_deref())
            .ok_or_else(|| "missing country code".to_string())?;
        let code = normalize(raw_code).map_err(|e| e.to_string())?;

        let display_name = self
            .name
            .and_then(|n| n.common)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| format!("{}: missing display name", code))?;

        let flag_url = self
            .flags
            .and_then(|f| f.png.or(f.svg))
            .ok_or_else(|| format!("{}: missing flag image", code))?;

        let population = self
            .population
            .ok_or_else(|| format!("{}: missing population", code))?;

        let region = self
            .region
            .ok_or_else(|| format!("{}: missing region", code))?;

        Ok(Entity {
            code,
            display_name,
            flag_url,
            capital: self.capital.into_iter().next(),
            population,
            region,
            subregion: self.subregion.filter(|s| !s.is_empty()),
            languages: self.languages.into_values().collect(),
            currencies: self.currencies.into_values().filter_map(|c| c.name).collect(),
            coordinates: Coordinates::from_pair(&self.latlng),
        })
    }
}

/// Parse the catalog response
///
/// The body must be a JSON array. Individual records that fail to convert are
/// skipped and logged; the second value counts them.
pub fn parse_catalog(body: &str) -> Result<(Vec<Entity>, usize), String> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| format!("catalog is not a JSON array: {}", e))?;

    let mut entities = Vec::with_capacity(values.len());
    let mut skipped = 0;
    for value in values {
        let converted = serde_json::from_value::<RawCountry>(value)
            .map_err(|e| e.to_string())
            .and_then(RawCountry::into_entity);
        match converted {
            Ok(entity) => entities.push(entity),
            Err(reason) => {
                log::warn!("Skipping catalog record: {}", reason);
                skipped += 1;
            }
        }
    }
    Ok((entities, skipped))
}

/// The detail endpoint answers with a single record or a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailPayload {
    Many(Vec<RawCountry>),
    One(Box<RawCountry>),
}

/// Outcome of parsing a detail response
#[derive(Debug)]
pub enum DetailParse {
    Found(Entity),
    Empty,
}

pub fn parse_detail(body: &str) -> Result<DetailParse, String> {
    let payload: DetailPayload =
        serde_json::from_str(body).map_err(|e| format!("unexpected detail payload: {}", e))?;
    let raw = match payload {
        DetailPayload::One(raw) => *raw,
        DetailPayload::Many(list) => match list.into_iter().next() {
            Some(raw) => raw,
            None => return Ok(DetailParse::Empty),
        },
    };
    raw.into_entity().map(DetailParse::Found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRANCE: &str = r#"{
        "name": {"common": "France", "official": "French Republic"},
        "flags": {"png": "https://flagcdn.com/w320/fr.png", "svg": "https://flagcdn.com/fr.svg"},
        "capital": ["Paris"],
        "population": 67391582,
        "region": "Europe",
        "subregion": "Western Europe",
        "cca2": "FR",
        "cca3": "FRA",
        "latlng": [46.0, 2.0],
        "languages": {"fra": "French"},
        "currencies": {"EUR": {"name": "Euro", "symbol": "€"}}
    }"#;

    #[test]
    fn test_record_to_entity() {
        let raw: RawCountry = serde_json::from_str(FRANCE).unwrap();
        let entity = raw.into_entity().unwrap();
        assert_eq!(entity.code.as_str(), "FRA");
        assert_eq!(entity.display_name, "France");
        assert_eq!(entity.flag_url, "https://flagcdn.com/w320/fr.png");
        assert_eq!(entity.capital.as_deref(), Some("Paris"));
        assert_eq!(entity.population, 67391582);
        assert_eq!(entity.subregion.as_deref(), Some("Western Europe"));
        assert_eq!(entity.languages, vec!["French"]);
        assert_eq!(entity.currencies, vec!["Euro"]);
        assert_eq!(entity.coordinates, Some(Coordinates::new(46.0, 2.0)));
    }

    #[test]
    fn test_catalog_skips_bad_records() {
        let body = format!(
            r#"[{},
               {{"name": {{"common": "Nowhere"}}, "flags": {{"png": "x"}}, "population": 1, "region": "X", "cca3": "-99"}},
               {{"name": {{"common": "No flag"}}, "population": 1, "region": "X", "cca3": "NFL"}},
               {{"name": {{"common": "Kosovo"}}, "flags": {{"png": "k"}}, "population": 1775378, "region": "Europe", "cca2": "XK"}},
               "garbage"]"#,
            FRANCE
        );
        let (entities, skipped) = parse_catalog(&body).unwrap();
        let codes: Vec<&str> = entities.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["FRA", "UNK"]);
        assert_eq!(skipped, 3);
    }

    #[test]
    fn test_catalog_must_be_an_array() {
        assert!(parse_catalog(r#"{"status": 404, "message": "Not Found"}"#).is_err());
        assert!(parse_catalog("<html>").is_err());
    }

    #[test]
    fn test_detail_single_or_sequence() {
        assert!(matches!(parse_detail(FRANCE).unwrap(), DetailParse::Found(e) if e.code.as_str() == "FRA"));

        let wrapped = format!("[{}]", FRANCE);
        assert!(matches!(parse_detail(&wrapped).unwrap(), DetailParse::Found(e) if e.display_name == "France"));

        assert!(matches!(parse_detail("[]").unwrap(), DetailParse::Empty));
    }

    #[test]
    fn test_detail_with_bad_code_is_an_error() {
        let body = r#"{"name": {"common": "X"}, "flags": {"png": "x"}, "population": 0, "region": "X", "cca3": "N/A"}"#;
        assert!(parse_detail(body).is_err());
    }
}
