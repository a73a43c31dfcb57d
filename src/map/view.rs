//! Map viewport per region and bucket-list markers.

use serde::Serialize;

use crate::catalog::{Coordinates, Entity};
use crate::identity::CanonicalKey;

/// Center and zoom level of the map viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

/// Whole-world view used when no region (or an unknown one) is selected
pub const WORLD_VIEW: MapView = MapView {
    center: Coordinates::new(20.0, 0.0),
    zoom: 2,
};

/// Fixed viewports for the provider's region names: (region, lat, lon, zoom)
const REGION_VIEWS: &[(&str, f64, f64, u8)] = &[
    ("Africa", 0.0, 20.0, 3),
    ("Americas", 0.0, -80.0, 2),
    ("Asia", 30.0, 100.0, 3),
    ("Europe", 50.0, 10.0, 4),
    ("Oceania", -25.0, 135.0, 4),
];

impl MapView {
    pub fn for_region(region: Option<&str>) -> Self {
        let Some(region) = region.map(str::trim).filter(|r| !r.is_empty()) else {
            return WORLD_VIEW;
        };
        REGION_VIEWS
            .iter()
            .find(|(name, ..)| *name == region)
            .map(|&(_, lat, lon, zoom)| MapView {
                center: Coordinates::new(lat, lon),
                zoom,
            })
            .unwrap_or(WORLD_VIEW)
    }
}

/// Pin for one bucket-list country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub code: CanonicalKey,
    pub label: String,
    pub position: Coordinates,
}

/// Markers for selected countries that carry coordinates, optionally one region only
pub fn bucket_list_markers(selected: &[Entity], region: Option<&str>) -> Vec<Marker> {
    let region = region.map(str::trim).filter(|r| !r.is_empty());
    selected
        .iter()
        .filter(|e| region.map_or(true, |r| e.region == r))
        .filter_map(|e| {
            e.coordinates.map(|position| Marker {
                code: e.code,
                label: e.display_name.clone(),
                position,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;

    #[test]
    fn test_region_views() {
        assert_eq!(MapView::for_region(Some("Europe")).zoom, 4);
        assert_eq!(MapView::for_region(Some("Europe")).center, Coordinates::new(50.0, 10.0));
        assert_eq!(MapView::for_region(Some("Americas")).center, Coordinates::new(0.0, -80.0));
        assert_eq!(MapView::for_region(None), WORLD_VIEW);
        assert_eq!(MapView::for_region(Some("")), WORLD_VIEW);
        assert_eq!(MapView::for_region(Some("Antarctic")), WORLD_VIEW);
    }

    #[test]
    fn test_markers_need_coordinates() {
        let mut france = Entity::new(normalize("FRA").unwrap(), "France");
        france.region = "Europe".to_string();
        france.coordinates = Some(Coordinates::new(46.0, 2.0));
        let mut japan = Entity::new(normalize("JPN").unwrap(), "Japan");
        japan.region = "Asia".to_string();
        japan.coordinates = Some(Coordinates::new(36.0, 138.0));
        let unknown = Entity::new(normalize("DEU").unwrap(), "Germany");

        let selected = vec![france, japan, unknown];
        let all = bucket_list_markers(&selected, None);
        assert_eq!(all.len(), 2);

        let asia = bucket_list_markers(&selected, Some("Asia"));
        assert_eq!(asia.len(), 1);
        assert_eq!(asia[0].label, "Japan");
    }
}
