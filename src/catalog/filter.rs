//! Catalog browsing: search, region filter and per-region bucket-list counts.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Entity;
use crate::selection::SelectionLookup;

/// Search and region filter over the loaded catalog
///
/// Empty or whitespace-only fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub region: Option<String>,
}

impl CatalogQuery {
    pub fn new(search: Option<String>, region: Option<String>) -> Self {
        Self { search, region }
    }

    /// True when neither a search term nor a region is set
    pub fn is_empty(&self) -> bool {
        non_blank(&self.search).is_none() && non_blank(&self.region).is_none()
    }

    /// Case-insensitive substring match on the display name, exact match on region
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(term) = non_blank(&self.search) {
            if !entity.display_name.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(region) = non_blank(&self.region) {
            if entity.region != region {
                return false;
            }
        }
        true
    }

    /// Entities matching this query, in catalog order
    pub fn apply<'a>(&self, entities: &'a [Entity]) -> Vec<&'a Entity> {
        entities.iter().filter(|e| self.matches(e)).collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Distinct, non-empty regions in sorted order
pub fn regions(entities: &[Entity]) -> Vec<String> {
    let mut regions: Vec<String> = entities
        .iter()
        .map(|e| e.region.clone())
        .filter(|r| !r.is_empty())
        .collect();
    regions.sort();
    regions.dedup();
    regions
}

/// Country and bucket-list counts for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub country_count: usize,
    pub selected_count: usize,
}

/// One summary per region, sorted by region name
///
/// Membership goes through the selection's key index, one O(1) test per entity.
pub fn summarize_regions<S: SelectionLookup + ?Sized>(entities: &[Entity], selection: &S) -> Vec<RegionSummary> {
    let mut by_region: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for entity in entities.iter().filter(|e| !e.region.is_empty()) {
        let counts = by_region.entry(entity.region.as_str()).or_insert((0, 0));
        counts.0 += 1;
        if selection.contains(&entity.code) {
            counts.1 += 1;
        }
    }
    by_region
        .into_iter()
        .map(|(region, (country_count, selected_count))| RegionSummary {
            region: region.to_string(),
            country_count,
            selected_count,
        })
        .collect()
}
