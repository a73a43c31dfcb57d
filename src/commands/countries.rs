//! Country commands
//!
//! This module handles:
//! - load_catalog / list_countries / list_regions: browsing the catalog
//! - show_country: the detail view, keyed by the requested code

use serde::Serialize;

use super::state::AppState;
use crate::catalog::{regions, summarize_regions, CatalogQuery, Entity, RegionSummary};
use crate::identity::{normalize, CanonicalKey};
use crate::loader::{LoadState, ResourceSlot};

// ============================================================================
// Data Types
// ============================================================================

/// One row of the catalog listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySummary {
    pub code: CanonicalKey,
    pub name: String,
    pub flag_url: String,
    pub capital: Option<String>,
    pub population: u64,
    pub region: String,
    pub in_bucket_list: bool,
}

/// The detail view of one country
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDetail {
    pub country: Entity,
    pub in_bucket_list: bool,
    /// Set when the fetch failed and a cached snapshot is shown instead
    pub stale_reason: Option<String>,
}

// ============================================================================
// Catalog Commands
// ============================================================================

/// Fetch the catalog once per session; returns the number of countries
pub async fn load_catalog(state: &AppState) -> Result<usize, String> {
    let client = state.client.clone();
    state
        .catalog
        .ensure(ResourceSlot::Catalog, async move { client.fetch_catalog().await })
        .await;

    match state.catalog.state(ResourceSlot::Catalog) {
        LoadState::Loaded(entities) => Ok(entities.len()),
        LoadState::Failed(e) => Err(e.to_string()),
        LoadState::Idle | LoadState::Loading => Err("Country catalog is not loaded".to_string()),
    }
}

pub async fn list_countries(
    state: &AppState,
    search: Option<String>,
    region: Option<String>,
) -> Result<Vec<CountrySummary>, String> {
    load_catalog(state).await?;
    let query = CatalogQuery::new(search, region);
    let bucket_list = state.bucket_list.borrow();

    Ok(state.catalog.with_latest(ResourceSlot::Catalog, |entities| {
        query
            .apply(entities.map(Vec::as_slice).unwrap_or(&[]))
            .into_iter()
            .map(|e| CountrySummary {
                code: e.code,
                name: e.display_name.clone(),
                flag_url: e.flag_url.clone(),
                capital: e.capital.clone(),
                population: e.population,
                region: e.region.clone(),
                in_bucket_list: bucket_list.contains(&e.code),
            })
            .collect()
    }))
}

/// Region names with country and bucket-list counts
pub async fn list_regions(state: &AppState) -> Result<Vec<RegionSummary>, String> {
    load_catalog(state).await?;
    let bucket_list = state.bucket_list.borrow();
    Ok(state.catalog.with_latest(ResourceSlot::Catalog, |entities| {
        summarize_regions(entities.map(Vec::as_slice).unwrap_or(&[]), &*bucket_list)
    }))
}

/// Region names only, for filter pickers
pub async fn region_names(state: &AppState) -> Result<Vec<String>, String> {
    load_catalog(state).await?;
    Ok(state
        .catalog
        .with_latest(ResourceSlot::Catalog, |entities| regions(entities.map(Vec::as_slice).unwrap_or(&[]))))
}

// ============================================================================
// Detail Commands
// ============================================================================

/// Fetch a country's detail record (alpha-2 or alpha-3 code)
///
/// Each call re-fetches and makes the code the current country. If another
/// country became current while the fetch was in flight, the late result is
/// not shown and the call fails as superseded. If the fetch fails, the last
/// loaded detail (or the bucket-list snapshot) is returned with `stale_reason`
/// set.
pub async fn show_country(state: &AppState, code: String) -> Result<CountryDetail, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;
    state.current_country.set(Some(key));

    let client = state.client.clone();
    let slot = ResourceSlot::Detail(key);
    state
        .details
        .request(slot, async move { client.fetch_detail(key).await })
        .await;

    current_detail_view(state, key)
}

/// The detail view for `key`, only while it is still the current country
pub fn current_detail_view(state: &AppState, key: CanonicalKey) -> Result<CountryDetail, String> {
    match state.current_country.get() {
        Some(current) if current != key => {
            log::debug!("Dropping detail view of {}: {} is current", key, current);
            Err(format!("Details for {} were superseded by {}", key, current))
        }
        _ => detail_view(state, key),
    }
}

/// Build the detail view from whatever the detail slot currently holds
pub fn detail_view(state: &AppState, key: CanonicalKey) -> Result<CountryDetail, String> {
    let slot = ResourceSlot::Detail(key);
    let bucket_list = state.bucket_list.borrow();
    let in_bucket_list = bucket_list.contains(&key);

    match state.details.state(slot) {
        LoadState::Loaded(country) => Ok(CountryDetail {
            country,
            in_bucket_list,
            stale_reason: None,
        }),
        LoadState::Failed(e) => {
            let cached = state.details.latest(slot).or_else(|| bucket_list.get(&key).cloned());
            match cached {
                Some(country) => {
                    log::warn!("Showing cached snapshot of {}: {}", key, e);
                    Ok(CountryDetail {
                        country,
                        in_bucket_list,
                        stale_reason: Some(e.to_string()),
                    })
                }
                None => Err(e.to_string()),
            }
        }
        LoadState::Idle | LoadState::Loading => Err(format!("Details for {} are still loading", key)),
    }
}

/// Latest detail record for a key, fetching it if this session has none
pub(crate) async fn resolve_entity(state: &AppState, key: CanonicalKey) -> Result<Entity, String> {
    if let Some(entity) = state.details.latest(ResourceSlot::Detail(key)) {
        return Ok(entity);
    }
    show_country(state, key.to_string()).await.map(|detail| detail.country)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchError;
    use crate::commands::test_support::{country, test_state};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_list_countries_filters_and_marks_bucket_list() {
        let state = test_state();
        state
            .catalog
            .request(ResourceSlot::Catalog, async {
                Ok(vec![
                    country("FRA", "France", "Europe"),
                    country("DEU", "Germany", "Europe"),
                    country("JPN", "Japan", "Asia"),
                ])
            })
            .await;
        state.bucket_list.borrow_mut().add(country("JPN", "Japan", "Asia")).unwrap();

        let europe = list_countries(&state, None, Some("Europe".to_string())).await.unwrap();
        assert_eq!(europe.len(), 2);
        assert!(europe.iter().all(|c| !c.in_bucket_list));

        let japan = list_countries(&state, Some("jap".to_string()), None).await.unwrap();
        assert_eq!(japan.len(), 1);
        assert!(japan[0].in_bucket_list);

        let regions = list_regions(&state).await.unwrap();
        let asia = regions.iter().find(|r| r.region == "Asia").unwrap();
        assert_eq!(asia.selected_count, 1);
        assert_eq!(region_names(&state).await.unwrap(), vec!["Asia", "Europe"]);
    }

    #[tokio::test]
    async fn test_show_country_rejects_bad_codes() {
        let state = test_state();
        let err = show_country(&state, "-99".to_string()).await.unwrap_err();
        assert!(err.contains("-99"));
        assert_eq!(state.current_country.get(), None);
    }

    #[tokio::test]
    async fn test_failed_detail_falls_back_to_snapshot() {
        let state = test_state();
        let key = normalize("PER").unwrap();
        state.bucket_list.borrow_mut().add(country("PER", "Peru", "Americas")).unwrap();

        let slot = ResourceSlot::Detail(key);
        state
            .details
            .request(slot, async { Err(FetchError::network("detail:PER", "offline")) })
            .await;

        let detail = detail_view(&state, key).unwrap();
        assert_eq!(detail.country.display_name, "Peru");
        assert!(detail.in_bucket_list);
        assert!(detail.stale_reason.is_some());

        // Nothing cached anywhere: the failure surfaces
        let other = normalize("CHL").unwrap();
        state
            .details
            .request(ResourceSlot::Detail(other), async { Err(FetchError::network("detail:CHL", "offline")) })
            .await;
        assert!(detail_view(&state, other).unwrap_err().contains("offline"));
    }

    #[tokio::test]
    async fn test_late_detail_of_previous_country_is_not_shown() {
        let state = test_state();
        let fra = normalize("FRA").unwrap();
        let deu = normalize("DEU").unwrap();

        // FRA is opened and its fetch stays in flight
        state.current_country.set(Some(fra));
        let (tx, rx) = oneshot::channel();
        let fra_fetch = state.details.request(ResourceSlot::Detail(fra), async move {
            rx.await.map_err(|_| FetchError::network("detail:FRA", "dropped"))
        });

        // The user switches to DEU, which resolves first
        state.current_country.set(Some(deu));
        state
            .details
            .request(ResourceSlot::Detail(deu), async { Ok(country("DEU", "Germany", "Europe")) })
            .await;
        assert_eq!(current_detail_view(&state, deu).unwrap().country.display_name, "Germany");

        tx.send(country("FRA", "France", "Europe")).unwrap();
        fra_fetch.await;

        let err = current_detail_view(&state, fra).unwrap_err();
        assert!(err.contains("superseded by DEU"));
        assert_eq!(state.current_country.get(), Some(deu));
        assert_eq!(current_detail_view(&state, deu).unwrap().country.display_name, "Germany");
    }

    #[tokio::test]
    async fn test_resolve_entity_uses_loaded_detail() {
        let state = test_state();
        let key = normalize("FRA").unwrap();
        state
            .details
            .request(ResourceSlot::Detail(key), async { Ok(country("FRA", "France", "Europe")) })
            .await;
        let entity = resolve_entity(&state, key).await.unwrap();
        assert_eq!(entity.display_name, "France");
    }
}
