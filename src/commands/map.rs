//! Map commands
//!
//! This module handles:
//! - load_map: fetch the feature collection once and correlate it
//! - render_map / map_overview: per-feature states, viewport and markers
//! - hover_feature / leave_feature / click_feature: pointer events
//! - feature_for_country: key -> feature lookup for callers that only know codes

use serde::Serialize;

use super::state::AppState;
use crate::identity::normalize;
use crate::loader::{LoadState, ResourceSlot};
use crate::map::{bucket_list_markers, FeatureId, FeatureState, MapIntent, MapView, Marker, RenderedFeature};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOverview {
    pub view: MapView,
    pub feature_count: usize,
    pub interactive_count: usize,
    pub selected_count: usize,
    pub markers: Vec<Marker>,
}

/// Fetch features once per session and derive every feature's state
pub async fn load_map(state: &AppState) -> Result<usize, String> {
    let client = state.client.clone();
    let source = state.config.features_source.clone();
    let fields = state.identity_fields.clone();
    let requested = state
        .features
        .ensure(ResourceSlot::Features, async move { client.fetch_features(&source, &fields).await })
        .await;

    match state.features.state(ResourceSlot::Features) {
        LoadState::Loaded(features) => {
            if requested.is_some() || !state.map.borrow().is_loaded() {
                let count = features.len();
                state.map.borrow_mut().load(features, &*state.bucket_list.borrow());
                // Events queued so far are already reflected
                state.sync_map();
                return Ok(count);
            }
            Ok(features.len())
        }
        LoadState::Failed(e) => Err(e.to_string()),
        LoadState::Idle | LoadState::Loading => Err("Map features are not loaded".to_string()),
    }
}

pub async fn render_map(state: &AppState) -> Result<Vec<RenderedFeature>, String> {
    load_map(state).await?;
    Ok(state.map.borrow().render())
}

/// Viewport, counts and bucket-list markers for an optional region
pub async fn map_overview(state: &AppState, region: Option<String>) -> Result<MapOverview, String> {
    load_map(state).await?;
    let map = state.map.borrow();
    let selected = state.bucket_list.borrow().list();
    Ok(MapOverview {
        view: MapView::for_region(region.as_deref()),
        feature_count: map.features().len(),
        interactive_count: map.features().interactive_count(),
        selected_count: map.selected_count(),
        markers: bucket_list_markers(&selected, region.as_deref()),
    })
}

/// First feature carrying a country code
pub fn feature_for_country(state: &AppState, code: String) -> Result<FeatureId, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;
    state
        .map
        .borrow()
        .features()
        .features_for(&key)
        .first()
        .copied()
        .ok_or_else(|| format!("No interactive map feature for {}", key))
}

pub fn hover_feature(state: &AppState, id: usize) -> Option<FeatureState> {
    state.map.borrow_mut().hover_enter(FeatureId(id))
}

pub fn leave_feature(state: &AppState, id: usize) -> Option<FeatureState> {
    state.map.borrow_mut().hover_leave(FeatureId(id))
}

/// Click a feature; the caller routes the returned intent
pub fn click_feature(state: &AppState, id: usize) -> Option<MapIntent> {
    state.map.borrow().click(FeatureId(id))
}
