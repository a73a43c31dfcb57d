// =============================================================================
// Map Correlation - Features x Bucket List
// =============================================================================
//
// Reconciles the loaded feature collection with the selection store and turns
// pointer events into state changes or a navigation intent.
//
// Rules:
// - A feature's initial state is Selected when its key is on the bucket list,
//   Default otherwise. Membership is an O(1) lookup per feature.
// - Hover only changes the hover dimension; selection only changes the
//   selection dimension.
// - Clicking an interactive feature yields `MapIntent::Navigate(key)`. Clicking
//   NEVER changes the bucket list; adding happens on the detail page.
// - Non-interactive features (no usable identity, or block-listed) ignore every
//   event and always render Default.
//
// After a store mutation only the features carrying the mutated key are
// updated (`apply_selection_event` / `sync_key`); `refresh` recomputes all.

pub mod feature;
pub mod state;
pub mod view;

use serde::Serialize;

use crate::catalog::Entity;
use crate::identity::CanonicalKey;
use crate::selection::{SelectionEvent, SelectionLookup, SelectionStore, SlotStorage, StoreError, Toggled};

pub use feature::{Feature, FeatureCollection, FeatureId, IdentityFields};
pub use state::{FeatureState, FeatureStyle};
pub use view::{bucket_list_markers, MapView, Marker, WORLD_VIEW};

/// Intent handed to the routing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MapIntent {
    /// Show the detail page for this country
    Navigate(CanonicalKey),
}

/// One feature as the renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedFeature {
    pub id: usize,
    pub code: Option<CanonicalKey>,
    pub label: String,
    pub interactive: bool,
    pub state: FeatureState,
    pub style: FeatureStyle,
}

/// Per-feature render state over the loaded collection
#[derive(Debug, Default)]
pub struct MapCorrelation {
    features: FeatureCollection,
    states: Vec<FeatureState>,
    loaded: bool,
}

impl MapCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a feature collection and derive every state from the selection
    pub fn load<S: SelectionLookup + ?Sized>(&mut self, features: FeatureCollection, selection: &S) {
        self.states = vec![FeatureState::Default; features.len()];
        self.features = features;
        self.loaded = true;
        self.refresh(selection);
        log::debug!(
            "Map correlation loaded: {} features, {} selected",
            self.features.len(),
            self.selected_count()
        );
    }

    /// Recompute selection membership for every feature, keeping hover
    pub fn refresh<S: SelectionLookup + ?Sized>(&mut self, selection: &S) {
        for (id, feature) in self.features.iter() {
            let state = match feature.key {
                Some(key) => self.states[id.0].with_selected(selection.contains(&key)),
                None => FeatureState::Default,
            };
            self.states[id.0] = state;
        }
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    /// True once a collection was installed, even an empty one
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn state(&self, id: FeatureId) -> Option<FeatureState> {
        self.states.get(id.0).copied()
    }

    pub fn style(&self, id: FeatureId) -> Option<FeatureStyle> {
        self.state(id).map(|s| s.style())
    }

    /// State of the first feature carrying this key
    pub fn state_for_key(&self, key: &CanonicalKey) -> Option<FeatureState> {
        self.features.features_for(key).first().and_then(|id| self.state(*id))
    }

    pub fn selected_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_selected()).count()
    }

    pub fn hover_enter(&mut self, id: FeatureId) -> Option<FeatureState> {
        self.transition(id, FeatureState::on_hover_enter)
    }

    pub fn hover_leave(&mut self, id: FeatureId) -> Option<FeatureState> {
        self.transition(id, FeatureState::on_hover_leave)
    }

    /// Navigation intent for an interactive feature, nothing otherwise
    pub fn click(&self, id: FeatureId) -> Option<MapIntent> {
        let feature = self.features.get(id)?;
        match feature.key {
            Some(key) => {
                log::debug!("Feature {} ({}) clicked, navigating to {}", id, feature.label(), key);
                Some(MapIntent::Navigate(key))
            }
            None => {
                log::trace!("Ignoring click on non-interactive feature {} ({})", id, feature.label());
                None
            }
        }
    }

    /// Update the features of one key after a store mutation event
    pub fn apply_selection_event(&mut self, event: &SelectionEvent) {
        match event {
            SelectionEvent::Added(key) | SelectionEvent::Refreshed(key) => self.set_selected(key, true),
            SelectionEvent::Removed(key) => self.set_selected(key, false),
        }
    }

    /// Re-read one key's membership from the selection
    pub fn sync_key<S: SelectionLookup + ?Sized>(&mut self, key: &CanonicalKey, selection: &S) {
        self.set_selected(key, selection.contains(key));
    }

    /// Detail-page toggle: remove if on the bucket list, add otherwise
    pub fn toggle<S: SlotStorage>(
        &mut self,
        store: &mut SelectionStore<S>,
        entity: Entity,
    ) -> Result<Toggled, StoreError> {
        let key = entity.code;
        let toggled = store.toggle(entity)?;
        self.sync_key(&key, &*store);
        Ok(toggled)
    }

    /// Every feature with its current state and style, in collection order
    pub fn render(&self) -> Vec<RenderedFeature> {
        self.features
            .iter()
            .map(|(id, feature)| {
                let state = self.states.get(id.0).copied().unwrap_or(FeatureState::Default);
                RenderedFeature {
                    id: id.0,
                    code: feature.key,
                    label: feature.label().to_string(),
                    interactive: feature.is_interactive(),
                    state,
                    style: state.style(),
                }
            })
            .collect()
    }

    fn set_selected(&mut self, key: &CanonicalKey, selected: bool) {
        for id in self.features.features_for(key) {
            if let Some(state) = self.states.get_mut(id.0) {
                *state = state.with_selected(selected);
            }
        }
    }

    fn transition(&mut self, id: FeatureId, f: impl FnOnce(FeatureState) -> FeatureState) -> Option<FeatureState> {
        if !self.features.get(id)?.is_interactive() {
            return None;
        }
        let state = self.states.get_mut(id.0)?;
        *state = f(*state);
        Some(*state)
    }
}
