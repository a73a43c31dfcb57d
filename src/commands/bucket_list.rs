//! Bucket list commands
//!
//! This module handles:
//! - get_bucket_list / is_in_bucket_list: reading the list
//! - add_to_bucket_list / remove_from_bucket_list: explicit list edits
//! - toggle_bucket_list: the detail-page button
//! - take_restore_warning: the one-time restore diagnostic
//!
//! Every mutation is persisted before the handler returns; the map picks the
//! change up through the store's event channel.

use serde::Serialize;

use super::countries::resolve_entity;
use super::state::AppState;
use crate::catalog::Entity;
use crate::identity::normalize;
use crate::selection::{AddOutcome, Toggled};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketListView {
    pub countries: Vec<Entity>,
    pub count: usize,
}

pub fn get_bucket_list(state: &AppState) -> Result<BucketListView, String> {
    let bucket_list = state.bucket_list.borrow();
    let countries = bucket_list.list();
    Ok(BucketListView {
        count: countries.len(),
        countries,
    })
}

pub fn is_in_bucket_list(state: &AppState, code: String) -> Result<bool, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;
    Ok(state.bucket_list.borrow().contains(&key))
}

/// Add a country, storing its freshest detail snapshot
pub async fn add_to_bucket_list(state: &AppState, code: String) -> Result<AddOutcome, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;
    let entity = resolve_entity(state, key).await?;

    let outcome = state.bucket_list.borrow_mut().add(entity).map_err(|e| e.to_string())?;
    state.sync_map();
    Ok(outcome)
}

/// Remove a country; removing one that is not on the list is not an error
pub fn remove_from_bucket_list(state: &AppState, code: String) -> Result<bool, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;
    let removed = state.bucket_list.borrow_mut().remove(&key).map_err(|e| e.to_string())?;
    if !removed {
        log::debug!("{} was not on the bucket list", key);
    }
    state.sync_map();
    Ok(removed)
}

/// Detail-page toggle: remove if present, otherwise add
pub async fn toggle_bucket_list(state: &AppState, code: String) -> Result<Toggled, String> {
    let key = normalize(&code).map_err(|e| e.to_string())?;

    // Removing needs no fetch; the stored snapshot identifies the entry
    let stored = state.bucket_list.borrow().get(&key).cloned();
    let entity = match stored {
        Some(entity) => entity,
        None => resolve_entity(state, key).await?,
    };

    let mut bucket_list = state.bucket_list.borrow_mut();
    let toggled = state
        .map
        .borrow_mut()
        .toggle(&mut *bucket_list, entity)
        .map_err(|e| e.to_string())?;
    drop(bucket_list);

    state.sync_map();
    Ok(toggled)
}

/// Restore diagnostic, reported once per session
pub fn take_restore_warning(state: &AppState) -> Option<String> {
    state.bucket_list.borrow_mut().take_diagnostic().map(|d| d.to_string())
}
