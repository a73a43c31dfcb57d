//! Application State
//!
//! Everything the command handlers share: configuration, the provider client,
//! the bucket list, the three loaders and the map correlation.
//!
//! Single-threaded: interior mutability through `RefCell`/`Cell`, and no
//! handler holds a borrow across an await.

use std::cell::{Cell, RefCell};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::catalog::Entity;
use crate::client::CountryClient;
use crate::config::AppConfig;
use crate::identity::CanonicalKey;
use crate::loader::Loader;
use crate::map::{FeatureCollection, IdentityFields, MapCorrelation};
use crate::selection::{FileStorage, SelectionEvent, SelectionStore, SlotStorage};

/// The bucket list over whichever storage backend the session uses
pub type BucketList = SelectionStore<Box<dyn SlotStorage>>;

pub struct AppState {
    pub config: AppConfig,
    pub client: CountryClient,
    pub identity_fields: IdentityFields,
    pub bucket_list: RefCell<BucketList>,
    pub catalog: Loader<Vec<Entity>>,
    pub details: Loader<Entity>,
    pub features: Loader<FeatureCollection>,
    pub map: RefCell<MapCorrelation>,
    /// Country the detail view currently shows
    pub current_country: Cell<Option<CanonicalKey>>,
    selection_events: RefCell<UnboundedReceiver<SelectionEvent>>,
}

impl AppState {
    /// State backed by the configured data directory
    pub fn open(config: AppConfig) -> Result<Self, String> {
        let storage = FileStorage::open(&config.data_dir).map_err(|e| e.to_string())?;
        Self::with_storage(config, Box::new(storage))
    }

    /// State over an explicit storage backend
    pub fn with_storage(config: AppConfig, storage: Box<dyn SlotStorage>) -> Result<Self, String> {
        let client = CountryClient::new(config.api_base.clone(), config.timeout).map_err(|e| e.to_string())?;
        let mut bucket_list = SelectionStore::restore(storage);
        let selection_events = bucket_list.subscribe();

        log::info!(
            "WorldWander state ready: {} countries on the bucket list, provider {}",
            bucket_list.len(),
            client.base_url()
        );

        Ok(Self {
            identity_fields: config.identity_fields(),
            config,
            client,
            bucket_list: RefCell::new(bucket_list),
            catalog: Loader::new(),
            details: Loader::new(),
            features: Loader::new(),
            map: RefCell::new(MapCorrelation::new()),
            current_country: Cell::new(None),
            selection_events: RefCell::new(selection_events),
        })
    }

    /// Feed pending bucket-list events to the map so only changed keys update
    pub fn sync_map(&self) {
        let mut events = self.selection_events.borrow_mut();
        let mut map = self.map.borrow_mut();
        while let Ok(event) = events.try_recv() {
            map.apply_selection_event(&event);
        }
    }
}
