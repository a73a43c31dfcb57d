//! Command Handlers
//!
//! The intent boundary the front end calls. Handlers take the shared
//! `AppState` and report errors as plain strings for display.
//!
//! ## Module Organization
//! - `state` - Application state shared by all handlers
//! - `countries` - Catalog browsing and the detail view
//! - `bucket_list` - Bucket list reads and edits
//! - `map` - Map loading, rendering and pointer events

mod state;
pub mod bucket_list;
pub mod countries;
pub mod map;

pub use state::{AppState, BucketList};
