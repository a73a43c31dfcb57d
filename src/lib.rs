// WorldWander Library
// Country catalog, persisted bucket list and map correlation.

pub mod catalog;
pub mod client;
pub mod commands;
pub mod config;
pub mod identity;
pub mod loader;
pub mod map;
pub mod selection;
