//! Concrete implementations of the port traits.

pub mod cached_store;
pub mod csv_candles;
pub mod file_config_adapter;
