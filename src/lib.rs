//! quantsim — candle-series strategy backtesting engine.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], bounded run scheduling in
//! [`coordinator`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod coordinator;
pub mod cli;
