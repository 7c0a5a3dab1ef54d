//! Pure domain logic: candles, indicators, rules, simulation, analytics.

pub mod analytics;
pub mod candle;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod position;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod sizing;
pub mod strategy;
