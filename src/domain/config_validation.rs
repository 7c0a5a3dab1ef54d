//! Configuration validation for the CLI boundary.
//!
//! Checks every run and strategy field before any candles are fetched.

use chrono::DateTime;

use crate::domain::candle::Timeframe;
use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_initial_balance(config)?;
    validate_fees(config)?;
    validate_risk_free_rate(config)?;
    validate_range(config)?;
    validate_symbol(config)?;
    validate_timeframe(config)?;
    validate_max_concurrent(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_sizing(config)?;
    validate_stop_loss(config)?;
    validate_take_profit(config)?;
    validate_rules(config)?;
    Ok(())
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("run", "initial_balance", 0.0);
    if value <= 0.0 {
        return Err(EngineError::ConfigInvalid {
            section: "run".to_string(),
            key: "initial_balance".to_string(),
            reason: "initial_balance must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_fees(config: &dyn ConfigPort) -> Result<(), EngineError> {
    for key in ["fee_per_trade", "fee_pct"] {
        let value = config.get_double("run", key, 0.0);
        if value < 0.0 {
            return Err(EngineError::ConfigInvalid {
                section: "run".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be non-negative"),
            });
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("run", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(EngineError::ConfigInvalid {
            section: "run".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_range(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let start = parse_timestamp(config.get_string("run", "start").as_deref(), "start")?;
    let end = parse_timestamp(config.get_string("run", "end").as_deref(), "end")?;
    if start >= end {
        return Err(EngineError::ConfigInvalid {
            section: "run".to_string(),
            key: "start".to_string(),
            reason: "start must be before end".to_string(),
        });
    }
    Ok(())
}

fn parse_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<DateTime<chrono::FixedOffset>, EngineError> {
    match value {
        None => Err(EngineError::ConfigMissing {
            section: "run".to_string(),
            key: field.to_string(),
        }),
        Some(s) => DateTime::parse_from_rfc3339(s).map_err(|_| EngineError::ConfigInvalid {
            section: "run".to_string(),
            key: field.to_string(),
            reason: format!("invalid {field} format, expected RFC 3339"),
        }),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("run", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(EngineError::ConfigMissing {
            section: "run".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), EngineError> {
    match config.get_string("run", "timeframe") {
        None => Err(EngineError::ConfigMissing {
            section: "run".to_string(),
            key: "timeframe".to_string(),
        }),
        Some(s) => {
            s.parse::<Timeframe>()
                .map(|_| ())
                .map_err(|_| EngineError::ConfigInvalid {
                    section: "run".to_string(),
                    key: "timeframe".to_string(),
                    reason: format!("unknown timeframe '{s}'"),
                })
        }
    }
}

fn validate_max_concurrent(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_int("run", "max_concurrent_runs", 2);
    if value < 1 {
        return Err(EngineError::ConfigInvalid {
            section: "run".to_string(),
            key: "max_concurrent_runs".to_string(),
            reason: "max_concurrent_runs must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let mode = config
        .get_string("strategy", "sizing_mode")
        .unwrap_or_else(|| "fixed".to_string());
    let key = match mode.as_str() {
        "fixed" => "fraction",
        "risk" => "risk_per_trade",
        other => {
            return Err(EngineError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "sizing_mode".to_string(),
                reason: format!("unknown sizing_mode '{other}', expected fixed or risk"),
            });
        }
    };
    let value = config.get_double("strategy", key, 0.0);
    if value <= 0.0 || value > 1.0 {
        return Err(EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be between 0 and 1"),
        });
    }
    let cap = config.get_double("strategy", "max_position_size", 1.0);
    if cap <= 0.0 || cap > 1.0 {
        return Err(EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "max_position_size".to_string(),
            reason: "max_position_size must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_stop_loss(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("strategy", "stop_loss_pct", 0.0);
    if value < 0.0 {
        return Err(EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "stop_loss_pct".to_string(),
            reason: "stop_loss_pct must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_take_profit(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let value = config.get_double("strategy", "take_profit_pct", 0.0);
    if value < 0.0 {
        return Err(EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "take_profit_pct".to_string(),
            reason: "take_profit_pct must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_rules(config: &dyn ConfigPort) -> Result<(), EngineError> {
    for key in ["entry", "exit"] {
        match config.get_string("strategy", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(EngineError::ConfigMissing {
                    section: "strategy".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}
