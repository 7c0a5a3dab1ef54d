//! Engine error taxonomy.
//!
//! Indicator/rule-level conditions (`InsufficientData`, `InvalidParameter`)
//! are handled locally with documented fallbacks and never abort a run.
//! Run-level conditions (`StorageUnavailable`, `SimulationFailure`) abort only
//! the affected run.

/// Top-level error type for quantsim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("insufficient data: have {have} candles, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("invalid parameter {param} for {indicator}: {reason}")]
    InvalidParameter {
        indicator: String,
        param: String,
        reason: String,
    },

    #[error("candle store unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("simulation {run_id} failed at candle {last_index}: {reason}")]
    SimulationFailure {
        run_id: String,
        last_index: usize,
        reason: String,
    },

    #[error("run {run_id} is already in progress")]
    AlreadyRunning { run_id: String },

    #[error("candle series not strictly ascending at index {index}")]
    UnsortedCandles { index: usize },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io { .. } => 1,
            EngineError::ConfigMissing { .. } | EngineError::ConfigInvalid { .. } => 2,
            EngineError::StorageUnavailable { .. } => 3,
            EngineError::InvalidParameter { .. } | EngineError::UnsortedCandles { .. } => 4,
            EngineError::InsufficientData { .. } => 5,
            EngineError::SimulationFailure { .. } | EngineError::AlreadyRunning { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
