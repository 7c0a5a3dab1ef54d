//! Port traits decoupling the domain from storage, configuration, and
//! progress delivery.

pub mod candle_port;
pub mod config_port;
pub mod progress_port;
