//! Progress delivery port.
//!
//! Sinks must never block the simulation loop; implementations either do
//! trivial work or hand off to a channel and drop updates nobody is reading.

use std::sync::mpsc;

use crate::domain::engine::RunStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub run_id: String,
    pub status: RunStatus,
    pub percent_complete: u8,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, update: ProgressUpdate);
}

/// Discards every update.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _update: ProgressUpdate) {}
}

/// Forwards updates over an mpsc channel; a closed receiver is ignored so a
/// departed listener never stalls a run.
pub struct ChannelProgressSink {
    sender: mpsc::Sender<ProgressUpdate>,
}

impl ChannelProgressSink {
    pub fn new(sender: mpsc::Sender<ProgressUpdate>) -> Self {
        ChannelProgressSink { sender }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, update: ProgressUpdate) {
        let _ = self.sender.send(update);
    }
}
