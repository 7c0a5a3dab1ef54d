//! Run coordinator: bounded worker pool with a FIFO submission queue.
//!
//! Submissions beyond the worker count queue in order. A run id is unique
//! while its run is pending or running; resubmitting after a terminal state
//! replaces the old record. Cancellation sets a flag the engine checks once
//! per candle step.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tracing::{info, warn};

use crate::domain::candle::Candle;
use crate::domain::engine::{run, RunOutcome, RunStatus};
use crate::domain::error::EngineError;
use crate::domain::strategy::Strategy;
use crate::ports::progress_port::ProgressSink;

pub struct RunRequest {
    pub run_id: String,
    pub strategy: Strategy,
    pub candles: Vec<Candle>,
    pub initial_balance: f64,
}

struct RunRecord {
    status: RunStatus,
    cancel: Arc<AtomicBool>,
    outcome: Option<RunOutcome>,
}

struct Job {
    request: RunRequest,
    cancel: Arc<AtomicBool>,
}

pub struct RunCoordinator {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
    runs: Arc<Mutex<HashMap<String, RunRecord>>>,
}

impl RunCoordinator {
    pub fn new(max_concurrent: usize, progress: Arc<dyn ProgressSink>) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let runs: Arc<Mutex<HashMap<String, RunRecord>>> = Arc::new(Mutex::new(HashMap::new()));

        let workers = (0..max_concurrent.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let runs = Arc::clone(&runs);
                let progress = Arc::clone(&progress);
                thread::spawn(move || loop {
                    let job = {
                        let guard = match receiver.lock() {
                            Ok(guard) => guard,
                            Err(_) => return,
                        };
                        guard.recv()
                    };
                    let Ok(job) = job else { return };

                    let run_id = job.request.run_id.clone();
                    info!(worker_id, run_id, "worker picked up run");
                    if let Ok(mut runs) = runs.lock() {
                        if let Some(record) = runs.get_mut(&run_id) {
                            record.status = RunStatus::Running;
                        }
                    }

                    let outcome = run(
                        &run_id,
                        &job.request.strategy,
                        &job.request.candles,
                        job.request.initial_balance,
                        progress.as_ref(),
                        &job.cancel,
                    );

                    if let Ok(mut runs) = runs.lock() {
                        if let Some(record) = runs.get_mut(&run_id) {
                            record.status = outcome.status;
                            record.outcome = Some(outcome);
                        }
                    }
                })
            })
            .collect();

        RunCoordinator {
            sender: Some(sender),
            workers,
            runs,
        }
    }

    /// Queue a run. Rejects ids that are still pending or running; ids in a
    /// terminal state are replaced.
    pub fn submit(&self, request: RunRequest) -> Result<(), EngineError> {
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut runs = self.runs.lock().map_err(|_| EngineError::SimulationFailure {
                run_id: request.run_id.clone(),
                last_index: 0,
                reason: "run registry poisoned".to_string(),
            })?;
            if let Some(record) = runs.get(&request.run_id) {
                if !record.status.is_terminal() {
                    warn!(run_id = request.run_id, "duplicate submission rejected");
                    return Err(EngineError::AlreadyRunning {
                        run_id: request.run_id.clone(),
                    });
                }
            }
            runs.insert(
                request.run_id.clone(),
                RunRecord {
                    status: RunStatus::Pending,
                    cancel: Arc::clone(&cancel),
                    outcome: None,
                },
            );
        }

        info!(run_id = request.run_id, "run submitted");
        if let Some(sender) = &self.sender {
            sender
                .send(Job { request, cancel })
                .map_err(|e| EngineError::SimulationFailure {
                    run_id: e.0.request.run_id.clone(),
                    last_index: 0,
                    reason: "worker pool shut down".to_string(),
                })?;
        }
        Ok(())
    }

    pub fn status(&self, run_id: &str) -> Option<RunStatus> {
        self.runs
            .lock()
            .ok()
            .and_then(|runs| runs.get(run_id).map(|r| r.status))
    }

    pub fn outcome(&self, run_id: &str) -> Option<RunOutcome> {
        self.runs
            .lock()
            .ok()
            .and_then(|runs| runs.get(run_id).and_then(|r| r.outcome.clone()))
    }

    /// Request cancellation. Returns false for unknown or already-terminal
    /// runs. The engine observes the flag at its next candle step; a still
    /// queued run cancels on its first.
    pub fn cancel(&self, run_id: &str) -> bool {
        let Ok(runs) = self.runs.lock() else {
            return false;
        };
        match runs.get(run_id) {
            Some(record) if !record.status.is_terminal() => {
                info!(run_id, "cancellation requested");
                record.cancel.store(true, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }
}

impl Drop for RunCoordinator {
    fn drop(&mut self) {
        // Closing the channel lets each worker drain remaining jobs and exit.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Timeframe;
    use crate::domain::position::Side;
    use crate::domain::rule::{Comparator, Operand, Rule};
    use crate::domain::sizing::{FeeConfig, PositionSizing};
    use crate::ports::progress_port::{NullProgressSink, ProgressSink, ProgressUpdate};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    /// Blocks every emit until the paired sender is dropped, pinning the
    /// worker inside its current run.
    struct GateProgressSink {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ProgressSink for GateProgressSink {
        fn emit(&self, _update: ProgressUpdate) {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
        }
    }

    fn make_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i % 7) as f64;
                Candle {
                    symbol: "TEST".to_string(),
                    timeframe: Timeframe::H1,
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(i as i64),
                    open: close,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    fn make_request(run_id: &str, n_candles: usize) -> RunRequest {
        RunRequest {
            run_id: run_id.to_string(),
            strategy: Strategy {
                name: "threshold".into(),
                symbol: "TEST".into(),
                timeframe: Timeframe::H1,
                side: Side::Long,
                entry_rules: vec![Rule::new(
                    Operand::Close,
                    Comparator::CrossesAbove,
                    Operand::Constant(102.5),
                )],
                exit_rules: vec![Rule::new(
                    Operand::Close,
                    Comparator::CrossesBelow,
                    Operand::Constant(100.5),
                )],
                stop_loss_pct: None,
                take_profit_pct: None,
                sizing: PositionSizing::FixedFraction { fraction: 1.0 },
                max_position_size: 1.0,
                fees: FeeConfig::default(),
            },
            candles: make_candles(n_candles),
            initial_balance: 10_000.0,
        }
    }

    fn wait_terminal(coordinator: &RunCoordinator, run_id: &str) -> RunStatus {
        for _ in 0..500 {
            if let Some(status) = coordinator.status(run_id) {
                if status.is_terminal() {
                    return status;
                }
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("run {run_id} did not reach a terminal state");
    }

    #[test]
    fn submitted_run_completes() {
        let coordinator = RunCoordinator::new(2, Arc::new(NullProgressSink));
        coordinator.submit(make_request("run-1", 50)).unwrap();
        assert_eq!(wait_terminal(&coordinator, "run-1"), RunStatus::Completed);
        let outcome = coordinator.outcome("run-1").unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert!(!outcome.equity_curve.is_empty());
    }

    #[test]
    fn duplicate_id_rejected_while_active() {
        let (hold, gate) = mpsc::channel::<()>();
        let coordinator = RunCoordinator::new(
            1,
            Arc::new(GateProgressSink {
                gate: Mutex::new(gate),
            }),
        );
        // The gated sink keeps run-1 non-terminal until `hold` is dropped.
        coordinator.submit(make_request("run-1", 50)).unwrap();
        let err = coordinator.submit(make_request("run-1", 10)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRunning { run_id } if run_id == "run-1"));
        drop(hold);
        assert_eq!(wait_terminal(&coordinator, "run-1"), RunStatus::Completed);
    }

    #[test]
    fn resubmission_allowed_after_terminal() {
        let coordinator = RunCoordinator::new(1, Arc::new(NullProgressSink));
        coordinator.submit(make_request("run-1", 20)).unwrap();
        wait_terminal(&coordinator, "run-1");
        coordinator.submit(make_request("run-1", 20)).unwrap();
        assert_eq!(wait_terminal(&coordinator, "run-1"), RunStatus::Completed);
    }

    #[test]
    fn excess_submissions_queue_and_all_finish() {
        let coordinator = RunCoordinator::new(2, Arc::new(NullProgressSink));
        for i in 0..6 {
            coordinator.submit(make_request(&format!("run-{i}"), 100)).unwrap();
        }
        for i in 0..6 {
            assert_eq!(
                wait_terminal(&coordinator, &format!("run-{i}")),
                RunStatus::Completed
            );
        }
    }

    #[test]
    fn cancel_unknown_run_is_false() {
        let coordinator = RunCoordinator::new(1, Arc::new(NullProgressSink));
        assert!(!coordinator.cancel("nope"));
    }

    #[test]
    fn cancelled_run_reaches_cancelled_state() {
        let coordinator = RunCoordinator::new(1, Arc::new(NullProgressSink));
        // Occupy the single worker, then queue a second run and cancel it
        // before it starts.
        coordinator.submit(make_request("busy", 5000)).unwrap();
        coordinator.submit(make_request("victim", 5000)).unwrap();
        assert!(coordinator.cancel("victim"));
        assert_eq!(wait_terminal(&coordinator, "victim"), RunStatus::Cancelled);
        let outcome = coordinator.outcome("victim").unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled);
        wait_terminal(&coordinator, "busy");
    }

    #[test]
    fn status_unknown_run_is_none() {
        let coordinator = RunCoordinator::new(1, Arc::new(NullProgressSink));
        assert!(coordinator.status("nope").is_none());
        assert!(coordinator.outcome("nope").is_none());
    }
}
