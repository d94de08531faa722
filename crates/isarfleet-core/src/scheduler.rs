//! Periodic tick driver.
//!
//! A [`Scheduler`] owns the engine and, while running, a single worker
//! thread that ticks it on a fixed interval. Every tick (scheduled or
//! manual) runs under the engine lock, so ticks never interleave and a
//! started tick always finishes before `stop` returns.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::{SimulationEngine, TickReport};
use crate::error::SimError;

const WORKER_NAME: &str = "isarfleet-ticker";

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Cancellable periodic task around a [`SimulationEngine`].
pub struct Scheduler<R: Rng + Send + 'static = StdRng> {
    engine: Arc<Mutex<SimulationEngine<R>>>,
    interval: Duration,
    worker: Option<Worker>,
}

impl<R: Rng + Send + 'static> Scheduler<R> {
    /// Wrap `engine`, ticking at its configured interval once started.
    pub fn new(engine: SimulationEngine<R>) -> Self {
        let interval = engine.config().tick_interval();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            interval,
            worker: None,
        }
    }

    /// Whether a worker is alive. A worker that died, e.g. from a
    /// panicking listener, does not count.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking. Returns `Ok(false)` if already running.
    ///
    /// A dead worker is reaped first, so this restarts ticking after a
    /// panic.
    pub fn start(&mut self) -> Result<bool, SimError> {
        if self.is_running() {
            return Ok(false);
        }
        if let Some(dead) = self.worker.take() {
            reap(dead);
        }

        let (stop, stop_rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            lock(&engine).tick();
                            next += interval;
                            // Behind schedule: skip missed ticks rather than burst.
                            let now = Instant::now();
                            if next < now {
                                next = now + interval;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(SimError::Spawn)?;

        log::info!("simulation started ({} ms interval)", interval.as_millis());
        self.worker = Some(Worker { stop, handle });
        Ok(true)
    }

    /// Stop ticking and wait for the worker to exit. Returns `false` if
    /// it was not running.
    ///
    /// Once this returns no tick is in progress and none will start. Must
    /// not be called from a store listener, which runs on the worker.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };

        // A send error means the worker already exited.
        let _ = worker.stop.send(());
        reap(worker);
        log::info!("simulation stopped");
        true
    }

    /// Run one tick now on the calling thread, serialized with the worker.
    pub fn tick_now(&self) -> TickReport {
        lock(&self.engine).tick()
    }

    /// Shared handle to the engine, e.g. for reading its clock.
    pub fn engine(&self) -> &Arc<Mutex<SimulationEngine<R>>> {
        &self.engine
    }
}

impl<R: Rng + Send + 'static> Drop for Scheduler<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reap(worker: Worker) {
    if worker.handle.join().is_err() {
        log::error!("tick worker panicked");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
