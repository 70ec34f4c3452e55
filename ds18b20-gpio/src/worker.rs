use std::{
    fmt::Debug,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error};
use onewire_core::{BusTimer, OneWire};

use crate::{AcquisitionTask, RETRY_DELAY, ReadingStore, TaskOutcome};

/// The acquisition worker has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("acquisition worker is not running")]
pub struct QueueClosed;

/// Errors starting or stopping the acquisition worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn acquisition worker: {0}")]
    Spawn(#[from] io::Error),
    /// The worker thread panicked; the bus was lost with it.
    #[error("acquisition worker panicked")]
    Panicked,
}

enum Job {
    Acquire { delay: Duration },
    Flush(Sender<()>),
    Shutdown,
}

/// Handle for queueing work on the acquisition worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    jobs: Sender<Job>,
    queued: Arc<AtomicBool>,
}

impl TaskQueue {
    /// Queues a fresh acquisition to start after `delay`.
    ///
    /// If an acquisition is already queued and has not started yet, this one
    /// is merged into it. A fresh acquisition replaces any pending retry.
    ///
    /// # Errors
    /// [`QueueClosed`] if the worker has shut down.
    pub fn schedule(&self, delay: Duration) -> Result<(), QueueClosed> {
        if self.queued.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.jobs.send(Job::Acquire { delay }).map_err(|_| {
            self.queued.store(false, Ordering::Release);
            QueueClosed
        })
    }

    /// Blocks until everything queued before this call, retries included,
    /// has finished.
    ///
    /// # Errors
    /// [`QueueClosed`] if the worker has shut down.
    pub fn flush(&self) -> Result<(), QueueClosed> {
        let (done, wait) = mpsc::channel();
        self.jobs.send(Job::Flush(done)).map_err(|_| QueueClosed)?;
        wait.recv().map_err(|_| QueueClosed)
    }
}

/// A single worker thread owning the bus.
///
/// At most one [`AcquisitionTask`] runs at a time, so neither the bus nor the
/// attempt count of a task is ever shared. Blocking delays inside a task block
/// this thread only.
pub struct Worker<B, T> {
    queue: TaskQueue,
    handle: Option<JoinHandle<(B, T)>>,
}

impl<B, T> Worker<B, T>
where
    B: OneWire + Send + 'static,
    B::BusError: Debug,
    T: BusTimer + Send + 'static,
{
    /// Moves `bus` and `timer` onto a new worker thread publishing to `store`.
    ///
    /// # Errors
    /// [`WorkerError::Spawn`] if the thread cannot be created.
    pub fn spawn(bus: B, timer: T, store: ReadingStore) -> Result<Self, WorkerError> {
        let (jobs, rx) = mpsc::channel();
        let queued = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new().name("ds18b20-acq".into()).spawn({
            let queued = queued.clone();
            move || work(rx, queued, bus, timer, store)
        })?;
        Ok(Self {
            queue: TaskQueue { jobs, queued },
            handle: Some(handle),
        })
    }

    /// A handle for queueing acquisitions.
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    /// Cancels pending acquisitions, waits for a running one to finish and
    /// hands the bus back.
    ///
    /// # Errors
    /// [`WorkerError::Panicked`] if the worker thread panicked.
    pub fn shutdown(mut self) -> Result<(B, T), WorkerError> {
        self.stop().ok_or(WorkerError::Panicked)
    }
}

impl<B, T> Worker<B, T> {
    fn stop(&mut self) -> Option<(B, T)> {
        let handle = self.handle.take()?;
        // the worker may already be gone after a panic
        let _ = self.queue.jobs.send(Job::Shutdown);
        handle.join().ok()
    }
}

impl<B, T> Drop for Worker<B, T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn work<B, T>(
    rx: Receiver<Job>,
    queued: Arc<AtomicBool>,
    mut bus: B,
    mut timer: T,
    store: ReadingStore,
) -> (B, T)
where
    B: OneWire,
    B::BusError: Debug,
    T: BusTimer,
{
    let mut pending: Option<(Instant, AcquisitionTask)> = None;
    let mut waiters: Vec<Sender<()>> = Vec::new();
    loop {
        let job = match pending {
            None => rx.recv().ok(),
            Some((due, _)) => {
                match rx.recv_timeout(due.saturating_duration_since(Instant::now())) {
                    Ok(job) => Some(job),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        };
        match job {
            Some(Job::Acquire { delay }) => {
                pending = Some((Instant::now() + delay, AcquisitionTask::new()));
            }
            Some(Job::Flush(done)) => waiters.push(done),
            Some(Job::Shutdown) => break,
            None if pending.is_none() => break,
            None => {}
        }

        if let Some((due, task)) = pending {
            if due <= Instant::now() {
                pending = None;
                queued.store(false, Ordering::Release);
                match task.run(&mut bus, &mut timer, &store) {
                    TaskOutcome::Retry(next) => {
                        pending = Some((Instant::now() + RETRY_DELAY, next));
                    }
                    TaskOutcome::Completed => {}
                    TaskOutcome::Aborted => error!("acquisition abandoned until the next trigger"),
                }
            }
        }

        if pending.is_none() {
            for done in waiters.drain(..) {
                let _ = done.send(());
            }
        }
    }

    if let Some((_, task)) = pending {
        debug!("cancelled pending acquisition on attempt {}", task.attempt());
    }
    queued.store(false, Ordering::Release);
    for done in waiters {
        let _ = done.send(());
    }
    debug!("acquisition worker drained");
    (bus, timer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sim::SimSensor, RawReading};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn spawn(sim: SimSensor) -> (Worker<SimSensor, NoopDelay>, ReadingStore) {
        let store = ReadingStore::new();
        let worker = Worker::spawn(sim, NoopDelay::new(), store.clone()).unwrap();
        (worker, store)
    }

    #[test]
    fn runs_a_scheduled_acquisition() {
        let (worker, store) = spawn(SimSensor::new(1, 0x0550));
        let queue = worker.queue();
        queue.schedule(Duration::ZERO).unwrap();
        queue.flush().unwrap();
        assert_eq!(store.snapshot(), RawReading(0x0550));

        let (sim, _) = worker.shutdown().unwrap();
        assert_eq!(sim.resets, 4);
    }

    #[test]
    fn retries_are_deferred_and_bounded() {
        let (worker, store) = spawn(SimSensor::new(1, 0x0550).absent());
        let queue = worker.queue();
        let started = Instant::now();
        queue.schedule(Duration::ZERO).unwrap();
        queue.flush().unwrap();
        assert!(started.elapsed() >= RETRY_DELAY * 3);
        assert_eq!(store.snapshot(), RawReading(0));

        let (sim, _) = worker.shutdown().unwrap();
        assert_eq!(sim.resets, 4);
    }

    #[test]
    fn fresh_trigger_replaces_a_deferred_retry() {
        let (worker, store) = spawn(SimSensor::new(1, 0x0550).absent());
        let queue = worker.queue();
        queue.schedule(Duration::ZERO).unwrap();
        // attempt 2 has failed, attempt 3 is deferred
        thread::sleep(RETRY_DELAY + RETRY_DELAY / 2);
        let retriggered = Instant::now();
        queue.schedule(Duration::ZERO).unwrap();
        queue.flush().unwrap();
        assert!(retriggered.elapsed() >= RETRY_DELAY * 3);
        assert_eq!(store.snapshot(), RawReading(0));

        let (sim, _) = worker.shutdown().unwrap();
        assert_eq!(sim.resets, 2 + 4);
    }

    #[test]
    fn queued_triggers_are_merged() {
        let (worker, _) = spawn(SimSensor::new(1, 0x0550));
        let queue = worker.queue();
        queue.schedule(Duration::from_millis(50)).unwrap();
        queue.schedule(Duration::ZERO).unwrap();
        queue.schedule(Duration::ZERO).unwrap();
        queue.flush().unwrap();

        let (sim, _) = worker.shutdown().unwrap();
        assert_eq!(sim.resets, 4);
    }

    #[test]
    fn shutdown_cancels_delayed_work() {
        let (worker, store) = spawn(SimSensor::new(1, 0x0550));
        let queue = worker.queue();
        queue.schedule(Duration::from_secs(3600)).unwrap();

        let (sim, _) = worker.shutdown().unwrap();
        assert_eq!(sim.resets, 0);
        assert_eq!(store.snapshot(), RawReading(0));
        assert_eq!(queue.schedule(Duration::ZERO), Err(QueueClosed));
        assert_eq!(queue.flush(), Err(QueueClosed));
    }

    #[test]
    fn flush_on_idle_worker_returns() {
        let (worker, _) = spawn(SimSensor::new(1, 0x0550));
        worker.queue().flush().unwrap();
    }
}
