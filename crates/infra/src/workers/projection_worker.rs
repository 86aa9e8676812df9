//! Dedicated thread that drains a bus subscription into a projection.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use flowgic_events::EventBus;

/// How often an idle worker checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns the worker thread. Dropping it stops the thread as well.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Signal the loop and block until it exits.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("projection worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Subscribe now and hand every later message to `apply` on a named
    /// thread. Handler errors are logged and the loop keeps going.
    pub fn spawn<M, B, H, E>(name: &'static str, bus: &B, mut apply: H) -> std::io::Result<WorkerHandle>
    where
        M: Send + 'static,
        B: EventBus<M> + ?Sized,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let inbox = bus.subscribe();

        let thread = thread::Builder::new().name(name.into()).spawn(move || {
            debug!(worker = name, "projection worker started");
            loop {
                if stopped.try_recv().is_ok() {
                    break;
                }
                match inbox.recv_timeout(POLL_INTERVAL) {
                    Ok(message) => {
                        if let Err(err) = apply(message) {
                            warn!(worker = name, error = ?err, "projection update failed");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(worker = name, "projection worker stopped");
        })?;

        Ok(WorkerHandle {
            stop,
            thread: Some(thread),
        })
    }
}
