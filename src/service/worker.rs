//! Worker thread running the wrapped application

use crate::service::descriptor::MainCallback;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// How waiting for the worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Wrapped application returned this exit code
    Finished(i32),
    /// Shutdown timeout expired; the thread is left running
    TimedOut,
    /// Thread ended without an exit code (wrapped application panicked)
    Vanished,
}

/// Handle to the running worker thread
pub struct Worker {
    handle: Option<JoinHandle<()>>,
    done_rx: Receiver<i32>,
}

impl Worker {
    /// Spawn the worker thread running `main` with the given arguments
    pub fn spawn(name: &str, main: MainCallback, args: Vec<String>) -> io::Result<Self> {
        let (done_tx, done_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name(format!("{}-worker", name))
            .spawn(move || {
                debug!("Worker thread started");
                let code = main(args);
                info!("Wrapped application returned exit code {}", code);
                // Engine may have stopped waiting already
                let _ = done_tx.send(code);
            })?;

        Ok(Self {
            handle: Some(handle),
            done_rx,
        })
    }

    /// Whether the wrapped application has returned
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the wrapped application to return
    ///
    /// `None` waits without bound. On timeout the thread is detached.
    pub fn wait(mut self, timeout: Option<Duration>) -> WorkerOutcome {
        let received = match timeout {
            Some(timeout) => self.done_rx.recv_timeout(timeout),
            None => self
                .done_rx
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(code) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                WorkerOutcome::Finished(code)
            }
            Err(RecvTimeoutError::Timeout) => {
                // Dropping the handle detaches the thread
                self.handle.take();
                WorkerOutcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                WorkerOutcome::Vanished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_exit_code_is_captured() {
        let main: MainCallback = Arc::new(|args: Vec<String>| args.len() as i32);
        let worker = Worker::spawn("test", main, vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(worker.wait(None), WorkerOutcome::Finished(2));
    }

    #[test]
    fn test_timeout_detaches() {
        let release = Arc::new(AtomicBool::new(false));
        let flag = release.clone();
        let main: MainCallback = Arc::new(move |_: Vec<String>| {
            while !flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
            0
        });

        let worker = Worker::spawn("test", main, Vec::new()).unwrap();
        assert!(!worker.is_finished());
        assert_eq!(
            worker.wait(Some(Duration::from_millis(20))),
            WorkerOutcome::TimedOut
        );
        release.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_panic_reports_vanished() {
        let main: MainCallback =
            Arc::new(|_: Vec<String>| -> i32 { panic!("wrapped application fault") });
        let worker = Worker::spawn("test", main, Vec::new()).unwrap();
        assert_eq!(
            worker.wait(Some(Duration::from_secs(5))),
            WorkerOutcome::Vanished
        );
    }
}
