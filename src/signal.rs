// src/signal.rs

use crate::worktree::Terminator;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Exit status used when a walk is interrupted by Ctrl-C (SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Exit status used when a walk is ended by SIGTERM.
pub const TERMINATED_EXIT_CODE: i32 = 143;

/// Turns a shutdown signal into a [`Terminator::request`] for as long as it
/// is alive.
///
/// Ctrl-C and, on unix, SIGTERM are both handled. The handlers are registered
/// before [`install`](Self::install) returns. On a signal the listener waits
/// for the in-flight commit to be restored, raises the terminating flag,
/// waits out the grace period and then exits the process. Dropping the
/// listener (or calling [`deregister`](Self::deregister)) before any signal
/// detaches it.
pub struct ShutdownListener {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ShutdownListener {
    pub fn install(terminator: Terminator, grace: Duration) -> io::Result<Self> {
        Self::with_handler(terminator, grace, |code| std::process::exit(code))
    }

    /// Like [`install`](Self::install), but hands the exit status to
    /// `on_signal` instead of exiting.
    pub fn with_handler<F>(terminator: Terminator, grace: Duration, on_signal: F) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut signals = {
            let _guard = runtime.enter();
            ShutdownSignals::register()?
        };
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = thread::Builder::new()
            .name("shutdown-listener".into())
            .spawn(move || {
                runtime.block_on(async move {
                    tokio::select! {
                        code = signals.recv() => {
                            terminator.request(grace);
                            on_signal(code);
                        }
                        _ = stopped => debug!("Shutdown listener deregistered"),
                    }
                });
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn deregister(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ShutdownListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Must run inside a runtime context.
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.interrupt.recv() => {
                info!("Received SIGINT");
                INTERRUPTED_EXIT_CODE
            }
            _ = self.terminate.recv() => {
                info!("Received SIGTERM");
                TERMINATED_EXIT_CODE
            }
        }
    }
}

#[cfg(windows)]
struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl ShutdownSignals {
    fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> i32 {
        self.ctrl_c.recv().await;
        info!("Received Ctrl-C");
        INTERRUPTED_EXIT_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::mpsc;

    // Signals are process-wide; listeners from parallel tests would all see them.
    static SIGNAL_TESTS: Mutex<()> = parking_lot::const_mutex(());

    #[test]
    fn deregistering_without_signal_leaves_terminator_untouched() {
        let _serial = SIGNAL_TESTS.lock();
        let terminator = Terminator::new();
        let (tx, rx) = mpsc::channel();
        let listener = ShutdownListener::with_handler(terminator.clone(), Duration::ZERO, move |code| {
            let _ = tx.send(code);
        })
        .unwrap();

        listener.deregister();

        assert!(!terminator.is_terminating());
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn sigterm_requests_termination() {
        let _serial = SIGNAL_TESTS.lock();
        let terminator = Terminator::new();
        let (tx, rx) = mpsc::channel();
        let listener = ShutdownListener::with_handler(terminator.clone(), Duration::ZERO, move |code| {
            let _ = tx.send(code);
        })
        .unwrap();

        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);

        let code = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(code, TERMINATED_EXIT_CODE);
        assert!(terminator.is_terminating());
        listener.deregister();
    }
}
