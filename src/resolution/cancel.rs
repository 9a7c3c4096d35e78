use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::{Result, ScripRefError};

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Hooks {
    next_id: u64,
    registered: HashMap<u64, Hook>,
}

/// Cooperative cancellation shared between a caller and a running fetch.
///
/// Clones share the same flag. The fetcher checks the token before every
/// store round-trip and stops with [`ScripRefError::Cancelled`] once it fires.
/// Hooks registered with [`on_cancel`](Self::on_cancel) run when the token
/// fires, so a store call already in flight can be aborted too.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    hooks: Arc<Mutex<Hooks>>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl CancelToken {
    /// A token that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A token that also fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks: Vec<Hook> = self.lock_hooks().registered.values().cloned().collect();
        for hook in hooks {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ScripRefError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `hook` when the token fires, by [`cancel`](Self::cancel) or by
    /// its deadline, for as long as the returned guard lives.
    ///
    /// A token that has already fired runs the hook immediately. A hook may
    /// run more than once.
    pub fn on_cancel(&self, hook: impl Fn() + Send + Sync + 'static) -> CancelGuard {
        let hook: Hook = Arc::new(hook);
        let id = {
            let mut hooks = self.lock_hooks();
            let id = hooks.next_id;
            hooks.next_id += 1;
            hooks.registered.insert(id, Arc::clone(&hook));
            id
        };

        let watchdog = if self.is_cancelled() {
            hook();
            None
        } else {
            self.deadline.map(|deadline| spawn_watchdog(deadline, hook))
        };

        CancelGuard {
            hooks: Arc::clone(&self.hooks),
            id,
            _watchdog: watchdog,
        }
    }

    fn lock_hooks(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a hook registered with [`CancelToken::on_cancel`]. Dropping it
/// unregisters the hook and stops any deadline watchdog.
#[must_use = "the hook is unregistered when the guard is dropped"]
pub struct CancelGuard {
    hooks: Arc<Mutex<Hooks>>,
    id: u64,
    _watchdog: Option<Sender<()>>,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .registered
            .remove(&self.id);
    }
}

/// Calls `hook` at `deadline` unless the returned sender is dropped first.
fn spawn_watchdog(deadline: Instant, hook: Hook) -> Sender<()> {
    let (stop, stopped) = mpsc::channel::<()>();
    thread::spawn(move || {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(remaining) {
            hook();
        }
    });
    stop
}
