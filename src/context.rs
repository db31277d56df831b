// src/context.rs

//! Run-wide cancellation context.
//!
//! A [`Context`] couples a [`CancellationToken`] with an optional deadline.
//! The same context is handed to the executor and to every task of a run;
//! tasks are expected to check it cooperatively, nothing is preempted.
//!
//! Contexts form a tree: [`Context::child`], [`Context::with_deadline`] and
//! [`Context::with_timeout`] derive a context that fires when its parent fires
//! (or earlier), while cancelling a child never affects the parent.
//!
//! A context with a deadline created inside a tokio runtime arms a timer that
//! cancels its token when the deadline passes, so code waiting only on
//! [`Context::token`] is woken too. Outside a runtime the deadline is checked
//! lazily by [`Context::err`] and [`Context::done`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Why a context fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// [`Context::cancel`] was called (on this context or an ancestor).
    #[error("context canceled")]
    Canceled,
    /// The context's deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    /// First reason recorded for this context; later ones are ignored.
    reason: OnceLock<CancelReason>,
    parent: Option<Context>,
    /// Whether some timer cancels `token` at `deadline`.
    armed: bool,
    /// Stops this context's own timer once the last clone is dropped.
    _timer: Option<DropGuard>,
}

impl Context {
    /// A fresh root context with no deadline. Fires only when cancelled.
    pub fn new() -> Self {
        Self::from_parts(CancellationToken::new(), None, None)
    }

    /// Derive a child context sharing the parent's deadline.
    pub fn child(&self) -> Self {
        Self::from_parts(
            self.inner.token.child_token(),
            self.inner.deadline,
            Some(self.clone()),
        )
    }

    /// Derive a child context that also expires at `deadline`.
    ///
    /// The effective deadline is the earlier of `deadline` and the parent's.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self::from_parts(self.inner.token.child_token(), Some(deadline), Some(self.clone()))
    }

    /// Derive a child context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn from_parts(
        token: CancellationToken,
        deadline: Option<Instant>,
        parent: Option<Context>,
    ) -> Self {
        let inherits_timer = parent
            .as_ref()
            .is_some_and(|p| p.inner.armed && p.inner.deadline == deadline);
        let timer = match deadline {
            Some(deadline) if !inherits_timer => arm_deadline(&token, deadline),
            _ => None,
        };

        Self {
            inner: Arc::new(Inner {
                token,
                deadline,
                reason: OnceLock::new(),
                parent,
                armed: inherits_timer || timer.is_some(),
                _timer: timer,
            }),
        }
    }

    /// Cancel this context and all contexts derived from it.
    pub fn cancel(&self) {
        let _ = self.inner.reason.set(CancelReason::Canceled);
        self.inner.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Underlying token, for interop with code that already speaks
    /// `tokio_util`. Cancelling it directly reports [`CancelReason::Canceled`].
    ///
    /// The token is also cancelled when the deadline passes, provided the
    /// context was created inside a tokio runtime.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Reason this context fired, or `None` while it is still live.
    pub fn err(&self) -> Option<CancelReason> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }

        if let Some(parent) = &self.inner.parent {
            if let Some(reason) = parent.err() {
                return Some(reason);
            }
        }

        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                let _ = self.inner.reason.set(CancelReason::DeadlineExceeded);
                self.inner.token.cancel();
                return self.inner.reason.get().copied();
            }
        }

        if self.inner.token.is_cancelled() {
            return Some(CancelReason::Canceled);
        }

        None
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context fires and return why.
    ///
    /// Cancel safe; may be awaited any number of times from any task.
    pub async fn done(&self) -> CancelReason {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }

        self.err().unwrap_or(CancelReason::Canceled)
    }
}

/// Spawn a timer cancelling `token` at `deadline`. Returns `None` outside a
/// tokio runtime.
fn arm_deadline(token: &CancellationToken, deadline: Instant) -> Option<DropGuard> {
    let handle = Handle::try_current().ok()?;
    let stop = CancellationToken::new();
    let token = token.clone();
    let stopped = stop.clone();

    handle.spawn(async move {
        tokio::select! {
            _ = stopped.cancelled() => {}
            _ = token.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => token.cancel(),
        }
    });

    Some(stop.drop_guard())
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish_non_exhaustive()
    }
}
