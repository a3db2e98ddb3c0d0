//! A mutex the holding execution context may re-enter.
//!
//! Ownership belongs to an execution context rather than to a guard. By
//! default every thread is its own context; cooperative tasks sharing a
//! thread can claim distinct identities with [`ExecutionContext::enter`].

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use error_set::error_set;
use parking_lot::{Condvar, Mutex};

error_set! {
    /// Misuse of a [`ReentrantMutex`]
    LockError := {
        #[display("Attempt to unlock a mutex which is locked by another thread/fiber")]
        NotOwner,
        #[display("Attempt to unlock a mutex which is not locked")]
        NotLocked,
    }
}

/// Identity of a thread or cooperative task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXT: ContextId = ExecutionContext::new_id();
    static ENTERED_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

pub struct ExecutionContext;

impl ExecutionContext {
    /// The context code on this thread is currently running as.
    pub fn current() -> ContextId {
        ENTERED_CONTEXT
            .with(Cell::get)
            .unwrap_or_else(|| THREAD_CONTEXT.with(|id| *id))
    }

    pub fn new_id() -> ContextId {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Run `f` as context `id`, restoring the previous identity afterwards.
    pub fn enter<R>(id: ContextId, f: impl FnOnce() -> R) -> R {
        let previous = ENTERED_CONTEXT.with(|entered| entered.replace(Some(id)));
        let _restore = RestoreContext(previous);
        f()
    }
}

struct RestoreContext(Option<ContextId>);

impl Drop for RestoreContext {
    fn drop(&mut self) {
        ENTERED_CONTEXT.with(|entered| entered.set(self.0));
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ContextId>,
    count: usize,
}

/// Lets one execution context hold a lock any number of times while other
/// contexts wait for the outermost release.
#[derive(Debug, Default)]
pub struct ReentrantMutex {
    state: Mutex<LockState>,
    released: Condvar,
}

impl ReentrantMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire, blocking while another context holds the lock.
    pub fn lock(&self) {
        let me = ExecutionContext::current();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.count = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.count += 1;
                    return;
                }
                Some(owner) => {
                    tracing::trace!(?owner, waiter = ?me, "waiting for reentrant mutex");
                    self.released.wait(&mut state);
                }
            }
        }
    }

    /// Acquire without blocking; `false` if another context holds the lock.
    pub fn try_lock(&self) -> bool {
        let me = ExecutionContext::current();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.count = 1;
                true
            }
            Some(owner) if owner == me => {
                state.count += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Release one level of ownership.
    pub fn unlock(&self) -> Result<(), LockError> {
        let me = ExecutionContext::current();
        let mut state = self.state.lock();
        match state.owner {
            None => return Err(LockError::NotLocked),
            Some(owner) if owner != me => return Err(LockError::NotOwner),
            Some(_) => {}
        }
        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            self.released.notify_one();
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the current context holds the lock.
    pub fn is_owned(&self) -> bool {
        self.state.lock().owner == Some(ExecutionContext::current())
    }

    /// Run `f` while holding the lock, releasing it afterwards even if `f`
    /// panics.
    pub fn synchronize<R>(&self, f: impl FnOnce() -> R) -> Result<R, LockError> {
        self.lock();
        let mut guard = UnlockOnUnwind {
            mutex: self,
            armed: true,
        };
        let result = f();
        guard.armed = false;
        self.unlock()?;
        Ok(result)
    }
}

struct UnlockOnUnwind<'a> {
    mutex: &'a ReentrantMutex,
    armed: bool,
}

impl Drop for UnlockOnUnwind<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.mutex.unlock() {
            tracing::warn!(%err, "could not release reentrant mutex while unwinding");
        }
    }
}
