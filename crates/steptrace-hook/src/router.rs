//! Process-wide frame event router.
//!
//! At most one [`Subscription`] exists per process. Every instrumented frame
//! reports to [`dispatch`], which drops events outside the subscription's
//! [`Filter`] and forwards the rest to its handler.
//!
//! Events from several threads all land in the same subscription; tracing
//! two calls concurrently interleaves them. The single-slot design turns a
//! second session request into [`HookError::SessionActive`] instead.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use steptrace_frame::FunctionMeta;
use tracing::{debug, error, info, trace};

use crate::{Directive, Filter, FrameEvent, FrameHandler, HookError, Result};

/// Called by [`abort`] to end the process.
pub type ExitHook = fn(i32) -> !;

/// Exit status used when the operator aborts a session.
pub const EXIT_CLEAN: i32 = 0;

/// Event counts of one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Events forwarded to the handler.
    pub delivered: u64,
    /// Events dropped by the filter.
    pub filtered: u64,
}

type SharedHandler = Arc<Mutex<dyn FrameHandler>>;

struct Active {
    id: u64,
    target: &'static FunctionMeta,
    filter: Filter,
    handler: SharedHandler,
    exit: ExitHook,
    stats: SessionStats,
    fault: Option<HookError>,
}

static SLOT: Mutex<Option<Active>> = parking_lot::const_mutex(None);
static ACTIVE: AtomicBool = AtomicBool::new(false);
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a handler until dropped.
struct ReentryGuard;

impl ReentryGuard {
    fn enter() -> Option<Self> {
        if DISPATCHING.with(Cell::get) {
            return None;
        }
        DISPATCHING.with(|d| d.set(true));
        Some(Self)
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(false));
    }
}

/// Whether a session is currently subscribed.
pub fn is_active() -> bool {
    ACTIVE.load(Ordering::Acquire)
}

/// Open the process-wide session for `target`.
///
/// Fails with [`HookError::SessionActive`] while another subscription
/// exists. The returned guard unsubscribes when finished or dropped.
pub fn subscribe<H>(
    target: &'static FunctionMeta,
    filter: Filter,
    handler: H,
    exit: ExitHook,
) -> Result<Subscription<H>>
where
    H: FrameHandler + 'static,
{
    let handler = Arc::new(Mutex::new(handler));
    let shared: SharedHandler = handler.clone();

    let mut slot = SLOT.lock();
    if let Some(active) = slot.as_ref() {
        return Err(HookError::SessionActive {
            active: active.target.name(),
            requested: target.name(),
        });
    }

    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    *slot = Some(Active {
        id,
        target,
        filter,
        handler: shared,
        exit,
        stats: SessionStats::default(),
        fault: None,
    });
    ACTIVE.store(true, Ordering::Release);
    debug!(function = target.name(), session = id, "trace session started");

    Ok(Subscription {
        id,
        target,
        handler,
        outcome: None,
    })
}

/// Remove the subscription `id`, leaving any other one in place.
fn release(id: u64) -> Option<Active> {
    let mut slot = SLOT.lock();
    if slot.as_ref().is_some_and(|active| active.id == id) {
        ACTIVE.store(false, Ordering::Release);
        slot.take()
    } else {
        None
    }
}

/// Route one event from an instrumented frame.
pub(crate) fn dispatch(meta: &'static FunctionMeta, event: &FrameEvent<'_>) -> Directive {
    if !is_active() {
        return Directive::Continue;
    }
    let Some(_reentry) = ReentryGuard::enter() else {
        return Directive::Continue;
    };

    let (id, handler) = {
        let mut slot = SLOT.lock();
        let Some(active) = slot.as_mut() else {
            return Directive::Continue;
        };
        if active.fault.is_some() {
            return Directive::Continue;
        }
        if !active.filter.matches(meta.id()) {
            active.stats.filtered += 1;
            trace!(function = meta.name(), event = event.kind(), "filtered frame event");
            return Directive::Continue;
        }
        active.stats.delivered += 1;
        (active.id, Arc::clone(&active.handler))
    };

    let result = handler.lock().handle(meta, event);
    match result {
        Ok(directive) => directive,
        Err(err) => {
            error!(
                error = %err,
                function = meta.name(),
                event = event.kind(),
                "trace session poisoned"
            );
            let mut slot = SLOT.lock();
            if let Some(active) = slot.as_mut()
                && active.id == id
            {
                active.fault = Some(err);
            }
            Directive::Continue
        }
    }
}

/// Unsubscribe the active session and end the process with [`EXIT_CLEAN`]
/// through the session's exit hook.
pub fn abort() -> ! {
    let active = {
        let mut slot = SLOT.lock();
        ACTIVE.store(false, Ordering::Release);
        slot.take()
    };
    let exit = match active {
        Some(active) => {
            info!(function = active.target.name(), session = active.id, "trace session aborted");
            active.exit
        }
        None => std::process::exit as ExitHook,
    };
    exit(EXIT_CLEAN)
}

/// Guard over the process-wide subscription.
///
/// The only way to receive frame events. Dropping it unsubscribes, so a
/// panicking traced call still tears the session down.
pub struct Subscription<H> {
    id: u64,
    target: &'static FunctionMeta,
    handler: Arc<Mutex<H>>,
    outcome: Option<Result<SessionStats>>,
}

impl<H> Subscription<H> {
    /// Function the session was opened for.
    pub const fn target(&self) -> &'static FunctionMeta {
        self.target
    }

    /// Lock the handler state.
    pub fn handler(&self) -> MutexGuard<'_, H> {
        self.handler.lock()
    }

    /// Unsubscribe and report the session's event counts, or the error
    /// that poisoned it. Calling it again returns the same outcome.
    pub fn finish(&mut self) -> Result<SessionStats> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = match release(self.id) {
            Some(Active {
                fault: Some(err), ..
            }) => Err(err),
            Some(active) => {
                debug!(
                    function = self.target.name(),
                    session = self.id,
                    delivered = active.stats.delivered,
                    filtered = active.stats.filtered,
                    "trace session finished"
                );
                Ok(active.stats)
            }
            None => Ok(SessionStats::default()),
        };
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl<H> Drop for Subscription<H> {
    fn drop(&mut self) {
        if self.outcome.is_none() && release(self.id).is_some() {
            debug!(
                function = self.target.name(),
                session = self.id,
                "trace session released on drop"
            );
        }
    }
}
