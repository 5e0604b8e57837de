//! Instrumentation guard emitted by traced functions.

use std::fmt;
use std::future::Future;

use steptrace_frame::{Binding, FunctionMeta};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::warn;

use crate::router::{abort, dispatch};
use crate::{Directive, FrameEvent, Verdict};

/// One activation of an instrumented function.
///
/// Opening a frame emits `call`; [`line`](Self::line) emits `line` before a
/// statement runs; [`ret`](Self::ret) emits `return` with the value. A frame
/// dropped without `ret` (early `?` return, panic) still emits `return`,
/// just without a value, so call and return events always pair up.
///
/// ```
/// use steptrace_hook::{Frame, FunctionMeta, locals};
///
/// static ADD: FunctionMeta = FunctionMeta::new("add");
///
/// fn add(x: i64, y: i64) -> i64 {
///     let mut frame = Frame::enter(&ADD, &locals![x, y]);
///     frame.line(line!(), &locals![x, y]);
///     let z = x + y;
///     frame.line(line!(), &locals![x, y, z]);
///     frame.ret(z)
/// }
///
/// assert_eq!(add(5, 10), 15);
/// ```
#[must_use = "dropping a frame emits its return event immediately"]
pub struct Frame {
    meta: &'static FunctionMeta,
    open: bool,
}

impl Frame {
    /// Open a frame for `meta` with its bound arguments.
    pub fn enter(meta: &'static FunctionMeta, args: &[Binding<'_>]) -> Self {
        // Call events never suspend.
        if let Directive::Abort = dispatch(meta, &FrameEvent::Call { args }) {
            abort();
        }
        Self { meta, open: true }
    }

    pub const fn meta(&self) -> &'static FunctionMeta {
        self.meta
    }

    /// Report that `line` is about to run with `locals` in scope.
    ///
    /// Blocks while a step session is paused on this line. Inside a
    /// multi-thread tokio runtime the wait moves off the worker with
    /// `block_in_place`; a current-thread runtime cannot wait, so the line
    /// is reported as not pausable.
    pub fn line(&mut self, line: u32, locals: &[Binding<'_>]) {
        let runtime = Handle::try_current().ok();
        let pausable = runtime
            .as_ref()
            .is_none_or(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        let event = FrameEvent::Line {
            line,
            locals,
            pausable,
        };
        match dispatch(self.meta, &event) {
            Directive::Continue => {}
            Directive::Abort => abort(),
            Directive::Await(gate) => {
                let verdict = match runtime {
                    None => gate.blocking_recv(),
                    Some(handle) if pausable => block_in_place(|| handle.block_on(gate)),
                    Some(_) => {
                        warn!(
                            function = self.meta.name(),
                            line, "line event on a current-thread runtime cannot pause"
                        );
                        return;
                    }
                };
                if let Ok(Verdict::Abort) = verdict {
                    abort();
                }
            }
        }
    }

    /// Async form of [`line`](Self::line).
    ///
    /// The event is dispatched immediately; the returned future resolves
    /// once the step controller lets the line run.
    pub fn line_async(
        &mut self,
        line: u32,
        locals: &[Binding<'_>],
    ) -> impl Future<Output = ()> + Send + use<> {
        let event = FrameEvent::Line {
            line,
            locals,
            pausable: true,
        };
        let directive = dispatch(self.meta, &event);
        async move {
            match directive {
                Directive::Continue => {}
                Directive::Abort => abort(),
                Directive::Await(gate) => {
                    if let Ok(Verdict::Abort) = gate.await {
                        abort();
                    }
                }
            }
        }
    }

    /// Emit `return` with `value` and hand the value back.
    pub fn ret<T: fmt::Debug>(mut self, value: T) -> T {
        self.open = false;
        let event = FrameEvent::Return {
            value: Some(&value as &dyn fmt::Debug),
        };
        if let Directive::Abort = dispatch(self.meta, &event) {
            abort();
        }
        value
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if self.open {
            // Unwinding or an early return; the directive has nothing left
            // to act on.
            let _ = dispatch(self.meta, &FrameEvent::Return { value: None });
        }
    }
}
