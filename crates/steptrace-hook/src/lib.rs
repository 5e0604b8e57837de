//! Frame event routing for steptrace.
//!
//! Instrumented functions open a [`Frame`] and report `call`, `line` and
//! `return` events through it. While a [`Subscription`] is open, the router
//! forwards the events whose code identity passes the subscription's
//! [`Filter`] to its [`FrameHandler`]; everything else is dropped. With no
//! subscription the cost of an event is one atomic load.
//!
//! # Sessions
//!
//! ```
//! use steptrace_hook::{Directive, Filter, Frame, FrameEvent, FrameHandler, FunctionMeta, locals};
//!
//! static DOUBLE: FunctionMeta = FunctionMeta::new("double");
//!
//! fn double(x: u32) -> u32 {
//!     let mut frame = Frame::enter(&DOUBLE, &locals![x]);
//!     frame.line(line!(), &locals![x]);
//!     frame.ret(x * 2)
//! }
//!
//! #[derive(Default)]
//! struct Lines(Vec<u32>);
//!
//! impl FrameHandler for Lines {
//!     fn handle(
//!         &mut self,
//!         _meta: &'static FunctionMeta,
//!         event: &FrameEvent<'_>,
//!     ) -> steptrace_hook::Result<Directive> {
//!         if let FrameEvent::Line { line, .. } = event {
//!             self.0.push(*line);
//!         }
//!         Ok(Directive::Continue)
//!     }
//! }
//!
//! let filter = Filter::only(&DOUBLE);
//! let mut session =
//!     steptrace_hook::subscribe(&DOUBLE, filter, Lines::default(), std::process::exit)?;
//! double(4);
//! session.finish()?;
//! assert_eq!(session.handler().0.len(), 1);
//! # Ok::<(), steptrace_hook::HookError>(())
//! ```

mod error;
mod event;
mod frame;
mod router;

#[cfg(test)]
mod test_support;

pub use error::{HookError, Result};
pub use event::{Directive, Filter, FrameEvent, FrameHandler, Verdict};
pub use frame::Frame;
pub use router::{EXIT_CLEAN, ExitHook, SessionStats, Subscription, abort, is_active, subscribe};

/// Report that the statement on the next source line is about to run.
///
/// `next_line!(frame, x, y)` expands to `frame.line(line!() + 1, ..)` so the
/// reported line, and the source text shown for it, is the statement that
/// follows the macro rather than the macro itself.
#[macro_export]
macro_rules! next_line {
    ($frame:ident $(, $name:ident)* $(,)?) => {
        $frame.line(line!() + 1, &$crate::locals![$($name),*])
    };
}

/// Async form of [`next_line!`]; `.await` the result.
///
/// The borrowed bindings are dropped before the returned future is
/// awaited, so they never live across the suspension point.
#[macro_export]
macro_rules! next_line_async {
    ($frame:ident $(, $name:ident)* $(,)?) => {{
        let gate = $frame.line_async(line!() + 1, &$crate::locals![$($name),*]);
        gate
    }};
}

// Re-export the frame model so instrumented code needs one import.
pub use steptrace_frame::{Binding, CodeId, FunctionMeta, VariableSnapshot, locals};
