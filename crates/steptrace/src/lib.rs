//! steptrace - call-tree tracing and interactive line stepping.
//!
//! Instrumented functions report call, line and return events through a
//! [`Frame`]. The tracers here open a process-wide session for one target
//! function and turn its events into:
//!
//! - a call tree with variable snapshots ([`TreeTracer`]),
//! - an interactive step session with a breakpoint ([`StepDebugger`]),
//!   for synchronous calls and for futures,
//! - a per-line time profile ([`LineProfiler`]).
//!
//! Output goes through a [`Renderer`]; [`ConsoleRenderer`] draws it in a
//! terminal.
//!
//! Only one session can be open per process. Tracing two calls at the same
//! time fails with [`HookError::SessionActive`] rather than interleaving
//! their events.
//!
//! # Example
//!
//! ```
//! use steptrace::demo::{self, ADD};
//! use steptrace::test_support::ScriptedRenderer;
//! use steptrace::{BreakpointCommand, StepConfig, StepDebugger};
//!
//! let line = ADD.find_line("let z = x + y;").expect("demo source");
//! let renderer = ScriptedRenderer::with_commands([BreakpointCommand::Resume]);
//! let debugger = StepDebugger::new(StepConfig::default().with_breakpoint_line(line), renderer);
//!
//! assert_eq!(debugger.run(&ADD, || demo::add(5, 10))?, 15);
//! assert_eq!(debugger.pauses(), 1);
//! # Ok::<(), steptrace::Error>(())
//! ```

mod console_renderer;
pub mod demo;
mod error;
pub mod metrics;
mod profile;
mod render;
mod step;
pub mod terminal;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
mod timing;
mod tree;

pub use console_renderer::ConsoleRenderer;
pub use error::{Error, Result};
pub use profile::{LineProfile, LineProfiler, LineStat};
pub use render::{BreakpointCommand, Notice, Renderer, UnknownCommand};
pub use step::{PauseReason, StepConfig, StepController, StepDebugger, StepState};
pub use timing::{Elapsed, Stopwatch};
pub use tree::{TraceChild, TraceNode, TreeBuilder, TreeTrace, TreeTracer};

pub use steptrace_hook::{
    Binding, CodeId, EXIT_CLEAN, ExitHook, Frame, FunctionMeta, HookError, SessionStats,
    VariableSnapshot, locals, next_line, next_line_async,
};
