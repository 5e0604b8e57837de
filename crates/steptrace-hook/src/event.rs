//! Frame events and the handler seam.

use std::fmt;

use steptrace_frame::{Binding, CodeId, FunctionMeta};
use tokio::sync::oneshot;

use crate::Result;

/// One call/line/return transition of an instrumented frame.
#[derive(Debug)]
pub enum FrameEvent<'a> {
    /// A frame opened with its bound arguments.
    Call { args: &'a [Binding<'a>] },
    /// A line is about to execute; `locals` are the bindings visible to it.
    /// `pausable` is false when the emitting frame cannot wait on a
    /// [`Directive::Await`] (a synchronous frame on a current-thread
    /// runtime).
    Line {
        line: u32,
        locals: &'a [Binding<'a>],
        pausable: bool,
    },
    /// The frame closed. `value` is `None` when it closed without a value
    /// (early error return or unwinding).
    Return {
        value: Option<&'a dyn fmt::Debug>,
    },
}

impl FrameEvent<'_> {
    /// Short event name, used in logs and metrics labels.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Line { .. } => "line",
            Self::Return { .. } => "return",
        }
    }
}

/// Answer from a step controller to a suspended line event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Abort,
}

/// What the emitting frame does after a handler processed its event.
#[derive(Debug)]
pub enum Directive {
    /// Keep executing.
    Continue,
    /// Tear the session down and end the process.
    Abort,
    /// Wait for a controller running elsewhere to answer.
    Await(oneshot::Receiver<Verdict>),
}

/// Receives the frame events that pass a subscription's [`Filter`].
///
/// Handlers run on whichever thread emitted the event, while that thread
/// is marked as dispatching: frames opened from inside a handler are not
/// traced.
pub trait FrameHandler: Send {
    fn handle(&mut self, meta: &'static FunctionMeta, event: &FrameEvent<'_>) -> Result<Directive>;
}

/// Code identities a subscription receives events for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    codes: Vec<CodeId>,
}

impl Filter {
    /// Only events of `meta`.
    pub fn only(meta: &'static FunctionMeta) -> Self {
        Self {
            codes: vec![meta.id()],
        }
    }

    /// Also accept events of `meta`.
    #[must_use]
    pub fn with(mut self, meta: &'static FunctionMeta) -> Self {
        let id = meta.id();
        if !self.codes.contains(&id) {
            self.codes.push(id);
        }
        self
    }

    pub fn matches(&self, code: CodeId) -> bool {
        self.codes.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static A: FunctionMeta = FunctionMeta::new("a");
    static B: FunctionMeta = FunctionMeta::new("b");
    static C: FunctionMeta = FunctionMeta::new("c");

    #[test]
    fn test_filter_membership() {
        let filter = Filter::only(&A).with(&B).with(&B);
        assert_eq!(filter.len(), 2);
        assert!(filter.matches(A.id()));
        assert!(filter.matches(B.id()));
        assert!(!filter.matches(C.id()));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(FrameEvent::Call { args: &[] }.kind(), "call");
        let line = FrameEvent::Line {
            line: 3,
            locals: &[],
            pausable: true,
        };
        assert_eq!(line.kind(), "line");
        assert_eq!(FrameEvent::Return { value: None }.kind(), "return");
    }
}
