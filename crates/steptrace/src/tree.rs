//! Call-tree tracing.
//!
//! [`TreeBuilder`] turns the call/line/return events of one session into a
//! nested [`TraceNode`]; [`TreeTracer`] wraps a call in such a session and
//! hands the finished tree to its renderer.

use parking_lot::{Mutex, MutexGuard};
use steptrace_frame::format_bindings;
use steptrace_hook::{
    self as hook, Binding, CodeId, Directive, Filter, FrameEvent, FrameHandler, FunctionMeta,
    HookError, VariableSnapshot,
};
use tracing::debug;

use crate::metrics::{self, SessionMode};
use crate::render::Renderer;
use crate::timing::{Elapsed, Stopwatch};
use crate::{Error, Result};

/// Child of a [`TraceNode`], in event order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceChild {
    /// A nested invocation.
    Call(TraceNode),
    /// Bindings seen at one line of the parent invocation.
    Snapshot(VariableSnapshot),
}

/// One invocation within a call tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceNode {
    function: &'static str,
    args: Vec<(String, String)>,
    children: Vec<TraceChild>,
    return_value: Option<String>,
}

impl TraceNode {
    fn open(meta: &FunctionMeta, args: &[Binding<'_>]) -> Self {
        Self {
            function: meta.name(),
            args: format_bindings(args),
            children: Vec::new(),
            return_value: None,
        }
    }

    pub const fn function(&self) -> &'static str {
        self.function
    }

    /// Rendered bound arguments.
    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    pub fn children(&self) -> &[TraceChild] {
        &self.children
    }

    /// Rendered return value; `None` if the invocation ended without one.
    pub fn return_value(&self) -> Option<&str> {
        self.return_value.as_deref()
    }

    /// `name(arg=value, ...)`.
    pub fn label(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{}({})", self.function, args.join(", "))
    }

    /// Nested invocations, in call order.
    pub fn calls(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            TraceChild::Call(node) => Some(node),
            TraceChild::Snapshot(_) => None,
        })
    }

    /// Line snapshots of this invocation, in line order.
    pub fn snapshots(&self) -> impl Iterator<Item = &VariableSnapshot> {
        self.children.iter().filter_map(|child| match child {
            TraceChild::Snapshot(snapshot) => Some(snapshot),
            TraceChild::Call(_) => None,
        })
    }

    /// Number of invocation levels, this one included.
    pub fn depth(&self) -> usize {
        1 + self.calls().map(Self::depth).max().unwrap_or(0)
    }
}

/// A finished call tree.
#[derive(Clone, Debug)]
pub struct TreeTrace {
    pub root: TraceNode,
    /// Wall time of the whole traced call.
    pub elapsed: Elapsed,
    /// Deepest call stack seen during the session.
    pub peak_depth: usize,
}

/// Builds a call tree from frame events.
///
/// Open invocations live on a stack; a `return` pops the top and attaches
/// it to its parent, or makes it the root when the stack runs empty. Only
/// the target starts a tree: other functions are recorded while nested in
/// it and skipped, with everything they call, while no target is open.
#[derive(Debug)]
pub struct TreeBuilder {
    target: CodeId,
    stack: Vec<TraceNode>,
    root: Option<TraceNode>,
    /// Open invocations skipped because no target was on the stack.
    detached: usize,
    peak_depth: usize,
    completed: usize,
}

impl TreeBuilder {
    /// Builder for a tree rooted at `target`.
    pub fn new(target: &'static FunctionMeta) -> Self {
        Self {
            target: target.id(),
            stack: Vec::new(),
            root: None,
            detached: 0,
            peak_depth: 0,
            completed: 0,
        }
    }

    /// Currently open invocations.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub const fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    /// How many times the stack returned to empty.
    pub const fn completed(&self) -> usize {
        self.completed
    }

    pub fn on_call(&mut self, meta: &'static FunctionMeta, args: &[Binding<'_>]) {
        if self.stack.is_empty() && meta.id() != self.target {
            self.detached += 1;
            return;
        }
        self.stack.push(TraceNode::open(meta, args));
        self.peak_depth = self.peak_depth.max(self.stack.len());
    }

    pub fn on_line(&mut self, meta: &FunctionMeta, line: u32, locals: &[Binding<'_>]) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let snapshot = VariableSnapshot::capture(meta, line, locals);
        if !snapshot.is_empty() {
            top.children.push(TraceChild::Snapshot(snapshot));
        }
    }

    pub fn on_return(&mut self, meta: &FunctionMeta, value: Option<String>) -> hook::Result<()> {
        let Some(mut node) = self.stack.pop() else {
            if self.detached > 0 {
                self.detached -= 1;
                return Ok(());
            }
            return Err(HookError::StackUnderflow {
                function: meta.name(),
            });
        };
        debug_assert!(node.return_value.is_none(), "return value attached twice");
        node.return_value = value;

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(TraceChild::Call(node)),
            None => {
                self.completed += 1;
                if self.root.is_none() {
                    self.root = Some(node);
                } else {
                    debug!(function = meta.name(), "ignoring repeated top-level call");
                }
            }
        }
        Ok(())
    }

    /// The finished tree, if a top-level invocation completed.
    pub fn finish(self, elapsed: Elapsed) -> Option<TreeTrace> {
        if !self.stack.is_empty() {
            debug!(open = self.stack.len(), "discarding unfinished call tree");
            return None;
        }
        self.root.map(|root| TreeTrace {
            root,
            elapsed,
            peak_depth: self.peak_depth,
        })
    }
}

impl FrameHandler for TreeBuilder {
    fn handle(
        &mut self,
        meta: &'static FunctionMeta,
        event: &FrameEvent<'_>,
    ) -> hook::Result<Directive> {
        match event {
            FrameEvent::Call { args } => self.on_call(meta, args),
            FrameEvent::Line { line, locals, .. } => self.on_line(meta, *line, locals),
            FrameEvent::Return { value } => {
                self.on_return(meta, value.map(steptrace_frame::render_value))?;
            }
        }
        Ok(Directive::Continue)
    }
}

/// Traces calls into a tree and renders it once the call returns.
///
/// ```
/// use steptrace::{Frame, FunctionMeta, TreeTracer, locals, next_line};
/// use steptrace::test_support::ScriptedRenderer;
///
/// static ADD: FunctionMeta = FunctionMeta::new("add");
///
/// fn add(x: i64, y: i64) -> i64 {
///     let mut frame = Frame::enter(&ADD, &locals![x, y]);
///     next_line!(frame, x, y);
///     let z = x + y;
///     next_line!(frame, x, y, z);
///     frame.ret(z)
/// }
///
/// let tracer = TreeTracer::new(ScriptedRenderer::default());
/// assert_eq!(tracer.run(&ADD, || add(5, 10))?, 15);
/// assert_eq!(tracer.renderer().trees[0].root.label(), "add(x=5, y=10)");
/// # Ok::<(), steptrace::Error>(())
/// ```
pub struct TreeTracer<R> {
    renderer: Mutex<R>,
    follow: Vec<&'static FunctionMeta>,
}

impl<R: Renderer> TreeTracer<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Mutex::new(renderer),
            follow: Vec::new(),
        }
    }

    /// Also record invocations of `meta` made during the traced call.
    #[must_use]
    pub fn follow(mut self, meta: &'static FunctionMeta) -> Self {
        self.follow.push(meta);
        self
    }

    pub fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer.lock()
    }

    pub fn into_renderer(self) -> R {
        self.renderer.into_inner()
    }

    /// Trace `call` without rendering. The tree is `None` when `meta` was
    /// never entered or its outermost invocation did not finish.
    pub fn record<T>(
        &self,
        meta: &'static FunctionMeta,
        call: impl FnOnce() -> T,
    ) -> Result<(T, Option<TreeTrace>)> {
        let filter = self
            .follow
            .iter()
            .fold(Filter::only(meta), |filter, other| filter.with(other));
        let builder = TreeBuilder::new(meta);
        let mut session = hook::subscribe(meta, filter, builder, std::process::exit)?;

        let stopwatch = Stopwatch::start();
        let value = call();
        let elapsed = stopwatch.elapsed();

        let stats = session.finish()?;
        let builder = std::mem::replace(&mut *session.handler(), TreeBuilder::new(meta));
        metrics::record_session(SessionMode::Tree, &stats, elapsed);
        metrics::record_peak_depth(builder.peak_depth());

        Ok((value, builder.finish(elapsed)))
    }

    /// Trace `call`, render its tree and return its value.
    pub fn run<T>(&self, meta: &'static FunctionMeta, call: impl FnOnce() -> T) -> Result<T> {
        let (value, trace) = self.record(meta, call)?;
        if let Some(trace) = trace {
            self.renderer.lock().render_tree(&trace);
        }
        Ok(value)
    }

    /// Trace a fallible call. An `Err` from the call discards the tree and
    /// is returned unchanged.
    pub fn run_fallible<T, E>(
        &self,
        meta: &'static FunctionMeta,
        call: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        let (result, trace) = self.record(meta, call)?;
        match (result, trace) {
            (Ok(value), Some(trace)) => {
                self.renderer.lock().render_tree(&trace);
                Ok(value)
            }
            (Ok(value), None) => Ok(value),
            (Err(err), _) => {
                debug!(function = meta.name(), "traced call failed; tree discarded");
                Err(err)
            }
        }
    }

    /// Wrap `call` so every invocation is traced.
    pub fn wrap<'a, A, T>(
        &'a self,
        meta: &'static FunctionMeta,
        call: impl Fn(A) -> T + 'a,
    ) -> impl Fn(A) -> Result<T> + 'a {
        move |args| self.run(meta, || call(args))
    }

    /// Wrap a fallible `call`; each invocation goes through
    /// [`run_fallible`](Self::run_fallible).
    pub fn wrap_fallible<'a, A, T, E>(
        &'a self,
        meta: &'static FunctionMeta,
        call: impl Fn(A) -> std::result::Result<T, E> + 'a,
    ) -> impl Fn(A) -> std::result::Result<T, E> + 'a
    where
        E: From<Error>,
    {
        move |args| self.run_fallible(meta, || call(args))
    }
}
